//! Volatility: `mstd`, `boll`, `bbw`, `hv` and `atr`.

use sf_columnar::{rolling_mean, rolling_std};
use sf_directive::{CommandDefinition, CommandPreset, CommandRegistry, FormulaError};
use sf_types::ArgValue;

use crate::args::{
    DAY_MINUTES, expect_series, f64_at, i64_at, minutes_of, period, period_lookback, period_or,
    series, str_at, time_frame, times, trading_days, usize_at, window_lookback,
};

type Output = Result<(Vec<f64>, usize), FormulaError>;

/// Moving sample standard deviation.
#[must_use]
pub fn mstd(values: &[f64], period: usize) -> Vec<f64> {
    rolling_std(values, period, 1)
}

/// Bollinger band: the moving average shifted by `times` population
/// standard deviations. A negative `times` gives the lower band.
#[must_use]
pub fn boll_band(values: &[f64], period: usize, times: f64) -> Vec<f64> {
    rolling_mean(values, period)
        .into_iter()
        .zip(rolling_std(values, period, 0))
        .map(|(ma, std)| ma + times * std)
        .collect()
}

/// Bollinger band width, `4 * std / ma`.
#[must_use]
pub fn bbw(values: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(values, period)
        .into_iter()
        .zip(rolling_std(values, period, 0))
        .map(|(ma, std)| 4.0 * std / ma)
        .collect()
}

/// Historical volatility: the sample standard deviation of log returns,
/// annualized for bars of `minutes` over `trading_days` days a year.
#[must_use]
pub fn hv(close: &[f64], period: usize, minutes: i64, trading_days: i64) -> Vec<f64> {
    let log_returns: Vec<f64> = std::iter::once(f64::NAN)
        .chain(close.windows(2).map(|pair| (pair[1] / pair[0]).ln()))
        .take(close.len())
        .collect();
    let scale = (trading_days as f64 * DAY_MINUTES as f64 / minutes as f64).sqrt();

    rolling_std(&log_returns, period, 1)
        .into_iter()
        .map(|std| std * scale)
        .collect()
}

/// Average true range. The first row has no previous close, so its true
/// range is `high - low`.
#[must_use]
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let true_range: Vec<f64> = (0..high.len())
        .map(|row| {
            let range = high[row] - low[row];
            match row.checked_sub(1).map(|prev| close[prev]) {
                Some(prev_close) => range
                    .max((high[row] - prev_close).abs())
                    .max((low[row] - prev_close).abs()),
                None => range,
            }
        })
        .collect();

    rolling_mean(&true_range, period)
}

fn input<'a>(series: &[&'a [f64]]) -> Result<&'a [f64], FormulaError> {
    Ok(expect_series(series, 1)?[0])
}

fn mstd_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    Ok((mstd(input(series)?, usize_at(params, 0)?), window_lookback(params)))
}

fn boll_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    Ok((
        rolling_mean(input(series)?, usize_at(params, 0)?),
        window_lookback(params),
    ))
}

fn boll_upper_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let values = boll_band(input(series)?, usize_at(params, 0)?, f64_at(params, 1)?);
    Ok((values, window_lookback(params)))
}

fn boll_lower_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let values = boll_band(input(series)?, usize_at(params, 0)?, -f64_at(params, 1)?);
    Ok((values, window_lookback(params)))
}

fn bbw_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    Ok((bbw(input(series)?, usize_at(params, 0)?), window_lookback(params)))
}

fn hv_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let values = hv(
        input(series)?,
        usize_at(params, 0)?,
        minutes_of(str_at(params, 1)?)?,
        i64_at(params, 2)?,
    );
    Ok((values, period_lookback(params)))
}

fn atr_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let series = expect_series(series, 3)?;
    let values = atr(series[0], series[1], series[2], usize_at(params, 0)?);
    Ok((values, period_lookback(params)))
}

pub(crate) fn register(registry: &mut CommandRegistry) {
    registry.register(
        "mstd",
        CommandDefinition::new(CommandPreset::new(
            mstd_formula,
            window_lookback,
            vec![period(), series("close")],
        )),
    );

    let band_args = || vec![period_or(20), times(), series("close")];
    registry.register(
        "boll",
        CommandDefinition::new(CommandPreset::new(
            boll_formula,
            window_lookback,
            vec![period_or(20), series("close")],
        ))
        .with_sub_command(
            "upper",
            CommandPreset::new(boll_upper_formula, window_lookback, band_args()),
        )
        .with_sub_command(
            "lower",
            CommandPreset::new(boll_lower_formula, window_lookback, band_args()),
        )
        .with_alias("u", Some("upper"))
        .with_alias("l", Some("lower")),
    );

    registry.register(
        "bbw",
        CommandDefinition::new(CommandPreset::new(
            bbw_formula,
            window_lookback,
            vec![period_or(20), series("close")],
        )),
    );

    registry.register(
        "hv",
        CommandDefinition::new(CommandPreset::new(
            hv_formula,
            period_lookback,
            vec![period(), time_frame(), trading_days(), series("close")],
        )),
    );

    registry.register(
        "atr",
        CommandDefinition::new(CommandPreset::new(
            atr_formula,
            period_lookback,
            vec![
                period_or(14),
                series("high"),
                series("low"),
                series("close"),
            ],
        )),
    );
}
