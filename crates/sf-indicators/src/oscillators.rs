//! Overbought / oversold indicators: `llv`, `hhv`, `donchian`, `rsv`, `kdj`,
//! their close-only variants `rsvc` and `kdjc`, and `rsi`.

use sf_columnar::{rolling_max, rolling_min};
use sf_directive::{ArgSpec, CommandDefinition, CommandPreset, CommandRegistry, FormulaError};
use sf_types::ArgValue;

use crate::args::{
    expect_series, f64_at, init, period, period_or, series, unbounded_lookback, usize_at,
    window_lookback,
};
use crate::trend::smma;

type Output = Result<(Vec<f64>, usize), FormulaError>;

const KDJ_WEIGHT_K: f64 = 3.0;
const KDJ_WEIGHT_D: f64 = 2.0;

/// Smoothed losses below this count as no loss at all.
const RSI_FLAT_LOSS: f64 = 1e-10;

/// Middle line of the Donchian channel.
#[must_use]
pub fn donchian(high: &[f64], low: &[f64], period: usize) -> Vec<f64> {
    rolling_max(high, period)
        .into_iter()
        .zip(rolling_min(low, period))
        .map(|(hhv, llv)| (hhv + llv) / 2.0)
        .collect()
}

/// Raw stochastic value in `[0, 100]`. Rows without a full window are 0.
#[must_use]
pub fn rsv(close: &[f64], high: &[f64], low: &[f64], period: usize) -> Vec<f64> {
    let llv = rolling_min(low, period);
    let hhv = rolling_max(high, period);

    close
        .iter()
        .zip(llv.iter().zip(&hhv))
        .map(|(close, (llv, hhv))| {
            let value = (close - llv) / (hhv - llv);
            if value.is_nan() { 0.0 } else { value * 100.0 }
        })
        .collect()
}

/// Running smoothing `k = (1 - 1/period) * k + x / period` starting at
/// `init`.
#[must_use]
pub fn kdj_smooth(values: &[f64], period: usize, init: f64) -> Vec<f64> {
    let alpha = 1.0 / period as f64;
    values
        .iter()
        .scan(init, |k, x| {
            *k = (1.0 - alpha) * *k + alpha * x;
            Some(*k)
        })
        .collect()
}

#[must_use]
pub fn kdj_k(
    close: &[f64],
    high: &[f64],
    low: &[f64],
    rsv_period: usize,
    k_period: usize,
    init: f64,
) -> Vec<f64> {
    kdj_smooth(&rsv(close, high, low, rsv_period), k_period, init)
}

#[must_use]
pub fn kdj_d(
    close: &[f64],
    high: &[f64],
    low: &[f64],
    periods: [usize; 3],
    init: f64,
) -> Vec<f64> {
    let [rsv_period, k_period, d_period] = periods;
    kdj_smooth(&kdj_k(close, high, low, rsv_period, k_period, init), d_period, init)
}

/// `3k - 2d`.
#[must_use]
pub fn kdj_j(
    close: &[f64],
    high: &[f64],
    low: &[f64],
    periods: [usize; 3],
    init: f64,
) -> Vec<f64> {
    let [rsv_period, k_period, d_period] = periods;
    let k = kdj_k(close, high, low, rsv_period, k_period, init);
    let d = kdj_smooth(&k, d_period, init);
    k.into_iter()
        .zip(d)
        .map(|(k, d)| KDJ_WEIGHT_K * k - KDJ_WEIGHT_D * d)
        .collect()
}

/// Relative strength index over smoothed gains and losses. A window
/// without losses is 100.
#[must_use]
pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let delta: Vec<f64> = std::iter::once(f64::NAN)
        .chain(close.windows(2).map(|pair| pair[1] - pair[0]))
        .take(close.len())
        .collect();

    let gains: Vec<f64> = delta.iter().map(|d| (d.abs() + d) / 2.0).collect();
    let losses: Vec<f64> = delta.iter().map(|d| (d.abs() - d) / 2.0).collect();

    smma(&gains, period)
        .into_iter()
        .zip(smma(&losses, period))
        .map(|(gain, loss)| {
            if loss.abs() < RSI_FLAT_LOSS && !gain.is_nan() {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}

fn llv_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let low = expect_series(series, 1)?[0];
    Ok((rolling_min(low, usize_at(params, 0)?), window_lookback(params)))
}

fn hhv_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let high = expect_series(series, 1)?[0];
    Ok((rolling_max(high, usize_at(params, 0)?), window_lookback(params)))
}

fn donchian_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let series = expect_series(series, 2)?;
    let values = donchian(series[0], series[1], usize_at(params, 0)?);
    Ok((values, window_lookback(params)))
}

/// Picks close, high and low out of the input series.
type Inputs = for<'a> fn(&[&'a [f64]]) -> Result<[&'a [f64]; 3], FormulaError>;

fn hlc<'a>(series: &[&'a [f64]]) -> Result<[&'a [f64]; 3], FormulaError> {
    let series = expect_series(series, 3)?;
    Ok([series[0], series[1], series[2]])
}

/// The close stands in for the high and the low.
fn close_only<'a>(series: &[&'a [f64]]) -> Result<[&'a [f64]; 3], FormulaError> {
    let close = expect_series(series, 1)?[0];
    Ok([close, close, close])
}

fn rsv_formula(inputs: Inputs, params: &[ArgValue], series: &[&[f64]]) -> Output {
    let [close, high, low] = inputs(series)?;
    Ok((rsv(close, high, low, usize_at(params, 0)?), window_lookback(params)))
}

fn kdj_k_formula(inputs: Inputs, params: &[ArgValue], series: &[&[f64]]) -> Output {
    let [close, high, low] = inputs(series)?;
    let values = kdj_k(
        close,
        high,
        low,
        usize_at(params, 0)?,
        usize_at(params, 1)?,
        f64_at(params, 2)?,
    );
    Ok((values, unbounded_lookback(params)))
}

fn kdj_periods(params: &[ArgValue]) -> Result<[usize; 3], FormulaError> {
    Ok([
        usize_at(params, 0)?,
        usize_at(params, 1)?,
        usize_at(params, 2)?,
    ])
}

fn kdj_d_formula(inputs: Inputs, params: &[ArgValue], series: &[&[f64]]) -> Output {
    let [close, high, low] = inputs(series)?;
    let values = kdj_d(close, high, low, kdj_periods(params)?, f64_at(params, 3)?);
    Ok((values, unbounded_lookback(params)))
}

fn kdj_j_formula(inputs: Inputs, params: &[ArgValue], series: &[&[f64]]) -> Output {
    let [close, high, low] = inputs(series)?;
    let values = kdj_j(close, high, low, kdj_periods(params)?, f64_at(params, 3)?);
    Ok((values, unbounded_lookback(params)))
}

fn rsi_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let close = expect_series(series, 1)?[0];
    Ok((rsi(close, usize_at(params, 0)?), unbounded_lookback(params)))
}

fn hlc_series() -> Vec<ArgSpec> {
    vec![series("close"), series("high"), series("low")]
}

fn close_series() -> Vec<ArgSpec> {
    vec![series("close")]
}

fn rsv_definition(inputs: Inputs, input_series: fn() -> Vec<ArgSpec>) -> CommandDefinition {
    let mut args = vec![period()];
    args.extend(input_series());
    CommandDefinition::new(CommandPreset::new(
        move |params: &[ArgValue], series: &[&[f64]]| rsv_formula(inputs, params, series),
        window_lookback,
        args,
    ))
}

fn kdj_definition(inputs: Inputs, input_series: fn() -> Vec<ArgSpec>) -> CommandDefinition {
    let mut k_args = vec![period_or(9), period_or(3), init()];
    k_args.extend(input_series());
    let dj_args = || {
        let mut args = vec![period_or(9), period_or(3), period_or(3), init()];
        args.extend(input_series());
        args
    };

    CommandDefinition::sub_commands_only()
        .with_sub_command(
            "k",
            CommandPreset::new(
                move |params: &[ArgValue], series: &[&[f64]]| {
                    kdj_k_formula(inputs, params, series)
                },
                unbounded_lookback,
                k_args,
            ),
        )
        .with_sub_command(
            "d",
            CommandPreset::new(
                move |params: &[ArgValue], series: &[&[f64]]| {
                    kdj_d_formula(inputs, params, series)
                },
                unbounded_lookback,
                dj_args(),
            ),
        )
        .with_sub_command(
            "j",
            CommandPreset::new(
                move |params: &[ArgValue], series: &[&[f64]]| {
                    kdj_j_formula(inputs, params, series)
                },
                unbounded_lookback,
                dj_args(),
            ),
        )
}

pub(crate) fn register(registry: &mut CommandRegistry) {
    let llv = || CommandPreset::new(llv_formula, window_lookback, vec![period(), series("low")]);
    let hhv = || CommandPreset::new(hhv_formula, window_lookback, vec![period(), series("high")]);

    registry.register("llv", CommandDefinition::new(llv()));
    registry.register("hhv", CommandDefinition::new(hhv()));

    registry.register(
        "donchian",
        CommandDefinition::new(CommandPreset::new(
            donchian_formula,
            window_lookback,
            vec![period(), series("high"), series("low")],
        ))
        .with_sub_command("upper", hhv())
        .with_sub_command("lower", llv())
        .with_alias("u", Some("upper"))
        .with_alias("l", Some("lower"))
        .with_alias("middle", None),
    );

    registry.register("rsv", rsv_definition(hlc, hlc_series));
    registry.register("kdj", kdj_definition(hlc, hlc_series));
    registry.register("rsvc", rsv_definition(close_only, close_series));
    registry.register("kdjc", kdj_definition(close_only, close_series));

    registry.register(
        "rsi",
        CommandDefinition::new(CommandPreset::new(
            rsi_formula,
            unbounded_lookback,
            vec![period(), series("close")],
        )),
    );
}
