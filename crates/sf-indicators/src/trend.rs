//! Moving averages: `ma`, `ema`, `smma`, `macd` and `bbi`.

use sf_columnar::{ewma, rolling_mean};
use sf_directive::{CommandDefinition, CommandPreset, CommandRegistry, FormulaError};
use sf_types::ArgValue;

use crate::args::{
    expect_series, period, period_or, series, unbounded_lookback, usize_at, window_lookback,
};

type Output = Result<(Vec<f64>, usize), FormulaError>;

/// Exponential moving average with `alpha = 2 / (period + 1)`.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    ewma(values, 2.0 / (period as f64 + 1.0), period)
}

/// Smoothed (Wilder) moving average with `alpha = 1 / period`.
#[must_use]
pub fn smma(values: &[f64], period: usize) -> Vec<f64> {
    ewma(values, 1.0 / period as f64, period)
}

/// Fast EMA minus slow EMA.
#[must_use]
pub fn macd(values: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    ema(values, fast)
        .into_iter()
        .zip(ema(values, slow))
        .map(|(fast, slow)| fast - slow)
        .collect()
}

#[must_use]
pub fn macd_signal(values: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
    ema(&macd(values, fast, slow), signal)
}

/// Twice the distance between the macd line and its signal line.
#[must_use]
pub fn macd_histogram(values: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<f64> {
    let line = macd(values, fast, slow);
    let signal = ema(&line, signal);
    line.into_iter()
        .zip(signal)
        .map(|(line, signal)| 2.0 * (line - signal))
        .collect()
}

/// Bull and bear index: the average of four simple moving averages.
#[must_use]
pub fn bbi(values: &[f64], periods: [usize; 4]) -> Vec<f64> {
    let averages = periods.map(|period| rolling_mean(values, period));
    (0..values.len())
        .map(|row| averages.iter().map(|ma| ma[row]).sum::<f64>() / 4.0)
        .collect()
}

fn ma_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let close = single(series)?;
    let period = usize_at(params, 0)?;
    Ok((rolling_mean(close, period), window_lookback(params)))
}

fn ema_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let close = single(series)?;
    Ok((ema(close, usize_at(params, 0)?), unbounded_lookback(params)))
}

fn smma_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let close = single(series)?;
    Ok((smma(close, usize_at(params, 0)?), unbounded_lookback(params)))
}

fn macd_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let close = single(series)?;
    let values = macd(close, usize_at(params, 0)?, usize_at(params, 1)?);
    Ok((values, unbounded_lookback(params)))
}

fn macd_signal_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let close = single(series)?;
    let values = macd_signal(
        close,
        usize_at(params, 0)?,
        usize_at(params, 1)?,
        usize_at(params, 2)?,
    );
    Ok((values, unbounded_lookback(params)))
}

fn macd_histogram_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let close = single(series)?;
    let values = macd_histogram(
        close,
        usize_at(params, 0)?,
        usize_at(params, 1)?,
        usize_at(params, 2)?,
    );
    Ok((values, unbounded_lookback(params)))
}

fn bbi_periods(params: &[ArgValue]) -> Result<[usize; 4], FormulaError> {
    Ok([
        usize_at(params, 0)?,
        usize_at(params, 1)?,
        usize_at(params, 2)?,
        usize_at(params, 3)?,
    ])
}

fn bbi_lookback(params: &[ArgValue]) -> usize {
    params
        .iter()
        .filter_map(|p| p.as_usize().ok())
        .max()
        .map_or(0, |period| period.saturating_sub(1))
}

fn bbi_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let close = single(series)?;
    Ok((bbi(close, bbi_periods(params)?), bbi_lookback(params)))
}

fn single<'a>(series: &[&'a [f64]]) -> Result<&'a [f64], FormulaError> {
    Ok(expect_series(series, 1)?[0])
}

pub(crate) fn register(registry: &mut CommandRegistry) {
    registry.register(
        "ma",
        CommandDefinition::new(CommandPreset::new(
            ma_formula,
            window_lookback,
            vec![period(), series("close")],
        )),
    );

    registry.register(
        "ema",
        CommandDefinition::new(CommandPreset::new(
            ema_formula,
            unbounded_lookback,
            vec![period(), series("close")],
        )),
    );

    registry.register(
        "smma",
        CommandDefinition::new(CommandPreset::new(
            smma_formula,
            unbounded_lookback,
            vec![period(), series("close")],
        )),
    );

    let signal_args = || {
        vec![
            period_or(12),
            period_or(26),
            period_or(9),
            series("close"),
        ]
    };
    registry.register(
        "macd",
        CommandDefinition::new(CommandPreset::new(
            macd_formula,
            unbounded_lookback,
            vec![period_or(12), period_or(26), series("close")],
        ))
        .with_sub_command(
            "signal",
            CommandPreset::new(macd_signal_formula, unbounded_lookback, signal_args()),
        )
        .with_sub_command(
            "histogram",
            CommandPreset::new(macd_histogram_formula, unbounded_lookback, signal_args()),
        )
        .with_alias("s", Some("signal"))
        .with_alias("h", Some("histogram"))
        .with_alias("dif", None)
        .with_alias("dea", Some("signal"))
        .with_alias("macd", Some("histogram")),
    );

    registry.register(
        "bbi",
        CommandDefinition::new(CommandPreset::new(
            bbi_formula,
            bbi_lookback,
            vec![
                period_or(3),
                period_or(6),
                period_or(12),
                period_or(24),
                series("close"),
            ],
        )),
    );
}
