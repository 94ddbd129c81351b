//! Helpers over arbitrary series: `column`, `increase`, `repeat`,
//! `change` and `style`.

use sf_columnar::{FALSE, from_bool, truthy};
use sf_directive::{ArgSpec, CommandDefinition, CommandPreset, CommandRegistry, FormulaError};
use sf_types::{ArgValue, coerce_choice};

use crate::args::{
    direction, expect_series, i64_at, period_lookback, period_or, repeat, required_series, series,
    usize_at, window_lookback,
};

type Output = Result<(Vec<f64>, usize), FormulaError>;

const CHANGE_EPSILON: f64 = 1e-10;

const STYLES: [&str; 2] = ["bullish", "bearish"];

/// Rolling boolean reduction; rows without a full window are false.
fn rolling_flag(values: &[f64], window: usize, f: impl Fn(&[f64]) -> bool) -> Vec<f64> {
    let mut out = vec![FALSE; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }
    for (offset, chunk) in values.windows(window).enumerate() {
        out[offset + window - 1] = from_bool(f(chunk));
    }
    out
}

/// Whether the series kept moving in `direction` (`1` up, `-1` down) for
/// `repeat` consecutive rows.
#[must_use]
pub fn increase(values: &[f64], repeat: usize, direction: i64) -> Vec<f64> {
    let direction = direction as f64;
    let start = if direction > 0.0 {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    };

    rolling_flag(values, repeat + 1, |chunk| {
        let mut current = start;
        chunk.iter().all(|value| {
            let moved = (value - current) * direction > 0.0;
            current = *value;
            moved
        })
    })
}

/// Whether the series was truthy for `repeat` consecutive rows.
#[must_use]
pub fn repeat_truthy(values: &[f64], repeat: usize) -> Vec<f64> {
    rolling_flag(values, repeat, |chunk| chunk.iter().copied().all(truthy))
}

/// Relative change against the value `period - 1` rows earlier.
#[must_use]
pub fn change(values: &[f64], period: usize) -> Vec<f64> {
    let shift = period.saturating_sub(1);
    (0..values.len())
        .map(|row| {
            let Some(previous) = row.checked_sub(shift).map(|i| values[i]) else {
                return f64::NAN;
            };
            if previous.abs() > CHANGE_EPSILON {
                values[row] / previous - 1.0
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// `bullish` rows close above the open, `bearish` rows below it.
#[must_use]
pub fn style(close: &[f64], open: &[f64], bullish: bool) -> Vec<f64> {
    close
        .iter()
        .zip(open)
        .map(|(close, open)| from_bool(if bullish { close > open } else { close < open }))
        .collect()
}

fn column_formula(_: &[ArgValue], series: &[&[f64]]) -> Output {
    Ok((expect_series(series, 1)?[0].to_vec(), 0))
}

fn increase_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let values = expect_series(series, 1)?[0];
    let result = increase(values, usize_at(params, 0)?, i64_at(params, 1)?);
    Ok((result, period_lookback(params)))
}

fn repeat_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let values = expect_series(series, 1)?[0];
    Ok((
        repeat_truthy(values, usize_at(params, 0)?),
        window_lookback(params),
    ))
}

fn change_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let values = expect_series(series, 1)?[0];
    Ok((change(values, usize_at(params, 0)?), window_lookback(params)))
}

fn style_formula(params: &[ArgValue], series: &[&[f64]]) -> Output {
    let series = expect_series(series, 2)?;
    let name = params
        .first()
        .ok_or_else(|| FormulaError::InvalidArgument("missing style".to_owned()))?
        .as_str()?;
    Ok((style(series[0], series[1], name == "bullish"), 0))
}

pub(crate) fn register(registry: &mut CommandRegistry) {
    registry.register(
        "column",
        CommandDefinition::new(CommandPreset::new(
            column_formula,
            |_| 0,
            vec![required_series()],
        )),
    );

    registry.register(
        "increase",
        CommandDefinition::new(CommandPreset::new(
            increase_formula,
            period_lookback,
            vec![repeat(), direction(), required_series()],
        )),
    );

    registry.register(
        "repeat",
        CommandDefinition::new(CommandPreset::new(
            repeat_formula,
            window_lookback,
            vec![repeat(), required_series()],
        )),
    );

    registry.register(
        "change",
        CommandDefinition::new(CommandPreset::new(
            change_formula,
            window_lookback,
            vec![period_or(2), required_series()],
        )),
    );

    registry.register(
        "style",
        CommandDefinition::new(CommandPreset::new(
            style_formula,
            |_| 0,
            vec![
                ArgSpec::param().with_coerce(|raw| {
                    coerce_choice("style", raw, &STYLES).map_err(|e| e.to_string())
                }),
                series("close"),
                series("open"),
            ],
        )),
    );
}
