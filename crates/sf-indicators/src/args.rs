//! Argument schemas and parameter accessors shared by the builtin commands.

use sf_directive::{ArgSpec, FormulaError, UNBOUNDED_LOOKBACK};
use sf_types::{
    ArgValue, coerce_direction, coerce_float, coerce_float_in_range, coerce_int,
    coerce_int_in_range,
};

/// Bar sizes accepted by `hv`, with their length in minutes.
const TIME_FRAMES: [(&str, i64); 14] = [
    ("1m", 1),
    ("3m", 3),
    ("5m", 5),
    ("15m", 15),
    ("30m", 30),
    ("1h", 60),
    ("2h", 120),
    ("4h", 240),
    ("6h", 360),
    ("8h", 480),
    ("12h", 720),
    ("1d", 1440),
    ("3d", 4320),
    ("1w", 10080),
];

pub(crate) const DAY_MINUTES: i64 = 1440;

/// A period that must be greater than 1.
pub(crate) fn period() -> ArgSpec {
    ArgSpec::param().with_coerce(|raw| coerce_int("period", raw, 1).map_err(|e| e.to_string()))
}

pub(crate) fn period_or(default: i64) -> ArgSpec {
    period().with_default(default)
}

pub(crate) fn times() -> ArgSpec {
    ArgSpec::param()
        .with_default(2.0)
        .with_coerce(|raw| coerce_float("times", raw, 0.0).map_err(|e| e.to_string()))
}

pub(crate) fn repeat() -> ArgSpec {
    ArgSpec::param()
        .with_default(1_i64)
        .with_coerce(|raw| coerce_int("repeat", raw, 0).map_err(|e| e.to_string()))
}

pub(crate) fn direction() -> ArgSpec {
    ArgSpec::param()
        .with_default(1_i64)
        .with_coerce(|raw| coerce_direction(raw).map_err(|e| e.to_string()))
}

/// Starting value of the KDJ smoothing, in `[0, 100]`.
pub(crate) fn init() -> ArgSpec {
    ArgSpec::param().with_default(50.0).with_coerce(|raw| {
        coerce_float_in_range("init", raw, 0.0, 100.0).map_err(|e| e.to_string())
    })
}

/// A bar size such as `15m` or `1d`. Upper-case day suffixes are folded
/// to the lower-case spelling.
pub(crate) fn time_frame() -> ArgSpec {
    ArgSpec::param().with_default("1d").with_coerce(|raw| {
        let name = raw.trim().replace('D', "d");
        TIME_FRAMES
            .iter()
            .find(|(frame, _)| *frame == name)
            .map(|(frame, _)| ArgValue::from(*frame))
            .ok_or_else(|| format!("`{raw}` is not a valid time frame"))
    })
}

pub(crate) fn minutes_of(frame: &str) -> Result<i64, FormulaError> {
    TIME_FRAMES
        .iter()
        .find(|(name, _)| *name == frame)
        .map(|(_, minutes)| *minutes)
        .ok_or_else(|| FormulaError::InvalidArgument(format!("unknown time frame `{frame}`")))
}

pub(crate) fn trading_days() -> ArgSpec {
    ArgSpec::param().with_default(252_i64).with_coerce(|raw| {
        coerce_int_in_range("trading days", raw, 1, 365).map_err(|e| e.to_string())
    })
}

pub(crate) fn series(default: &str) -> ArgSpec {
    ArgSpec::series(Some(default))
}

pub(crate) fn required_series() -> ArgSpec {
    ArgSpec::series(None)
}

pub(crate) fn usize_at(params: &[ArgValue], index: usize) -> Result<usize, FormulaError> {
    param(params, index)?.as_usize().map_err(FormulaError::from)
}

pub(crate) fn f64_at(params: &[ArgValue], index: usize) -> Result<f64, FormulaError> {
    param(params, index)?.as_f64().map_err(FormulaError::from)
}

pub(crate) fn i64_at(params: &[ArgValue], index: usize) -> Result<i64, FormulaError> {
    param(params, index)?.as_i64().map_err(FormulaError::from)
}

pub(crate) fn str_at(params: &[ArgValue], index: usize) -> Result<&str, FormulaError> {
    param(params, index)?.as_str().map_err(FormulaError::from)
}

fn param(params: &[ArgValue], index: usize) -> Result<&ArgValue, FormulaError> {
    params
        .get(index)
        .ok_or_else(|| FormulaError::InvalidArgument(format!("missing params[{index}]")))
}

pub(crate) fn expect_series<'a>(
    series: &[&'a [f64]],
    expected: usize,
) -> Result<Vec<&'a [f64]>, FormulaError> {
    if series.len() != expected {
        return Err(FormulaError::SeriesCount {
            expected,
            actual: series.len(),
        });
    }
    Ok(series.to_vec())
}

/// `period - 1` rows: a window ending at a row covers that many earlier ones.
pub(crate) fn window_lookback(params: &[ArgValue]) -> usize {
    params
        .first()
        .and_then(|p| p.as_usize().ok())
        .map_or(0, |period| period.saturating_sub(1))
}

/// `period` rows: the first value of the window also reads the row before.
pub(crate) fn period_lookback(params: &[ArgValue]) -> usize {
    params
        .first()
        .and_then(|p| p.as_usize().ok())
        .unwrap_or(0)
}

pub(crate) fn unbounded_lookback(_: &[ArgValue]) -> usize {
    UNBOUNDED_LOOKBACK
}
