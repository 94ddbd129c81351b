#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TRUE: f64 = 1.0;
pub const FALSE: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Gt,
    Lt,
    Eq,
    Ne,
    Ge,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossOp {
    Either,
    Up,
    Down,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColumnError {
    #[error("column length mismatch: left={left}, right={right}")]
    LengthMismatch { left: usize, right: usize },
}

/// Booleans are stored as `1.0` / `0.0`; NaN is never true.
#[must_use]
pub fn truthy(value: f64) -> bool {
    !value.is_nan() && value != 0.0
}

#[must_use]
pub fn from_bool(value: bool) -> f64 {
    if value { TRUE } else { FALSE }
}

fn zip_with(
    left: &[f64],
    right: &[f64],
    f: impl Fn(f64, f64) -> f64,
) -> Result<Vec<f64>, ColumnError> {
    if left.len() != right.len() {
        return Err(ColumnError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    Ok(left.iter().zip(right).map(|(l, r)| f(*l, *r)).collect())
}

pub fn binary_numeric(
    left: &[f64],
    right: &[f64],
    op: ArithmeticOp,
) -> Result<Vec<f64>, ColumnError> {
    zip_with(left, right, |l, r| match op {
        ArithmeticOp::Add => l + r,
        ArithmeticOp::Sub => l - r,
        ArithmeticOp::Mul => l * r,
        ArithmeticOp::Div => l / r,
    })
}

/// Any comparison involving NaN yields false, matching numpy.
pub fn compare(left: &[f64], right: &[f64], op: ComparisonOp) -> Result<Vec<f64>, ColumnError> {
    zip_with(left, right, |l, r| {
        from_bool(match op {
            ComparisonOp::Gt => l > r,
            ComparisonOp::Lt => l < r,
            ComparisonOp::Eq => l == r,
            ComparisonOp::Ne => l != r,
            ComparisonOp::Ge => l >= r,
            ComparisonOp::Le => l <= r,
        })
    })
}

pub fn logical(left: &[f64], right: &[f64], op: LogicalOp) -> Result<Vec<f64>, ColumnError> {
    zip_with(left, right, |l, r| match op {
        LogicalOp::And => from_bool(truthy(l) && truthy(r)),
        LogicalOp::Or => from_bool(truthy(l) || truthy(r)),
        LogicalOp::BitAnd => (as_bits(l) & as_bits(r)) as f64,
        LogicalOp::BitOr => (as_bits(l) | as_bits(r)) as f64,
        LogicalOp::BitXor => (as_bits(l) ^ as_bits(r)) as f64,
    })
}

fn as_bits(value: f64) -> i64 {
    if value.is_nan() { 0 } else { value as i64 }
}

/// Marks the rows where the order of `left` and `right` flips relative to
/// the previous row. Row 0 never crosses.
pub fn cross(left: &[f64], right: &[f64], op: CrossOp) -> Result<Vec<f64>, ColumnError> {
    let above = compare(left, right, ComparisonOp::Gt)?;

    let mut out = vec![FALSE; above.len()];
    for i in 1..above.len() {
        let crossed = above[i] != above[i - 1];
        let is_above = truthy(above[i]);
        out[i] = from_bool(match op {
            CrossOp::Either => crossed,
            CrossOp::Up => crossed && is_above,
            CrossOp::Down => crossed && !is_above,
        });
    }

    Ok(out)
}

/// Applies `f` to every full `window`-sized window ending at each row.
/// Rows without a full window are NaN.
///
/// Every window is reduced from scratch so that a value only depends on
/// the rows inside its window, which keeps tail recomputation bit-identical
/// to a full pass.
pub fn rolling(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }

    for (offset, chunk) in values.windows(window).enumerate() {
        out[offset + window - 1] = f(chunk);
    }

    out
}

#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, mean)
}

/// Rolling standard deviation with `ddof` delta degrees of freedom:
/// `1` for the sample deviation, `0` for the population deviation.
#[must_use]
pub fn rolling_std(values: &[f64], window: usize, ddof: usize) -> Vec<f64> {
    rolling(values, window, |chunk| {
        if chunk.len() <= ddof {
            return f64::NAN;
        }
        let m = mean(chunk);
        let var =
            chunk.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (chunk.len() - ddof) as f64;
        var.sqrt()
    })
}

#[must_use]
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |chunk| {
        chunk.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

#[must_use]
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |chunk| {
        chunk.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

fn mean(chunk: &[f64]) -> f64 {
    chunk.iter().sum::<f64>() / chunk.len() as f64
}

/// Exponentially weighted moving average seeded with the first non-NaN
/// value. NaN inputs keep the running value; rows before `min_periods`
/// observations are NaN.
#[must_use]
pub fn ewma(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut current = f64::NAN;
    let mut seen = 0_usize;

    for (slot, value) in out.iter_mut().zip(values) {
        if !value.is_nan() {
            seen += 1;
            current = if current.is_nan() {
                *value
            } else {
                alpha * value + (1.0 - alpha) * current
            };
        }

        if seen >= min_periods {
            *slot = current;
        }
    }

    out
}

/// Broadcasts a scalar to a column of `len` rows.
#[must_use]
pub fn broadcast(value: f64, len: usize) -> Vec<f64> {
    vec![value; len]
}

#[must_use]
pub fn semantic_eq(left: &[f64], right: &[f64]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(l, r)| (l.is_nan() && r.is_nan()) || l == r)
}
