//! Per-column result cache with append-only incremental recomputation.

use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;

use crate::ast::Directive;
use crate::error::EvalError;
use crate::eval::run;

/// Bookkeeping stored next to a computed column.
///
/// Rows `[0, size)` of the cached array are valid. `size == 0` forces a
/// full recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub size: usize,
    #[serde(serialize_with = "serialize_directive")]
    pub directive: Arc<Directive>,
    pub lookback: usize,
}

impl ColumnInfo {
    #[must_use]
    pub fn new(directive: Arc<Directive>, size: usize) -> Self {
        let lookback = directive.lookback();
        Self {
            size,
            directive,
            lookback,
        }
    }

    fn describes(&self, directive: &Arc<Directive>, lookback: usize) -> bool {
        self.lookback == lookback
            && (Arc::ptr_eq(&self.directive, directive) || *self.directive == **directive)
    }
}

fn serialize_directive<S: serde::Serializer>(
    directive: &Arc<Directive>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(directive)
}

/// Tabular data a directive can be evaluated against.
pub trait DataSource {
    fn row_count(&self) -> usize;

    /// Rows `range` of the named input series.
    fn series(&self, name: &str, range: Range<usize>) -> Result<&[f64], EvalError>;

    fn cached_column(&self, key: &str) -> Option<(&[f64], &ColumnInfo)>;

    /// Stores a computed column. A source may decline, in which case the
    /// next evaluation recomputes it.
    fn set_cached_column(&mut self, key: &str, values: Vec<f64>, info: ColumnInfo);
}

enum Plan {
    Hit(Vec<f64>),
    Tail { size: usize, cached: Vec<f64> },
    Full,
}

/// Evaluates `directive` over every row of `source`, reusing the cached
/// column where it is still valid.
///
/// When rows were appended since the column was computed, only the new
/// rows are evaluated, starting `lookback` rows earlier so that windowed
/// formulas see complete windows. Cached rows are never rewritten.
pub fn exec<S: DataSource + ?Sized>(
    source: &mut S,
    directive: &Arc<Directive>,
) -> Result<Vec<f64>, EvalError> {
    let rows = source.row_count();
    let key = directive.to_string();
    let lookback = directive.lookback();

    let plan = match source.cached_column(&key) {
        Some((values, info)) if info.describes(directive, lookback) && info.size > 0 => {
            if info.size == rows && values.len() == rows {
                Plan::Hit(values.to_vec())
            } else if info.size < rows {
                Plan::Tail {
                    size: info.size,
                    cached: values.to_vec(),
                }
            } else {
                Plan::Full
            }
        }
        _ => Plan::Full,
    };

    let values = match plan {
        Plan::Hit(values) => {
            #[cfg(feature = "tracing")]
            tracing::trace!(column = %key, rows, "column cache hit");
            return Ok(values);
        }
        Plan::Tail { size, mut cached } => {
            let start = size.saturating_sub(lookback);
            #[cfg(feature = "tracing")]
            tracing::debug!(column = %key, size, rows, start, "column cache incremental update");

            let (tail, _) = run(directive, source, start..rows)?;
            cached.resize(rows, f64::NAN);
            let skip = size - start;
            cached[size..].copy_from_slice(&tail[skip..]);
            cached
        }
        Plan::Full => {
            #[cfg(feature = "tracing")]
            tracing::debug!(column = %key, rows, "column cache full computation");

            run(directive, source, 0..rows)?.0
        }
    };

    source.set_cached_column(
        &key,
        values.clone(),
        ColumnInfo {
            size: rows,
            directive: Arc::clone(directive),
            lookback,
        },
    );
    Ok(values)
}
