#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A coerced command argument.
///
/// Display output is the canonical directive text of the value, so
/// `Float(2.0)` prints as `2` and re-coerces to the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Int,
    Float,
    Str,
}

impl ArgValue {
    #[must_use]
    pub fn kind(&self) -> ArgKind {
        match self {
            Self::Int(_) => ArgKind::Int,
            Self::Float(_) => ArgKind::Float,
            Self::Str(_) => ArgKind::Str,
        }
    }

    pub fn as_i64(&self) -> Result<i64, TypeError> {
        match self {
            Self::Int(v) => Ok(*v),
            other => Err(TypeError::UnexpectedKind {
                expected: ArgKind::Int,
                found: other.clone(),
            }),
        }
    }

    pub fn as_usize(&self) -> Result<usize, TypeError> {
        let value = self.as_i64()?;
        usize::try_from(value).map_err(|_| TypeError::UnexpectedKind {
            expected: ArgKind::Int,
            found: self.clone(),
        })
    }

    pub fn as_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::Str(_) => Err(TypeError::UnexpectedKind {
                expected: ArgKind::Float,
                found: self.clone(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, TypeError> {
        match self {
            Self::Str(v) => Ok(v),
            other => Err(TypeError::UnexpectedKind {
                expected: ArgKind::Str,
                found: other.clone(),
            }),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("{name} must be a positive {type_name}, but got `{raw}`")]
    NotANumber {
        name: &'static str,
        type_name: &'static str,
        raw: String,
    },
    #[error("{name} must be greater than {bound}, but got `{raw}`")]
    TooSmall {
        name: &'static str,
        bound: String,
        raw: String,
    },
    #[error("{name} must be in between {min} and {max}, but got `{raw}`")]
    OutOfRange {
        name: &'static str,
        min: String,
        max: String,
        raw: String,
    },
    #[error("{name} should be either {choices}, but got `{raw}`")]
    NotAChoice {
        name: &'static str,
        choices: String,
        raw: String,
    },
    #[error("expected a {expected:?} argument but found {found:?}")]
    UnexpectedKind { expected: ArgKind, found: ArgValue },
}

/// Parses an integer strictly greater than `larger_than`.
pub fn coerce_int(name: &'static str, raw: &str, larger_than: i64) -> Result<ArgValue, TypeError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| TypeError::NotANumber {
            name,
            type_name: "int",
            raw: raw.to_owned(),
        })?;

    if value <= larger_than {
        return Err(TypeError::TooSmall {
            name,
            bound: larger_than.to_string(),
            raw: raw.to_owned(),
        });
    }

    Ok(ArgValue::Int(value))
}

/// Parses a finite float strictly greater than `larger_than`.
pub fn coerce_float(
    name: &'static str,
    raw: &str,
    larger_than: f64,
) -> Result<ArgValue, TypeError> {
    let value = parse_finite(name, raw)?;

    if value <= larger_than {
        return Err(TypeError::TooSmall {
            name,
            bound: larger_than.to_string(),
            raw: raw.to_owned(),
        });
    }

    Ok(ArgValue::Float(value))
}

/// Parses a finite float within `[min, max]`.
pub fn coerce_float_in_range(
    name: &'static str,
    raw: &str,
    min: f64,
    max: f64,
) -> Result<ArgValue, TypeError> {
    let value = parse_finite(name, raw)?;

    if !(min..=max).contains(&value) {
        return Err(TypeError::OutOfRange {
            name,
            min: min.to_string(),
            max: max.to_string(),
            raw: raw.to_owned(),
        });
    }

    Ok(ArgValue::Float(value))
}

pub fn coerce_choice(
    name: &'static str,
    raw: &str,
    choices: &[&str],
) -> Result<ArgValue, TypeError> {
    let value = raw.trim();
    if choices.contains(&value) {
        return Ok(ArgValue::Str(value.to_owned()));
    }

    let choices = choices
        .iter()
        .map(|choice| format!("\"{choice}\""))
        .collect::<Vec<_>>()
        .join(" or ");

    Err(TypeError::NotAChoice {
        name,
        choices,
        raw: raw.to_owned(),
    })
}

/// Parses an integer within `[min, max]`.
pub fn coerce_int_in_range(
    name: &'static str,
    raw: &str,
    min: i64,
    max: i64,
) -> Result<ArgValue, TypeError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| TypeError::NotANumber {
            name,
            type_name: "int",
            raw: raw.to_owned(),
        })?;

    if !(min..=max).contains(&value) {
        return Err(TypeError::OutOfRange {
            name,
            min: min.to_string(),
            max: max.to_string(),
            raw: raw.to_owned(),
        });
    }

    Ok(ArgValue::Int(value))
}

/// `1` for upward, `-1` for downward.
pub fn coerce_direction(raw: &str) -> Result<ArgValue, TypeError> {
    match raw.trim() {
        "1" => Ok(ArgValue::Int(1)),
        "-1" => Ok(ArgValue::Int(-1)),
        _ => Err(TypeError::NotAChoice {
            name: "direction",
            choices: "`1` or `-1`".to_owned(),
            raw: raw.to_owned(),
        }),
    }
}

fn parse_finite(name: &'static str, raw: &str) -> Result<f64, TypeError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| TypeError::NotANumber {
            name,
            type_name: "float",
            raw: raw.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::{
        ArgKind, ArgValue, TypeError, coerce_choice, coerce_direction, coerce_float,
        coerce_float_in_range, coerce_int, coerce_int_in_range,
    };

    #[test]
    fn integral_floats_display_without_fraction() {
        assert_eq!(ArgValue::Float(2.0).to_string(), "2");
        assert_eq!(ArgValue::Float(0.5).to_string(), "0.5");
        assert_eq!(ArgValue::Int(26).to_string(), "26");
        assert_eq!(ArgValue::from("close").to_string(), "close");
    }

    #[test]
    fn period_coercion_reports_readable_messages() {
        assert_eq!(
            coerce_int("period", "5", 1).expect("valid period"),
            ArgValue::Int(5)
        );

        let err = coerce_int("period", "close", 1).expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "period must be a positive int, but got `close`"
        );

        let err = coerce_int("period", "1", 1).expect_err("must fail");
        assert!(err.to_string().contains("greater than 1"));
    }

    #[test]
    fn bounded_ints_include_both_ends() {
        assert_eq!(
            coerce_int_in_range("trading days", "365", 1, 365).expect("upper end"),
            ArgValue::Int(365)
        );
        let err = coerce_int_in_range("trading days", "366", 1, 365).expect_err("too many");
        assert_eq!(
            err.to_string(),
            "trading days must be in between 1 and 365, but got `366`"
        );
        assert!(coerce_int_in_range("trading days", "0", 1, 365).is_err());
    }

    #[test]
    fn float_coercion_rejects_non_finite_values() {
        assert!(coerce_float("times", "inf", 0.0).is_err());
        assert!(coerce_float("times", "nan", 0.0).is_err());
        assert_eq!(
            coerce_float("times", "2.5", 0.0).expect("times"),
            ArgValue::Float(2.5)
        );

        let err = coerce_float_in_range("init", "200", 0.0, 100.0).expect_err("out of range");
        assert!(err.to_string().contains("in between 0 and 100"));
    }

    #[test]
    fn choices_and_direction_are_validated() {
        let err = coerce_choice("style", "cartoon", &["bullish", "bearish"]).expect_err("bad");
        assert_eq!(
            err.to_string(),
            "style should be either \"bullish\" or \"bearish\", but got `cartoon`"
        );
        assert_eq!(
            coerce_direction("-1").expect("direction"),
            ArgValue::Int(-1)
        );
        assert!(coerce_direction("0").is_err());
    }

    #[test]
    fn accessors_reject_mismatched_kinds() {
        let err = ArgValue::from("close").as_usize().expect_err("not an int");
        assert!(matches!(
            err,
            TypeError::UnexpectedKind {
                expected: ArgKind::Int,
                ..
            }
        ));
        assert_eq!(ArgValue::Int(3).as_f64().expect("widen"), 3.0);
    }

    #[test]
    fn arg_values_serialize_with_kind_tags() {
        let json = serde_json::to_string(&ArgValue::Int(12)).expect("serialize");
        assert_eq!(json, r#"{"kind":"int","value":12}"#);

        let back: ArgValue =
            serde_json::from_str(r#"{"kind":"str","value":"close"}"#).expect("deserialize");
        assert_eq!(back, ArgValue::from("close"));
    }
}
