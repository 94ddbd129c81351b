use std::borrow::Cow;
use std::ops::Range;

use sf_columnar::broadcast;

use crate::ast::{ArgumentValue, Command, Directive, Operand};
use crate::column::DataSource;
use crate::error::EvalError;

/// Evaluates `directive` over the rows in `range`.
///
/// Returns one value per row of `range` and the lookback the values
/// depend on.
pub fn run<S: DataSource + ?Sized>(
    directive: &Directive,
    source: &S,
    range: Range<usize>,
) -> Result<(Vec<f64>, usize), EvalError> {
    let len = source.row_count();
    if range.start > range.end || range.end > len {
        return Err(EvalError::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            len,
        });
    }

    let (left, left_lookback) = run_command(&directive.command, source, range.clone())?;
    let Some((operator, operand)) = &directive.operation else {
        return Ok((left, left_lookback));
    };

    let (right, right_lookback) = match operand {
        Operand::Number(value) => (broadcast(*value, range.len()), 0),
        Operand::Command(command) => run_command(command, source, range)?,
    };

    let values = operator.apply(&left, &right)?;
    let lookback = left_lookback
        .max(right_lookback)
        .saturating_add(operator.extra_lookback());
    Ok((values, lookback))
}

fn run_command<S: DataSource + ?Sized>(
    command: &Command,
    source: &S,
    range: Range<usize>,
) -> Result<(Vec<f64>, usize), EvalError> {
    let mut inputs: Vec<Cow<'_, [f64]>> = Vec::new();
    let mut nested_lookback = 0;

    for value in command.series() {
        match value {
            ArgumentValue::Scalar(name) => {
                let name = match name.as_str() {
                    Ok(name) => Cow::Borrowed(name),
                    Err(_) => Cow::Owned(name.to_string()),
                };
                inputs.push(Cow::Borrowed(source.series(&name, range.clone())?));
            }
            ArgumentValue::Nested(directive) => {
                let (values, lookback) = run(directive, source, range.clone())?;
                nested_lookback = nested_lookback.max(lookback);
                inputs.push(Cow::Owned(values));
            }
        }
    }

    let series: Vec<&[f64]> = inputs.iter().map(AsRef::as_ref).collect();
    let (values, lookback) = command.preset.compute(&command.params(), &series)?;

    if values.len() != range.len() {
        return Err(EvalError::LengthMismatch {
            expected: range.len(),
            actual: values.len(),
        });
    }

    Ok((values, lookback.saturating_add(nested_lookback)))
}
