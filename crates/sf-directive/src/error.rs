use std::fmt;

use serde::{Deserialize, Serialize};
use sf_columnar::ColumnError;
use thiserror::Error;

use crate::lexer::Loc;

/// Where and why a directive was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub input: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ErrorDetail {
    #[must_use]
    pub fn new(input: &str, message: impl Into<String>, loc: Loc) -> Self {
        Self {
            input: input.to_owned(),
            message: message.into(),
            line: loc.line,
            column: loc.column,
        }
    }

    /// Renders the message followed by the offending source line and a
    /// caret under the reported column.
    #[must_use]
    pub fn render(&self) -> String {
        let normalized = self.input.replace("\r\n", "\n");
        let source_line = normalized
            .split(['\n', '\r'])
            .nth(self.line.saturating_sub(1))
            .unwrap_or_default();
        let pad = " ".repeat(self.column.saturating_sub(1));

        format!("{self}\n\n{source_line}\n{pad}^")
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, line {}, column {}",
            self.message, self.line, self.column
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Syntax,
    Value,
}

/// A directive that could not be parsed (`Syntax`) or could not be
/// resolved against the registry (`Value`).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DirectiveError {
    #[error("syntax error: {0}")]
    Syntax(ErrorDetail),
    #[error("value error: {0}")]
    Value(ErrorDetail),
}

impl DirectiveError {
    pub(crate) fn syntax(input: &str, message: impl Into<String>, loc: Loc) -> Self {
        Self::Syntax(ErrorDetail::new(input, message, loc))
    }

    pub(crate) fn value(input: &str, message: impl Into<String>, loc: Loc) -> Self {
        Self::Value(ErrorDetail::new(input, message, loc))
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::Value(_) => ErrorKind::Value,
        }
    }

    #[must_use]
    pub fn detail(&self) -> &ErrorDetail {
        match self {
            Self::Syntax(detail) | Self::Value(detail) => detail,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.detail().message
    }

    #[must_use]
    pub fn line(&self) -> usize {
        self.detail().line
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.detail().column
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command \"{0}\" is already defined")]
    AlreadyDefined(String),
    #[error("\"{0}\" is not a valid command name")]
    InvalidName(String),
    #[error("command \"{0}\" defines neither a preset nor sub commands")]
    EmptyDefinition(String),
}

/// Failure raised by a command formula.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("expected {expected} input series, but got {actual}")]
    SeriesCount { expected: usize, actual: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Type(#[from] sf_types::TypeError),
    #[error(transparent)]
    Column(#[from] ColumnError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown series \"{0}\"")]
    UnknownSeries(String),
    #[error("rows {start}..{end} are out of bounds for {len} rows")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    #[error("formula returned {actual} values for {expected} rows")]
    LengthMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Directive(#[from] DirectiveError),
}
