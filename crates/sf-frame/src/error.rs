use sf_directive::{DirectiveError, EvalError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame has {expected} rows, but column \"{name}\" has {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("column \"{0}\" already exists")]
    DuplicateColumn(String),
    #[error("column \"{0}\" does not exist")]
    UnknownColumn(String),
    #[error("column \"{0}\" is computed and cannot be aliased")]
    ComputedColumn(String),
    #[error("row {position} is out of bounds for a frame of {len} rows")]
    RowOutOfBounds { position: usize, len: usize },
    #[error("slice step must be positive")]
    ZeroStep,
    #[error("column \"{column}\" row {row}: `{value}` is not a number")]
    NotANumber {
        column: String,
        row: usize,
        value: String,
    },
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error(transparent)]
    Directive(#[from] DirectiveError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}
