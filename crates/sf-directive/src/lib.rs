#![forbid(unsafe_code)]

//! The directive language: text such as `macd.signal:12,26,9` or
//! `ma:5 >< ma:20` names an indicator computation. Directives are parsed
//! against a [`CommandRegistry`], memoized in a [`DirectiveCache`],
//! evaluated with [`run`] and stored per column by [`exec`], which only
//! recomputes appended rows.

pub mod ast;
pub mod cache;
pub mod column;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod registry;

pub use ast::{Argument, ArgumentValue, Command, Directive, Operand};
pub use cache::DirectiveCache;
pub use column::{ColumnInfo, DataSource, exec};
pub use error::{
    DirectiveError, ErrorDetail, ErrorKind, EvalError, FormulaError, RegistryError,
};
pub use eval::run;
pub use lexer::{Lexer, Loc, Token};
pub use operator::{BUILTIN_OPERATORS, Operator};
pub use parser::{parse, parse_uncached};
pub use registry::{
    ArgSpec, ArgSpecKind, CommandDefinition, CommandPreset, CommandRegistry, DefineMode,
    UNBOUNDED_LOOKBACK,
};
