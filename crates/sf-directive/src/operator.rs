use std::fmt;

use sf_columnar::{
    ArithmeticOp, ColumnError, ComparisonOp, CrossOp, LogicalOp, binary_numeric, compare, cross,
    logical,
};

pub type OperatorFormula = fn(&[f64], &[f64]) -> Result<Vec<f64>, ColumnError>;

/// A binary operator applicable between a command and an operand.
#[derive(Clone, Copy)]
pub struct Operator {
    symbol: &'static str,
    formula: OperatorFormula,
    extra_lookback: usize,
}

impl Operator {
    #[must_use]
    pub const fn new(symbol: &'static str, formula: OperatorFormula, extra_lookback: usize) -> Self {
        Self {
            symbol,
            formula,
            extra_lookback,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Rows before the current one that the operator reads.
    #[must_use]
    pub fn extra_lookback(&self) -> usize {
        self.extra_lookback
    }

    pub fn apply(&self, left: &[f64], right: &[f64]) -> Result<Vec<f64>, ColumnError> {
        (self.formula)(left, right)
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol && self.extra_lookback == other.extra_lookback
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("symbol", &self.symbol)
            .field("extra_lookback", &self.extra_lookback)
            .finish()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol)
    }
}

fn or(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    logical(l, r, LogicalOp::Or)
}

fn and(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    logical(l, r, LogicalOp::And)
}

fn bit_or(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    logical(l, r, LogicalOp::BitOr)
}

fn bit_xor(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    logical(l, r, LogicalOp::BitXor)
}

fn bit_and(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    logical(l, r, LogicalOp::BitAnd)
}

fn lt(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    compare(l, r, ComparisonOp::Lt)
}

fn le(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    compare(l, r, ComparisonOp::Le)
}

fn ge(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    compare(l, r, ComparisonOp::Ge)
}

fn gt(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    compare(l, r, ComparisonOp::Gt)
}

fn eq(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    compare(l, r, ComparisonOp::Eq)
}

fn ne(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    compare(l, r, ComparisonOp::Ne)
}

fn cross_up(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    cross(l, r, CrossOp::Up)
}

fn cross_down(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    cross(l, r, CrossOp::Down)
}

fn cross_either(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    cross(l, r, CrossOp::Either)
}

fn add(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    binary_numeric(l, r, ArithmeticOp::Add)
}

fn sub(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    binary_numeric(l, r, ArithmeticOp::Sub)
}

fn mul(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    binary_numeric(l, r, ArithmeticOp::Mul)
}

fn div(l: &[f64], r: &[f64]) -> Result<Vec<f64>, ColumnError> {
    binary_numeric(l, r, ArithmeticOp::Div)
}

/// The operator table of the directive language.
pub static BUILTIN_OPERATORS: [Operator; 18] = [
    Operator::new("||", or, 0),
    Operator::new("&&", and, 0),
    Operator::new("|", bit_or, 0),
    Operator::new("^", bit_xor, 0),
    Operator::new("&", bit_and, 0),
    Operator::new("<", lt, 0),
    Operator::new("<=", le, 0),
    Operator::new(">=", ge, 0),
    Operator::new(">", gt, 0),
    Operator::new("==", eq, 0),
    Operator::new("!=", ne, 0),
    // Crosses compare against the previous row.
    Operator::new("//", cross_up, 1),
    Operator::new("\\", cross_down, 1),
    Operator::new("><", cross_either, 1),
    Operator::new("+", add, 0),
    Operator::new("-", sub, 0),
    Operator::new("*", mul, 0),
    Operator::new("/", div, 0),
];
