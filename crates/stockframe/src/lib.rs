#![forbid(unsafe_code)]

//! Stock indicator directives over in-memory OHLCV tables.
//!
//! ```
//! use stockframe::StockFrame;
//!
//! let mut frame = StockFrame::from_columns([
//!     ("close", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
//! ])
//! .unwrap();
//!
//! let ma = frame.get("ma:3").unwrap();
//! assert_eq!(&ma[2..], &[2.0, 3.0, 4.0]);
//!
//! let crossed = frame.exec("column:close > ma:3").unwrap();
//! assert_eq!(&crossed[2..], &[1.0, 1.0, 1.0]);
//! ```

pub use sf_columnar::{ColumnError, semantic_eq};
pub use sf_directive::{
    ArgSpec, ArgSpecKind, ColumnInfo, Command, CommandDefinition, CommandPreset, CommandRegistry,
    DataSource, DefineMode, Directive, DirectiveError, ErrorKind, EvalError, FormulaError,
    Operator, RegistryError, UNBOUNDED_LOOKBACK, parse,
};
pub use sf_frame::{CsvOptions, FrameError, StockFrame};
pub use sf_indicators::{builtin_registry, registry_with_builtins};
pub use sf_types::{ArgValue, TypeError};

/// The indicator formulas, callable on plain slices.
pub mod indicators {
    pub use sf_indicators::{bands, oscillators, tools, trend};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn umbrella_exposes_frame_and_registry() {
        let registry = builtin_registry();
        assert!(registry.contains("kdj"));

        let mut frame = StockFrame::from_columns([("close", vec![2.0, 4.0, 6.0])])
            .expect("frame");
        let values = frame.get("ma:2").expect("ma");
        assert!(semantic_eq(&values, &[f64::NAN, 3.0, 5.0]));

        let smma = indicators::trend::smma(&[4.0, 8.0, 8.0], 2);
        assert!(semantic_eq(&smma, &[f64::NAN, 6.0, 7.0]));
    }
}
