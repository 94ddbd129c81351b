#![forbid(unsafe_code)]

//! [`StockFrame`]: an in-memory table of OHLCV columns that evaluates
//! directives such as `kdj.j` or `ma:5 >< ma:20` into cached columns.

mod derive;
mod error;
mod frame;
mod io;

pub use error::FrameError;
pub use frame::StockFrame;
pub use io::CsvOptions;
