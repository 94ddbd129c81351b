//! CSV loading and writing.

use std::io;

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::frame::StockFrame;

/// How to read a CSV table into a [`StockFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Without headers, columns are named by position: `0`, `1`, ...
    pub has_headers: bool,
    /// Columns left out of the frame, such as a date column.
    pub skip_columns: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            skip_columns: Vec::new(),
        }
    }
}

impl StockFrame {
    /// Reads every non-skipped column as numbers. Empty and missing fields
    /// are NaN; fields past the header get positional names.
    pub fn read_csv<R: io::Read>(reader: R, options: &CsvOptions) -> Result<Self, FrameError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(options.has_headers)
            .flexible(true)
            .from_reader(reader);

        let mut names: Vec<String> = Vec::new();
        if options.has_headers {
            let headers = reader.headers()?;
            if headers.is_empty() {
                return Err(FrameError::MissingHeaders);
            }
            names = headers.iter().map(|name| name.trim().to_owned()).collect();
        }

        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            if names.len() < record.len() {
                for position in names.len()..record.len() {
                    names.push(position.to_string());
                    columns.push(vec![f64::NAN; row]);
                }
            }

            for (position, name) in names.iter().enumerate() {
                if options.skip_columns.contains(name) {
                    continue;
                }
                let field = record.get(position).unwrap_or_default();
                columns[position].push(parse_field(name, row, field)?);
            }
        }

        Self::from_columns(
            names
                .into_iter()
                .zip(columns)
                .filter(|(name, _)| !options.skip_columns.contains(name)),
        )
    }

    pub fn read_csv_str(input: &str, options: &CsvOptions) -> Result<Self, FrameError> {
        Self::read_csv(input.as_bytes(), options)
    }

    /// Writes every column, computed ones included, NaN as empty fields.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), FrameError> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        let headers: Vec<&str> = self.column_names().collect();
        writer.write_record(&headers)?;

        for row in 0..self.len() {
            let record = headers.iter().map(|name| {
                self.column(name)
                    .and_then(|values| values.get(row))
                    .filter(|value| !value.is_nan())
                    .map_or_else(String::new, f64::to_string)
            });
            writer.write_record(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, FrameError> {
        let mut bytes = Vec::new();
        self.write_csv(&mut bytes)?;
        Ok(String::from_utf8(bytes)?)
    }
}

fn parse_field(column: &str, row: usize, field: &str) -> Result<f64, FrameError> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Ok(f64::NAN);
    }

    trimmed.parse::<f64>().map_err(|_| FrameError::NotANumber {
        column: column.to_owned(),
        row,
        value: trimmed.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use sf_columnar::semantic_eq;

    use super::CsvOptions;
    use crate::error::FrameError;
    use crate::frame::StockFrame;

    const OHLC: &str = "\
date,open,high,low,close
2024-01-02,10,11,9,10.5
2024-01-03,10.5,12,10,11.5
2024-01-04,11.5,12.5,11,
";

    fn options() -> CsvOptions {
        CsvOptions {
            skip_columns: vec!["date".to_owned()],
            ..CsvOptions::default()
        }
    }

    #[test]
    fn reads_numeric_columns_and_skips_dates() {
        let frame = StockFrame::read_csv_str(OHLC, &options()).expect("read");
        assert_eq!(frame.len(), 3);
        assert_eq!(
            frame.column_names().collect::<Vec<_>>(),
            vec!["close", "high", "low", "open"]
        );
        assert!(semantic_eq(
            frame.column("close").expect("close"),
            &[10.5, 11.5, f64::NAN]
        ));
    }

    #[test]
    fn non_numeric_fields_are_reported() {
        let err = StockFrame::read_csv_str(OHLC, &CsvOptions::default()).expect_err("dates");
        assert!(matches!(
            err,
            FrameError::NotANumber { ref column, row: 0, .. } if column == "date"
        ));
        assert_eq!(
            err.to_string(),
            "column \"date\" row 0: `2024-01-02` is not a number"
        );
    }

    #[test]
    fn headerless_input_names_columns_by_position() {
        let options = CsvOptions {
            delimiter: b';',
            has_headers: false,
            ..CsvOptions::default()
        };
        let frame = StockFrame::read_csv_str("1;2\n3;4\n", &options).expect("read");
        assert_eq!(frame.column("0"), Some([1.0, 3.0].as_slice()));
        assert_eq!(frame.column("1"), Some([2.0, 4.0].as_slice()));
    }

    #[test]
    fn ragged_rows_are_padded_with_nan() {
        let frame = StockFrame::read_csv_str("a,b\n1,2\n3\n4,5,6\n", &CsvOptions::default())
            .expect("ragged input");
        assert_eq!(
            frame.column_names().collect::<Vec<_>>(),
            vec!["2", "a", "b"]
        );
        assert!(semantic_eq(frame.column("b").expect("b"), &[2.0, f64::NAN, 5.0]));
        assert!(semantic_eq(
            frame.column("2").expect("extra field"),
            &[f64::NAN, f64::NAN, 6.0]
        ));
    }

    #[test]
    fn written_csv_includes_computed_columns() {
        let mut frame = StockFrame::read_csv_str(OHLC, &options()).expect("read");
        frame.exec("ma:2,open").expect("exec");

        let out = frame.to_csv_string().expect("write");
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("close,high,low,\"ma:2,open\",open"));
        assert_eq!(lines.next(), Some("10.5,11,9,,10"));
        assert_eq!(lines.next(), Some("11.5,12,10,10.25,10.5"));
        assert_eq!(lines.next(), Some(",12.5,11,11,11.5"));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: CsvOptions =
            serde_json::from_str(r#"{"skip_columns":["date"]}"#).expect("options");
        assert_eq!(options, self::options());
        assert_eq!(options.delimiter, b',');
    }
}
