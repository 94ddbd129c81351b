use std::sync::Arc;

use proptest::prelude::*;
use sf_columnar::{rolling_max, semantic_eq};
use sf_directive::{ArgSpec, CommandDefinition, CommandPreset, DefineMode};
use sf_frame::{CsvOptions, StockFrame};
use sf_indicators::registry_with_builtins;
use sf_types::coerce_int;

fn ohlc(close: &[f64]) -> StockFrame {
    let open: Vec<f64> = close
        .iter()
        .enumerate()
        .map(|(row, c)| c - (row as f64 * 1.3).cos())
        .collect();
    let high = close.iter().zip(&open).map(|(c, o)| c.max(*o) + 0.25).collect();
    let low = close.iter().zip(&open).map(|(c, o)| c.min(*o) - 0.25).collect();
    StockFrame::from_columns([
        ("open", open),
        ("high", high),
        ("low", low),
        ("close", close.to_vec()),
    ])
    .expect("ohlc frame")
}

const DIRECTIVES: [&str; 12] = [
    "ma:5",
    "boll.upper:6,1.5",
    "macd.signal:4,8,3",
    "kdj.j:5,3,3",
    "rsi:4",
    "bbi:2,3,4,6",
    "rsv:3 > 50",
    "ma:2 // ma:4",
    "repeat:2,(column:close > column:open)",
    "increase:2,1,(hhv:3)",
    "change:3,(llv:2)",
    "style:bullish",
];

proptest! {
    #[test]
    fn appended_frames_match_a_direct_computation(
        close in proptest::collection::vec(1.0_f64..50.0, 1..48),
        split in 0.0_f64..1.0,
    ) {
        let k = ((close.len() as f64) * split) as usize;
        let mut direct = ohlc(&close);

        // both halves come from one frame so the derived open column lines up
        let whole = ohlc(&close);
        let mut head = whole.slice(None, Some(k as isize), None).expect("head");
        let tail = whole.slice(Some(k as isize), None, None).expect("tail");

        for text in DIRECTIVES {
            head.exec(text).expect("head exec");
        }
        let mut joined = head.append(&tail).expect("append");

        for text in DIRECTIVES {
            let expected = direct.exec(text).expect("direct");
            let actual = joined.exec(text).expect("joined");
            prop_assert!(semantic_eq(&expected, &actual), "{text}: {expected:?} != {actual:?}");
        }
    }
}

#[test]
fn custom_commands_take_part_in_incremental_evaluation() {
    let mut registry = registry_with_builtins();
    registry
        .define_command(
            "peak",
            CommandDefinition::new(CommandPreset::new(
                |params, series| {
                    let period = params[0].as_usize()?;
                    Ok((rolling_max(series[0], period), period - 1))
                },
                |params| params[0].as_usize().map_or(0, |p| p - 1),
                vec![
                    ArgSpec::param()
                        .with_default(3_i64)
                        .with_coerce(|raw| coerce_int("period", raw, 1).map_err(|e| e.to_string())),
                    ArgSpec::series(Some("close")),
                ],
            )),
            DefineMode::Strict,
        )
        .expect("define peak");

    let mut frame = StockFrame::with_registry(Arc::new(registry));
    frame
        .set_column("close", vec![1.0, 3.0, 2.0, 5.0])
        .expect("close");

    let values = frame.get("peak").expect("peak");
    assert!(semantic_eq(&values, &[f64::NAN, f64::NAN, 3.0, 5.0]));
    assert_eq!(frame.column_info("peak:3").map(|info| info.lookback), Some(2));

    let mut grown = frame
        .append(&StockFrame::from_columns([("close", vec![4.0])]).expect("row"))
        .expect("append");
    let values = grown.get("peak:3").expect("grown");
    assert_eq!(values[4], 5.0);

    // the builtin frame does not know the command
    assert!(StockFrame::new().parse("peak").is_err());
}

#[test]
fn loads_a_csv_and_evaluates_indicators() {
    let input = "\
date,open,high,low,close,volume
2024-01-02,10.0,10.6,9.8,10.4,1000
2024-01-03,10.4,10.9,10.1,10.8,1200
2024-01-04,10.8,11.3,10.6,11.1,900
2024-01-05,11.1,11.2,10.2,10.3,1500
2024-01-08,10.3,10.7,10.0,10.6,1100
";
    let options = CsvOptions {
        skip_columns: vec!["date".to_owned()],
        ..CsvOptions::default()
    };
    let mut frame = StockFrame::read_csv_str(input, &options).expect("csv");
    assert_eq!(frame.len(), 5);

    let ma = frame.get("ma:2").expect("ma");
    assert!((ma[4] - 10.45).abs() < 1e-12);

    let k = frame.get("kdj.k").expect("kdj.k");
    assert_eq!(k.len(), 5);
    assert!(k.iter().all(|value| (0.0..=100.0).contains(value)));

    let volume_up = frame.get("increase:1,1,(column:volume)").expect("increase");
    assert_eq!(volume_up, vec![0.0, 1.0, 0.0, 1.0, 0.0]);
}
