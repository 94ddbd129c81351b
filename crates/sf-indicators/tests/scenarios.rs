use std::collections::BTreeMap;
use std::ops::Range;

use proptest::prelude::*;
use sf_columnar::semantic_eq;
use sf_directive::{
    ArgumentValue, ColumnInfo, CommandDefinition, DataSource, DefineMode, ErrorKind, EvalError,
    Operand, exec, parse_uncached,
};
use sf_indicators::{builtin_registry, registry_with_builtins};
use sf_types::ArgValue;

#[derive(Default)]
struct Table {
    columns: BTreeMap<String, Vec<f64>>,
    cache: BTreeMap<String, (Vec<f64>, ColumnInfo)>,
}

impl Table {
    fn ohlc(close: &[f64]) -> Self {
        let mut table = Self::default();
        for name in ["open", "high", "low", "close"] {
            table.columns.insert(name.to_owned(), Vec::new());
        }
        for value in close {
            table.push(*value);
        }
        table
    }

    fn push(&mut self, close: f64) {
        let row = self.row_count() as f64;
        let open = close - (row * 0.9).sin();
        for (name, value) in [
            ("open", open),
            ("high", close.max(open) + 0.5),
            ("low", close.min(open) - 0.5),
            ("close", close),
        ] {
            self.columns.entry(name.to_owned()).or_default().push(value);
        }
    }
}

impl DataSource for Table {
    fn row_count(&self) -> usize {
        self.columns.get("close").map_or(0, Vec::len)
    }

    fn series(&self, name: &str, range: Range<usize>) -> Result<&[f64], EvalError> {
        self.columns
            .get(name)
            .map(|values| &values[range])
            .ok_or_else(|| EvalError::UnknownSeries(name.to_owned()))
    }

    fn cached_column(&self, key: &str) -> Option<(&[f64], &ColumnInfo)> {
        self.cache
            .get(key)
            .map(|(values, info)| (values.as_slice(), info))
    }

    fn set_cached_column(&mut self, key: &str, values: Vec<f64>, info: ColumnInfo) {
        self.cache.insert(key.to_owned(), (values, info));
    }
}

#[test]
fn ma_keeps_only_the_period_as_param() {
    let registry = builtin_registry();
    let directive = parse_uncached("ma:5", &registry).expect("ma:5");
    assert_eq!(directive.command.name, "ma");
    assert_eq!(directive.command.params(), vec![ArgValue::Int(5)]);
    assert_eq!(directive.to_string(), "ma:5");
}

#[test]
fn macd_signal_fills_default_params() {
    let registry = builtin_registry();
    let directive = parse_uncached("macd.signal", &registry).expect("macd.signal");
    assert_eq!(directive.command.sub.as_deref(), Some("signal"));
    assert_eq!(
        directive.command.params(),
        vec![ArgValue::Int(12), ArgValue::Int(26), ArgValue::Int(9)]
    );
    assert_eq!(directive.to_string(), "macd.signal:12,26,9");

    let dea = parse_uncached("macd.dea", &registry).expect("macd.dea");
    assert_eq!(dea, directive);
}

#[test]
fn macd_dif_is_the_top_level_command() {
    let registry = builtin_registry();
    let directive = parse_uncached("macd.dif", &registry).expect("macd.dif");
    assert_eq!(directive.command.sub, None);
    assert_eq!(
        directive.command.params(),
        vec![ArgValue::Int(12), ArgValue::Int(26)]
    );
    assert_eq!(directive.to_string(), "macd:12,26");
}

#[test]
fn comparison_against_a_bollinger_band() {
    let registry = builtin_registry();
    let directive = parse_uncached("ma:10 > boll.upper:20", &registry).expect("parse");
    let Some((operator, Operand::Command(operand))) = &directive.operation else {
        panic!("expected a command operand");
    };
    assert_eq!(operator.symbol(), ">");
    assert_eq!(operand.full_name(), "boll.upper");
    let args: Vec<ArgumentValue> = operand.args.iter().map(|arg| arg.value.clone()).collect();
    assert_eq!(
        args,
        vec![
            ArgumentValue::Scalar(ArgValue::Int(20)),
            ArgumentValue::Scalar(ArgValue::Float(2.0)),
            ArgumentValue::Scalar(ArgValue::from("close")),
        ]
    );
    assert_eq!(directive.to_string(), "ma:10>boll.upper:20,2");
}

#[test]
fn kdj_needs_a_sub_command() {
    let registry = builtin_registry();
    let err = parse_uncached("kdj", &registry).expect_err("kdj alone");
    assert_eq!(err.kind(), ErrorKind::Value);
    assert!(err.message().contains("sub command should be specified"));
    assert_eq!((err.line(), err.column()), (1, 1));

    let k = parse_uncached("kdj.k", &registry).expect("kdj.k");
    assert_eq!(k.to_string(), "kdj.k:9,3,50");
    let j = parse_uncached("kdj.j:9,3,3,20", &registry).expect("kdj.j");
    assert_eq!(j.to_string(), "kdj.j:9,3,3,20");
}

#[test]
fn coercion_failures_point_at_the_argument() {
    let registry = builtin_registry();

    let err = parse_uncached("ma:1", &registry).expect_err("period too small");
    assert_eq!(err.message(), "period must be greater than 1, but got `1`");
    assert_eq!(err.column(), 4);

    let err = parse_uncached("kdj.k:9,3,120", &registry).expect_err("init out of range");
    assert!(err.message().contains("in between"));

    let err = parse_uncached("change:2", &registry).expect_err("series required");
    assert!(
        err.message().contains("args[1] is required for command \"change\""),
        "{}",
        err.message()
    );

    let err = parse_uncached("style:neutral", &registry).expect_err("unknown style");
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn donchian_bands_resolve_to_hhv_and_llv() {
    let registry = builtin_registry();

    let middle = parse_uncached("donchian.middle:5", &registry).expect("middle");
    assert_eq!(middle.command.sub, None);
    assert_eq!(middle.to_string(), "donchian:5");

    let upper = parse_uncached("donchian.u:5", &registry).expect("upper");
    assert_eq!(upper.command.sub.as_deref(), Some("upper"));
    assert_eq!(upper.to_string(), "donchian.upper:5");

    let mut table = Table::ohlc(&[2.0, 3.0, 4.0, 5.0]);
    let lower = parse_uncached("donchian.l:2", &registry).expect("lower");
    let llv = parse_uncached("llv:2", &registry).expect("llv");
    let from_channel = exec(&mut table, &lower).expect("donchian.lower");
    let from_llv = exec(&mut table, &llv).expect("llv");
    assert!(semantic_eq(&from_channel, &from_llv));

    let hhv = parse_uncached("donchian.upper:2", &registry).expect("upper:2");
    let from_hhv = exec(&mut table, &hhv).expect("donchian.upper");
    let middle = parse_uncached("donchian:2", &registry).expect("donchian:2");
    let middle = exec(&mut table, &middle).expect("donchian");
    for row in 1..4 {
        assert_eq!(middle[row], (from_hhv[row] + from_llv[row]) / 2.0);
    }
}

#[test]
fn close_only_variants_ignore_high_and_low() {
    let registry = builtin_registry();
    let close = [10.0, 12.0, 11.0, 13.0, 12.5];

    let mut table = Table::ohlc(&close);
    let rsvc = parse_uncached("rsvc:3", &registry).expect("rsvc");
    assert_eq!(rsvc.to_string(), "rsvc:3");
    let rsv_of_close = parse_uncached("rsv:3,close,close,close", &registry).expect("rsv");
    let expected = exec(&mut table, &rsv_of_close).expect("rsv over close");
    assert!(semantic_eq(&exec(&mut table, &rsvc).expect("rsvc"), &expected));
    // row 3 closes at the top of its window
    assert_eq!(expected[3], 100.0);

    let kdjc = parse_uncached("kdjc.j:3,3,3", &registry).expect("kdjc.j");
    let kdj = parse_uncached("kdj.j:3,3,3,50,close,close,close", &registry).expect("kdj.j");
    assert!(semantic_eq(
        &exec(&mut table, &kdjc).expect("kdjc.j"),
        &exec(&mut table, &kdj).expect("kdj.j over close"),
    ));
    assert_eq!(
        parse_uncached("kdjc.k", &registry).expect("kdjc.k").to_string(),
        "kdjc.k:9,3,50"
    );
}

#[test]
fn hv_validates_time_frames_and_trading_days() {
    let registry = builtin_registry();

    let hv = parse_uncached("hv:10", &registry).expect("hv:10");
    assert_eq!(hv.to_string(), "hv:10,1d,252");
    assert_eq!(hv.lookback(), 10);
    let daily = parse_uncached("hv:10,1D", &registry).expect("upper-case day");
    assert_eq!(daily.to_string(), "hv:10,1d,252");

    let err = parse_uncached("hv:10,invalid", &registry).expect_err("bad frame");
    assert_eq!(err.message(), "`invalid` is not a valid time frame");
    for text in ["hv:10,15m,0", "hv:10,15m,366"] {
        let err = parse_uncached(text, &registry).expect_err("bad trading days");
        assert!(err.message().contains("but got `"), "{}", err.message());
    }
}

#[test]
fn rsi_of_flat_prices_is_one_hundred() {
    let registry = builtin_registry();
    let rsi = parse_uncached("rsi:3", &registry).expect("rsi:3");
    let mut table = Table::ohlc(&[5.0; 8]);
    let values = exec(&mut table, &rsi).expect("rsi over flat close");
    assert!(values[..3].iter().all(|v| v.is_nan()));
    assert_eq!(values[7], 100.0);
}

#[test]
fn series_arguments_take_nested_directives() {
    let registry = builtin_registry();
    let directive =
        parse_uncached("increase:3,1,(ma:5)", &registry).expect("increase over ma");
    assert_eq!(directive.to_string(), "increase:3,1,(ma:5)");
    // increase reads 3 rows back on top of the 4 rows ma:5 needs
    assert_eq!(directive.lookback(), 7);

    let repeat = parse_uncached("repeat:2,(close > open)", &registry);
    assert!(repeat.is_err(), "`close` is a column, not a command");

    let repeat = parse_uncached("repeat:2,(column:close > column:open)", &registry)
        .expect("repeat over a comparison");
    assert_eq!(repeat.to_string(), "repeat:2,(column:close>column:open)");
    assert_eq!(repeat.lookback(), 1);
}

#[test]
fn ma_is_extended_incrementally() {
    let registry = builtin_registry();
    let directive = parse_uncached("ma:2", &registry).expect("ma:2");
    let mut table = Table::ohlc(&[2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

    let first = exec(&mut table, &directive).expect("first pass");
    assert!(semantic_eq(&first, &[f64::NAN, 2.5, 3.5, 4.5, 5.5, 6.5]));

    table.push(8.0);
    let extended = exec(&mut table, &directive).expect("extended");
    assert!(semantic_eq(&extended[..6], &first));
    assert_eq!(extended[6], 7.5);
}

#[test]
fn extended_registries_do_not_leak_into_the_builtins() {
    let mut registry = registry_with_builtins();
    registry
        .define_command(
            "ma",
            CommandDefinition::sub_commands_only(),
            DefineMode::Overwrite,
        )
        .expect_err("empty definitions are rejected");

    let copy = registry.get("ma").cloned().expect("ma is builtin");
    registry
        .define_command("sma", copy, DefineMode::Strict)
        .expect("alias command");

    assert!(registry.contains("sma"));
    assert!(!builtin_registry().contains("sma"));
}

const DIRECTIVES: [&str; 26] = [
    "ma:3",
    "ema:4",
    "smma:3",
    "mstd:3",
    "boll",
    "boll.u:5,1.5",
    "boll.l:5",
    "bbw:5",
    "macd:3,6",
    "macd.h:3,6,4",
    "bbi:2,3,4,5",
    "rsv:4",
    "kdj.d:4,3,3",
    "llv:3",
    "hhv:3",
    "donchian:3",
    "donchian.u:4",
    "rsvc:3",
    "kdjc.j:4,3,3",
    "rsi:3",
    "hv:3",
    "hv:4,15m,200",
    "atr:3",
    "increase:2,-1,(ma:2)",
    "change:3,(ema:3)",
    "ma:2 >< ma:4",
];

proptest! {
    #[test]
    fn incremental_results_match_a_full_pass(
        close in proptest::collection::vec(1.0_f64..100.0, 2..60),
        split in 0.0_f64..1.0,
    ) {
        let registry = builtin_registry();
        let k = ((close.len() as f64) * split) as usize;

        for text in DIRECTIVES {
            let directive = parse_uncached(text, &registry).expect("builtin directive");

            let mut direct = Table::ohlc(&close);
            let expected = exec(&mut direct, &directive).expect("direct");

            let mut incremental = Table::ohlc(&close[..k]);
            exec(&mut incremental, &directive).expect("prefix");
            for value in &close[k..] {
                incremental.push(*value);
            }
            let actual = exec(&mut incremental, &directive).expect("extended");

            prop_assert!(semantic_eq(&expected, &actual), "{text}: {expected:?} != {actual:?}");
        }
    }
}
