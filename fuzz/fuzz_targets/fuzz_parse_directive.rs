#![no_main]

use libfuzzer_sys::fuzz_target;
use sf_directive::parse_uncached;
use sf_indicators::builtin_registry;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let registry = builtin_registry();
    let Ok(directive) = parse_uncached(input, &registry) else {
        return;
    };

    // the canonical spelling parses back to itself
    let canonical = directive.to_string();
    let reparsed = parse_uncached(&canonical, &registry)
        .unwrap_or_else(|err| panic!("{canonical:?} failed to reparse: {err}"));
    assert_eq!(canonical, reparsed.to_string());
});
