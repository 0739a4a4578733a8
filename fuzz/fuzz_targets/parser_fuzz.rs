//! Fuzz target for the filter parser, printer and translators.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use prdash_dsl::{normalize, parse_filter, translate_github, translate_gitlab, validate_filter};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = validate_filter(input);
        match parse_filter(input) {
            Ok(expr) => {
                let printed = expr.to_string();
                let reparsed = parse_filter(&printed).expect("printed filter must re-parse");
                assert_eq!(reparsed, expr, "print/parse round trip");
                let normalized = normalize(&expr);
                assert_eq!(normalize(&normalized), normalized, "normalize is idempotent");

                let now = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
                let _ = translate_github(&expr, now);
                let _ = translate_gitlab(&expr, now);
            }
            Err(err) => assert!(err.offset() <= input.len()),
        }
    }
});
