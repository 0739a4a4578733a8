//! Fuzz target for the filter lexer.
//!
//! Run with: cargo +nightly fuzz run lexer_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use prdash_dsl::{Lexer, TokenKind};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match Lexer::new(input).tokenize() {
            Ok(tokens) => {
                assert_eq!(
                    tokens.last().map(|t| &t.kind),
                    Some(&TokenKind::Eof),
                    "token stream must end with Eof"
                );
                for token in &tokens {
                    assert!(token.span.start <= token.span.end);
                    assert!(token.span.end <= input.len());
                }
            }
            Err(err) => assert!(err.offset() <= input.len()),
        }
    }
});
