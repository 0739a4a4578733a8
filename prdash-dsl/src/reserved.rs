//! Reserved words of the filter DSL.

/// Words that cannot be used as bare field names or values.
pub const RESERVED_WORDS: [&str; 7] = ["and", "or", "not", "in", "true", "false", "last"];

/// Case-insensitive check against [`RESERVED_WORDS`].
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_reserved() {
        for word in ["and", "OR", "Not", "in", "TRUE", "false", "Last"] {
            assert!(is_reserved(word), "{} should be reserved", word);
        }
        for word in ["author", "label", "", "lasts"] {
            assert!(!is_reserved(word), "{} should not be reserved", word);
        }
    }
}
