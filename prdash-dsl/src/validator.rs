//! Pre-parse check that rejects legacy `qualifier:value` filters.

use thiserror::Error;

/// Filter text that cannot be handed to the DSL parser.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason} ({hint})")]
pub struct ValidationError {
    pub reason: String,
    pub hint: String,
}

/// Reject filters written in the legacy search syntax.
///
/// Blank input passes. An unquoted `:` reports the whitespace-delimited
/// token around it; an unterminated quote is reported as well.
pub fn validate_filter(filter: &str) -> Result<(), ValidationError> {
    if filter.trim().is_empty() {
        return Ok(());
    }

    let mut in_quote = false;
    let mut escaped = false;
    for (i, c) in filter.char_indices() {
        match c {
            '\\' => {
                if in_quote {
                    escaped = !escaped;
                }
            }
            '"' => {
                if !escaped {
                    in_quote = !in_quote;
                }
                escaped = false;
            }
            ':' if !in_quote => {
                return Err(ValidationError {
                    reason: format!(
                        "filters must use the DSL; legacy qualifier {:?} detected",
                        token_around(filter, i)
                    ),
                    hint: r#"use "field = value" or "field in [..]" syntax"#.to_string(),
                });
            }
            _ => escaped = false,
        }
    }

    if in_quote {
        return Err(ValidationError {
            reason: "filters contain an unterminated string".to_string(),
            hint: r#"close the quote or escape it with \""#.to_string(),
        });
    }

    Ok(())
}

/// Whitespace-delimited run of text containing byte `index`.
fn token_around(input: &str, index: usize) -> &str {
    let start = input[..index]
        .rfind(char::is_whitespace)
        .map(|pos| pos + input[pos..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let end = input[index..]
        .find(char::is_whitespace)
        .map(|pos| index + pos)
        .unwrap_or(input.len());
    input[start..end].trim()
}
