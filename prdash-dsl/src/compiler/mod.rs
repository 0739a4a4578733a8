//! Backend Translators - Compile Filters to Provider Queries
//!
//! Both translators normalize the expression and split off provider routing
//! predicates before compiling what remains.
//!
//! # Pipeline
//!
//! ```text
//! Expr → normalize → extract_provider_filter → translate_github → GitHubQuery
//!                                            ↘ translate_gitlab → GitLabQuery
//! ```

pub mod github;
pub mod gitlab;

pub use github::*;
pub use gitlab::*;

use crate::parser::ast::*;
use crate::provider_filter::ProviderFilterError;
use chrono::{DateTime, Utc};
use prdash_core::ProviderKind;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ============================================================================
// TRANSLATE ERRORS
// ============================================================================

/// Backend a filter is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    GitHub,
    GitLab,
}

impl Backend {
    pub fn label(&self) -> &'static str {
        match self {
            Backend::GitHub => "github",
            Backend::GitLab => "gitlab",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<ProviderKind> for Backend {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::GitHub => Backend::GitHub,
            ProviderKind::GitLab => Backend::GitLab,
        }
    }
}

/// A field/operator combination the backend cannot express.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{backend} does not support predicate {field} {operator}")]
pub struct UnsupportedPredicateError {
    pub backend: Backend,
    pub field: String,
    pub operator: String,
}

impl UnsupportedPredicateError {
    pub(crate) fn new(backend: Backend, field: &str, op: PredicateOp) -> Self {
        Self {
            backend,
            field: field.to_string(),
            operator: op.as_str().to_string(),
        }
    }
}

/// Errors that can occur while compiling a filter for a backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedPredicateError),

    #[error(transparent)]
    ProviderFilter(#[from] ProviderFilterError),

    /// OR with one side rendered empty
    #[error("OR predicates must include both sides")]
    EmptyOrOperand,

    /// NOT over a composite expression
    #[error("negation only supported on predicates")]
    NegatedComposite,

    #[error("{backend} translation only supports AND predicates")]
    OrNotSupported { backend: Backend },

    #[error("{backend} translation does not support negation")]
    NegationNotSupported { backend: Backend },

    #[error("multiple project predicates are not supported ({first} vs {second})")]
    ConflictingProject { first: String, second: String },

    #[error("empty list for {field}")]
    EmptyList { field: String },

    #[error("expected {expected} value for {field}")]
    ValueType {
        field: String,
        expected: &'static str,
    },

    #[error("date out of range for {field}")]
    DateOutOfRange { field: String },
}

pub type TranslateResult<T> = Result<T, TranslateError>;

// ============================================================================
// VALUE HELPERS
// ============================================================================

pub(crate) fn string_value<'v>(field: &str, value: &'v Value) -> TranslateResult<&'v str> {
    value.as_str().ok_or_else(|| TranslateError::ValueType {
        field: field.to_string(),
        expected: "string",
    })
}

pub(crate) fn string_values(field: &str, values: &[Value]) -> TranslateResult<Vec<String>> {
    values
        .iter()
        .map(|value| string_value(field, value).map(str::to_string))
        .collect()
}

pub(crate) fn bool_value(field: &str, value: &Value) -> TranslateResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        _ => Err(TranslateError::ValueType {
            field: field.to_string(),
            expected: "boolean",
        }),
    }
}

/// Resolve a date literal or a duration relative to `now` as `YYYY-MM-DD`.
pub(crate) fn date_from_value(
    field: &str,
    value: &Value,
    now: DateTime<Utc>,
) -> TranslateResult<String> {
    let out_of_range = || TranslateError::DateOutOfRange {
        field: field.to_string(),
    };
    match value {
        Value::Date(date) => Ok(date.format("%Y-%m-%d").to_string()),
        Value::Duration(duration) => {
            let offset = duration.to_chrono().ok_or_else(out_of_range)?;
            let target = now.checked_add_signed(offset).ok_or_else(out_of_range)?;
            Ok(target.format("%Y-%m-%d").to_string())
        }
        _ => Err(TranslateError::ValueType {
            field: field.to_string(),
            expected: "date or duration",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 10, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_date_from_value_duration() {
        let value = Value::Duration(DurationValue::new(-7, DurationUnit::Day));
        assert_eq!(date_from_value("updated", &value, now()).unwrap(), "2025-12-03");

        let value = Value::Duration(DurationValue::new(-9, DurationUnit::Hour));
        assert_eq!(date_from_value("updated", &value, now()).unwrap(), "2025-12-09");
    }

    #[test]
    fn test_date_from_value_out_of_range() {
        let value = Value::Duration(DurationValue::new(i64::MAX / 2, DurationUnit::Minute));
        assert_eq!(
            date_from_value("created", &value, now()).unwrap_err(),
            TranslateError::DateOutOfRange {
                field: "created".to_string()
            }
        );
    }

    #[test]
    fn test_date_from_value_type_mismatch() {
        let err = date_from_value("updated", &Value::Number(3), now()).unwrap_err();
        assert!(err.to_string().contains("date or duration"));
    }

    #[test]
    fn test_unsupported_predicate_display() {
        let err = UnsupportedPredicateError::new(
            Backend::GitLab,
            "label",
            PredicateOp::Membership(MembershipOp::NotIn),
        );
        assert_eq!(err.to_string(), "gitlab does not support predicate label not in");
    }
}
