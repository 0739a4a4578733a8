//! Client error type and its retry classification.

use crate::config::ConfigError;
use prdash_core::WorkItemType;
use prdash_dsl::FilterError;
use reqwest::StatusCode;

/// Whether an error is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Retryable,
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} request failed: {status}{}", retry_after_suffix(.retry_after_ms))]
    Status {
        provider: &'static str,
        status: StatusCode,
        retry_after_ms: Option<u64>,
    },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("missing auth token for {provider_id}")]
    MissingToken { provider_id: String },

    #[error("missing project path")]
    MissingProjectPath,

    #[error("project id not found for {path:?}")]
    ProjectNotFound { path: String },

    #[error("user {username:?} not found")]
    UserNotFound { username: String },

    #[error("{action} is not supported for {item_type:?}")]
    UnsupportedAction {
        action: &'static str,
        item_type: WorkItemType,
    },

    #[error("{action} is not supported by {provider_id}")]
    MissingCapability {
        provider_id: String,
        action: &'static str,
    },

    #[error("resolve current user for {provider_id}: {reason}")]
    CurrentUser { provider_id: String, reason: String },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Status { status, .. }
                if *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() =>
            {
                ErrorKind::Retryable
            }
            ClientError::Http(err) if err.is_timeout() || err.is_connect() || err.is_request() => {
                ErrorKind::Retryable
            }
            _ => ErrorKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

fn retry_after_suffix(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(" (retry after {}ms)", ms),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ClientError {
        ClientError::Status {
            provider: "gitlab",
            status: StatusCode::from_u16(code).unwrap(),
            retry_after_ms: None,
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(status(429).kind(), ErrorKind::Retryable);
        assert_eq!(status(500).kind(), ErrorKind::Retryable);
        assert_eq!(status(503).kind(), ErrorKind::Retryable);
        assert_eq!(status(404).kind(), ErrorKind::Fatal);
        assert_eq!(status(401).kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_status_display_matches_http_reason() {
        assert_eq!(
            status(429).to_string(),
            "gitlab request failed: 429 Too Many Requests"
        );
    }

    #[test]
    fn test_status_display_includes_retry_after() {
        let err = ClientError::Status {
            provider: "github",
            status: StatusCode::TOO_MANY_REQUESTS,
            retry_after_ms: Some(1500),
        };
        assert_eq!(
            err.to_string(),
            "github request failed: 429 Too Many Requests (retry after 1500ms)"
        );
    }

    #[test]
    fn test_domain_errors_are_fatal() {
        assert!(!ClientError::MissingProjectPath.is_retryable());
        assert!(!ClientError::UserNotFound {
            username: "ghost".to_string()
        }
        .is_retryable());
        assert!(!ClientError::InvalidResponse("temporary glitch".to_string()).is_retryable());
    }
}
