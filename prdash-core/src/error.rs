//! Error types for provider registry operations

use thiserror::Error;

/// Provider registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Unknown provider kind: {kind}")]
    UnknownKind { kind: String },

    #[error("Provider host must not be empty")]
    EmptyHost,
}

/// Result type for provider registry operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
