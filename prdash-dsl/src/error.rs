//! Umbrella error for the whole filter pipeline.

use crate::compiler::TranslateError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::provider_filter::ProviderFilterError;
use crate::validator::ValidationError;
use thiserror::Error;

/// Any failure between raw filter text and a backend query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid filter: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid filter: {0}")]
    Lex(#[from] LexError),

    #[error("invalid filter: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    ProviderFilter(#[from] ProviderFilterError),

    #[error(transparent)]
    Translate(#[from] TranslateError),
}

impl FilterError {
    /// Byte offset into the filter text, for lex and parse failures.
    pub fn offset(&self) -> Option<usize> {
        match self {
            FilterError::Lex(e) => Some(e.offset()),
            FilterError::Parse(e) => Some(e.offset()),
            _ => None,
        }
    }
}

pub type FilterResult<T> = Result<T, FilterError>;
