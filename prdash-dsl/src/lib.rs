//! PRDASH DSL - Filter Language Parser & Backend Translators
//!
//! This crate turns dashboard filter text into provider-native queries.
//! The pipeline is pure: no I/O, no shared state.
//!
//! Architecture:
//! ```text
//! Filter Source ("state = \"open\" and author = \"me\"")
//!     ↓
//! Legacy Syntax Check (optional, validator)
//!     ↓
//! Lexer (tokens + byte spans)
//!     ↓
//! Parser (recursive descent → Expr)
//!     ↓
//! Normalizer (me → @me, last(D) → >= -D)
//!     ↓
//! Provider Filter Extraction (provider predicates → include/exclude)
//!     ↓
//! Translators (GitHub search string | GitLab REST params)
//!     ↓
//! Printer (canonical source, for round-trip testing)
//! ```

pub mod compiler;
pub mod error;
pub mod expand;
pub mod lexer;
pub mod normalize;
pub mod parser;
pub mod printer;
pub mod provider_filter;
pub mod reserved;
pub mod validator;

// Re-export key types for convenience
pub use compiler::*;
pub use error::{FilterError, FilterResult};
pub use expand::{expand_current_user, requires_current_user, USER_FIELDS};
pub use lexer::{LexError, Lexer, Span, Token, TokenKind};
pub use normalize::{normalize, ME_ALIAS, ME_PLACEHOLDER};
pub use parser::*;
pub use provider_filter::*;
pub use reserved::{is_reserved, RESERVED_WORDS};
pub use validator::{validate_filter, ValidationError};
