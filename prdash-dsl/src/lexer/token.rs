//! Lexer token types

use std::fmt;
use thiserror::Error;

// ============================================================================
// LEXER TYPES
// ============================================================================

/// Token kinds for the filter DSL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    And,
    Or,
    Not,
    In,

    // Operators
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Bang,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,

    // Literals. Numeric lexemes are kept verbatim and converted by the parser.
    Ident(String),
    String(String),
    Number(String),
    Date(String),
    Duration(String),
    Bool(bool),

    // Special
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::And => f.write_str("and"),
            TokenKind::Or => f.write_str("or"),
            TokenKind::Not => f.write_str("not"),
            TokenKind::In => f.write_str("in"),
            TokenKind::Eq => f.write_str("="),
            TokenKind::Ne => f.write_str("!="),
            TokenKind::Gt => f.write_str(">"),
            TokenKind::Ge => f.write_str(">="),
            TokenKind::Lt => f.write_str("<"),
            TokenKind::Le => f.write_str("<="),
            TokenKind::Bang => f.write_str("!"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Ident(s)
            | TokenKind::Number(s)
            | TokenKind::Date(s)
            | TokenKind::Duration(s) => f.write_str(s),
            TokenKind::String(s) => write!(f, "{:?}", s),
            TokenKind::Bool(b) => write!(f, "{}", b),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

/// Byte range of a token in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Errors raised while scanning filter text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character {ch:?} at {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string starting at {offset}")]
    UnterminatedString { offset: usize },

    #[error("expected digits at {offset}")]
    ExpectedDigits { offset: usize },
}

impl LexError {
    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnexpectedChar { offset, .. }
            | LexError::UnterminatedString { offset }
            | LexError::ExpectedDigits { offset } => *offset,
        }
    }
}
