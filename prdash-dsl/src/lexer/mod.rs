//! Lexer module for the filter DSL

pub mod scanner;
pub mod token;

pub use scanner::*;
pub use token::*;
