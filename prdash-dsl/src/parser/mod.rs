//! Parser module for the filter DSL

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::*;
