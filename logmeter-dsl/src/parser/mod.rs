//! Parser module for logmeter programs

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::*;
