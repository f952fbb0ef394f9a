//! Lexer module for logmeter programs

pub mod scanner;
pub mod token;

pub use scanner::*;
pub use token::*;
