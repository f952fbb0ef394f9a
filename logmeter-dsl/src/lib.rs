//! logmeter DSL - Program Lexer, Parser & Compiler
//!
//! A logmeter program is a list of rules. Each rule is a regular expression
//! guarding a block of builtin calls that update metrics:
//!
//! ```text
//! /(?P<date>\d+) GET (?P<path>\S+)/ {
//!   strptime($date, "%s")
//!   inc(requests)
//!   tag(requests, "path", $path)
//! }
//! ```
//!
//! Architecture:
//! ```text
//! Program Source (.lm files)
//!     ↓
//! Lexer (positioned tokens)
//!     ↓
//! Parser (rules → AST, collected syntax errors)
//!     ↓
//! Compiler (regex compilation, capture resolution, arity checks)
//!     ↓
//! Program (executed by the runtime VM)
//! ```

pub mod builtin;
pub mod compiler;
pub mod lexer;
pub mod parser;

pub use builtin::{ArgKind, Builtin};
pub use compiler::*;
pub use lexer::{Lexer, Position, Token, TokenKind};
pub use parser::{parse, Ast, CaptureRef, Expr, ExprKind, ParseError, Parser, Rule, Statement};

use thiserror::Error;

/// Any diagnostic produced while turning program source into a [`Program`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DslError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Parse and compile one program source.
///
/// Any syntax error rejects the whole source. Compile errors only drop the
/// offending rules; the program is still returned if at least one rule
/// survived, together with the diagnostics for the rules that did not.
pub fn compile_source(label: &str, source: &str) -> (Option<Program>, Vec<DslError>) {
    let (ast, parse_errors) = parse(label, source);
    if !parse_errors.is_empty() {
        return (None, parse_errors.into_iter().map(DslError::from).collect());
    }

    let (program, compile_errors) = compile(label, &ast);
    (program, compile_errors.into_iter().map(DslError::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_rejects_whole_source() {
        let source = "/a/ { inc(x) }\n/b/ { inc(y }\n";
        let (program, errors) = compile_source("two.lm", source);
        assert!(program.is_none());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], DslError::Parse(_)));
    }

    #[test]
    fn test_compile_error_keeps_valid_rules() {
        let source = "/a/ { inc(x) }\n/b/ { tag(y, \"k\", $missing) }\n";
        let (program, errors) = compile_source("partial.lm", source);
        let program = program.expect("one rule should survive");
        assert_eq!(program.rules.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("undefined capture reference"));
    }
}
