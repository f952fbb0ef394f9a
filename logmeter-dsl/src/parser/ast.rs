//! AST types and parse errors

use crate::builtin::Builtin;
use crate::lexer::Position;
use thiserror::Error;

// ============================================================================
// AST TYPES
// ============================================================================

/// A parsed program: its rules in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    pub rules: Vec<Rule>,
}

/// A regex pattern guarding a block of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Regex source as written between the slashes, escapes intact.
    pub pattern: String,
    pub position: Position,
    pub body: Vec<Statement>,
}

/// A builtin call inside a rule body.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub builtin: Builtin,
    pub args: Vec<Expr>,
    pub position: Position,
}

/// A call argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Bare identifier, naming a metric.
    Identifier(String),
    /// Quoted string, escapes intact.
    StringLiteral(String),
    /// `$name` or `$N`.
    CaptureRef(CaptureRef),
}

/// Target of a capture reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaptureRef {
    Index(usize),
    Named(String),
}

impl CaptureRef {
    /// Interpret capture token text: all digits is an index, anything else a
    /// name. Indices too large for `usize` saturate and fail resolution later.
    pub fn from_token_text(text: &str) -> Self {
        if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
            CaptureRef::Index(text.parse().unwrap_or(usize::MAX))
        } else {
            CaptureRef::Named(text.to_string())
        }
    }
}

impl std::fmt::Display for CaptureRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureRef::Index(i) => write!(f, "${}", i),
            CaptureRef::Named(name) => write!(f, "${}", name),
        }
    }
}

// ============================================================================
// PARSE ERROR
// ============================================================================

/// Syntax error with source label and position.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{label}:{position}: {message}")]
pub struct ParseError {
    pub label: String,
    pub position: Position,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_ref_from_token_text() {
        assert_eq!(CaptureRef::from_token_text("1"), CaptureRef::Index(1));
        assert_eq!(CaptureRef::from_token_text("10"), CaptureRef::Index(10));
        assert_eq!(
            CaptureRef::from_token_text("date"),
            CaptureRef::Named("date".to_string())
        );
        assert_eq!(
            CaptureRef::from_token_text("99999999999999999999999999"),
            CaptureRef::Index(usize::MAX)
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            label: "apache.lm".to_string(),
            position: Position::new(3, 4, 6),
            message: "expected '(', found identifier \"foo\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "apache.lm:3:4-6: expected '(', found identifier \"foo\""
        );
    }
}
