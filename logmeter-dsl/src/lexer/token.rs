//! Lexer token types

use std::fmt;

/// Token kinds for logmeter programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,
    Invalid,

    // Delimiters
    LCurly,
    RCurly,
    LParen,
    RParen,
    Comma,

    // Words
    Builtin,
    Id,

    // Literals
    Regex,
    CapRef,
    String,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Eof => "end of input",
            TokenKind::Invalid => "invalid input",
            TokenKind::LCurly => "'{'",
            TokenKind::RCurly => "'}'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Builtin => "builtin",
            TokenKind::Id => "identifier",
            TokenKind::Regex => "regular expression",
            TokenKind::CapRef => "capture reference",
            TokenKind::String => "quoted string",
        };
        f.write_str(text)
    }
}

/// Source location of a token.
///
/// Lines and columns are zero-based; `start_column` and `end_column` are
/// both inclusive, so a one-character token has `start_column == end_column`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl Position {
    pub fn new(line: usize, start_column: usize, end_column: usize) -> Self {
        Self {
            line,
            start_column,
            end_column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_column == self.end_column {
            write!(f, "{}:{}", self.line, self.start_column)
        } else {
            write!(f, "{}:{}-{}", self.line, self.start_column, self.end_column)
        }
    }
}

/// A token with its kind, text and source location.
///
/// For `Regex`, `String` and `CapRef` the text is the payload with its
/// delimiters stripped; for `Invalid` it is the diagnostic message; for
/// `Eof` it is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Whether no further tokens can follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, TokenKind::Eof | TokenKind::Invalid)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "{}", self.kind),
            TokenKind::LCurly
            | TokenKind::RCurly
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::Comma => write!(f, "{}", self.kind),
            _ => write!(f, "{} {:?}", self.kind, self.text),
        }
    }
}
