//! Lexer implementation

use super::token::*;
use crate::builtin::Builtin;
use std::iter::Peekable;
use std::str::Chars;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for logmeter programs.
///
/// Produces one token per call to [`Lexer::next_token`]. The stream ends with
/// exactly one `Eof` token, or with an `Invalid` token if the input cannot be
/// tokenized; callers stop at either.
pub struct Lexer<'a> {
    label: String,
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source. `label` names the source in
    /// diagnostics.
    pub fn new(label: impl Into<String>, source: &'a str) -> Self {
        Self {
            label: label.into(),
            chars: source.chars().peekable(),
            line: 0,
            column: 0,
            done: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Tokenize the entire source, up to and including the first `Eof` or
    /// `Invalid` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_terminal = token.is_terminal();
            tokens.push(token);
            if is_terminal {
                break;
            }
        }

        tokens
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if self.done {
            return self.eof();
        }

        self.skip_whitespace_and_comments();

        let line = self.line;
        let start = self.column;

        let c = match self.peek_char() {
            None => {
                self.done = true;
                return self.eof();
            }
            Some(c) => c,
        };

        let token = match c {
            '{' => self.punctuation(TokenKind::LCurly),
            '}' => self.punctuation(TokenKind::RCurly),
            '(' => self.punctuation(TokenKind::LParen),
            ')' => self.punctuation(TokenKind::RParen),
            ',' => self.punctuation(TokenKind::Comma),

            '/' => self.scan_delimited('/', TokenKind::Regex, "Unterminated regular expression"),
            '"' => self.scan_delimited('"', TokenKind::String, "Unterminated quoted string"),

            '$' => self.scan_capref(),

            c if c.is_alphabetic() => self.scan_identifier(),

            c => {
                self.advance();
                Token::new(
                    TokenKind::Invalid,
                    format!("Unexpected input: '{}'", c),
                    Position::new(line, start, start),
                )
            }
        };

        if token.kind == TokenKind::Invalid {
            self.done = true;
        }
        token
    }

    fn eof(&self) -> Token {
        Token::new(
            TokenKind::Eof,
            "",
            Position::new(self.line, self.column, self.column),
        )
    }

    fn punctuation(&mut self, kind: TokenKind) -> Token {
        let line = self.line;
        let start = self.column;
        let text = self.advance().map(String::from).unwrap_or_default();
        Token::new(kind, text, Position::new(line, start, start))
    }

    /// Scan an identifier or builtin keyword.
    fn scan_identifier(&mut self) -> Token {
        let line = self.line;
        let start = self.column;
        let text = self.take_while(is_ident_char);

        let kind = if Builtin::from_name(&text).is_some() {
            TokenKind::Builtin
        } else {
            TokenKind::Id
        };

        Token::new(kind, text, Position::new(line, start, self.column - 1))
    }

    /// Scan a capture reference: `$` followed by digits or a name.
    fn scan_capref(&mut self) -> Token {
        let line = self.line;
        let start = self.column;
        self.advance(); // consume '$'

        let text = match self.peek_char() {
            Some(c) if c.is_ascii_digit() => self.take_while(|c| c.is_ascii_digit()),
            Some(c) if c.is_alphabetic() => self.take_while(is_ident_char),
            _ => {
                return Token::new(
                    TokenKind::Invalid,
                    "Unexpected input: '$'",
                    Position::new(line, start, start),
                )
            }
        };

        Token::new(TokenKind::CapRef, text, Position::new(line, start, self.column - 1))
    }

    /// Scan a regex or quoted string. A backslash keeps the following
    /// character in the literal, so an escaped delimiter does not end it.
    /// Escapes are kept verbatim in the token text.
    fn scan_delimited(&mut self, delimiter: char, kind: TokenKind, unterminated: &str) -> Token {
        let line = self.line;
        let start = self.column;
        self.advance(); // consume opening delimiter
        let mut text = String::new();

        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    let partial = format!("{}{}", delimiter, text)
                        .replace('\\', "\\\\")
                        .replace('"', "\\\"");
                    return Token::new(
                        TokenKind::Invalid,
                        format!("{}: \"{}\"", unterminated, partial),
                        Position::new(line, start, self.column - 1),
                    );
                }
                Some(c) if c == delimiter => {
                    self.advance();
                    return Token::new(kind, text, Position::new(line, start, self.column - 1));
                }
                Some('\\') => {
                    self.advance();
                    text.push('\\');
                    if let Some(c) = self.peek_char().filter(|c| *c != '\n') {
                        self.advance();
                        text.push(c);
                    }
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
            }
        }
    }

    /// Skip whitespace, newlines and `#` comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            self.advance();
            text.push(c);
        }
        text
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new("test", source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_builtins_and_identifiers() {
        assert_eq!(
            kinds("inc tag strptime set add incr"),
            vec![
                TokenKind::Builtin,
                TokenKind::Builtin,
                TokenKind::Builtin,
                TokenKind::Builtin,
                TokenKind::Builtin,
                TokenKind::Id,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_must_start_with_letter() {
        let tokens = Lexer::new("test", "_x").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert_eq!(tokens[0].text, "Unexpected input: '_'");
    }

    #[test]
    fn test_multi_digit_capref() {
        let tokens = Lexer::new("test", "$12").tokenize();
        assert_eq!(tokens[0], Token::new(TokenKind::CapRef, "12", Position::new(0, 0, 2)));
    }

    #[test]
    fn test_capref_digits_stop_at_letters() {
        let tokens = Lexer::new("test", "$1a").tokenize();
        assert_eq!(tokens[0], Token::new(TokenKind::CapRef, "1", Position::new(0, 0, 1)));
        assert_eq!(tokens[1], Token::new(TokenKind::Id, "a", Position::new(0, 2, 2)));
    }

    #[test]
    fn test_bare_dollar_is_invalid() {
        let tokens = Lexer::new("test", "$ foo").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert_eq!(tokens[0].position, Position::new(0, 0, 0));
    }

    #[test]
    fn test_unterminated_at_end_of_input() {
        let tokens = Lexer::new("test", "/foo").tokenize();
        assert_eq!(
            tokens,
            vec![Token::new(
                TokenKind::Invalid,
                "Unterminated regular expression: \"/foo\"",
                Position::new(0, 0, 3)
            )]
        );

        let tokens = Lexer::new("test", "\"foo").tokenize();
        assert_eq!(
            tokens,
            vec![Token::new(
                TokenKind::Invalid,
                "Unterminated quoted string: \"\\\"foo\"",
                Position::new(0, 0, 3)
            )]
        );
    }

    #[test]
    fn test_unterminated_message_escapes_backslashes() {
        let tokens = Lexer::new("test", "\"a\\\"b\n").tokenize();
        assert_eq!(
            tokens,
            vec![Token::new(
                TokenKind::Invalid,
                r#"Unterminated quoted string: "\"a\\\"b""#,
                Position::new(0, 0, 4)
            )]
        );
    }

    #[test]
    fn test_escaped_backslash_then_delimiter_terminates() {
        let tokens = Lexer::new("test", r"/a\\/").tokenize();
        assert_eq!(tokens[0], Token::new(TokenKind::Regex, r"a\\", Position::new(0, 0, 4)));
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_no_tokens_after_terminal() {
        let mut lexer = Lexer::new("test", "?inc");
        assert_eq!(lexer.next_token().kind, TokenKind::Invalid);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_crlf_line_endings() {
        let tokens = Lexer::new("test", "inc\r\n(").tokenize();
        assert_eq!(tokens[1], Token::new(TokenKind::LParen, "(", Position::new(1, 0, 0)));
    }
}
