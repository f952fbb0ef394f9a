//! Parser implementation
//!
//! Grammar:
//! ```text
//! program   := rule*
//! rule      := REGEX '{' statement* '}'
//! statement := BUILTIN '(' (expr (',' expr)*)? ')'
//! expr      := ID | STRING | CAPREF
//! ```

use super::ast::*;
use crate::builtin::Builtin;
use crate::lexer::*;

// ============================================================================
// PARSER
// ============================================================================

/// Recursive-descent parser with one token of lookahead.
///
/// Syntax errors do not stop parsing: the parser records the error, skips
/// to the next rule and keeps going, so one pass reports every broken rule.
/// An `Invalid` token from the lexer ends parsing.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    /// Create a new parser pulling tokens from `lexer`.
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            errors: Vec::new(),
        }
    }

    /// Parse the whole token stream into an AST and the list of syntax
    /// errors encountered along the way.
    pub fn parse(mut self) -> (Ast, Vec<ParseError>) {
        let mut rules = Vec::new();

        loop {
            match self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Invalid => {
                    let err = self.lexical_error();
                    self.errors.push(err);
                    break;
                }
                TokenKind::Regex => match self.parse_rule() {
                    Ok(rule) => rules.push(rule),
                    Err(err) => {
                        self.errors.push(err);
                        if self.current.kind == TokenKind::Invalid {
                            break;
                        }
                        self.synchronize();
                    }
                },
                _ => {
                    let err = self.unexpected("regular expression");
                    self.errors.push(err);
                    self.advance();
                    self.synchronize();
                }
            }
        }

        (Ast { rules }, self.errors)
    }

    /// Parse a rule: a regex followed by a braced block of statements.
    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        let position = self.current.position;
        let pattern = self.current.text.clone();
        self.advance();

        self.expect(TokenKind::LCurly)?;

        let mut body = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::RCurly => {
                    self.advance();
                    break;
                }
                TokenKind::Builtin => body.push(self.parse_statement()?),
                _ => return Err(self.unexpected("builtin or '}'")),
            }
        }

        Ok(Rule {
            pattern,
            position,
            body,
        })
    }

    /// Parse a builtin call.
    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let position = self.current.position;
        let builtin = Builtin::from_name(&self.current.text)
            .ok_or_else(|| self.unexpected("builtin"))?;
        self.advance();

        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        if self.current.kind != TokenKind::RParen {
            loop {
                args.push(self.parse_expr()?);
                if self.current.kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }

        self.expect(TokenKind::RParen)?;

        Ok(Statement {
            builtin,
            args,
            position,
        })
    }

    /// Parse a call argument.
    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let position = self.current.position;
        let kind = match self.current.kind {
            TokenKind::Id => ExprKind::Identifier(self.current.text.clone()),
            TokenKind::String => ExprKind::StringLiteral(self.current.text.clone()),
            TokenKind::CapRef => {
                ExprKind::CaptureRef(CaptureRef::from_token_text(&self.current.text))
            }
            _ => return Err(self.unexpected("identifier, string or capture reference")),
        };
        self.advance();
        Ok(Expr { kind, position })
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn advance(&mut self) {
        if !self.current.is_terminal() {
            self.current = self.lexer.next_token();
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.current.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    /// Skip to the next rule boundary. A regex can never appear inside a
    /// rule body, so any `Regex` token starts the next rule.
    fn synchronize(&mut self) {
        while !matches!(
            self.current.kind,
            TokenKind::Eof | TokenKind::Invalid | TokenKind::Regex
        ) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.current.kind == TokenKind::Invalid {
            return self.lexical_error();
        }
        self.error(format!("expected {}, found {}", expected, self.current))
    }

    fn lexical_error(&self) -> ParseError {
        self.error(self.current.text.clone())
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            label: self.lexer.label().to_string(),
            position: self.current.position,
            message,
        }
    }
}

/// Parse program source into an AST and its syntax errors.
pub fn parse(label: &str, source: &str) -> (Ast, Vec<ParseError>) {
    Parser::new(Lexer::new(label, source)).parse()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Ast {
        let (ast, errors) = parse("test.lm", source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        ast
    }

    #[test]
    fn test_parse_empty_program() {
        let ast = parse_ok("# nothing here\n");
        assert!(ast.rules.is_empty());
    }

    #[test]
    fn test_parse_rule_with_statements() {
        let ast = parse_ok(
            "/(?P<date>\\d+) (\\w+)/ {\n  strptime($date, \"%s\")\n  inc(line-count)\n  tag(line-count, \"verb\", $2)\n}\n",
        );

        assert_eq!(ast.rules.len(), 1);
        let rule = &ast.rules[0];
        assert_eq!(rule.pattern, "(?P<date>\\d+) (\\w+)");
        assert_eq!(rule.position, Position::new(0, 0, 20));
        assert_eq!(rule.body.len(), 3);

        assert_eq!(rule.body[0].builtin, Builtin::Strptime);
        assert_eq!(
            rule.body[0].args[0].kind,
            ExprKind::CaptureRef(CaptureRef::Named("date".to_string()))
        );
        assert_eq!(
            rule.body[0].args[1].kind,
            ExprKind::StringLiteral("%s".to_string())
        );

        assert_eq!(rule.body[1].builtin, Builtin::Inc);
        assert_eq!(
            rule.body[1].args,
            vec![Expr {
                kind: ExprKind::Identifier("line-count".to_string()),
                position: Position::new(2, 6, 15),
            }]
        );

        assert_eq!(
            rule.body[2].args[2].kind,
            ExprKind::CaptureRef(CaptureRef::Index(2))
        );
    }

    #[test]
    fn test_parse_empty_body_and_empty_args() {
        let ast = parse_ok("/a/ {}\n/b/ { inc() }");
        assert_eq!(ast.rules.len(), 2);
        assert!(ast.rules[0].body.is_empty());
        assert!(ast.rules[1].body[0].args.is_empty());
    }

    #[test]
    fn test_missing_paren_reports_position() {
        let (ast, errors) = parse("test.lm", "/a/ {\n  inc foo)\n}");
        assert!(ast.rules.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].position, Position::new(1, 6, 8));
        assert_eq!(errors[0].message, "expected '(', found identifier \"foo\"");
    }

    #[test]
    fn test_recovery_collects_every_broken_rule() {
        let source = "/a/ { inc(x }\n/b/ { inc(y) }\n/c/ inc(z)\n/d/ { tag(w, ,) }\n";
        let (ast, errors) = parse("test.lm", source);

        assert_eq!(ast.rules.len(), 1);
        assert_eq!(ast.rules[0].pattern, "b");
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].position.line, 0);
        assert_eq!(errors[1].position.line, 2);
        assert_eq!(errors[2].position.line, 3);
    }

    #[test]
    fn test_stray_token_at_top_level() {
        let (ast, errors) = parse("test.lm", "} /a/ { inc(x) }");
        assert_eq!(ast.rules.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "expected regular expression, found '}'");
    }

    #[test]
    fn test_lexical_error_is_terminal() {
        let (ast, errors) = parse("test.lm", "/a/ { inc(x) }\n/b/ { inc(?) }\n/c/ { inc(z) }");
        assert_eq!(ast.rules.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unexpected input: '?'");
        assert_eq!(errors[0].position, Position::new(1, 10, 10));
    }

    #[test]
    fn test_unterminated_string_surfaces_lexer_message() {
        let (_, errors) = parse("test.lm", "/a/ { tag(x, \"oops) }\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "test.lm:0:13-20: Unterminated quoted string: \"\\\"oops) }\""
        );
    }
}
