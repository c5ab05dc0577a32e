use crate::ast::*;
use crate::lexer::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = crate::lexer::Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    /// Kind of the next significant token after the current one
    fn peek_second_kind(&self) -> TokenKind {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .skip(1)
            .find(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Comment))
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn skip_newlines_and_comments(&mut self) {
        while matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Comment
        ) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(t) if t.kind != TokenKind::Eof => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("{:?}", t.kind),
                span: t.span,
            },
            _ => ParseError::UnexpectedEof,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        self.skip_newlines_and_comments();
        if self.peek_kind() != kind {
            return Err(self.unexpected(&format!("{:?}", kind)));
        }
        self.advance().ok_or(ParseError::UnexpectedEof)
    }

    /// End offset of the last consumed token
    fn last_end(&self, fallback: Span) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.end)
            .unwrap_or(fallback.end)
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();

        loop {
            self.skip_newlines_and_comments();

            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Constraint => items.push(Item::Constraint(self.parse_constraint()?)),
                TokenKind::Minimize | TokenKind::Maximize => {
                    items.push(Item::Objective(self.parse_objective()?))
                }
                _ => return Err(self.unexpected("constraint, minimize, or maximize")),
            }
        }

        Ok(Program { items })
    }

    /// `name:` prefix of a declaration, if present
    fn parse_label(&mut self) -> Result<Option<String>, ParseError> {
        self.skip_newlines_and_comments();
        if self.peek_kind() == TokenKind::Ident && self.peek_second_kind() == TokenKind::Colon {
            let name = self.expect(TokenKind::Ident)?.text;
            self.expect(TokenKind::Colon)?;
            return Ok(Some(name));
        }
        Ok(None)
    }

    fn parse_constraint(&mut self) -> Result<ConstraintDecl, ParseError> {
        let start = self.expect(TokenKind::Constraint)?.span;
        let label = self.parse_label()?;
        let first = self.parse_expr()?;

        let mut comparisons = Vec::new();
        while comparisons.len() < 2 {
            self.skip_newlines_and_comments();
            let op = match self.peek_kind() {
                TokenKind::Le => Comparator::Le,
                TokenKind::Lt => Comparator::Lt,
                TokenKind::EqEq => Comparator::Eq,
                _ => break,
            };
            self.advance();
            let expr = self.parse_expr()?;
            comparisons.push(Comparison { op, expr });
        }
        if comparisons.is_empty() {
            return Err(self.unexpected("<=, <, or =="));
        }

        Ok(ConstraintDecl {
            span: Span::new(start.start, self.last_end(start)),
            label,
            first,
            comparisons,
        })
    }

    fn parse_objective(&mut self) -> Result<ObjectiveDecl, ParseError> {
        self.skip_newlines_and_comments();
        let sense = match self.peek_kind() {
            TokenKind::Minimize => Sense::Minimize,
            TokenKind::Maximize => Sense::Maximize,
            _ => return Err(self.unexpected("minimize or maximize")),
        };
        let start = self.advance().map(|t| t.span).ok_or(ParseError::UnexpectedEof)?;
        let label = self.parse_label()?;
        let expr = self.parse_expr()?;

        Ok(ObjectiveDecl {
            span: Span::new(start.start, self.last_end(start)),
            label,
            sense,
            expr,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            self.skip_newlines_and_comments();
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            self.skip_newlines_and_comments();
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_newlines_and_comments();
        if self.peek_kind() == TokenKind::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_newlines_and_comments();

        match self.peek_kind() {
            TokenKind::Number => {
                let token = self.expect(TokenKind::Number)?;
                let value: i64 = token
                    .text
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(token.text.clone()))?;
                Ok(Expr::Number(value))
            }
            TokenKind::Ident => {
                let token = self.expect(TokenKind::Ident)?;
                Ok(Expr::Var {
                    span: token.span,
                    name: token.text,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(expr)))
            }
            _ => Err(self.unexpected("number, identifier, or (")),
        }
    }
}
