use thiserror::Error;

use crate::ast::{BinOp, Body, Constant, Expression, Program, Statement, UnOp};
use crate::token::Token;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expected {expected}, got {found}")]
    UnexpectedToken { expected: &'static str, found: String },
    #[error("Can't parse {found} as a value")]
    InvalidValue { found: String },
}

/// Recursive-descent parser over a fully materialized token sequence.
///
/// The grammar it implements:
///
/// ```text
/// program        := statement* EOF
/// statement      := assignment | conditional | expr_statement
/// assignment     := (NAME '=')+ expr NEWLINE
/// conditional    := 'if' expr ':' NEWLINE body
/// body           := INDENT statement+ DEDENT
/// expr_statement := expr NEWLINE
/// expr           := negation
/// negation       := 'not' negation | computation
/// computation    := term (('+'|'-') term)*
/// term           := unary (('*'|'/'|'%') unary)*
/// unary          := ('+'|'-') unary | exponent
/// exponent       := atom ('**' unary)?
/// atom           := '(' expr ')' | value
/// value          := NAME | INT | FLOAT | TRUE | FALSE
/// ```
pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    next: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self { tokens, next: 0 }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !matches!(self.peek(), Some(Token::Eof) | None) {
            statements.push(self.parse_statement()?);
        }
        self.expect(Token::Eof)?;
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        if matches!(self.peek_at(1), Some(Token::Assign)) {
            self.parse_assignment()
        } else if matches!(self.peek(), Some(Token::If)) {
            self.parse_conditional()
        } else {
            self.parse_expr_statement()
        }
    }

    fn parse_assignment(&mut self) -> Result<Statement, ParseError> {
        let mut targets = vec![self.expect_name()?];
        self.expect(Token::Assign)?;
        // Chained targets all share the one value expression at the end.
        while matches!(self.peek_at(1), Some(Token::Assign)) {
            targets.push(self.expect_name()?);
            self.expect(Token::Assign)?;
        }

        let value = self.parse_expr()?;
        self.expect(Token::Newline)?;
        Ok(Statement::Assignment { targets, value })
    }

    fn parse_conditional(&mut self) -> Result<Statement, ParseError> {
        self.expect(Token::If)?;
        let condition = self.parse_expr()?;
        self.expect(Token::Colon)?;
        self.expect(Token::Newline)?;
        let body = self.parse_body()?;
        Ok(Statement::Conditional { condition, body })
    }

    fn parse_body(&mut self) -> Result<Body, ParseError> {
        self.expect(Token::Indent)?;
        let mut statements = Vec::new();
        while !matches!(self.peek(), Some(Token::Dedent)) {
            statements.push(self.parse_statement()?);
        }
        self.expect(Token::Dedent)?;
        Ok(Body { statements })
    }

    fn parse_expr_statement(&mut self) -> Result<Statement, ParseError> {
        let expression = self.parse_expr()?;
        self.expect(Token::Newline)?;
        Ok(Statement::Expr(expression))
    }

    fn parse_expr(&mut self) -> Result<Expression, ParseError> {
        self.parse_negation()
    }

    fn parse_negation(&mut self) -> Result<Expression, ParseError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            Ok(Expression::UnaryOp {
                op: UnOp::Not,
                operand: Box::new(self.parse_negation()?),
            })
        } else {
            self.parse_computation()
        }
    }

    fn parse_computation(&mut self) -> Result<Expression, ParseError> {
        let mut result = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            result = Expression::BinaryOp {
                op,
                left: Box::new(result),
                right: Box::new(right),
            };
        }
        Ok(result)
    }

    fn parse_term(&mut self) -> Result<Expression, ParseError> {
        let mut result = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Mul) => BinOp::Mul,
                Some(Token::Div) => BinOp::Div,
                Some(Token::Mod) => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            result = Expression::BinaryOp {
                op,
                left: Box::new(result),
                right: Box::new(right),
            };
        }
        Ok(result)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let op = match self.peek() {
            Some(Token::Plus) => Some(UnOp::Pos),
            Some(Token::Minus) => Some(UnOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            Ok(Expression::UnaryOp {
                op,
                operand: Box::new(self.parse_unary()?),
            })
        } else {
            self.parse_exponent()
        }
    }

    fn parse_exponent(&mut self) -> Result<Expression, ParseError> {
        let mut result = self.parse_atom()?;
        if matches!(self.peek(), Some(Token::Exp)) {
            self.advance();
            // The right operand recurses through `unary`, which makes `**`
            // right-associative.
            result = Expression::BinaryOp {
                op: BinOp::Pow,
                left: Box::new(result),
                right: Box::new(self.parse_unary()?),
            };
        }
        Ok(result)
    }

    fn parse_atom(&mut self) -> Result<Expression, ParseError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            let result = self.parse_expr()?;
            self.expect(Token::RParen)?;
            Ok(result)
        } else {
            self.parse_value()
        }
    }

    fn parse_value(&mut self) -> Result<Expression, ParseError> {
        let expression = match self.peek() {
            Some(Token::Name(name)) => Expression::Variable(name.to_string()),
            Some(Token::Int(value)) => Expression::Constant(Constant::Int(*value)),
            Some(Token::Float(value)) => Expression::Constant(Constant::Float(*value)),
            Some(Token::True) => Expression::Constant(Constant::Bool(true)),
            Some(Token::False) => Expression::Constant(Constant::Bool(false)),
            _ => {
                return Err(ParseError::InvalidValue {
                    found: self.found(),
                });
            }
        };
        self.advance();
        Ok(expression)
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.peek_at(0)
    }

    /// Arbitrary-distance lookahead; past the end of the stream this returns
    /// `None` rather than faulting.
    fn peek_at(&self, steps: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.next + steps)
    }

    fn advance(&mut self) {
        self.next += 1;
    }

    fn expect(&mut self, expected: Token<'a>) -> Result<(), ParseError> {
        if self.peek() == Some(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.type_name(),
                found: self.found(),
            })
        }
    }

    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Name(name)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::UnexpectedToken {
                expected: "NAME",
                found: self.found(),
            }),
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => token.to_string(),
            None => "end of input".to_string(),
        }
    }
}

pub fn parse(tokens: Vec<Token<'_>>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}
