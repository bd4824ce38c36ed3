use std::collections::VecDeque;
use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("Indentation must be a multiple of 4")]
    IndentationNotMultipleOfFour,
    #[error("Unrecognized character '{character}'")]
    UnexpectedCharacter { character: char },
    #[error("Invalid numeric literal '{literal}'")]
    InvalidNumericLiteral { literal: String },
}

/// Single-pass lexer over one source text. Each instance may be consumed
/// exactly once; re-scanning requires a fresh instance over the same text.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pending: VecDeque<Token<'a>>,
    at_line_start: bool,
    indent_level: usize,
    trailing_newline_emitted: bool,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            pending: VecDeque::new(),
            at_line_start: true,
            indent_level: 0,
            trailing_newline_emitted: false,
            done: false,
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        if self.at_line_start {
            self.handle_line_start()?;
        }

        if let Some(token) = self.pending.pop_front() {
            return Ok(token);
        }

        self.consume_spaces();

        let (index, character) = match self.chars.peek() {
            Some(&(index, character)) => (index, character),
            None => {
                // The source behaves as if it ended with a newline: a final
                // line with content still gets its NEWLINE before EOF.
                if !self.trailing_newline_emitted {
                    self.trailing_newline_emitted = true;
                    self.at_line_start = true;
                    return Ok(Token::Newline);
                }
                return Ok(Token::Eof);
            }
        };

        match character {
            '\n' => {
                self.chars.next();
                self.at_line_start = true;
                Ok(Token::Newline)
            }
            '*' => {
                self.chars.next();
                if matches!(self.chars.peek(), Some(&(_, '*'))) {
                    self.chars.next();
                    Ok(Token::Exp)
                } else {
                    Ok(Token::Mul)
                }
            }
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '/' => self.single(Token::Div),
            '%' => self.single(Token::Mod),
            '=' => self.single(Token::Assign),
            ':' => self.single(Token::Colon),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '.' if self.next_is_digit(index) => self.read_number(index),
            c if c.is_ascii_digit() => self.read_number(index),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_name(index)),
            character => Err(LexError::UnexpectedCharacter { character }),
        }
    }

    /// Measures the indentation of the next non-blank line and queues the
    /// INDENT/DEDENT tokens it owes. Blank lines are consumed silently.
    fn handle_line_start(&mut self) -> Result<(), LexError> {
        loop {
            let spaces = self.consume_spaces();
            match self.chars.peek() {
                Some(&(_, '\n')) => {
                    self.chars.next();
                    continue;
                }
                None => {
                    self.trailing_newline_emitted = true;
                    self.set_indent_level(0);
                    self.at_line_start = false;
                    return Ok(());
                }
                Some(_) => {
                    if spaces % 4 != 0 {
                        return Err(LexError::IndentationNotMultipleOfFour);
                    }
                    self.set_indent_level(spaces / 4);
                    self.at_line_start = false;
                    return Ok(());
                }
            }
        }
    }

    fn set_indent_level(&mut self, level: usize) {
        while level > self.indent_level {
            self.pending.push_back(Token::Indent);
            self.indent_level += 1;
        }
        while level < self.indent_level {
            self.pending.push_back(Token::Dedent);
            self.indent_level -= 1;
        }
    }

    fn consume_spaces(&mut self) -> usize {
        let mut count = 0;
        while let Some(&(_, ' ')) = self.chars.peek() {
            self.chars.next();
            count += 1;
        }
        count
    }

    fn single(&mut self, token: Token<'a>) -> Result<Token<'a>, LexError> {
        self.chars.next();
        Ok(token)
    }

    fn next_is_digit(&self, index: usize) -> bool {
        self.input
            .as_bytes()
            .get(index + 1)
            .is_some_and(|byte| byte.is_ascii_digit())
    }

    fn read_number(&mut self, start: usize) -> Result<Token<'a>, LexError> {
        let mut is_float = false;
        if matches!(self.chars.peek(), Some(&(_, '.'))) {
            // Leading-dot float such as `.5`.
            is_float = true;
            self.chars.next();
        }
        self.consume_digits();
        if !is_float && matches!(self.chars.peek(), Some(&(_, '.'))) {
            // A bare trailing dot defaults the fraction to zero: `5.` is 5.0.
            is_float = true;
            self.chars.next();
            self.consume_digits();
        }

        let literal = &self.input[start..self.current_index()];
        if is_float {
            let value = literal.parse::<f64>().map_err(|_| {
                LexError::InvalidNumericLiteral {
                    literal: literal.to_string(),
                }
            })?;
            Ok(Token::Float(value))
        } else {
            let value = literal.parse::<i64>().map_err(|_| {
                LexError::InvalidNumericLiteral {
                    literal: literal.to_string(),
                }
            })?;
            Ok(Token::Int(value))
        }
    }

    fn consume_digits(&mut self) {
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
            self.chars.next();
        }
    }

    fn read_name(&mut self, start: usize) -> Token<'a> {
        self.chars.next();
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_alphanumeric() || c == '_') {
            self.chars.next();
        }

        let name = &self.input[start..self.current_index()];
        match name {
            "if" => Token::If,
            "not" => Token::Not,
            "True" => Token::True,
            "False" => Token::False,
            _ => Token::Name(name),
        }
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(index, _)| index)
            .unwrap_or(self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(Token::Eof) => {
                self.done = true;
                Some(Ok(Token::Eof))
            }
            Ok(token) => Some(Ok(token)),
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token, Token::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
