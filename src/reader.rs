use std::iter::Peekable;
use std::str::CharIndices;

use crate::ast::*;
use crate::error::ReadError;

/// Turns source text into unevaluated values: `(...)` becomes an
/// S-Expression, `{...}` a Q-Expression, and everything else a number or a
/// symbol.
pub struct Reader<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Reader<'a> {
    const SYMBOL_CHARS: &'static str = "_+-*/\\=<>!&%";

    pub fn new(source: &'a str) -> Reader<'a> {
        Reader {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next().map(|(_, chr)| chr)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, chr)| chr)
    }

    fn pos(&mut self) -> usize {
        match self.chars.peek() {
            Some(&(i, _)) => i,
            None => self.source.len(),
        }
    }

    fn error(&mut self, msg: impl ToString) -> ReadError {
        let byte = self.pos();
        ReadError::new(self.source, byte, msg)
    }

    fn is_symbol_char(chr: char) -> bool {
        chr.is_ascii_alphanumeric() || Self::SYMBOL_CHARS.contains(chr)
    }

    /// Skips whitespace and `;` line comments.
    fn skip_whitespace(&mut self) {
        while let Some(chr) = self.peek() {
            if chr == ';' {
                while let Some(chr) = self.advance() {
                    if chr == '\n' { break }
                }
            } else if chr.is_whitespace() {
                self.advance();
            } else {
                return;
            }
        }
    }

    pub fn parse_atom(&mut self) -> Result<Value, ReadError> {
        let start = self.pos();
        while let Some(chr) = self.peek() {
            if !Self::is_symbol_char(chr) { break }
            self.advance();
        }
        let end = self.pos();
        let source = self.source;
        let tok = &source[start..end];

        if tok.is_empty() {
            return Err(match self.peek() {
                Some(chr) => self.error(format!("unexpected char '{chr}'")),
                None => self.error("unexpected end of input"),
            });
        }

        let digits = tok.strip_prefix('-').unwrap_or(tok);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            // Too large for the number type: the evaluator sees an error leaf.
            return Ok(tok
                .parse()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::error("invalid number")));
        }

        Ok(Value::symbol(tok))
    }

    fn parse_list(&mut self, close: char) -> Result<Vec<Value>, ReadError> {
        // Opening bracket.
        self.advance();

        let mut cells = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(chr) if chr == close => {
                    self.advance();
                    return Ok(cells);
                }
                Some(chr @ (')' | '}')) => {
                    return Err(self.error(format!("expected '{close}', got '{chr}'")));
                }
                Some(_) => cells.push(self.parse_expr()?),
                None => return Err(self.error(format!("expected a closing '{close}'"))),
            }
        }
    }

    pub fn parse_expr(&mut self) -> Result<Value, ReadError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => Ok(Value::SExpr(self.parse_list(')')?)),
            Some('{') => Ok(Value::QExpr(self.parse_list('}')?)),
            Some(_) => self.parse_atom(),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Every top-level expression, in source order.
    pub fn parse_exprs(&mut self) -> Result<Vec<Value>, ReadError> {
        let mut exprs = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(exprs),
                Some(chr @ (')' | '}')) => {
                    return Err(self.error(format!("unexpected '{chr}'")));
                }
                Some(_) => exprs.push(self.parse_expr()?),
            }
        }
    }

    /// The whole input as one S-Expression, so `+ 1 2` reads as `(+ 1 2)`.
    pub fn parse_program(&mut self) -> Result<Value, ReadError> {
        self.parse_exprs().map(Value::SExpr)
    }
}
