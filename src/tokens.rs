use crate::types::Int;
use std::fmt;
use std::iter::Peekable;

pub const SYMBOL_MAX_LEN: usize = 200;

const SYMBOL_LEADERS: &str = "+=!@#$%^&*";

#[derive(Debug, PartialEq, Eq)]
pub enum Token {
    OpenParen,
    CloseParen,
    Dot,
    Quote,
    Integer(Int),
    Symbol(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum TokenizerError {
    SymbolTooLong,
    IntegerOutOfRange,
    UnrecognizedCharacter(char),
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerError::SymbolTooLong => write!(f, "symbol name too long"),
            TokenizerError::IntegerOutOfRange => write!(f, "integer literal out of range"),
            TokenizerError::UnrecognizedCharacter(c) => {
                write!(f, "don't know how to handle {:?}", c)
            }
        }
    }
}

/// Splits a character stream into tokens, one at a time. Characters are only
/// pulled from the underlying iterator when the next token is requested.
pub struct Tokenizer<I: Iterator<Item = char>> {
    chars: Peekable<I>,
}

impl<I: Iterator<Item = char>> Tokenizer<I> {
    pub fn new(chars: I) -> Self {
        Self {
            chars: chars.peekable(),
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.chars.next() {
            if c == '\n' || c == '\r' {
                return;
            }
        }
    }

    fn next_is_digit(&mut self) -> bool {
        matches!(self.chars.peek(), Some(c) if c.is_ascii_digit())
    }

    // Accumulates towards the sign of the literal so that Int::MIN is readable.
    fn read_integer(&mut self, first: Int, negative: bool) -> Result<Token, TokenizerError> {
        let mut value = if negative { -first } else { first };
        while let Some(digit) = self.chars.peek().and_then(|c| c.to_digit(10)) {
            self.chars.next();
            let digit = Int::from(digit);
            value = value
                .checked_mul(10)
                .and_then(|v| match negative {
                    true => v.checked_sub(digit),
                    false => v.checked_add(digit),
                })
                .ok_or(TokenizerError::IntegerOutOfRange)?;
        }
        Ok(Token::Integer(value))
    }

    fn read_symbol(&mut self, first: char) -> Result<Token, TokenizerError> {
        let mut name = String::new();
        name.push(first);
        while let Some(&c) = self.chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '-') {
                break;
            }
            if name.len() >= SYMBOL_MAX_LEN {
                return Err(TokenizerError::SymbolTooLong);
            }
            name.push(c);
            self.chars.next();
        }
        Ok(Token::Symbol(name))
    }
}

impl<I: Iterator<Item = char>> Iterator for Tokenizer<I> {
    type Item = Result<Token, TokenizerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let c = self.chars.next()?;
            let token = match c {
                ' ' | '\t' | '\n' | '\r' => continue,
                ';' => {
                    self.skip_line();
                    continue;
                }
                '(' => Ok(Token::OpenParen),
                ')' => Ok(Token::CloseParen),
                '.' => Ok(Token::Dot),
                '\'' => Ok(Token::Quote),
                '0'..='9' => self.read_integer(Int::from(c as u8 - b'0'), false),
                '-' if self.next_is_digit() => self.read_integer(0, true),
                '-' => self.read_symbol(c),
                c if c.is_ascii_alphabetic() || SYMBOL_LEADERS.contains(c) => self.read_symbol(c),
                c => Err(TokenizerError::UnrecognizedCharacter(c)),
            };
            return Some(token);
        }
    }
}
