use crate::heap::Heap;
use crate::symbols::SymbolTable;
use crate::tokens::{Token, Tokenizer, TokenizerError};
use crate::types::ObjRef;
use std::fmt;
use std::str::Chars;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Tokenizer(TokenizerError),
    UnclosedList,
    StrayDot,
    StrayCloseParen,
    ExpectedCloseAfterDot,
    NothingToQuote,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Tokenizer(e) => write!(f, "{}", e),
            Error::UnclosedList => write!(f, "unclosed parenthesis"),
            Error::StrayDot => write!(f, "stray dot"),
            Error::StrayCloseParen => write!(f, "stray close parenthesis"),
            Error::ExpectedCloseAfterDot => write!(f, "closed parenthesis expected after dot"),
            Error::NothingToQuote => write!(f, "quote must be followed by an expression"),
        }
    }
}

impl From<TokenizerError> for Error {
    fn from(e: TokenizerError) -> Self {
        Error::Tokenizer(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuation {
    Dot,
    CloseParen,
}

/// What a single read produced. Punctuation is reported out of band so that
/// list reading can recognise it without a dedicated object.
#[derive(Debug, PartialEq, Eq)]
pub enum Datum {
    Value(ObjRef),
    Punctuation(Punctuation),
    EndOfInput,
}

pub struct Reader<I: Iterator<Item = char>> {
    tokens: Tokenizer<I>,
}

impl<'a> Reader<Chars<'a>> {
    pub fn from_str(input: &'a str) -> Self {
        Self::new(input.chars())
    }
}

impl<I: Iterator<Item = char>> Reader<I> {
    pub fn new(chars: I) -> Self {
        Self {
            tokens: Tokenizer::new(chars),
        }
    }

    /// Reads one top-level expression. Returns `Ok(None)` at end of input.
    /// The returned value carries one credit.
    pub fn read(&mut self, heap: &mut Heap, symbols: &mut SymbolTable) -> Result<Option<ObjRef>> {
        match self.read_datum(heap, symbols)? {
            Datum::Value(obj) => Ok(Some(obj)),
            Datum::EndOfInput => Ok(None),
            Datum::Punctuation(Punctuation::Dot) => Err(Error::StrayDot),
            Datum::Punctuation(Punctuation::CloseParen) => Err(Error::StrayCloseParen),
        }
    }

    pub fn read_datum(&mut self, heap: &mut Heap, symbols: &mut SymbolTable) -> Result<Datum> {
        let token = match self.tokens.next() {
            None => return Ok(Datum::EndOfInput),
            Some(token) => token?,
        };
        let datum = match token {
            Token::OpenParen => Datum::Value(self.read_list(heap, symbols)?),
            Token::CloseParen => Datum::Punctuation(Punctuation::CloseParen),
            Token::Dot => Datum::Punctuation(Punctuation::Dot),
            Token::Quote => Datum::Value(self.read_quote(heap, symbols)?),
            Token::Integer(value) => Datum::Value(heap.integer(value)),
            Token::Symbol(name) => {
                let sym = symbols.intern(heap, &name);
                Datum::Value(heap.retain(sym))
            }
        };
        Ok(datum)
    }

    // 'expr reads as (quote expr)
    fn read_quote(&mut self, heap: &mut Heap, symbols: &mut SymbolTable) -> Result<ObjRef> {
        let quoted = match self.read_datum(heap, symbols)? {
            Datum::Value(obj) => obj,
            Datum::EndOfInput => return Err(Error::NothingToQuote),
            Datum::Punctuation(Punctuation::Dot) => return Err(Error::StrayDot),
            Datum::Punctuation(Punctuation::CloseParen) => return Err(Error::StrayCloseParen),
        };
        let quote = symbols.intern(heap, "quote");
        let quote = heap.retain(quote);
        Ok(heap.list(vec![quote, quoted]))
    }

    // The opening parenthesis has already been consumed.
    fn read_list(&mut self, heap: &mut Heap, symbols: &mut SymbolTable) -> Result<ObjRef> {
        let mut items = Vec::new();
        match self.read_list_items(heap, symbols, &mut items) {
            Ok(tail) => Ok(heap.list_with_tail(items, tail)),
            Err(e) => {
                for item in items {
                    heap.release(item);
                }
                Err(e)
            }
        }
    }

    /// Collects elements into `items` and returns the owned tail of the list.
    fn read_list_items(
        &mut self,
        heap: &mut Heap,
        symbols: &mut SymbolTable,
        items: &mut Vec<ObjRef>,
    ) -> Result<ObjRef> {
        loop {
            match self.read_datum(heap, symbols)? {
                Datum::Value(obj) => items.push(obj),
                Datum::EndOfInput => return Err(Error::UnclosedList),
                Datum::Punctuation(Punctuation::CloseParen) => return Ok(heap.owned_nil()),
                Datum::Punctuation(Punctuation::Dot) if items.is_empty() => {
                    return Err(Error::StrayDot)
                }
                Datum::Punctuation(Punctuation::Dot) => return self.read_dotted_tail(heap, symbols),
            }
        }
    }

    fn read_dotted_tail(&mut self, heap: &mut Heap, symbols: &mut SymbolTable) -> Result<ObjRef> {
        let tail = match self.read_datum(heap, symbols)? {
            Datum::Value(obj) => obj,
            Datum::EndOfInput => return Err(Error::UnclosedList),
            Datum::Punctuation(_) => return Err(Error::ExpectedCloseAfterDot),
        };
        match self.read_datum(heap, symbols) {
            Ok(Datum::Punctuation(Punctuation::CloseParen)) => Ok(tail),
            Ok(other) => {
                heap.release(tail);
                if let Datum::Value(obj) = other {
                    heap.release(obj);
                }
                Err(Error::ExpectedCloseAfterDot)
            }
            Err(e) => {
                heap.release(tail);
                Err(e)
            }
        }
    }
}
