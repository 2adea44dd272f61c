//! Stateful token reader over a JSON byte slice.
//!
//! The tokenizer only tracks framing: object and array delimiters, the `:`
//! and `,` separators, and which positions may hold a key or a value.
//! Separators are consumed implicitly and never surfaced as tokens. Keys,
//! scalars and whole values are handed to `serde_json`, whose errors are
//! passed through untouched.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Deserializer, Number, Value};

use crate::error::{Error, ErrorKind};
use crate::span::{Pos, Span, Spanned, offset_of};

/// A framing or scalar token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// A string, either an object key or a value
    String(String),
    /// A number value
    Number(Number),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
        }
    }
}

/// Error raised by the tokenizer itself, as opposed to `serde_json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    /// What went wrong
    pub kind: TokenErrorKind,
    /// Where it went wrong
    pub span: Span,
}

/// Framing errors detected while reading tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenErrorKind {
    /// A character that is not allowed at this point of the stream
    UnexpectedCharacter {
        /// The offending character
        found: char,
        /// What the tokenizer was looking for
        context: &'static str,
    },
    /// An object key was not followed by `:`
    ExpectedColon,
    /// An array element was not followed by `,` or `]`
    ExpectedComma,
    /// The input ended early
    UnexpectedEof,
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenErrorKind::UnexpectedCharacter { found, context } => {
                write!(f, "invalid character {found:?} {context}")
            }
            TokenErrorKind::ExpectedColon => write!(f, "expected colon after object key"),
            TokenErrorKind::ExpectedComma => write!(f, "expected comma after array element"),
            TokenErrorKind::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Where the reader is relative to the enclosing container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    TopValue,
    ArrayStart,
    ArrayValue,
    ArrayComma,
    ObjectStart,
    ObjectKey,
    ObjectColon,
    ObjectValue,
    ObjectComma,
}

impl State {
    fn value_allowed(self) -> bool {
        matches!(
            self,
            State::TopValue | State::ArrayStart | State::ArrayValue | State::ObjectValue
        )
    }

    fn context(self) -> &'static str {
        match self {
            State::TopValue | State::ArrayStart | State::ArrayValue | State::ObjectValue => {
                "looking for beginning of value"
            }
            State::ArrayComma => "after array element",
            State::ObjectStart | State::ObjectKey => "looking for beginning of object key string",
            State::ObjectColon => "after object key",
            State::ObjectComma => "after object key:value pair",
        }
    }
}

/// Token reader that hands scalar and value decoding to `serde_json`.
pub struct Tokenizer<'input> {
    input: &'input [u8],
    pos: Pos,
    state: State,
    parents: Vec<State>,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer positioned at the start of `input`.
    pub fn new(input: &'input [u8]) -> Self {
        Tokenizer {
            input,
            pos: 0,
            state: State::TopValue,
            parents: Vec::new(),
        }
    }

    /// Current byte offset.
    pub fn position(&self) -> Pos {
        self.pos
    }

    /// Reports whether the current array or object has another element.
    ///
    /// End of input counts as "no more"; the following [`next_token`]
    /// call reports it.
    ///
    /// [`next_token`]: Tokenizer::next_token
    pub fn more(&mut self) -> bool {
        !matches!(self.peek(), None | Some(b'}') | Some(b']'))
    }

    /// Read the next token, consuming any separators before it.
    pub fn next_token(&mut self) -> Result<Spanned<Token>, Error> {
        loop {
            let Some(c) = self.peek() else {
                return Err(self.eof());
            };
            let start = self.pos;
            match c {
                b'{' | b'[' => {
                    if !self.state.value_allowed() {
                        return Err(self.unexpected(start));
                    }
                    self.pos += 1;
                    self.parents.push(self.state);
                    let (state, token) = if c == b'{' {
                        (State::ObjectStart, Token::LBrace)
                    } else {
                        (State::ArrayStart, Token::LBracket)
                    };
                    self.state = state;
                    return Ok(Spanned::new(token, Span::new(start, 1)));
                }
                b'}' => {
                    if !matches!(self.state, State::ObjectStart | State::ObjectComma) {
                        return Err(self.unexpected(start));
                    }
                    self.pos += 1;
                    self.close_container();
                    return Ok(Spanned::new(Token::RBrace, Span::new(start, 1)));
                }
                b']' => {
                    if !matches!(self.state, State::ArrayStart | State::ArrayComma) {
                        return Err(self.unexpected(start));
                    }
                    self.pos += 1;
                    self.close_container();
                    return Ok(Spanned::new(Token::RBracket, Span::new(start, 1)));
                }
                b':' => {
                    if self.state != State::ObjectColon {
                        return Err(self.unexpected(start));
                    }
                    self.pos += 1;
                    self.state = State::ObjectValue;
                }
                b',' => match self.state {
                    State::ArrayComma => {
                        self.pos += 1;
                        self.state = State::ArrayValue;
                    }
                    State::ObjectComma => {
                        self.pos += 1;
                        self.state = State::ObjectKey;
                    }
                    _ => return Err(self.unexpected(start)),
                },
                b'"' if matches!(self.state, State::ObjectStart | State::ObjectKey) => {
                    let key = self.read_value::<String>()?;
                    self.state = State::ObjectColon;
                    return Ok(Spanned::new(Token::String(key.node), key.span));
                }
                _ => {
                    if !self.state.value_allowed() {
                        return Err(self.unexpected(start));
                    }
                    let scalar = self.read_value::<Value>()?;
                    let token = match scalar.node {
                        Value::String(s) => Token::String(s),
                        Value::Number(n) => Token::Number(n),
                        Value::Bool(true) => Token::True,
                        Value::Bool(false) => Token::False,
                        Value::Null => Token::Null,
                        // `{` and `[` are handled above
                        Value::Array(_) | Value::Object(_) => {
                            return Err(self.unexpected(start));
                        }
                    };
                    self.value_end();
                    return Ok(Spanned::new(token, scalar.span));
                }
            }
        }
    }

    /// Decode the next value directly as `T`.
    ///
    /// The pending `:` or `,` before the value is consumed first.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<Spanned<T>, Error> {
        self.prepare_for_value()?;
        if !self.state.value_allowed() {
            return Err(match self.peek() {
                Some(_) => self.unexpected(self.pos),
                None => self.eof(),
            });
        }
        let value = self.read_value::<T>()?;
        self.value_end();
        Ok(value)
    }

    /// Require that nothing but whitespace remains.
    pub fn finish(&mut self) -> Result<(), Error> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(Error::new(
                ErrorKind::Token(TokenErrorKind::UnexpectedCharacter {
                    found: self.char_at(self.pos),
                    context: "after top-level value",
                }),
                Span::new(self.pos, 1),
            )),
        }
    }

    fn prepare_for_value(&mut self) -> Result<(), Error> {
        match self.state {
            State::ArrayComma => {
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                        self.state = State::ArrayValue;
                    }
                    Some(_) => {
                        return Err(self.token_error(TokenErrorKind::ExpectedComma, self.pos));
                    }
                    None => return Err(self.eof()),
                }
            }
            State::ObjectColon => {
                match self.peek() {
                    Some(b':') => {
                        self.pos += 1;
                        self.state = State::ObjectValue;
                    }
                    Some(_) => {
                        return Err(self.token_error(TokenErrorKind::ExpectedColon, self.pos));
                    }
                    None => return Err(self.eof()),
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Hand one value to `serde_json`, starting at the next non-whitespace byte.
    fn read_value<T: DeserializeOwned>(&mut self) -> Result<Spanned<T>, Error> {
        self.skip_whitespace();
        let start = self.pos;
        let rest = &self.input[start..];
        let mut stream = Deserializer::from_slice(rest).into_iter::<T>();
        match stream.next() {
            Some(Ok(value)) => {
                self.pos = start + stream.byte_offset();
                Ok(Spanned::new(value, Span::between(start, self.pos)))
            }
            Some(Err(err)) => {
                let at = start + offset_of(rest, err.line(), err.column());
                let len = usize::from(at < self.input.len());
                Err(Error::new(ErrorKind::Json(err), Span::new(at, len)))
            }
            None => Err(self.eof()),
        }
    }

    fn close_container(&mut self) {
        self.state = self.parents.pop().unwrap_or(State::TopValue);
        self.value_end();
    }

    fn value_end(&mut self) {
        self.state = match self.state {
            State::ArrayStart | State::ArrayValue => State::ArrayComma,
            State::ObjectValue => State::ObjectComma,
            other => other,
        };
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.input.get(self.pos) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    fn char_at(&self, pos: Pos) -> char {
        let end = (pos + 4).min(self.input.len());
        String::from_utf8_lossy(&self.input[pos..end])
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn unexpected(&self, pos: Pos) -> Error {
        let kind = TokenErrorKind::UnexpectedCharacter {
            found: self.char_at(pos),
            context: self.state.context(),
        };
        self.token_error(kind, pos)
    }

    fn eof(&self) -> Error {
        self.token_error(TokenErrorKind::UnexpectedEof, self.input.len())
    }

    fn token_error(&self, kind: TokenErrorKind, pos: Pos) -> Error {
        let len = usize::from(pos < self.input.len());
        Error::from(TokenError {
            kind,
            span: Span::new(pos, len),
        })
    }
}
