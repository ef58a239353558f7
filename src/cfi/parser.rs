//! CFI Parser
//!
//! Parses EPUB CFI strings into structured [`Selector`] values.
//!
//! Grammar (subset):
//! ```text
//! cfi       = "epubcfi(" path ["," path "," path] ")"
//! path      = component+ [offset]
//! component = "/" number | "!" | "[" text "]"
//! offset    = ":" number ["[" text "]"]
//! ```
//!
//! Text assertions trailing a character offset (`:5[pre,post;s=b]`) are
//! accepted and dropped; temporal and spatial offsets are not supported.

use std::str::FromStr;

use super::types::*;
use thiserror::Error;

/// CFI parsing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CfiParseError {
    #[error("Empty CFI string")]
    Empty,

    #[error("CFI must start with 'epubcfi('")]
    MissingPrefix,

    #[error("CFI must end with ')'")]
    MissingClosingParen,

    #[error("Expected '/' or '!' at position {0}")]
    ExpectedStep(usize),

    #[error("Expected number at position {0}")]
    ExpectedNumber(usize),

    #[error("Unclosed bracket at position {0}")]
    UnclosedBracket(usize),

    #[error("Empty path at position {0}")]
    EmptyPath(usize),

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

/// Cursor over the CFI text
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consume `token` if the input continues with it
    fn eat(&mut self, token: &str) -> bool {
        let found = self.rest().starts_with(token);
        if found {
            self.pos += token.len();
        }
        found
    }

    fn unexpected(&self) -> CfiParseError {
        CfiParseError::UnexpectedChar(self.peek().unwrap_or('\0'), self.pos)
    }

    /// Step index or character offset
    fn number(&mut self) -> Result<u32, CfiParseError> {
        let start = self.pos;
        let rest = self.rest();
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        self.pos += digits;
        // An empty or overlong run fails the same way
        rest[..digits]
            .parse()
            .map_err(|_| CfiParseError::ExpectedNumber(start))
    }

    /// `[text]` with `^` escaping the next character
    fn bracketed(&mut self) -> Result<String, CfiParseError> {
        if !self.eat("[") {
            return Err(self.unexpected());
        }
        let start = self.pos;
        let mut value = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, ch)) = chars.next() {
            match ch {
                '^' => match chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                ']' => {
                    self.pos = start + i + 1;
                    return Ok(value);
                }
                '[' => return Err(CfiParseError::UnexpectedChar('[', start + i)),
                _ => value.push(ch),
            }
        }
        Err(CfiParseError::UnclosedBracket(start))
    }

    fn component(&mut self) -> Result<PathComponent, CfiParseError> {
        if self.eat("/") {
            Ok(PathComponent::Step(self.number()?))
        } else if self.eat("!") {
            Ok(PathComponent::Indirection)
        } else if self.peek() == Some('[') {
            Ok(PathComponent::id(self.bracketed()?))
        } else {
            Err(CfiParseError::ExpectedStep(self.pos))
        }
    }

    fn path(&mut self) -> Result<Path, CfiParseError> {
        let start = self.pos;
        let mut path = Path::new();

        while matches!(self.peek(), Some('/' | '!' | '[')) {
            path.push(self.component()?);
        }

        if self.eat(":") {
            path.set_character_offset(self.number()?);
            if self.peek() == Some('[') {
                // Text/side-bias assertion: validated syntactically only
                self.bracketed()?;
            }
        }

        if path.components.is_empty() && path.offset.is_none() {
            return Err(CfiParseError::EmptyPath(start));
        }
        Ok(path)
    }

    fn selector(&mut self) -> Result<Selector, CfiParseError> {
        if !self.eat("epubcfi(") {
            return Err(CfiParseError::MissingPrefix);
        }

        let path = self.path()?;

        let range = if self.eat(",") {
            let from = self.path()?;
            if !self.eat(",") {
                return Err(self.unexpected());
            }
            let to = self.path()?;
            Some(PathRange { from, to })
        } else {
            None
        };

        if !self.eat(")") {
            if self.rest().is_empty() {
                return Err(CfiParseError::MissingClosingParen);
            }
            return Err(self.unexpected());
        }

        Ok(Selector { path, range })
    }
}

/// Parse a CFI string into a Selector
pub fn parse(input: &str) -> Result<Selector, CfiParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CfiParseError::Empty);
    }

    let mut parser = Parser { input, pos: 0 };
    let selector = parser.selector()?;

    if !parser.rest().is_empty() {
        return Err(parser.unexpected());
    }

    Ok(selector)
}

/// Parse a CFI string, discarding the error
pub fn try_parse(input: &str) -> Option<Selector> {
    parse(input).ok()
}

impl FromStr for Selector {
    type Err = CfiParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
