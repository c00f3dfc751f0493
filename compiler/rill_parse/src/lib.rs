//! Recursive descent parser for Rill.
//!
//! The parser pulls tokens from a [`Lexer`] one at a time and keeps a single
//! token of lookahead. Statements are separated by newlines or `;`; blocks
//! are closed by `end`. Every node records the line it starts on.

mod error;
mod grammar;

pub use error::{ParseError, ParseErrorKind};

use rill_ir::{Module, Span, StringInterner, Token, TokenKind};
use rill_lexer::Lexer;
use std::path::Path;

/// Parser state.
pub struct Parser<'src, 'i> {
    lexer: Lexer<'src, 'i>,
    token: Token,
    /// End offset of the last consumed token.
    prev_end: u32,
}

impl<'src, 'i> Parser<'src, 'i> {
    /// Create a parser positioned on the first token of `source`.
    pub fn new(source: &'src str, interner: &'i StringInterner) -> Result<Self, ParseError> {
        let mut parser = Parser {
            lexer: Lexer::new(source, interner),
            token: Token::new(TokenKind::Eof, Span::DUMMY, 1),
            prev_end: 0,
        };
        parser.advance()?;
        parser.prev_end = 0;
        Ok(parser)
    }

    /// Parse a whole source file.
    pub fn parse_module(mut self) -> Result<Module, ParseError> {
        self.module()
    }

    // -------------------------------------------------------------------------
    // Token navigation
    // -------------------------------------------------------------------------

    #[inline]
    fn kind(&self) -> &TokenKind {
        &self.token.kind
    }

    #[inline]
    fn line(&self) -> u32 {
        self.token.line
    }

    #[inline]
    fn start(&self) -> u32 {
        self.token.span.start
    }

    /// Span from `start` to the end of the last consumed token.
    #[inline]
    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.prev_end = self.token.span.end;
        if let Some(next) = self.lexer.next() {
            self.token = next?;
        }
        Ok(())
    }

    #[inline]
    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.kind()) == std::mem::discriminant(kind)
    }

    /// Consume the current token if it has the given kind.
    fn accept(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: &TokenKind, context: &'static str) -> Result<(), ParseError> {
        if self.accept(kind)? {
            Ok(())
        } else {
            Err(self.expected(format!("\"{}\"", kind.spelling()), context))
        }
    }

    fn skip_separators(&mut self) -> Result<(), ParseError> {
        while self.token.is_separator() {
            self.advance()?;
        }
        Ok(())
    }

    fn skip_newlines(&mut self) -> Result<(), ParseError> {
        while self.check(&TokenKind::Eol) {
            self.advance()?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Errors
    // -------------------------------------------------------------------------

    #[cold]
    fn expected(&self, expected: impl Into<String>, context: &'static str) -> ParseError {
        ParseError::new(
            ParseErrorKind::Expected {
                expected: expected.into(),
                context,
                found: self.kind().describe(),
            },
            self.token.span,
            self.line(),
        )
    }

    #[cold]
    fn invalid(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(
            ParseErrorKind::Invalid(message.into()),
            self.token.span,
            self.line(),
        )
    }
}

/// Parse source text held in memory.
pub fn parse_string(source: &str, interner: &StringInterner) -> Result<Module, ParseError> {
    Parser::new(source, interner)?.parse_module()
}

/// Read and parse a source file.
pub fn parse_file(path: &Path, interner: &StringInterner) -> Result<Module, ParseError> {
    let source = std::fs::read_to_string(path).map_err(|err| {
        ParseError::new(
            ParseErrorKind::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            },
            Span::DUMMY,
            0,
        )
    })?;
    parse_string(&source, interner)
}

#[cfg(test)]
mod tests;
