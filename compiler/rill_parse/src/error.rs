//! Parse error types.

use rill_ir::Span;
use rill_lexer::{LexError, LexErrorKind};
use thiserror::Error;

/// A syntax error, with the location of the offending token.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Lex(LexErrorKind),

    /// `expected "then" in "if" statement but got "do"`
    #[error("expected {expected} {context} but got {found}")]
    Expected {
        expected: String,
        context: &'static str,
        found: String,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("cannot read file \"{path}\": {message}")]
    Io { path: String, message: String },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, line: u32) -> Self {
        ParseError { kind, span, line }
    }

    /// Suggestion to display alongside the error, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match &self.kind {
            ParseErrorKind::Lex(kind) => kind.hint(),
            ParseErrorKind::Expected { expected, .. } if expected == "\"end\"" => {
                Some("every block must be closed with \"end\"")
            }
            ParseErrorKind::Expected { found, .. } if found == "\"=\"" => {
                Some("use \"==\" to compare values")
            }
            _ => None,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(ParseErrorKind::Lex(err.kind), err.span, err.line)
    }
}
