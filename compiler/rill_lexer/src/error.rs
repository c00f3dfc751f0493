//! Scanner errors.

use rill_ir::Span;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
    pub line: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum LexErrorKind {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("integer literal is too large")]
    IntegerOverflow,
    #[error("invalid float literal")]
    InvalidFloat,
}

impl LexErrorKind {
    /// Suggestion shown under the error.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            LexErrorKind::InvalidCharacter('!') => Some("use \"not\" for logical negation"),
            LexErrorKind::UnterminatedString => Some("add the closing quote"),
            LexErrorKind::IntegerOverflow => Some("use a float literal for very large numbers"),
            LexErrorKind::InvalidCharacter(_) | LexErrorKind::InvalidFloat => None,
        }
    }
}
