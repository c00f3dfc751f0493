//! Scanner for Rill source text.
//!
//! [`Lexer`] wraps a logos-generated tokenizer and yields [`Token`]s lazily:
//! nothing past the parser's lookahead is scanned, so a syntax error late in
//! a file does not cost a full tokenization. Identifiers and string literals
//! are interned as they are produced. The sequence always ends with exactly
//! one `Eof` token.
//!
//! Newlines are significant (they separate statements) and come out as
//! `Eol` tokens; other whitespace and `#` comments are skipped.

mod error;
mod raw;

pub use error::{LexError, LexErrorKind};

use logos::Logos;
use raw::{RawError, RawToken};
use rill_ir::{Span, StringInterner, Token, TokenKind};

/// Lazy token stream over one source text.
pub struct Lexer<'src, 'i> {
    inner: logos::Lexer<'src, RawToken>,
    interner: &'i StringInterner,
    line: u32,
    finished: bool,
}

impl<'src, 'i> Lexer<'src, 'i> {
    pub fn new(source: &'src str, interner: &'i StringInterner) -> Self {
        Lexer {
            inner: RawToken::lexer(source),
            interner,
            line: 1,
            finished: false,
        }
    }

    /// Line the scanner is currently on.
    pub fn line(&self) -> u32 {
        self.line
    }

    fn advance_lines(&mut self, newlines: usize) {
        self.line = self
            .line
            .saturating_add(u32::try_from(newlines).unwrap_or(u32::MAX));
    }

    fn convert(&self, raw: RawToken) -> TokenKind {
        match raw {
            RawToken::Int(n) => TokenKind::Int(n),
            RawToken::Float(x) => TokenKind::float(x),
            RawToken::Str(text) => TokenKind::Str(self.interner.intern(&text)),
            RawToken::Ident => TokenKind::Ident(self.interner.intern(self.inner.slice())),
            RawToken::Newline => TokenKind::Eol,
            RawToken::And => TokenKind::And,
            RawToken::As => TokenKind::As,
            RawToken::Assert => TokenKind::Assert,
            RawToken::Break => TokenKind::Break,
            RawToken::Continue => TokenKind::Continue,
            RawToken::Debug => TokenKind::Debug,
            RawToken::Do => TokenKind::Do,
            RawToken::Downto => TokenKind::Downto,
            RawToken::Else => TokenKind::Else,
            RawToken::Elsif => TokenKind::Elsif,
            RawToken::End => TokenKind::End,
            RawToken::False => TokenKind::False,
            RawToken::For => TokenKind::For,
            RawToken::Foreach => TokenKind::Foreach,
            RawToken::Function => TokenKind::Function,
            RawToken::If => TokenKind::If,
            RawToken::In => TokenKind::In,
            RawToken::Local => TokenKind::Local,
            RawToken::Nan => TokenKind::Nan,
            RawToken::Not => TokenKind::Not,
            RawToken::Null => TokenKind::Null,
            RawToken::Option => TokenKind::Option,
            RawToken::Or => TokenKind::Or,
            RawToken::Pass => TokenKind::Pass,
            RawToken::Print => TokenKind::Print,
            RawToken::Ref => TokenKind::Ref,
            RawToken::Repeat => TokenKind::Repeat,
            RawToken::Return => TokenKind::Return,
            RawToken::Step => TokenKind::Step,
            RawToken::Then => TokenKind::Then,
            RawToken::Throw => TokenKind::Throw,
            RawToken::To => TokenKind::To,
            RawToken::True => TokenKind::True,
            RawToken::Until => TokenKind::Until,
            RawToken::While => TokenKind::While,
            RawToken::Assign => TokenKind::Assign,
            RawToken::PlusAssign => TokenKind::PlusAssign,
            RawToken::MinusAssign => TokenKind::MinusAssign,
            RawToken::StarAssign => TokenKind::StarAssign,
            RawToken::SlashAssign => TokenKind::SlashAssign,
            RawToken::CaretAssign => TokenKind::CaretAssign,
            RawToken::PercentAssign => TokenKind::PercentAssign,
            RawToken::AmpAssign => TokenKind::AmpAssign,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Caret => TokenKind::Caret,
            RawToken::Percent => TokenKind::Percent,
            RawToken::Amp => TokenKind::Amp,
            RawToken::EqEq => TokenKind::EqEq,
            RawToken::NotEq => TokenKind::NotEq,
            RawToken::Lt => TokenKind::Lt,
            RawToken::LtEq => TokenKind::LtEq,
            RawToken::Gt => TokenKind::Gt,
            RawToken::GtEq => TokenKind::GtEq,
            RawToken::Spaceship => TokenKind::Spaceship,
            RawToken::At => TokenKind::At,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Semicolon => TokenKind::Semicolon,
        }
    }

    fn error(&self, raw: RawError, span: Span) -> LexError {
        let kind = match raw {
            RawError::InvalidCharacter => {
                let found = self.inner.slice().chars().next().unwrap_or('\u{FFFD}');
                LexErrorKind::InvalidCharacter(found)
            }
            RawError::UnterminatedString => LexErrorKind::UnterminatedString,
            RawError::IntegerOverflow => LexErrorKind::IntegerOverflow,
            RawError::InvalidFloat => LexErrorKind::InvalidFloat,
        };
        LexError {
            kind,
            span,
            line: self.line,
        }
    }
}

impl Iterator for Lexer<'_, '_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let Some(result) = self.inner.next() else {
            self.finished = true;
            let end = self.inner.span().end;
            return Some(Ok(Token::new(
                TokenKind::Eof,
                Span::from_range(end..end),
                self.line,
            )));
        };
        let span = Span::from_range(self.inner.span());
        let line = self.line;
        let item = match result {
            Ok(raw) => Ok(Token::new(self.convert(raw), span, line)),
            Err(raw) => {
                self.finished = true;
                Err(self.error(raw, span))
            }
        };
        let newlines = self.inner.slice().bytes().filter(|&b| b == b'\n').count();
        self.advance_lines(newlines);
        Some(item)
    }
}

/// Scan a whole source text eagerly.
pub fn tokenize(source: &str, interner: &StringInterner) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, interner).collect()
}
