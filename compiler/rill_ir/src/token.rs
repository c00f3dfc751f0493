//! Scanner output.

use super::{Name, Span};
use std::fmt;

/// One lexeme: its kind, its byte span and the line it starts on.
#[derive(Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: u32,
}

impl Token {
    #[inline]
    pub fn new(kind: TokenKind, span: Span, line: u32) -> Self {
        Token { kind, span, line }
    }

    /// Statement separators: end of line and `;`.
    #[inline]
    pub fn is_separator(&self) -> bool {
        matches!(self.kind, TokenKind::Eol | TokenKind::Semicolon)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {} (line {})", self.kind, self.span, self.line)
    }
}

/// Token kinds.
///
/// Integer literals are unsigned; the parser folds a leading minus sign.
/// Float literals keep their bits so the enum stays comparable.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TokenKind {
    Int(u64),
    Float(u64),
    Str(Name),
    Ident(Name),

    // Keywords
    And,
    As,
    Assert,
    Break,
    Continue,
    Debug,
    Do,
    Downto,
    Else,
    Elsif,
    End,
    False,
    For,
    Foreach,
    Function,
    If,
    In,
    Local,
    Nan,
    Not,
    Null,
    Option,
    Or,
    Pass,
    Print,
    Ref,
    Repeat,
    Return,
    Step,
    Then,
    Throw,
    To,
    True,
    Until,
    While,

    // Assignment
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    CaretAssign,
    PercentAssign,
    AmpAssign,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Amp,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Spaceship,
    At,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,

    /// End of line.
    Eol,
    /// End of text.
    Eof,
}

impl TokenKind {
    /// Construct a float token from its value.
    #[inline]
    pub fn float(value: f64) -> Self {
        TokenKind::Float(value.to_bits())
    }

    /// Value of a float token.
    #[inline]
    pub fn float_value(&self) -> Option<f64> {
        match self {
            TokenKind::Float(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    /// Human-readable description used in "expected X but got Y" errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Int(n) => format!("integer {n}"),
            TokenKind::Float(bits) => format!("float {}", f64::from_bits(*bits)),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Ident(name) => format!("identifier \"{name}\""),
            TokenKind::Eol => "end of line".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            other => format!("\"{}\"", other.spelling()),
        }
    }

    /// Source spelling of fixed tokens; empty for literals and identifiers.
    pub fn spelling(&self) -> &'static str {
        match self {
            TokenKind::And => "and",
            TokenKind::As => "as",
            TokenKind::Assert => "assert",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Debug => "debug",
            TokenKind::Do => "do",
            TokenKind::Downto => "downto",
            TokenKind::Else => "else",
            TokenKind::Elsif => "elsif",
            TokenKind::End => "end",
            TokenKind::False => "false",
            TokenKind::For => "for",
            TokenKind::Foreach => "foreach",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::In => "in",
            TokenKind::Local => "local",
            TokenKind::Nan => "nan",
            TokenKind::Not => "not",
            TokenKind::Null => "null",
            TokenKind::Option => "option",
            TokenKind::Or => "or",
            TokenKind::Pass => "pass",
            TokenKind::Print => "print",
            TokenKind::Ref => "ref",
            TokenKind::Repeat => "repeat",
            TokenKind::Return => "return",
            TokenKind::Step => "step",
            TokenKind::Then => "then",
            TokenKind::Throw => "throw",
            TokenKind::To => "to",
            TokenKind::True => "true",
            TokenKind::Until => "until",
            TokenKind::While => "while",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::CaretAssign => "^=",
            TokenKind::PercentAssign => "%=",
            TokenKind::AmpAssign => "&=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Caret => "^",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Spaceship => "<=>",
            TokenKind::At => "@",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Ident(_)
            | TokenKind::Eol
            | TokenKind::Eof => "",
        }
    }
}
