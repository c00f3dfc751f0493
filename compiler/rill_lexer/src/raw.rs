//! Logos token definition.

use logos::{Lexer, Logos};

/// Failure reported by the generated tokenizer or one of its callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum RawError {
    #[default]
    InvalidCharacter,
    UnterminatedString,
    IntegerOverflow,
    InvalidFloat,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = RawError)]
#[logos(skip r"[ \t\r\x0B\x0C]+")]
#[logos(skip r"#[^\n]*")]
pub(crate) enum RawToken {
    #[token("\n")]
    Newline,

    #[regex(r"[0-9][0-9_]*", parse_int)]
    Int(u64),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*", parse_float)]
    Float(f64),

    #[token("\"", |lex| scan_string(lex, '"'))]
    #[token("'", |lex| scan_string(lex, '\''))]
    Str(String),

    #[regex(r"[\p{L}_][\p{L}\p{N}_]*\$*")]
    Ident,

    #[token("and")]
    And,
    #[token("as")]
    As,
    #[token("assert")]
    Assert,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("debug")]
    Debug,
    #[token("do")]
    Do,
    #[token("downto")]
    Downto,
    #[token("else")]
    Else,
    #[token("elsif")]
    Elsif,
    #[token("end")]
    End,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("foreach")]
    Foreach,
    #[token("function")]
    Function,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("local")]
    Local,
    #[token("nan")]
    Nan,
    #[token("not")]
    Not,
    #[token("null")]
    Null,
    #[token("option")]
    Option,
    #[token("or")]
    Or,
    #[token("pass")]
    Pass,
    #[token("print")]
    Print,
    #[token("ref")]
    Ref,
    #[token("repeat")]
    Repeat,
    #[token("return")]
    Return,
    #[token("step")]
    Step,
    #[token("then")]
    Then,
    #[token("throw")]
    Throw,
    #[token("to")]
    To,
    #[token("true")]
    True,
    #[token("until")]
    Until,
    #[token("while")]
    While,

    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("^=")]
    CaretAssign,
    #[token("%=")]
    PercentAssign,
    #[token("&=")]
    AmpAssign,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("<=>")]
    Spaceship,
    #[token("@")]
    At,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,
}

fn digits(text: &str) -> String {
    text.chars().filter(|&c| c != '_').collect()
}

fn parse_int(lex: &mut Lexer<'_, RawToken>) -> Result<u64, RawError> {
    digits(lex.slice())
        .parse()
        .map_err(|_| RawError::IntegerOverflow)
}

fn parse_float(lex: &mut Lexer<'_, RawToken>) -> Result<f64, RawError> {
    digits(lex.slice())
        .parse()
        .map_err(|_| RawError::InvalidFloat)
}

/// Scan the body of a string literal after its opening quote, cooking
/// escapes. Strings may span lines.
fn scan_string(lex: &mut Lexer<'_, RawToken>, quote: char) -> Result<String, RawError> {
    let rest = lex.remainder();
    let mut cooked = String::new();
    let mut chars = rest.char_indices();

    while let Some((offset, c)) = chars.next() {
        if c == quote {
            lex.bump(offset + c.len_utf8());
            return Ok(cooked);
        }
        if c != '\\' {
            cooked.push(c);
            continue;
        }
        let Some((_, escaped)) = chars.next() else {
            break;
        };
        match escaped {
            'n' => cooked.push('\n'),
            't' => cooked.push('\t'),
            'r' => cooked.push('\r'),
            'v' => cooked.push('\u{0B}'),
            'a' => cooked.push('\u{07}'),
            'b' => cooked.push('\u{08}'),
            'f' => cooked.push('\u{0C}'),
            '\\' | '\'' | '"' => cooked.push(escaped),
            other => {
                cooked.push('\\');
                cooked.push(other);
            }
        }
    }

    lex.bump(rest.len());
    Err(RawError::UnterminatedString)
}
