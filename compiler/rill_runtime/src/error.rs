//! Runtime error type.
//!
//! Every failure in the runtime, from a syntax error in loaded source to a
//! failed dispatch deep inside a script, is an [`Error`]: a [`Category`], a
//! message, the source position when one is known, and a backtrace captured
//! when the error crossed at least one script frame.
//!
//! Factory functions are `#[cold]` so the happy path stays compact.

use rill_ir::Span;
use rill_parse::ParseError;
use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Syntax,
    Name,
    Type,
    Range,
    Index,
    Math,
    Reference,
    Assertion,
    Runtime,
    /// Raised by scripts with `throw` or `error()`.
    User,
    /// Raised by `quit()`; carries the exit status.
    Exit,
    /// Broken runtime invariants: stack underflow or overflow.
    Internal,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::Syntax => "Syntax error",
            Category::Name => "Name error",
            Category::Type => "Type error",
            Category::Range => "Range error",
            Category::Index => "Index error",
            Category::Math => "Math error",
            Category::Reference => "Reference error",
            Category::Assertion => "Assertion error",
            Category::Runtime => "Runtime error",
            Category::User => "Error",
            Category::Exit => "Exit",
            Category::Internal => "Internal error",
        }
    }
}

/// One script frame active when an error was raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceFrame {
    pub name: String,
    pub file: String,
    pub line: u32,
}

/// Script frames at the error site, innermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Backtrace {
    frames: Vec<TraceFrame>,
}

impl Backtrace {
    pub fn new(frames: Vec<TraceFrame>) -> Self {
        Backtrace { frames }
    }

    pub fn frames(&self) -> &[TraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for Backtrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.frames {
            write!(f, "\n\tat {} ({}:{})", frame.name, frame.file, frame.line)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Error {
    pub category: Category,
    pub message: String,
    pub line: Option<u32>,
    pub file: Option<String>,
    /// Byte range in the source, for syntax errors.
    pub span: Option<Span>,
    pub backtrace: Option<Backtrace>,
    /// Secondary remarks, such as a fix suggestion.
    pub notes: Vec<String>,
    /// Exit status for [`Category::Exit`].
    pub status: i32,
}

impl Error {
    pub fn new(category: Category, message: impl Into<String>) -> Self {
        Error {
            category,
            message: message.into(),
            line: None,
            file: None,
            span: None,
            backtrace: None,
            notes: Vec::new(),
            status: 0,
        }
    }

    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Errors that leave the runtime in a state scripts must not observe.
    pub fn is_fatal(&self) -> bool {
        self.category == Category::Internal
    }

    pub fn is_exit(&self) -> bool {
        self.category == Category::Exit
    }

    /// `[<Category> error] <message>`, without position or trace.
    pub fn headline(&self) -> String {
        format!("[{}] {}", self.category.label(), self.message)
    }

    // -------------------------------------------------------------------------
    // Factories
    // -------------------------------------------------------------------------

    #[cold]
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::new(Category::Syntax, message)
    }

    #[cold]
    pub fn name_error(message: impl Into<String>) -> Self {
        Error::new(Category::Name, message)
    }

    #[cold]
    pub fn type_error(message: impl Into<String>) -> Self {
        Error::new(Category::Type, message)
    }

    #[cold]
    pub fn range_error(message: impl Into<String>) -> Self {
        Error::new(Category::Range, message)
    }

    #[cold]
    pub fn index_error(message: impl Into<String>) -> Self {
        Error::new(Category::Index, message)
    }

    #[cold]
    pub fn math_error(message: impl Into<String>) -> Self {
        Error::new(Category::Math, message)
    }

    #[cold]
    pub fn reference_error(message: impl Into<String>) -> Self {
        Error::new(Category::Reference, message)
    }

    #[cold]
    pub fn assertion(message: impl Into<String>) -> Self {
        Error::new(Category::Assertion, message)
    }

    #[cold]
    pub fn runtime(message: impl Into<String>) -> Self {
        Error::new(Category::Runtime, message)
    }

    #[cold]
    pub fn user(message: impl Into<String>) -> Self {
        Error::new(Category::User, message)
    }

    #[cold]
    pub fn exit(status: i32) -> Self {
        let mut err = Error::new(Category::Exit, format!("exit status {status}"));
        err.status = status;
        err
    }

    #[cold]
    pub fn internal(message: impl Into<String>) -> Self {
        Error::new(Category::Internal, message)
    }

    #[cold]
    pub fn stack_underflow() -> Self {
        Error::internal("stack underflow")
    }

    #[cold]
    pub fn stack_overflow() -> Self {
        Error::internal("stack overflow")
    }

    #[cold]
    pub fn undefined_identifier(name: &str) -> Self {
        Error::name_error(format!("undefined identifier \"{name}\""))
    }

    #[cold]
    pub fn already_defined(name: &str) -> Self {
        Error::name_error(format!("variable \"{name}\" is already defined in this scope"))
    }

    #[cold]
    pub fn not_callable(type_name: &str) -> Self {
        Error::type_error(format!("value of type {type_name} is not callable"))
    }

    #[cold]
    pub fn invalid_operands(op: &str, left: &str, right: &str) -> Self {
        Error::type_error(format!(
            "cannot apply operator \"{op}\" to {left} and {right}"
        ))
    }

    #[cold]
    pub fn invalid_operand(op: &str, operand: &str) -> Self {
        Error::type_error(format!("cannot apply operator \"{op}\" to {operand}"))
    }

    #[cold]
    pub fn expected_type(expected: &str, found: &str) -> Self {
        Error::type_error(format!("expected a value of type {expected} but got {found}"))
    }

    #[cold]
    pub fn index_out_of_range(index: i64, len: usize) -> Self {
        Error::index_error(format!("index {index} out of range (size is {len})"))
    }

    #[cold]
    pub fn key_not_found(key: &str) -> Self {
        Error::index_error(format!("key not found: {key}"))
    }

    #[cold]
    pub fn division_by_zero() -> Self {
        Error::math_error("division by zero")
    }

    #[cold]
    pub fn integer_overflow(op: &str) -> Self {
        Error::math_error(format!("integer overflow in \"{op}\""))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category.label(), self.message)?;
        match (&self.backtrace, self.line) {
            (Some(trace), _) if !trace.is_empty() => write!(f, "{trace}"),
            (_, Some(line)) => {
                let file = self.file.as_deref().unwrap_or("[string]");
                write!(f, "\n\tat {file}:{line}")
            }
            _ => Ok(()),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        let hint = err.hint();
        let mut converted = Error::syntax(err.kind.to_string());
        if err.line > 0 {
            converted.line = Some(err.line);
            converted.span = Some(err.span);
        }
        if let Some(hint) = hint {
            converted.notes.push(hint.to_string());
        }
        converted
    }
}

#[cfg(test)]
mod tests;
