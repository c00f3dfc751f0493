//! Rill IR: the data shared between the scanner, the parser and the
//! bytecode compiler.
//!
//! - [`Span`]: byte range of a token or node in its source
//! - [`Name`] / [`StringInterner`]: deduplicated identifier and literal text
//! - [`Token`] / [`TokenKind`]: scanner output
//! - [`ast`]: the syntax tree produced by the parser
//!
//! Every AST node carries the 1-based source line it starts on. Lines are
//! what the runtime reports in errors and stack traces; spans are only used
//! to render source snippets.

pub mod ast;
mod name;
mod span;
mod token;

pub use ast::{
    BinaryOp, Block, CompoundOp, Expr, ExprKind, FunctionDef, LogicalOp, Module, ModuleOptions,
    Param, Stmt, StmtKind, UnaryOp,
};
pub use name::{Name, StringInterner};
pub use span::Span;
pub use token::{Token, TokenKind};

/// Maximum number of parameters a routine may declare.
///
/// Reference flags for a signature are stored in one `u64`.
pub const MAX_PARAMS: usize = 64;
