//! Syntax tree.
//!
//! Expressions live in [`expr`], operators in [`operators`]; statements and
//! the module root are defined here. Blocks are plain statement lists: the
//! compiler decides which constructs open a lexical scope.

mod expr;
mod operators;

pub use expr::{Expr, ExprKind, FunctionDef, Param};
pub use operators::{BinaryOp, CompoundOp, LogicalOp, UnaryOp};

use crate::{Name, Span};

/// Parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub options: ModuleOptions,
    pub body: Block,
}

/// File-level `option` settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleOptions {
    /// `option debug [= true|false]`; `None` keeps the runtime's setting.
    pub debug: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub line: u32,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, line: u32) -> Self {
        Block { stmts, line }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, line: u32, span: Span) -> Self {
        Stmt { kind, line, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its effect; the value is discarded.
    Expr(Expr),
    /// `target = value` or `target op= value`.
    Assign {
        target: Expr,
        op: Option<CompoundOp>,
        value: Expr,
    },
    /// `local a, b = x, y`. `values` is empty or as long as `names`.
    Local { names: Vec<Name>, values: Vec<Expr> },
    /// `[local] function name(params) ... end`.
    Function { def: FunctionDef, local: bool },
    /// `print a, b[,]`; a trailing comma suppresses the newline.
    Print { args: Vec<Expr>, newline: bool },
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },
    While { cond: Expr, body: Block },
    /// `repeat body until cond`; `cond` sees the body's locals.
    Repeat { body: Block, cond: Expr },
    /// `for var = start to|downto end [step s] do body end`.
    For {
        var: Name,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        descending: bool,
        body: Block,
    },
    /// `foreach [key,] [ref] value in collection do body end`.
    Foreach {
        key: Option<Name>,
        value: Name,
        by_ref: bool,
        collection: Expr,
        body: Block,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Pass,
    Assert { cond: Expr, message: Option<Expr> },
    Throw(Expr),
    /// Compiled only when the runtime is in debug mode.
    Debug(Block),
    /// `do ... end`.
    Block(Block),
}

#[cfg(test)]
mod tests;
