//! Expression nodes.

use super::{BinaryOp, Block, LogicalOp, UnaryOp};
use crate::{Name, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, line: u32, span: Span) -> Self {
        Expr { kind, line, span }
    }

    /// Whether this expression names a storage location that can be
    /// assigned to or passed by reference.
    pub fn is_place(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Ident(_) | ExprKind::Field { .. } | ExprKind::Index { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Null,
    Nan,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Name),
    Ident(Name),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuit `and` / `or`.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a & b & c`, flattened.
    Concat(Vec<Expr>),
    /// `then_expr if cond else else_expr`.
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Field {
        object: Box<Expr>,
        name: Name,
    },
    Index {
        object: Box<Expr>,
        indices: Vec<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `ref e`: a reference to a place, or a call whose result is kept as
    /// a reference.
    Ref(Box<Expr>),
    List(Vec<Expr>),
    /// `@[a, b; c, d]`, stored row-major.
    Array {
        items: Vec<Expr>,
        rows: usize,
        cols: usize,
    },
    Table(Vec<(Expr, Expr)>),
    Set(Vec<Expr>),
    Function(Box<FunctionDef>),
}

/// A function declaration or literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// `None` for function literals.
    pub name: Option<Name>,
    pub params: Vec<Param>,
    pub body: Block,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Name,
    pub by_ref: bool,
    /// `as <expr>`; evaluated to a class when the closure is created.
    pub ty: Option<Expr>,
    pub line: u32,
}
