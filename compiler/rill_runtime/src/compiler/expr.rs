//! Expressions.
//!
//! Besides plain evaluation there are three ways to compile a place
//! (identifier, field or index expression):
//!
//! - [`Compiler::unique_place`] pushes a container that can be mutated in
//!   place, copying it first if it is shared;
//! - [`Compiler::reference`] pushes an alias to the place;
//! - [`Compiler::argument`] lets the callee's reference flags decide
//!   between the two at run time.

use super::stmt::count;
use super::{Compiler, RoutineBuilder, Slot};
use crate::bytecode::Opcode;
use crate::error::{Error, Result};
use rill_ir::{BinaryOp, Expr, ExprKind, FunctionDef, LogicalOp, UnaryOp, MAX_PARAMS};
use std::rc::Rc;

impl Compiler {
    pub(super) fn expression(&mut self, expr: &Expr) -> Result<()> {
        let saved = std::mem::replace(&mut self.line, expr.line);
        let result = rill_stack::ensure_sufficient_stack(|| self.expression_kind(&expr.kind));
        self.line = saved;
        result
    }

    fn expression_kind(&mut self, kind: &ExprKind) -> Result<()> {
        match kind {
            ExprKind::Null => {
                self.emit(Opcode::PushNull);
            }
            ExprKind::Nan => {
                self.emit(Opcode::PushNan);
            }
            ExprKind::Bool(b) => {
                self.emit(Opcode::PushBoolean(*b));
            }
            ExprKind::Int(value) => {
                let op = match i16::try_from(*value) {
                    Ok(small) => Opcode::PushSmallInt(small),
                    Err(_) => Opcode::PushInteger(self.integer_constant(*value)?),
                };
                self.emit(op);
            }
            ExprKind::Float(value) => {
                let index = self.float_constant(*value)?;
                self.emit(Opcode::PushFloat(index));
            }
            ExprKind::Str(text) => {
                let index = self.string_constant(text.as_rc())?;
                self.emit(Opcode::PushString(index));
            }
            ExprKind::Ident(name) => {
                let op = match self.resolve(name.as_rc())? {
                    Slot::Local(i) => Opcode::GetLocal(i),
                    Slot::Upvalue(i) => Opcode::GetUpvalue(i),
                    Slot::Global(i) => Opcode::GetGlobal(i),
                };
                self.emit(op);
            }
            ExprKind::Unary { op, operand } => {
                self.expression(operand)?;
                self.emit(match op {
                    UnaryOp::Neg => Opcode::Negate,
                    UnaryOp::Not => Opcode::Not,
                });
            }
            ExprKind::Binary { op, left, right } => {
                self.expression(left)?;
                self.expression(right)?;
                self.emit(Self::binary_opcode(*op));
            }
            ExprKind::Logical { op, left, right } => {
                self.expression(left)?;
                let jump = self.emit(match op {
                    LogicalOp::And => Opcode::JumpFalseAnd(0),
                    LogicalOp::Or => Opcode::JumpTrueOr(0),
                });
                self.expression(right)?;
                self.patch_here(jump);
            }
            ExprKind::Concat(items) => {
                for item in items {
                    self.expression(item)?;
                }
                self.emit(Opcode::Concat(count(items.len())));
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.expression(cond)?;
                let otherwise = self.emit(Opcode::JumpFalse(0));
                self.expression(then_expr)?;
                let exit = self.emit(Opcode::Jump(0));
                self.patch_here(otherwise);
                self.expression(else_expr)?;
                self.patch_here(exit);
            }
            ExprKind::Field { object, name } => {
                self.expression(object)?;
                let index = self.string_constant(name.as_rc())?;
                self.emit(Opcode::GetField(index));
            }
            ExprKind::Index { object, indices } => {
                self.expression(object)?;
                for index in indices {
                    self.expression(index)?;
                }
                self.emit(Opcode::GetIndex(count(indices.len())));
            }
            ExprKind::Call { callee, args } => self.call(callee, args, false)?,
            ExprKind::Ref(inner) => self.reference(inner)?,
            ExprKind::List(items) => {
                for item in items {
                    self.expression(item)?;
                }
                self.emit(Opcode::NewList(count(items.len())));
            }
            ExprKind::Array { items, rows, cols } => {
                for item in items {
                    self.expression(item)?;
                }
                self.emit(Opcode::NewArray {
                    rows: count(*rows),
                    cols: count(*cols),
                });
            }
            ExprKind::Table(entries) => {
                for (key, value) in entries {
                    self.expression(key)?;
                    self.expression(value)?;
                }
                self.emit(Opcode::NewTable(count(entries.len())));
            }
            ExprKind::Set(items) => {
                for item in items {
                    self.expression(item)?;
                }
                self.emit(Opcode::NewSet(count(items.len())));
            }
            ExprKind::Function(def) => self.closure(def)?,
        }
        Ok(())
    }

    pub(super) fn binary_opcode(op: BinaryOp) -> Opcode {
        match op {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Subtract,
            BinaryOp::Mul => Opcode::Multiply,
            BinaryOp::Div => Opcode::Divide,
            BinaryOp::Mod => Opcode::Modulus,
            BinaryOp::Pow => Opcode::Power,
            BinaryOp::Eq => Opcode::Equal,
            BinaryOp::NotEq => Opcode::NotEqual,
            BinaryOp::Lt => Opcode::Less,
            BinaryOp::LtEq => Opcode::LessEqual,
            BinaryOp::Gt => Opcode::Greater,
            BinaryOp::GtEq => Opcode::GreaterEqual,
            BinaryOp::Compare => Opcode::Compare,
        }
    }

    /// Push the value stored at a place, made unique so it can be mutated.
    /// Other expressions are evaluated normally.
    pub(super) fn unique_place(&mut self, expr: &Expr) -> Result<()> {
        let saved = std::mem::replace(&mut self.line, expr.line);
        let result = rill_stack::ensure_sufficient_stack(|| match &expr.kind {
            ExprKind::Ident(name) => {
                let op = match self.resolve(name.as_rc())? {
                    Slot::Local(i) => Opcode::GetUniqueLocal(i),
                    Slot::Upvalue(i) => Opcode::GetUniqueUpvalue(i),
                    Slot::Global(i) => Opcode::GetUniqueGlobal(i),
                };
                self.emit(op);
                Ok(())
            }
            ExprKind::Index { object, indices } => {
                self.unique_place(object)?;
                for index in indices {
                    self.expression(index)?;
                }
                self.emit(Opcode::GetIndexUnique(count(indices.len())));
                Ok(())
            }
            ExprKind::Field { object, name } => {
                self.unique_place(object)?;
                let index = self.string_constant(name.as_rc())?;
                self.emit(Opcode::GetFieldUnique(index));
                Ok(())
            }
            _ => self.expression(expr),
        });
        self.line = saved;
        result
    }

    /// `ref e`: an alias to a place, or a call whose result is kept as is.
    fn reference(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Ident(name) => {
                let op = match self.resolve(name.as_rc())? {
                    Slot::Local(i) => Opcode::GetLocalRef(i),
                    Slot::Upvalue(i) => Opcode::GetUpvalueRef(i),
                    Slot::Global(i) => Opcode::GetGlobalRef(i),
                };
                self.emit(op);
            }
            ExprKind::Index { object, indices } => {
                self.unique_place(object)?;
                for index in indices {
                    self.expression(index)?;
                }
                self.emit(Opcode::GetIndexRef(count(indices.len())));
            }
            ExprKind::Field { object, name } => {
                self.unique_place(object)?;
                let index = self.string_constant(name.as_rc())?;
                self.emit(Opcode::GetFieldRef(index));
            }
            ExprKind::Call { callee, args } => self.call(callee, args, true)?,
            _ => {
                return Err(self.error(Error::syntax(
                    "only variables, fields, indexed values and calls can be referenced",
                )))
            }
        }
        Ok(())
    }

    fn call(&mut self, callee: &Expr, args: &[Expr], return_ref: bool) -> Result<()> {
        self.expression(callee)?;
        self.emit(Opcode::Precall);
        for (pos, arg) in args.iter().enumerate() {
            self.argument(arg, count(pos))?;
        }
        self.emit(Opcode::Call {
            argc: count(args.len()),
            return_ref,
        });
        Ok(())
    }

    /// An argument at position `pos`; places are passed by reference when
    /// the callee asks for it.
    fn argument(&mut self, arg: &Expr, pos: u32) -> Result<()> {
        let saved = std::mem::replace(&mut self.line, arg.line);
        let result = self.argument_kind(arg, pos);
        self.line = saved;
        result
    }

    fn argument_kind(&mut self, arg: &Expr, pos: u32) -> Result<()> {
        match &arg.kind {
            ExprKind::Ident(name) => {
                let op = match self.resolve(name.as_rc())? {
                    Slot::Local(i) => Opcode::GetLocalArg(i, pos),
                    Slot::Upvalue(i) => Opcode::GetUpvalueArg(i, pos),
                    Slot::Global(i) => Opcode::GetGlobalArg(i, pos),
                };
                self.emit(op);
            }
            ExprKind::Index { object, indices } => {
                self.unique_place(object)?;
                for index in indices {
                    self.expression(index)?;
                }
                self.emit(Opcode::GetIndexArg(count(indices.len()), pos));
            }
            ExprKind::Field { object, name } => {
                self.unique_place(object)?;
                let index = self.string_constant(name.as_rc())?;
                self.emit(Opcode::GetFieldArg(index, pos));
            }
            _ => self.expression(arg)?,
        }
        Ok(())
    }

    /// Compile a function body into a child routine and emit the
    /// instruction that instantiates it.
    pub(super) fn closure(&mut self, def: &FunctionDef) -> Result<()> {
        if def.params.len() > MAX_PARAMS {
            return Err(self.error(Error::syntax(format!(
                "a function cannot have more than {MAX_PARAMS} parameters"
            ))));
        }
        let name = def
            .name
            .as_ref()
            .map_or_else(|| Rc::from("<anonymous>"), |n| Rc::clone(n.as_rc()));
        let routine = self.child_routine(name, def)?;
        let index = self.pool_index(self.builder.pools.routines.len())?;
        self.builder.pools.routines.push(Rc::new(routine));

        // Parameter classes are evaluated in the enclosing scope.
        for param in &def.params {
            match &param.ty {
                Some(ty) => self.expression(ty)?,
                None => {
                    self.emit(Opcode::PushNull);
                }
            }
        }
        self.emit(Opcode::NewClosure {
            routine: index,
            params: count(def.params.len()),
        });
        Ok(())
    }

    fn child_routine(&mut self, name: Rc<str>, def: &FunctionDef) -> Result<crate::function::Routine> {
        let parent = std::mem::replace(&mut self.builder, RoutineBuilder::new(name));
        self.enclosing.push(parent);
        let saved_line = std::mem::replace(&mut self.line, def.line);

        self.open_scope();
        let result = self.routine_body(def);
        self.close_scope();

        self.line = saved_line;
        let parent = self
            .enclosing
            .pop()
            .ok_or_else(|| Error::internal("unbalanced routine nesting"))?;
        let child = std::mem::replace(&mut self.builder, parent);
        result?;
        Ok(child.finish(Rc::clone(&self.file)))
    }

    fn routine_body(&mut self, def: &FunctionDef) -> Result<()> {
        self.emit(Opcode::NewFrame(0));
        for (pos, param) in def.params.iter().enumerate() {
            self.line = param.line;
            self.add_local(param.name.as_rc())?;
            if param.by_ref {
                self.builder.ref_flags |= 1 << pos;
            }
        }
        self.builder.param_count = def.params.len();
        self.line = def.body.line;
        self.statements(&def.body.stmts)?;
        self.emit(Opcode::PushNull);
        self.emit(Opcode::Return);
        Ok(())
    }
}
