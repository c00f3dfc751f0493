//! Statements.

use super::{Compiler, Slot};
use crate::bytecode::Opcode;
use crate::error::{Error, Result};
use rill_ir::{Block, CompoundOp, Expr, ExprKind, FunctionDef, Name, Stmt, StmtKind};
use std::rc::Rc;

impl Compiler {
    pub(super) fn statements(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.statement(stmt)?;
        }
        Ok(())
    }

    /// Compile a block in its own scope.
    fn scoped_block(&mut self, block: &Block) -> Result<()> {
        self.open_scope();
        let result = self.statements(&block.stmts);
        self.close_scope();
        result
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<()> {
        self.line = stmt.line;
        rill_stack::ensure_sufficient_stack(|| self.statement_kind(&stmt.kind))
    }

    fn statement_kind(&mut self, kind: &StmtKind) -> Result<()> {
        match kind {
            StmtKind::Expr(expr) => {
                self.expression(expr)?;
                self.emit(Opcode::Pop);
            }
            StmtKind::Assign { target, op, value } => self.assignment(target, *op, value)?,
            StmtKind::Local { names, values } => self.local_declaration(names, values)?,
            StmtKind::Function { def, local } => self.function_declaration(def, *local)?,
            StmtKind::Print { args, newline } => {
                for arg in args {
                    self.expression(arg)?;
                }
                let n = count(args.len());
                self.emit(if *newline {
                    Opcode::PrintLine(n)
                } else {
                    Opcode::Print(n)
                });
            }
            StmtKind::If {
                branches,
                else_block,
            } => self.if_statement(branches, else_block.as_ref())?,
            StmtKind::While { cond, body } => {
                let start = self.here();
                self.expression(cond)?;
                let exit = self.emit(Opcode::JumpFalse(0));
                self.enter_loop();
                self.scoped_block(body)?;
                self.emit(Opcode::Jump(start));
                self.patch_here(exit);
                self.exit_loop(start);
            }
            StmtKind::Repeat { body, cond } => {
                let start = self.here();
                self.enter_loop();
                self.open_scope();
                let result = self.statements(&body.stmts);
                let cont = self.here();
                let result = result.and_then(|()| self.expression(cond));
                self.close_scope();
                result?;
                self.emit(Opcode::JumpFalse(start));
                self.exit_loop(cont);
            }
            StmtKind::For {
                var,
                start,
                end,
                step,
                descending,
                body,
            } => self.for_statement(var, start, end, step.as_ref(), *descending, body)?,
            StmtKind::Foreach {
                key,
                value,
                by_ref,
                collection,
                body,
            } => self.foreach_statement(key.as_ref(), value, *by_ref, collection, body)?,
            StmtKind::Return(value) => {
                match value {
                    Some(expr) => self.expression(expr)?,
                    None => {
                        self.emit(Opcode::PushNull);
                    }
                }
                self.emit(Opcode::Return);
            }
            StmtKind::Break => {
                let at = self.emit(Opcode::Jump(0));
                match self.builder.loops.last_mut() {
                    Some(ctx) => ctx.breaks.push(at),
                    None => return Err(self.error(Error::syntax("\"break\" outside of a loop"))),
                }
            }
            StmtKind::Continue => {
                let at = self.emit(Opcode::Jump(0));
                match self.builder.loops.last_mut() {
                    Some(ctx) => ctx.continues.push(at),
                    None => {
                        return Err(self.error(Error::syntax("\"continue\" outside of a loop")))
                    }
                }
            }
            StmtKind::Pass => {}
            StmtKind::Assert { cond, message } => {
                self.expression(cond)?;
                let mut n = 1;
                if let Some(message) = message {
                    self.expression(message)?;
                    n = 2;
                }
                self.emit(Opcode::Assert(n));
            }
            StmtKind::Throw(value) => {
                self.expression(value)?;
                self.emit(Opcode::Throw);
            }
            StmtKind::Debug(block) => {
                if self.debug {
                    self.scoped_block(block)?;
                }
            }
            StmtKind::Block(block) => self.scoped_block(block)?,
        }
        Ok(())
    }

    fn assignment(&mut self, target: &Expr, op: Option<CompoundOp>, value: &Expr) -> Result<()> {
        match op {
            None => self.expression(value)?,
            Some(op) => {
                self.expression(target)?;
                self.expression(value)?;
                self.emit(match op {
                    CompoundOp::Arith(op) => Self::binary_opcode(op),
                    CompoundOp::Concat => Opcode::Concat(2),
                });
            }
        }
        self.store(target)
    }

    /// Pop the value on top of the stack into `target`.
    fn store(&mut self, target: &Expr) -> Result<()> {
        match &target.kind {
            ExprKind::Ident(name) => {
                let op = match self.resolve(name.as_rc())? {
                    Slot::Local(i) => Opcode::SetLocal(i),
                    Slot::Upvalue(i) => Opcode::SetUpvalue(i),
                    Slot::Global(i) => Opcode::SetGlobal(i),
                };
                self.emit(op);
            }
            ExprKind::Index { object, indices } => {
                self.unique_place(object)?;
                for index in indices {
                    self.expression(index)?;
                }
                self.emit(Opcode::SetIndex(count(indices.len())));
            }
            ExprKind::Field { object, name } => {
                self.unique_place(object)?;
                let index = self.string_constant(name.as_rc())?;
                self.emit(Opcode::SetField(index));
            }
            _ => return Err(self.error(Error::syntax("cannot assign to this expression"))),
        }
        Ok(())
    }

    fn local_declaration(&mut self, names: &[Name], values: &[Expr]) -> Result<()> {
        if values.is_empty() {
            for name in names {
                self.emit(Opcode::PushNull);
                let index = self.add_local(name.as_rc())?;
                self.emit(Opcode::DefineLocal(index));
            }
            return Ok(());
        }
        if values.len() != names.len() {
            return Err(self.error(Error::syntax(format!(
                "invalid declaration: {} name(s) but {} value(s)",
                names.len(),
                values.len()
            ))));
        }
        // Values are evaluated before the names come into scope.
        for value in values {
            self.expression(value)?;
        }
        let mut slots = Vec::with_capacity(names.len());
        for name in names {
            slots.push(self.add_local(name.as_rc())?);
        }
        for index in slots.into_iter().rev() {
            self.emit(Opcode::DefineLocal(index));
        }
        Ok(())
    }

    fn function_declaration(&mut self, def: &FunctionDef, local: bool) -> Result<()> {
        let Some(name) = &def.name else {
            return Err(self.error(Error::syntax("function declaration without a name")));
        };
        let name = name.as_rc();
        if local || self.scope_depth() > 1 {
            // Declared before the body so the function can call itself.
            let index = match self.local_in_scope(name) {
                Some(index) => index,
                None => {
                    self.emit(Opcode::PushNull);
                    let index = self.add_local(name)?;
                    self.emit(Opcode::DefineLocal(index));
                    index
                }
            };
            self.closure(def)?;
            self.emit(Opcode::DefineLocalFunction(index));
        } else {
            self.closure(def)?;
            let index = self.string_constant(name)?;
            self.emit(Opcode::DefineGlobalFunction(index));
        }
        Ok(())
    }

    fn if_statement(&mut self, branches: &[(Expr, Block)], else_block: Option<&Block>) -> Result<()> {
        let mut exits = Vec::with_capacity(branches.len());
        for (cond, block) in branches {
            self.line = cond.line;
            self.expression(cond)?;
            let next = self.emit(Opcode::JumpFalse(0));
            self.scoped_block(block)?;
            exits.push(self.emit(Opcode::Jump(0)));
            self.patch_here(next);
        }
        if let Some(block) = else_block {
            self.scoped_block(block)?;
        }
        for at in exits {
            self.patch_here(at);
        }
        Ok(())
    }

    fn for_statement(
        &mut self,
        var: &Name,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        descending: bool,
        body: &Block,
    ) -> Result<()> {
        let line = self.line;
        self.open_scope();
        let result = self.for_loop(var, start, end, step, descending, body, line);
        self.close_scope();
        result
    }

    #[allow(clippy::too_many_arguments, reason = "one parameter per loop part")]
    fn for_loop(
        &mut self,
        var: &Name,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        descending: bool,
        body: &Block,
        line: u32,
    ) -> Result<()> {
        self.expression(start)?;
        let counter = self.add_local(var.as_rc())?;
        self.emit(Opcode::DefineLocal(counter));
        self.expression(end)?;
        let limit = self.add_local(&Rc::from("$end"))?;
        self.emit(Opcode::DefineLocal(limit));
        let step_slot = match step {
            Some(step) => {
                self.expression(step)?;
                let slot = self.add_local(&Rc::from("$step"))?;
                self.emit(Opcode::DefineLocal(slot));
                Some(slot)
            }
            None => None,
        };

        let top = self.here();
        self.emit(Opcode::GetLocal(counter));
        self.emit(Opcode::GetLocal(limit));
        self.emit(if descending {
            Opcode::Less
        } else {
            Opcode::Greater
        });
        let exit = self.emit(Opcode::JumpTrue(0));

        self.enter_loop();
        self.scoped_block(body)?;
        self.line = line;
        let cont = self.here();
        match step_slot {
            Some(slot) => {
                self.emit(Opcode::GetLocal(counter));
                self.emit(Opcode::GetLocal(slot));
                self.emit(if descending {
                    Opcode::Subtract
                } else {
                    Opcode::Add
                });
                self.emit(Opcode::SetLocal(counter));
            }
            None => {
                self.emit(if descending {
                    Opcode::DecrementLocal(counter)
                } else {
                    Opcode::IncrementLocal(counter)
                });
            }
        }
        self.emit(Opcode::Jump(top));
        self.patch_here(exit);
        self.exit_loop(cont);
        Ok(())
    }

    fn foreach_statement(
        &mut self,
        key: Option<&Name>,
        value: &Name,
        by_ref: bool,
        collection: &Expr,
        body: &Block,
    ) -> Result<()> {
        let line = self.line;
        self.open_scope();
        let result = self.foreach_loop(key, value, by_ref, collection, body, line);
        self.close_scope();
        result
    }

    fn foreach_loop(
        &mut self,
        key: Option<&Name>,
        value: &Name,
        by_ref: bool,
        collection: &Expr,
        body: &Block,
        line: u32,
    ) -> Result<()> {
        if by_ref && collection.is_place() {
            self.unique_place(collection)?;
        } else {
            self.expression(collection)?;
        }
        self.emit(Opcode::NewIterator(by_ref));
        let iter = self.add_local(&Rc::from("$iter"))?;
        self.emit(Opcode::DefineLocal(iter));

        let top = self.here();
        self.emit(Opcode::GetLocal(iter));
        self.emit(Opcode::TestIterator);
        let exit = self.emit(Opcode::JumpFalse(0));

        self.enter_loop();
        self.open_scope();
        let result = self.foreach_body(key, value, iter, body);
        self.close_scope();
        result?;
        self.line = line;
        self.emit(Opcode::Jump(top));
        self.patch_here(exit);
        self.exit_loop(top);
        Ok(())
    }

    fn foreach_body(&mut self, key: Option<&Name>, value: &Name, iter: u32, body: &Block) -> Result<()> {
        if let Some(key) = key {
            self.emit(Opcode::GetLocal(iter));
            self.emit(Opcode::NextKey);
            let slot = self.add_local(key.as_rc())?;
            self.emit(Opcode::DefineLocal(slot));
        }
        self.emit(Opcode::GetLocal(iter));
        self.emit(Opcode::NextValue);
        let slot = self.add_local(value.as_rc())?;
        self.emit(Opcode::DefineLocal(slot));
        self.statements(&body.stmts)
    }
}

pub(super) fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
