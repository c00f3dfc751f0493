//! Bytecode compiler.
//!
//! Turns one parsed [`Module`] into one [`Routine`]. Nested function
//! literals and declarations become child routines stored in their parent's
//! routine pool; the closure that instantiates them is created at run time
//! by [`Opcode::NewClosure`].
//!
//! # Scopes
//!
//! Scope ids and depths are shared by every routine of a compilation: the
//! module body opens depth 1 and every block opens one more. A local is
//! visible while its scope is open; lookups scan the current routine's
//! locals from the most recent one backwards. A name that is not a local is
//! searched in the enclosing routines and becomes an upvalue; otherwise it
//! is a global.

mod expr;
mod stmt;

use crate::bytecode::{Code, Index, Opcode};
use crate::error::{Error, Result};
use crate::function::{ConstantPools, LocalInfo, RefFlags, Routine, UpvalueInfo};
use rill_ir::Module;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Compile a parsed module into its top-level routine.
///
/// `debug` decides whether `debug` blocks are compiled; the module's own
/// `option debug` takes precedence.
#[tracing::instrument(level = "debug", skip(module, debug))]
pub fn compile(module: &Module, file: &str, debug: bool) -> Result<Rc<Routine>> {
    let file: Rc<str> = Rc::from(file);
    let debug = module.options.debug.unwrap_or(debug);
    let mut compiler = Compiler {
        file: Rc::clone(&file),
        debug,
        line: module.body.line,
        scopes: Vec::new(),
        next_scope: 0,
        builder: RoutineBuilder::new(Rc::from("<main>")),
        enclosing: Vec::new(),
    };
    compiler.open_scope();
    compiler.emit(Opcode::NewFrame(0));
    compiler.statements(&module.body.stmts)?;
    compiler.emit(Opcode::PushNull);
    compiler.emit(Opcode::Return);
    let routine = compiler.builder.finish(file);
    tracing::debug!(ops = routine.code.len(), "module compiled");
    Ok(Rc::new(routine))
}

/// Where a name lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slot {
    Local(Index),
    Upvalue(Index),
    Global(Index),
}

struct Local {
    info: LocalInfo,
    active: bool,
}

#[derive(Default)]
struct LoopContext {
    breaks: Vec<u32>,
    continues: Vec<u32>,
}

/// A routine under construction.
struct RoutineBuilder {
    name: Rc<str>,
    code: Code,
    pools: ConstantPools,
    integer_index: FxHashMap<i64, Index>,
    float_index: FxHashMap<u64, Index>,
    string_index: FxHashMap<Rc<str>, Index>,
    locals: Vec<Local>,
    upvalues: Vec<UpvalueInfo>,
    loops: Vec<LoopContext>,
    param_count: usize,
    ref_flags: RefFlags,
}

impl RoutineBuilder {
    fn new(name: Rc<str>) -> Self {
        RoutineBuilder {
            name,
            code: Code::new(),
            pools: ConstantPools::default(),
            integer_index: FxHashMap::default(),
            float_index: FxHashMap::default(),
            string_index: FxHashMap::default(),
            locals: Vec::new(),
            upvalues: Vec::new(),
            loops: Vec::new(),
            param_count: 0,
            ref_flags: 0,
        }
    }

    fn find_local(&self, name: &str) -> Option<Index> {
        self.locals
            .iter()
            .rposition(|l| l.active && &*l.info.name == name)
            .map(to_index)
    }

    fn add_upvalue(&mut self, index: Index, is_local: bool) -> Index {
        let info = UpvalueInfo { index, is_local };
        if let Some(pos) = self.upvalues.iter().position(|u| *u == info) {
            return to_index(pos);
        }
        self.upvalues.push(info);
        to_index(self.upvalues.len() - 1)
    }

    fn finish(mut self, file: Rc<str>) -> Routine {
        let frame = u32::try_from(self.locals.len()).unwrap_or(u32::MAX);
        self.code.patch(0, Opcode::NewFrame(frame));
        let locals = self.locals.into_iter().map(|l| l.info).collect();
        Routine::new(
            self.name,
            file,
            self.code,
            self.pools,
            locals,
            self.upvalues,
            self.param_count,
            self.ref_flags,
        )
    }
}

fn to_index(n: usize) -> Index {
    Index::try_from(n).unwrap_or(Index::MAX)
}

pub(crate) struct Compiler {
    file: Rc<str>,
    debug: bool,
    /// Line attributed to emitted instructions.
    line: u32,
    /// Open scope ids, innermost last.
    scopes: Vec<u32>,
    next_scope: u32,
    builder: RoutineBuilder,
    enclosing: Vec<RoutineBuilder>,
}

impl Compiler {
    fn emit(&mut self, op: Opcode) -> u32 {
        self.builder.code.emit(op, self.line)
    }

    fn here(&self) -> u32 {
        self.builder.code.next_index()
    }

    fn patch_here(&mut self, at: u32) {
        let target = self.here();
        self.builder.code.patch_jump(at, target);
    }

    #[cold]
    fn error(&self, err: Error) -> Error {
        err.with_line(self.line).with_file(&*self.file)
    }

    // -------------------------------------------------------------------------
    // Scopes and names
    // -------------------------------------------------------------------------

    fn scope_depth(&self) -> u32 {
        u32::try_from(self.scopes.len()).unwrap_or(u32::MAX)
    }

    fn open_scope(&mut self) {
        self.next_scope += 1;
        self.scopes.push(self.next_scope);
    }

    fn close_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for local in &mut self.builder.locals {
                if local.info.scope == scope {
                    local.active = false;
                }
            }
        }
    }

    fn current_scope(&self) -> u32 {
        self.scopes.last().copied().unwrap_or(0)
    }

    /// Declare a local in the innermost scope.
    fn add_local(&mut self, name: &Rc<str>) -> Result<Index> {
        let scope = self.current_scope();
        if self.local_in_scope(name).is_some() {
            return Err(self.error(Error::already_defined(name)));
        }
        let depth = self.scope_depth();
        self.builder.locals.push(Local {
            info: LocalInfo {
                name: Rc::clone(name),
                scope,
                depth,
            },
            active: true,
        });
        Ok(to_index(self.builder.locals.len() - 1))
    }

    fn local_in_scope(&self, name: &str) -> Option<Index> {
        let scope = self.current_scope();
        self.builder
            .locals
            .iter()
            .rposition(|l| l.active && l.info.scope == scope && &*l.info.name == name)
            .map(to_index)
    }

    fn resolve(&mut self, name: &Rc<str>) -> Result<Slot> {
        if let Some(index) = self.builder.find_local(name) {
            return Ok(Slot::Local(index));
        }
        if let Some(index) = self.resolve_upvalue(name) {
            return Ok(Slot::Upvalue(index));
        }
        Ok(Slot::Global(self.string_constant(name)?))
    }

    /// Thread a captured variable from the innermost enclosing routine that
    /// declares it down to the current routine.
    fn resolve_upvalue(&mut self, name: &str) -> Option<Index> {
        let owner = self
            .enclosing
            .iter()
            .rposition(|b| b.find_local(name).is_some())?;
        let mut index = self.enclosing[owner].find_local(name)?;
        let mut is_local = true;
        for builder in &mut self.enclosing[owner + 1..] {
            index = builder.add_upvalue(index, is_local);
            is_local = false;
        }
        Some(self.builder.add_upvalue(index, is_local))
    }

    // -------------------------------------------------------------------------
    // Constants
    // -------------------------------------------------------------------------

    fn pool_index(&self, len: usize) -> Result<Index> {
        Index::try_from(len).map_err(|_| self.error(Error::syntax("too many constants in function")))
    }

    fn integer_constant(&mut self, value: i64) -> Result<Index> {
        if let Some(&index) = self.builder.integer_index.get(&value) {
            return Ok(index);
        }
        let index = self.pool_index(self.builder.pools.integers.len())?;
        self.builder.pools.integers.push(value);
        self.builder.integer_index.insert(value, index);
        Ok(index)
    }

    fn float_constant(&mut self, value: f64) -> Result<Index> {
        let bits = value.to_bits();
        if let Some(&index) = self.builder.float_index.get(&bits) {
            return Ok(index);
        }
        let index = self.pool_index(self.builder.pools.floats.len())?;
        self.builder.pools.floats.push(value);
        self.builder.float_index.insert(bits, index);
        Ok(index)
    }

    fn string_constant(&mut self, value: &Rc<str>) -> Result<Index> {
        if let Some(&index) = self.builder.string_index.get(value) {
            return Ok(index);
        }
        let index = self.pool_index(self.builder.pools.strings.len())?;
        self.builder.pools.strings.push(Rc::clone(value));
        self.builder.string_index.insert(Rc::clone(value), index);
        Ok(index)
    }

    // -------------------------------------------------------------------------
    // Loops
    // -------------------------------------------------------------------------

    fn enter_loop(&mut self) {
        self.builder.loops.push(LoopContext::default());
    }

    /// Close the innermost loop, pointing its `continue` jumps at
    /// `continue_target` and its `break` jumps here.
    fn exit_loop(&mut self, continue_target: u32) {
        if let Some(ctx) = self.builder.loops.pop() {
            for at in ctx.continues {
                self.builder.code.patch_jump(at, continue_target);
            }
            let exit = self.here();
            for at in ctx.breaks {
                self.builder.code.patch_jump(at, exit);
            }
        }
    }
}

#[cfg(test)]
mod tests;
