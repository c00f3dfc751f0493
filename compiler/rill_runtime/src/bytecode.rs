//! Instruction set.
//!
//! Operands are indices into the owning routine's constant pools or local
//! slots. Jump targets are absolute instruction indices.

/// Index into a constant pool, a local slot or an upvalue.
pub type Index = u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    PushNull,
    PushBoolean(bool),
    PushSmallInt(i16),
    PushInteger(Index),
    PushFloat(Index),
    PushNan,
    PushString(Index),
    Pop,
    /// Pad the frame with nulls up to this many local slots.
    NewFrame(u32),

    GetLocal(Index),
    SetLocal(Index),
    /// Start a fresh binding; never writes through an alias.
    DefineLocal(Index),
    GetLocalRef(Index),
    GetUniqueLocal(Index),
    /// Argument at position `.1`: by reference or by value depending on
    /// the callee.
    GetLocalArg(Index, u32),
    GetUpvalue(Index),
    SetUpvalue(Index),
    GetUpvalueRef(Index),
    GetUniqueUpvalue(Index),
    GetUpvalueArg(Index, u32),
    GetGlobal(Index),
    SetGlobal(Index),
    GetGlobalRef(Index),
    GetUniqueGlobal(Index),
    GetGlobalArg(Index, u32),
    /// Store a function, adding it as an overload when the slot already
    /// holds one.
    DefineLocalFunction(Index),
    DefineGlobalFunction(Index),
    IncrementLocal(Index),
    DecrementLocal(Index),

    GetIndex(u32),
    GetIndexRef(u32),
    GetIndexUnique(u32),
    GetIndexArg(u32, u32),
    /// Stack: value, container, indices.
    SetIndex(u32),
    GetField(Index),
    GetFieldRef(Index),
    GetFieldUnique(Index),
    GetFieldArg(Index, u32),
    /// Stack: value, object.
    SetField(Index),

    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Power,
    Negate,
    Not,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Compare,
    Concat(u32),

    Jump(u32),
    JumpFalse(u32),
    JumpTrue(u32),
    /// Jump and keep the value if it is false, otherwise pop it.
    JumpFalseAnd(u32),
    /// Jump and keep the value if it is true, otherwise pop it.
    JumpTrueOr(u32),

    /// Record the reference flags of the callee on top of the stack.
    Precall,
    Call { argc: u32, return_ref: bool },
    Return,
    /// Instantiate a nested routine; pops one class (or null) per parameter.
    NewClosure { routine: Index, params: u32 },

    NewList(u32),
    NewTable(u32),
    NewSet(u32),
    NewArray { rows: u32, cols: u32 },

    NewIterator(bool),
    TestIterator,
    NextKey,
    NextValue,

    Print(u32),
    PrintLine(u32),
    Assert(u32),
    Throw,
}

/// Instruction stream with a run-length line table.
#[derive(Clone, Debug, Default)]
pub struct Code {
    ops: Vec<Opcode>,
    /// `(first instruction, line)` pairs in increasing instruction order.
    lines: Vec<(u32, u32)>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[Opcode] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Index the next emitted instruction will get.
    pub fn next_index(&self) -> u32 {
        u32::try_from(self.ops.len()).unwrap_or(u32::MAX)
    }

    pub fn emit(&mut self, op: Opcode, line: u32) -> u32 {
        let at = self.next_index();
        if self.lines.last().map_or(true, |&(_, l)| l != line) {
            self.lines.push((at, line));
        }
        self.ops.push(op);
        at
    }

    /// Replace the placeholder at `at`.
    pub fn patch(&mut self, at: u32, op: Opcode) {
        if let Some(slot) = self.ops.get_mut(at as usize) {
            *slot = op;
        }
    }

    /// Point the jump at `at` to `target`.
    pub fn patch_jump(&mut self, at: u32, target: u32) {
        if let Some(slot) = self.ops.get_mut(at as usize) {
            *slot = match *slot {
                Opcode::Jump(_) => Opcode::Jump(target),
                Opcode::JumpFalse(_) => Opcode::JumpFalse(target),
                Opcode::JumpTrue(_) => Opcode::JumpTrue(target),
                Opcode::JumpFalseAnd(_) => Opcode::JumpFalseAnd(target),
                Opcode::JumpTrueOr(_) => Opcode::JumpTrueOr(target),
                other => other,
            };
        }
    }

    /// Source line of the instruction at `ip`.
    pub fn line_at(&self, ip: usize) -> u32 {
        let ip = u32::try_from(ip).unwrap_or(u32::MAX);
        let at = self.lines.partition_point(|&(start, _)| start <= ip);
        at.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map_or(0, |&(_, line)| line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_table_is_run_length() {
        let mut code = Code::new();
        code.emit(Opcode::PushNull, 1);
        code.emit(Opcode::Pop, 1);
        code.emit(Opcode::PushNull, 3);
        code.emit(Opcode::Return, 4);
        assert_eq!(code.lines.len(), 3);
        assert_eq!(code.line_at(0), 1);
        assert_eq!(code.line_at(1), 1);
        assert_eq!(code.line_at(2), 3);
        assert_eq!(code.line_at(3), 4);
        assert_eq!(code.line_at(99), 4);
    }

    #[test]
    fn jumps_are_backpatched() {
        let mut code = Code::new();
        let jump = code.emit(Opcode::JumpFalse(0), 1);
        code.emit(Opcode::PushNull, 1);
        code.patch_jump(jump, code.next_index());
        assert_eq!(code.ops()[0], Opcode::JumpFalse(2));
    }
}
