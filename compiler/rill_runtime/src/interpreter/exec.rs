//! The call sequence and the instruction loop.

use super::{Frame, NativeArgs, Runtime};
use crate::bytecode::Opcode;
use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::function::{is_ref, Callable, Closure, Function, Routine, Signature};
use crate::value::{Alias, Handle, Object, ObjectData, Variant};
use std::rc::Rc;

impl Runtime {
    /// Call the value `argc + 1` slots below the top. The callee and the
    /// arguments are replaced by the result, resolved unless `return_ref`.
    pub(crate) fn call_at(&mut self, argc: usize, return_ref: bool) -> Result<()> {
        let callee_slot = self
            .stack
            .len()
            .checked_sub(argc + 1)
            .ok_or_else(Error::stack_underflow)?;
        let closure = {
            let callee = self.stack[callee_slot].resolve();
            self.dispatch(&callee, &self.stack[callee_slot + 1..])?
        };

        let flags = closure.ref_flags();
        for (pos, arg) in self.stack[callee_slot + 1..].iter_mut().enumerate() {
            prepare_argument(&mut self.collector, arg, is_ref(flags, pos));
        }

        let result = match &closure.callable {
            Callable::Native(native) => {
                let mut args: NativeArgs = self.stack.drain(callee_slot + 1..).collect();
                let callback = Rc::clone(&native.callback);
                tracing::trace!(function = %native.name, "native call");
                callback(self, args.as_mut_slice())?
            }
            Callable::Routine(routine) => {
                let routine = Rc::clone(routine);
                self.call_routine(Rc::clone(&closure), routine, callee_slot)?
            }
        };
        self.stack.truncate(callee_slot);
        self.stack
            .push(if return_ref { result } else { result.into_resolved() });
        Ok(())
    }

    /// Find the overload of `callee` that accepts `args`. Calling a class
    /// calls its initializer.
    fn dispatch(&self, callee: &Variant, args: &[Variant]) -> Result<Rc<Closure>> {
        let Variant::Object(handle) = callee else {
            return Err(Error::not_callable(&callee.type_name()));
        };
        let initializer = match &*handle.data() {
            ObjectData::Function(function) => return function.find_closure(&self.classes, args),
            ObjectData::Class(class) => class.initializer().ok_or_else(|| {
                Error::type_error(format!("class {} cannot be instantiated", class.name()))
            })?,
            _ => return Err(Error::not_callable(handle.class().name())),
        };
        self.dispatch(&Variant::Object(initializer), args)
    }

    fn call_routine(&mut self, closure: Rc<Closure>, routine: Rc<Routine>, callee_slot: usize) -> Result<Variant> {
        if self.frames.len() >= self.config().call_depth {
            return Err(Error::stack_overflow());
        }
        tracing::trace!(function = %routine.name, depth = self.frames.len(), "frame push");
        self.frames.push(Frame {
            closure,
            routine,
            base: callee_slot + 1,
            ip: 0,
        });
        let result = rill_stack::ensure_sufficient_stack(|| self.execute())?;
        self.frames.pop();
        tracing::trace!(depth = self.frames.len(), "frame pop");
        Ok(result)
    }

    /// Run the innermost frame until it returns.
    fn execute(&mut self) -> Result<Variant> {
        self.maybe_collect();
        self.run().map_err(|err| self.annotate(err))
    }

    /// Attach the position of the innermost frame to an error raised in it.
    fn annotate(&self, mut err: Error) -> Error {
        if err.line.is_some() {
            return err;
        }
        if let Some(frame) = self.frames.last() {
            err = err
                .with_line(frame.routine.code.line_at(frame.ip))
                .with_file(&*frame.routine.file);
            err.backtrace = Some(self.backtrace());
        }
        err
    }

    fn run(&mut self) -> Result<Variant> {
        let depth = self.frames.len();
        let (closure, routine, base) = match self.frames.last() {
            Some(frame) => (Rc::clone(&frame.closure), Rc::clone(&frame.routine), frame.base),
            None => return Err(Error::internal("no active frame")),
        };
        let frame = depth - 1;
        let ops = routine.code.ops();
        let mut ip = 0;

        loop {
            let Some(op) = ops.get(ip).copied() else {
                return Err(Error::internal("instruction pointer out of range"));
            };
            self.frames[frame].ip = ip;
            ip += 1;

            match op {
                Opcode::PushNull => self.push(Variant::Null)?,
                Opcode::PushBoolean(b) => self.push(Variant::Boolean(b))?,
                Opcode::PushSmallInt(i) => self.push(Variant::Integer(i64::from(i)))?,
                Opcode::PushInteger(k) => self.push(Variant::Integer(routine.integers[k as usize]))?,
                Opcode::PushFloat(k) => self.push(Variant::Float(routine.floats[k as usize]))?,
                Opcode::PushNan => self.push(Variant::Float(f64::NAN))?,
                Opcode::PushString(k) => {
                    self.push(Variant::String(Rc::clone(&routine.strings[k as usize])))?;
                }
                Opcode::Pop => {
                    self.pop()?;
                }
                Opcode::NewFrame(size) => {
                    let top = base + size as usize;
                    if top > self.config().stack_limit {
                        return Err(Error::stack_overflow());
                    }
                    if self.stack.len() < top {
                        self.stack.resize(top, Variant::Null);
                    }
                }

                // Locals
                Opcode::GetLocal(i) => {
                    let value = self.local(base, i)?.resolve();
                    self.push(value)?;
                }
                Opcode::SetLocal(i) => {
                    let value = self.pop()?;
                    assign(self.local(base, i)?, value);
                }
                Opcode::DefineLocal(i) => {
                    let value = self.pop()?;
                    *self.local(base, i)? = value;
                }
                Opcode::GetLocalRef(i) => {
                    let alias = self.local_alias(base, i)?;
                    self.push(Variant::Alias(alias))?;
                }
                Opcode::GetUniqueLocal(i) => {
                    let slot = base + i as usize;
                    let value = match self.stack.get_mut(slot) {
                        Some(slot) => unique_slot(&mut self.collector, slot),
                        None => return Err(Error::internal("local slot out of range")),
                    };
                    self.push(value)?;
                }
                Opcode::GetLocalArg(i, pos) => {
                    let value = if self.argument_by_ref(pos) {
                        Variant::Alias(self.local_alias(base, i)?)
                    } else {
                        self.local(base, i)?.resolve()
                    };
                    self.push(value)?;
                }
                Opcode::DefineLocalFunction(i) => {
                    let function = self.pop()?;
                    let existing = self.local(base, i)?.clone();
                    let merged = self.merge_value(&existing, function)?;
                    assign(self.local(base, i)?, merged);
                }
                Opcode::IncrementLocal(i) => {
                    let slot = self.local(base, i)?;
                    let next = super::ops::step(&slot.resolve(), 1)?;
                    assign(slot, next);
                }
                Opcode::DecrementLocal(i) => {
                    let slot = self.local(base, i)?;
                    let next = super::ops::step(&slot.resolve(), -1)?;
                    assign(slot, next);
                }

                // Upvalues
                Opcode::GetUpvalue(i) => {
                    let value = upvalue(&closure, i)?.get();
                    self.push(value)?;
                }
                Opcode::SetUpvalue(i) => {
                    let value = self.pop()?;
                    upvalue(&closure, i)?.set(value);
                }
                Opcode::GetUpvalueRef(i) => {
                    let alias = Rc::clone(upvalue(&closure, i)?);
                    self.push(Variant::Alias(alias))?;
                }
                Opcode::GetUniqueUpvalue(i) => {
                    let mut slot = Variant::Alias(Rc::clone(upvalue(&closure, i)?));
                    let value = unique_slot(&mut self.collector, &mut slot);
                    self.push(value)?;
                }
                Opcode::GetUpvalueArg(i, pos) => {
                    let alias = upvalue(&closure, i)?;
                    let value = if self.argument_by_ref(pos) {
                        Variant::Alias(Rc::clone(alias))
                    } else {
                        alias.get()
                    };
                    self.push(value)?;
                }

                // Globals
                Opcode::GetGlobal(k) => {
                    let value = self.global(&routine.strings[k as usize])?.resolve();
                    self.push(value)?;
                }
                Opcode::SetGlobal(k) => {
                    let value = self.pop()?;
                    let name = &routine.strings[k as usize];
                    match self.globals.get_mut(name) {
                        Some(slot) => assign(slot, value),
                        None => {
                            self.globals.insert(Rc::clone(name), value);
                        }
                    }
                }
                Opcode::GetGlobalRef(k) => {
                    let alias = self.global_alias(&routine.strings[k as usize])?;
                    self.push(Variant::Alias(alias))?;
                }
                Opcode::GetUniqueGlobal(k) => {
                    let name = &routine.strings[k as usize];
                    let value = match self.globals.get_mut(name) {
                        Some(slot) => unique_slot(&mut self.collector, slot),
                        None => return Err(Error::undefined_identifier(name)),
                    };
                    self.push(value)?;
                }
                Opcode::GetGlobalArg(k, pos) => {
                    let name = &routine.strings[k as usize];
                    let value = if self.argument_by_ref(pos) {
                        Variant::Alias(self.global_alias(name)?)
                    } else {
                        self.global(name)?.resolve()
                    };
                    self.push(value)?;
                }
                Opcode::DefineGlobalFunction(k) => {
                    let function = self.pop()?;
                    let name = &routine.strings[k as usize];
                    let existing = self.globals.get(name).cloned().unwrap_or_default();
                    let merged = self.merge_value(&existing, function)?;
                    match self.globals.get_mut(name) {
                        Some(slot) => assign(slot, merged),
                        None => {
                            self.globals.insert(Rc::clone(name), merged);
                        }
                    }
                }

                // Indexing and fields
                Opcode::GetIndex(n) => {
                    let indices = self.pop_values(n as usize)?;
                    let container = self.pop()?;
                    let value = self.get_index(&container, &indices)?;
                    self.push(value)?;
                }
                Opcode::GetIndexRef(n) => {
                    let indices = self.pop_values(n as usize)?;
                    let container = self.pop()?;
                    let alias = self.index_alias(&container, &indices)?;
                    self.push(Variant::Alias(alias))?;
                }
                Opcode::GetIndexUnique(n) => {
                    let indices = self.pop_values(n as usize)?;
                    let container = self.pop()?;
                    let value = self.unique_index(&container, &indices)?;
                    self.push(value)?;
                }
                Opcode::GetIndexArg(n, pos) => {
                    let indices = self.pop_values(n as usize)?;
                    let container = self.pop()?;
                    let value = if self.argument_by_ref(pos) {
                        Variant::Alias(self.index_alias(&container, &indices)?)
                    } else {
                        self.get_index(&container, &indices)?
                    };
                    self.push(value)?;
                }
                Opcode::SetIndex(n) => {
                    let indices = self.pop_values(n as usize)?;
                    let container = self.pop()?;
                    let value = self.pop()?;
                    self.set_index(&container, &indices, value)?;
                }
                Opcode::GetField(k) => {
                    let object = self.pop()?;
                    let value = self.get_field(&object, &routine.strings[k as usize])?;
                    self.push(value)?;
                }
                Opcode::GetFieldRef(k) => {
                    let object = self.pop()?;
                    let alias = self.field_alias(&object, &routine.strings[k as usize])?;
                    self.push(Variant::Alias(alias))?;
                }
                Opcode::GetFieldUnique(k) => {
                    let object = self.pop()?;
                    let value = self.unique_field(&object, &routine.strings[k as usize])?;
                    self.push(value)?;
                }
                Opcode::GetFieldArg(k, pos) => {
                    let object = self.pop()?;
                    let name = &routine.strings[k as usize];
                    let value = if self.argument_by_ref(pos) {
                        Variant::Alias(self.field_alias(&object, name)?)
                    } else {
                        self.get_field(&object, name)?
                    };
                    self.push(value)?;
                }
                Opcode::SetField(k) => {
                    let object = self.pop()?;
                    let value = self.pop()?;
                    self.set_field(&object, &routine.strings[k as usize], value)?;
                }

                // Operators
                Opcode::Add
                | Opcode::Subtract
                | Opcode::Multiply
                | Opcode::Divide
                | Opcode::Modulus
                | Opcode::Power
                | Opcode::Equal
                | Opcode::NotEqual
                | Opcode::Less
                | Opcode::LessEqual
                | Opcode::Greater
                | Opcode::GreaterEqual
                | Opcode::Compare => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    let value = super::ops::binary(op, &left.resolve(), &right.resolve())?;
                    self.push(value)?;
                }
                Opcode::Negate => {
                    let value = self.pop()?;
                    self.push(super::ops::negate(&value.resolve())?)?;
                }
                Opcode::Not => {
                    let value = self.pop()?;
                    self.push(Variant::Boolean(!value.is_truthy()))?;
                }
                Opcode::Concat(n) => {
                    let values = self.pop_values(n as usize)?;
                    let text: String = values.iter().map(ToString::to_string).collect();
                    self.push(Variant::from(text))?;
                }

                // Control flow
                Opcode::Jump(target) => ip = target as usize,
                Opcode::JumpFalse(target) => {
                    if !self.pop()?.is_truthy() {
                        ip = target as usize;
                    }
                }
                Opcode::JumpTrue(target) => {
                    if self.pop()?.is_truthy() {
                        ip = target as usize;
                    }
                }
                Opcode::JumpFalseAnd(target) => {
                    if self.peek(0)?.is_truthy() {
                        self.pop()?;
                    } else {
                        ip = target as usize;
                    }
                }
                Opcode::JumpTrueOr(target) => {
                    if self.peek(0)?.is_truthy() {
                        ip = target as usize;
                    } else {
                        self.pop()?;
                    }
                }

                // Calls
                Opcode::Precall => {
                    let flags = callee_ref_flags(self.peek(0)?);
                    self.precall.push(flags);
                }
                Opcode::Call { argc, return_ref } => {
                    self.precall.pop();
                    self.call_at(argc as usize, return_ref)?;
                }
                Opcode::Return => return self.pop(),
                Opcode::NewClosure { routine: k, params } => {
                    let child = Rc::clone(&routine.routines[k as usize]);
                    let value = self.new_closure(&closure, base, child, params as usize)?;
                    self.push(value)?;
                }

                // Constructors
                Opcode::NewList(n) => {
                    let items = self.pop_values(n as usize)?;
                    let list = self.new_list(items.into_iter().map(Variant::into_resolved).collect());
                    self.push(list)?;
                }
                Opcode::NewTable(n) => {
                    let values = self.pop_values(2 * n as usize)?;
                    let table = self.build_table(values)?;
                    self.push(table)?;
                }
                Opcode::NewSet(n) => {
                    let values = self.pop_values(n as usize)?;
                    let set = self.build_set(&values)?;
                    self.push(set)?;
                }
                Opcode::NewArray { rows, cols } => {
                    let values = self.pop_values(rows as usize * cols as usize)?;
                    let array = self.build_array(rows as usize, cols as usize, &values)?;
                    self.push(array)?;
                }

                // Iteration
                Opcode::NewIterator(by_ref) => {
                    let collection = self.pop()?;
                    let iterator = self.new_iterator(&collection, by_ref)?;
                    self.push(iterator)?;
                }
                Opcode::TestIterator => {
                    let iterator = self.pop()?;
                    let more = super::iter::has_next(&iterator)?;
                    self.push(Variant::Boolean(more))?;
                }
                Opcode::NextKey => {
                    let iterator = self.pop()?;
                    let key = super::iter::current_key(&iterator)?;
                    self.push(key)?;
                }
                Opcode::NextValue => {
                    let iterator = self.pop()?;
                    let value = self.next_value(&iterator)?;
                    self.push(value)?;
                }

                // Statements
                Opcode::Print(n) | Opcode::PrintLine(n) => {
                    let values = self.pop_values(n as usize)?;
                    let text = values
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    if matches!(op, Opcode::PrintLine(_)) {
                        self.print_handler().println(&text);
                    } else {
                        self.print_handler().print(&text);
                    }
                }
                Opcode::Assert(n) => {
                    let message = if n > 1 { Some(self.pop()?) } else { None };
                    let cond = self.pop()?;
                    if !cond.is_truthy() {
                        let message = message.map_or_else(|| "assertion failed".to_string(), |m| m.to_string());
                        return Err(Error::assertion(message));
                    }
                }
                Opcode::Throw => {
                    let value = self.pop()?;
                    return Err(Error::user(value.to_string()));
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn local(&mut self, base: usize, index: u32) -> Result<&mut Variant> {
        self.stack
            .get_mut(base + index as usize)
            .ok_or_else(|| Error::internal("local slot out of range"))
    }

    /// Turn a local slot into an alias cell, or return the one it holds.
    fn local_alias(&mut self, base: usize, index: u32) -> Result<Rc<Alias>> {
        let slot = self
            .stack
            .get_mut(base + index as usize)
            .ok_or_else(|| Error::internal("local slot out of range"))?;
        Ok(alias_slot(&mut self.collector, slot))
    }

    fn global(&self, name: &str) -> Result<&Variant> {
        self.globals
            .get(name)
            .ok_or_else(|| Error::undefined_identifier(name))
    }

    fn global_alias(&mut self, name: &str) -> Result<Rc<Alias>> {
        match self.globals.get_mut(name) {
            Some(slot) => Ok(alias_slot(&mut self.collector, slot)),
            None => Err(Error::undefined_identifier(name)),
        }
    }

    /// Whether the callee being prepared takes argument `pos` by reference.
    fn argument_by_ref(&self, pos: u32) -> bool {
        self.precall
            .last()
            .is_some_and(|&flags| is_ref(flags, pos as usize))
    }

    /// Pop the top `n` values, in push order.
    pub(crate) fn pop_values(&mut self, n: usize) -> Result<Vec<Variant>> {
        let at = self
            .stack
            .len()
            .checked_sub(n)
            .ok_or_else(Error::stack_underflow)?;
        Ok(self.stack.split_off(at))
    }

    /// Store a declared function: an overload of the function already in the
    /// slot, or the new function itself.
    fn merge_value(&mut self, existing: &Variant, function: Variant) -> Result<Variant> {
        match function {
            Variant::Object(handle) => Ok(Variant::Object(self.merge_function(existing, handle)?)),
            other => Ok(other),
        }
    }

    /// Instantiate a nested routine. The parameter classes are on the stack.
    fn new_closure(
        &mut self,
        enclosing: &Rc<Closure>,
        base: usize,
        routine: Rc<Routine>,
        params: usize,
    ) -> Result<Variant> {
        let classes = self.pop_values(params)?;
        let mut signature = Signature::new();
        for class in &classes {
            signature.push(self.parameter_class(class)?);
        }
        let signature = routine.seal(signature)?.clone();

        let mut upvalues = Vec::with_capacity(routine.upvalues.len());
        for info in &routine.upvalues {
            let alias = if info.is_local {
                self.local_alias(base, info.index)?
            } else {
                Rc::clone(upvalue(enclosing, info.index)?)
            };
            upvalues.push(alias);
        }

        let name = Rc::clone(&routine.name);
        let closure = Rc::new(Closure::new(Callable::Routine(routine), signature, upvalues));
        let function = Function::with_closure(name, closure)?;
        Ok(Variant::Object(self.new_function(function)))
    }

    fn parameter_class(&self, value: &Variant) -> Result<Rc<crate::class::Class>> {
        if value.is_null() {
            return Ok(Rc::clone(&self.classes.object));
        }
        value
            .with_data(|data| match data {
                ObjectData::Class(class) => Some(Rc::clone(class)),
                _ => None,
            })
            .ok_or_else(|| Error::expected_type("Class", &value.type_name()))
    }
}

fn upvalue(closure: &Closure, index: u32) -> Result<&Rc<Alias>> {
    closure
        .upvalues
        .get(index as usize)
        .ok_or_else(|| Error::internal("upvalue out of range"))
}

/// Reference flags of a callee that is about to receive its arguments.
fn callee_ref_flags(callee: &Variant) -> u64 {
    callee
        .with_data(|data| match data {
            ObjectData::Function(function) => Some(function.ref_flags()),
            ObjectData::Class(class) => class.initializer().and_then(|init| {
                let data = init.data();
                match &*data {
                    ObjectData::Function(function) => Some(function.ref_flags()),
                    _ => None,
                }
            }),
            _ => None,
        })
        .unwrap_or(0)
}

/// Wrap a value passed at a reference position in a fresh alias, and
/// resolve an alias passed at a value position.
fn prepare_argument(collector: &mut Collector, arg: &mut Variant, by_ref: bool) {
    if by_ref && !arg.is_alias() {
        let alias = Rc::new(Alias::new(std::mem::take(arg)));
        collector.track_alias(&alias);
        *arg = Variant::Alias(alias);
    } else if !by_ref && arg.is_alias() {
        *arg = arg.resolve();
    }
}

/// Store `value` in a variable. A plain value is written through an alias
/// the variable holds; an alias rebinds the variable.
pub(crate) fn assign(slot: &mut Variant, value: Variant) {
    match slot {
        Variant::Alias(alias) if !value.is_alias() => alias.set(value),
        _ => *slot = value,
    }
}

/// The alias stored in `slot`, creating it from the slot's value first.
pub(crate) fn alias_slot(collector: &mut Collector, slot: &mut Variant) -> Rc<Alias> {
    if let Variant::Alias(alias) = slot {
        return Rc::clone(alias);
    }
    let alias = Rc::new(Alias::new(std::mem::take(slot)));
    collector.track_alias(&alias);
    *slot = Variant::Alias(Rc::clone(&alias));
    alias
}

/// The value of `slot` with any shared container replaced by a private
/// copy, written back into the slot (or the alias it holds).
pub(crate) fn unique_slot(collector: &mut Collector, slot: &mut Variant) -> Variant {
    if let Variant::Alias(alias) = slot {
        let alias = Rc::clone(alias);
        let mut value = alias.take();
        let unique = unique_value(collector, &mut value);
        alias.set(value);
        return unique;
    }
    unique_value(collector, slot)
}

fn unique_value(collector: &mut Collector, slot: &mut Variant) -> Variant {
    if let Variant::Object(handle) = slot {
        if Rc::strong_count(handle) > 1 && handle.is_container() {
            let copy = copy_container(collector, handle);
            *slot = Variant::Object(copy);
        }
    }
    slot.clone()
}

/// A shallow copy of a container. Aliases stored as elements are resolved,
/// so the copy shares no storage cell with the original.
fn copy_container(collector: &mut Collector, handle: &Handle) -> Handle {
    let data = match &*handle.data() {
        ObjectData::List(items) => ObjectData::List(items.iter().map(Variant::resolve).collect()),
        ObjectData::Table(table) => ObjectData::Table(
            table
                .iter()
                .map(|(key, value)| (key.clone(), value.resolve()))
                .collect(),
        ),
        ObjectData::Set(set) => ObjectData::Set(set.clone()),
        ObjectData::Array(array) => ObjectData::Array(array.clone()),
        _ => return Rc::clone(handle),
    };
    let copy = Rc::new(Object::new(Rc::clone(handle.class()), data));
    if copy.class().is_collectable() {
        collector.track_object(&copy);
    }
    tracing::trace!(class = copy.class().name(), "container copied on write");
    copy
}
