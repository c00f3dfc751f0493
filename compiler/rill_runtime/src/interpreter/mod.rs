//! The runtime: operand stack, call frames, globals and the host API.
//!
//! # Calls
//!
//! A call site pushes the callee, records the callee's reference flags
//! (`Precall`), pushes the arguments and executes `Call`. The callee slot
//! and the arguments are replaced by the result. Bytecode frames address
//! their locals relative to `base`, the slot of the first argument.
//!
//! # Errors
//!
//! Every failure is an [`Error`]. The innermost script frame attaches the
//! line, file and a backtrace. The host entry points ([`Runtime::call`],
//! [`Runtime::pcall`] and friends) restore the stack, the frames and the
//! precall stack before returning an error, so a runtime stays usable.

mod access;
mod intrinsics;
mod exec;
mod iter;
mod ops;

use crate::class::{Accessor, Capability, Class, ClassRegistry};
use crate::collector::Collector;
use crate::config::RuntimeConfig;
use crate::error::{Backtrace, Error, Result, TraceFrame};
use crate::function::{
    Callable, Closure, Function, NativeCallback, NativeRoutine, RefFlags, Routine, Signature,
};
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::value::{Alias, Array, Handle, NativeData, Object, ObjectData, ScriptModule, Set, Table, Variant};
use rill_ir::StringInterner;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::path::Path;
use std::rc::Rc;

/// An active bytecode call.
pub(crate) struct Frame {
    pub closure: Rc<Closure>,
    pub routine: Rc<Routine>,
    /// Stack index of local slot 0.
    pub base: usize,
    /// Instruction being executed, updated at calls.
    pub ip: usize,
}

/// One embedding context. Several runtimes may coexist; none of them is
/// `Send`.
pub struct Runtime {
    config: RuntimeConfig,
    interner: StringInterner,
    pub(crate) classes: ClassRegistry,
    pub(crate) globals: FxHashMap<Rc<str>, Variant>,
    pub(crate) stack: Vec<Variant>,
    pub(crate) frames: Vec<Frame>,
    /// Reference flags of the callees whose arguments are being evaluated.
    pub(crate) precall: Vec<RefFlags>,
    pub(crate) collector: Collector,
    print: SharedPrintHandler,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut rt = Runtime {
            config,
            interner: StringInterner::new(),
            classes: ClassRegistry::new(),
            globals: FxHashMap::default(),
            stack: Vec::with_capacity(256),
            frames: Vec::new(),
            precall: Vec::new(),
            collector: Collector::default(),
            print: stdout_handler(),
        };
        let class_objects: Vec<Handle> = rt.classes.class_objects().to_vec();
        for object in class_objects {
            if let ObjectData::Class(class) = &*object.data() {
                rt.globals
                    .insert(Rc::from(class.name()), Variant::Object(Rc::clone(&object)));
            }
        }
        intrinsics::register(&mut rt);
        rt
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn class_of(&self, value: &Variant) -> Rc<Class> {
        self.classes.class_of(value)
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print
    }

    pub fn set_print_handler(&mut self, handler: SharedPrintHandler) {
        self.print = handler;
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Parse and compile `source` without running it.
    #[tracing::instrument(level = "debug", skip(self, source))]
    pub fn compile(&self, source: &str, file: &str) -> Result<Rc<Routine>> {
        let module = rill_parse::parse_string(source, &self.interner)
            .map_err(|err| Error::from(err).with_file(file))?;
        crate::compiler::compile(&module, file, self.config.debug)
    }

    /// Compile `source` into a function that runs it.
    pub fn load_string(&mut self, filename: &str, source: &str) -> Result<Variant> {
        let routine = self.compile(source, filename)?;
        let signature = routine.seal(Signature::new())?.clone();
        let name = Rc::clone(&routine.name);
        let closure = Rc::new(Closure::new(Callable::Routine(routine), signature, Vec::new()));
        let function = Function::with_closure(name, closure)?;
        Ok(Variant::Object(self.new_function(function)))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn load_file(&mut self, path: &Path) -> Result<Variant> {
        let source = std::fs::read_to_string(path).map_err(|err| {
            Error::runtime(format!("cannot read file \"{}\": {err}", path.display()))
        })?;
        self.load_string(&path.display().to_string(), &source)
    }

    pub fn do_string(&mut self, source: &str) -> Result<Variant> {
        self.do_string_named("[string]", source)
    }

    pub fn do_string_named(&mut self, filename: &str, source: &str) -> Result<Variant> {
        let function = self.load_string(filename, source)?;
        self.run_loaded(function)
    }

    pub fn do_file(&mut self, path: &Path) -> Result<Variant> {
        let function = self.load_file(path)?;
        self.run_loaded(function)
    }

    fn run_loaded(&mut self, function: Variant) -> Result<Variant> {
        self.push(function)?;
        self.call(0)?;
        Ok(self.pop()?.into_resolved())
    }

    // -------------------------------------------------------------------------
    // Stack
    // -------------------------------------------------------------------------

    pub fn push(&mut self, value: Variant) -> Result<()> {
        if self.stack.len() >= self.config.stack_limit {
            return Err(Error::stack_overflow());
        }
        self.stack.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Variant> {
        self.stack.pop().ok_or_else(Error::stack_underflow)
    }

    /// The value `depth` slots below the top; 0 is the top.
    pub fn peek(&self, depth: usize) -> Result<&Variant> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .ok_or_else(Error::stack_underflow)
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Number of active script frames.
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    // -------------------------------------------------------------------------
    // Host calls
    // -------------------------------------------------------------------------

    /// Call the callee below the top `nargs` values. On success the callee
    /// and the arguments are replaced by the result; on error they are
    /// removed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn call(&mut self, nargs: usize) -> Result<()> {
        self.host_call(nargs, false, false)
    }

    /// Like [`Runtime::call`], but on error the error message replaces the
    /// callee and the arguments.
    pub fn pcall(&mut self, nargs: usize) -> Result<()> {
        self.host_call(nargs, false, true)
    }

    /// Call a class to build an instance.
    pub fn construct(&mut self, nargs: usize) -> Result<()> {
        self.host_call(nargs, true, false)
    }

    pub fn pconstruct(&mut self, nargs: usize) -> Result<()> {
        self.host_call(nargs, true, true)
    }

    fn host_call(&mut self, nargs: usize, construct: bool, protected: bool) -> Result<()> {
        let callee_slot = self
            .stack
            .len()
            .checked_sub(nargs + 1)
            .ok_or_else(Error::stack_underflow)?;
        let frames = self.frames.len();
        let precall = self.precall.len();

        let result = if construct && !self.is_class(&self.stack[callee_slot]) {
            Err(Error::type_error(format!(
                "cannot construct a value of type {}",
                self.stack[callee_slot].type_name()
            )))
        } else {
            self.call_at(nargs, false)
        };

        if let Err(err) = &result {
            self.stack.truncate(callee_slot);
            self.frames.truncate(frames);
            self.precall.truncate(precall);
            if protected {
                self.stack.push(Variant::from(err.headline()));
            }
        }
        result
    }

    fn is_class(&self, value: &Variant) -> bool {
        value
            .with_data(|data| matches!(data, ObjectData::Class(_)).then_some(()))
            .is_some()
    }

    /// Call `callee` with `args` and return the result. For natives that
    /// call back into scripts.
    pub fn call_value(&mut self, callee: &Variant, args: &[Variant]) -> Result<Variant> {
        let depth = self.stack.len();
        self.push(callee.clone())?;
        for arg in args {
            self.push(arg.clone())?;
        }
        match self.call(args.len()) {
            Ok(()) => self.pop(),
            Err(err) => {
                self.stack.truncate(depth);
                Err(err)
            }
        }
    }

    /// Render the active script frames, innermost first.
    pub fn get_stack_trace(&self) -> String {
        self.backtrace().to_string()
    }

    pub(crate) fn backtrace(&self) -> Backtrace {
        Backtrace::new(
            self.frames
                .iter()
                .rev()
                .map(|frame| TraceFrame {
                    name: frame.routine.name.to_string(),
                    file: frame.routine.file.to_string(),
                    line: frame.routine.code.line_at(frame.ip),
                })
                .collect(),
        )
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Create a class and bind it to a global of the same name.
    pub fn create_class(&mut self, name: &str, parent: &Rc<Class>, capability: Capability) -> Rc<Class> {
        let (class, object) = self.classes.create(name, parent, capability);
        self.globals.insert(Rc::from(name), Variant::Object(object));
        tracing::debug!(class = name, parent = parent.name(), "class created");
        class
    }

    fn native_function(
        &mut self,
        name: &str,
        callback: NativeCallback,
        signature: &[Rc<Class>],
        ref_flags: RefFlags,
    ) -> Result<Function> {
        let signature: Signature = signature.iter().cloned().collect();
        let name: Rc<str> = Rc::from(name);
        let routine = NativeRoutine {
            name: Rc::clone(&name),
            callback,
            signature: signature.clone(),
            ref_flags,
        };
        let closure = Closure::new(Callable::Native(Rc::new(routine)), signature, Vec::new());
        Function::with_closure(name, Rc::new(closure))
    }

    /// Add `function` to the function stored in `existing`, or return it
    /// as is when `existing` is not a function. The stored function is
    /// never modified in place.
    pub(crate) fn merge_function(&mut self, existing: &Variant, function: Handle) -> Result<Handle> {
        let Some(mut merged) = existing.with_data(|data| match data {
            ObjectData::Function(old) => Some(old.clone()),
            _ => None,
        }) else {
            return Ok(function);
        };
        let closures = match &*function.data() {
            ObjectData::Function(new) => new.closures().to_vec(),
            _ => Vec::new(),
        };
        if closures.is_empty() {
            return Ok(function);
        }
        for closure in closures {
            merged.add_closure(closure)?;
        }
        Ok(self.new_function(merged))
    }

    /// Register a method: a function stored in the class and found through
    /// field access on its instances.
    pub fn add_method(
        &mut self,
        class: &Rc<Class>,
        name: &str,
        callback: impl Fn(&mut Runtime, &mut [Variant]) -> Result<Variant> + 'static,
        signature: &[Rc<Class>],
        ref_flags: RefFlags,
    ) -> Result<()> {
        let function = self.native_function(name, Rc::new(callback), signature, ref_flags)?;
        let handle = self.new_function(function);
        let existing = class.own_member(name).unwrap_or_default();
        let merged = self.merge_function(&existing, handle)?;
        class.set_member(Rc::from(name), Variant::Object(merged));
        Ok(())
    }

    /// Register an overload of the function called when `class` is called.
    pub fn add_initializer(
        &mut self,
        class: &Rc<Class>,
        callback: impl Fn(&mut Runtime, &mut [Variant]) -> Result<Variant> + 'static,
        signature: &[Rc<Class>],
        ref_flags: RefFlags,
    ) -> Result<()> {
        let function = self.native_function(class.name(), Rc::new(callback), signature, ref_flags)?;
        let handle = self.new_function(function);
        let existing = class.initializer().map(Variant::Object).unwrap_or_default();
        let merged = self.merge_function(&existing, handle)?;
        class.set_initializer(merged);
        Ok(())
    }

    /// Register a global function, adding an overload if the global already
    /// holds a function.
    pub fn add_global_function(
        &mut self,
        name: &str,
        callback: impl Fn(&mut Runtime, &mut [Variant]) -> Result<Variant> + 'static,
        signature: &[Rc<Class>],
        ref_flags: RefFlags,
    ) -> Result<()> {
        let function = self.native_function(name, Rc::new(callback), signature, ref_flags)?;
        let handle = self.new_function(function);
        let existing = self.globals.get(name).cloned().unwrap_or_default();
        let merged = self.merge_function(&existing, handle)?;
        self.globals.insert(Rc::from(name), Variant::Object(merged));
        Ok(())
    }

    pub fn add_global(&mut self, name: &str, value: Variant) {
        self.globals.insert(Rc::from(name), value.into_resolved());
    }

    pub fn get_global(&self, name: &str) -> Option<Variant> {
        self.globals.get(name).map(Variant::resolve)
    }

    /// Register a computed field. Assigning to a field without a setter is
    /// a reference error.
    pub fn add_accessor(
        &mut self,
        class: &Rc<Class>,
        name: &str,
        getter: impl Fn(&mut Runtime, &mut [Variant]) -> Result<Variant> + 'static,
        setter: Option<NativeCallback>,
    ) {
        class.set_accessor(
            Rc::from(name),
            Accessor {
                getter: Rc::new(getter),
                setter,
            },
        );
    }

    // -------------------------------------------------------------------------
    // Objects
    // -------------------------------------------------------------------------

    /// Box `data` as an instance of `class`, registering it with the
    /// collector when the class is collectable.
    pub fn new_object(&mut self, class: &Rc<Class>, data: ObjectData) -> Handle {
        let handle = Rc::new(Object::new(Rc::clone(class), data));
        if class.is_collectable() {
            self.collector.track_object(&handle);
        }
        handle
    }

    pub fn new_function(&mut self, function: Function) -> Handle {
        let class = Rc::clone(&self.classes.function);
        self.new_object(&class, ObjectData::Function(function))
    }

    pub fn new_module(&mut self, name: &str) -> Variant {
        let class = Rc::clone(&self.classes.module);
        Variant::Object(self.new_object(&class, ObjectData::Module(ScriptModule::new(Rc::from(name)))))
    }

    pub fn new_list(&mut self, items: Vec<Variant>) -> Variant {
        let class = Rc::clone(&self.classes.list);
        Variant::Object(self.new_object(&class, ObjectData::List(items)))
    }

    pub fn new_table(&mut self, table: Table) -> Variant {
        let class = Rc::clone(&self.classes.table);
        Variant::Object(self.new_object(&class, ObjectData::Table(table)))
    }

    pub fn new_set(&mut self, set: Set) -> Variant {
        let class = Rc::clone(&self.classes.set);
        Variant::Object(self.new_object(&class, ObjectData::Set(set)))
    }

    pub fn new_array(&mut self, array: Array) -> Variant {
        let class = Rc::clone(&self.classes.array);
        Variant::Object(self.new_object(&class, ObjectData::Array(array)))
    }

    pub fn new_native(&mut self, class: &Rc<Class>, data: Box<dyn NativeData>) -> Variant {
        Variant::Object(self.new_object(class, ObjectData::Native(data)))
    }

    /// A new alias cell holding `value`, or `value` itself if it already is
    /// an alias.
    pub fn new_alias(&mut self, value: Variant) -> Rc<Alias> {
        if let Variant::Alias(alias) = value {
            return alias;
        }
        let alias = Rc::new(Alias::new(value));
        self.collector.track_alias(&alias);
        alias
    }

    /// The container behind `value`, copied first if it is shared with
    /// another variable. When `value` is an alias the copy is stored back
    /// into it; otherwise the copy is private to the caller. Natives use
    /// this before mutating an argument.
    pub fn unique_handle(&mut self, value: &Variant) -> Option<Handle> {
        let mut slot = value.clone();
        match exec::unique_slot(&mut self.collector, &mut slot) {
            Variant::Object(handle) => Some(handle),
            _ => None,
        }
    }

    /// Run `f` on the list behind a by-reference argument, unsharing it
    /// first.
    pub fn with_list_mut<R>(
        &mut self,
        value: &Variant,
        f: impl FnOnce(&mut Vec<Variant>) -> Result<R>,
    ) -> Result<R> {
        let handle = self
            .unique_handle(value)
            .ok_or_else(|| Error::expected_type("List", &value.type_name()))?;
        let mut data = handle.data_mut();
        match &mut *data {
            ObjectData::List(items) => f(items),
            _ => Err(Error::expected_type("List", &value.type_name())),
        }
    }

    pub fn with_table_mut<R>(&mut self, value: &Variant, f: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        let handle = self
            .unique_handle(value)
            .ok_or_else(|| Error::expected_type("Table", &value.type_name()))?;
        let mut data = handle.data_mut();
        match &mut *data {
            ObjectData::Table(table) => f(table),
            _ => Err(Error::expected_type("Table", &value.type_name())),
        }
    }

    pub fn with_set_mut<R>(&mut self, value: &Variant, f: impl FnOnce(&mut Set) -> Result<R>) -> Result<R> {
        let handle = self
            .unique_handle(value)
            .ok_or_else(|| Error::expected_type("Set", &value.type_name()))?;
        let mut data = handle.data_mut();
        match &mut *data {
            ObjectData::Set(set) => f(set),
            _ => Err(Error::expected_type("Set", &value.type_name())),
        }
    }

    pub fn with_array_mut<R>(&mut self, value: &Variant, f: impl FnOnce(&mut Array) -> Result<R>) -> Result<R> {
        let handle = self
            .unique_handle(value)
            .ok_or_else(|| Error::expected_type("Array", &value.type_name()))?;
        let mut data = handle.data_mut();
        match &mut *data {
            ObjectData::Array(array) => f(array),
            _ => Err(Error::expected_type("Array", &value.type_name())),
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Break the cycles scripts may have built so counting frees them.
        self.stack.clear();
        self.frames.clear();
        self.precall.clear();
        self.globals.clear();
        self.classes.clear();
        self.collector.release_all();
    }
}

/// Arguments drained from the stack for a native call.
pub(crate) type NativeArgs = SmallVec<[Variant; 8]>;

#[cfg(test)]
mod tests;
