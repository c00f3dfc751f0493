//! Callables, closures and overloaded functions.
//!
//! A [`Function`] is what scripts see: a name plus every overload
//! ([`Closure`]) declared under it, kept sorted by arity. Calls pick the
//! overload whose parameter classes are closest to the argument classes,
//! see [`Function::find_closure`].

use crate::bytecode::Code;
use crate::class::{Class, ClassRegistry};
use crate::error::{Error, Result};
use crate::value::{Alias, Variant};
use crate::Runtime;
use smallvec::SmallVec;
use std::cell::OnceCell;
use std::fmt::{self, Write};
use std::rc::Rc;

/// Host function body. Arguments at reference positions arrive as
/// [`Variant::Alias`]; the others are resolved.
pub type NativeCallback = Rc<dyn Fn(&mut Runtime, &mut [Variant]) -> Result<Variant>>;

/// Parameter classes of one overload.
pub type Signature = SmallVec<[Rc<Class>; 4]>;

/// Bit `i` is set when parameter `i` is passed by reference.
pub type RefFlags = u64;

pub struct NativeRoutine {
    pub name: Rc<str>,
    pub callback: NativeCallback,
    pub signature: Signature,
    pub ref_flags: RefFlags,
}

/// A local variable slot of a routine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalInfo {
    pub name: Rc<str>,
    pub scope: u32,
    pub depth: u32,
}

/// Where a closure finds a captured variable when it is created.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UpvalueInfo {
    pub index: u32,
    /// `true`: a local slot of the enclosing frame; `false`: one of the
    /// enclosing closure's own upvalues.
    pub is_local: bool,
}

/// Compiled body of a script function or of a whole source file.
pub struct Routine {
    pub name: Rc<str>,
    pub file: Rc<str>,
    pub code: Code,
    pub integers: Vec<i64>,
    pub floats: Vec<f64>,
    pub strings: Vec<Rc<str>>,
    pub routines: Vec<Rc<Routine>>,
    pub locals: Vec<LocalInfo>,
    pub upvalues: Vec<UpvalueInfo>,
    pub param_count: usize,
    pub ref_flags: RefFlags,
    signature: OnceCell<Signature>,
}

impl Routine {
    #[allow(clippy::too_many_arguments, reason = "assembled once by the compiler")]
    pub(crate) fn new(
        name: Rc<str>,
        file: Rc<str>,
        code: Code,
        pools: ConstantPools,
        locals: Vec<LocalInfo>,
        upvalues: Vec<UpvalueInfo>,
        param_count: usize,
        ref_flags: RefFlags,
    ) -> Self {
        Routine {
            name,
            file,
            code,
            integers: pools.integers,
            floats: pools.floats,
            strings: pools.strings,
            routines: pools.routines,
            locals,
            upvalues,
            param_count,
            ref_flags,
            signature: OnceCell::new(),
        }
    }

    /// Number of local slots, parameters included.
    pub fn frame_size(&self) -> usize {
        self.locals.len()
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.get()
    }

    /// Fix the parameter classes the first time the routine is
    /// instantiated. Later instantiations must use the same classes.
    pub(crate) fn seal(&self, signature: Signature) -> Result<&Signature> {
        let sealed = self.signature.get_or_init(|| signature.clone());
        if !same_signature(sealed, &signature) {
            return Err(Error::type_error(format!(
                "the parameter types of function \"{}\" cannot change once it has been created",
                self.name
            )));
        }
        Ok(sealed)
    }
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("name", &self.name)
            .field("file", &self.file)
            .field("param_count", &self.param_count)
            .finish_non_exhaustive()
    }
}

/// Constant pools of a routine under construction.
#[derive(Default)]
pub(crate) struct ConstantPools {
    pub integers: Vec<i64>,
    pub floats: Vec<f64>,
    pub strings: Vec<Rc<str>>,
    pub routines: Vec<Rc<Routine>>,
}

#[derive(Clone)]
pub enum Callable {
    Routine(Rc<Routine>),
    Native(Rc<NativeRoutine>),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Routine(r) => &r.name,
            Callable::Native(n) => &n.name,
        }
    }

    pub fn ref_flags(&self) -> RefFlags {
        match self {
            Callable::Routine(r) => r.ref_flags,
            Callable::Native(n) => n.ref_flags,
        }
    }
}

/// One overload: a callable with its captured variables.
pub struct Closure {
    pub callable: Callable,
    pub signature: Signature,
    pub upvalues: Vec<Rc<Alias>>,
}

impl Closure {
    pub fn new(callable: Callable, signature: Signature, upvalues: Vec<Rc<Alias>>) -> Self {
        Closure {
            callable,
            signature,
            upvalues,
        }
    }

    pub fn arity(&self) -> usize {
        self.signature.len()
    }

    pub fn ref_flags(&self) -> RefFlags {
        self.callable.ref_flags()
    }

    pub fn is_ref(&self, pos: usize) -> bool {
        is_ref(self.ref_flags(), pos)
    }

    /// Sum of the distances from each argument's class to the matching
    /// parameter class; `None` when an argument does not fit.
    fn cost(&self, classes: &[Option<Rc<Class>>]) -> Option<usize> {
        self.signature
            .iter()
            .zip(classes)
            .try_fold(0usize, |acc, (param, arg)| match arg {
                None => Some(acc),
                Some(arg) => arg.get_distance(param).map(|d| acc + d),
            })
    }

    /// `name(ref Class, Class)`.
    pub fn definition(&self, name: &str) -> String {
        let mut out = format!("{name}(");
        for (i, class) in self.signature.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if self.is_ref(i) {
                out.push_str("ref ");
            }
            out.push_str(class.name());
        }
        out.push(')');
        out
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("definition", &self.definition(self.callable.name()))
            .field("upvalues", &self.upvalues.len())
            .finish()
    }
}

#[inline]
pub fn is_ref(flags: RefFlags, pos: usize) -> bool {
    pos < 64 && flags & (1 << pos) != 0
}

fn same_signature(a: &Signature, b: &Signature) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Rc::ptr_eq(x, y))
}

/// A named set of overloads.
#[derive(Clone)]
pub struct Function {
    name: Rc<str>,
    closures: Vec<Rc<Closure>>,
    ref_flags: RefFlags,
    max_argc: usize,
}

impl Function {
    pub fn new(name: Rc<str>) -> Self {
        Function {
            name,
            closures: Vec::new(),
            ref_flags: 0,
            max_argc: 0,
        }
    }

    /// Native overloads that take every argument by value. Such overloads
    /// are always consistent with each other, so building cannot fail.
    /// Signatures must be distinct.
    pub(crate) fn native_by_value(name: &str, overloads: Vec<(NativeCallback, Signature)>) -> Self {
        let name: Rc<str> = Rc::from(name);
        let mut closures: Vec<Rc<Closure>> = overloads
            .into_iter()
            .map(|(callback, signature)| {
                let routine = NativeRoutine {
                    name: Rc::clone(&name),
                    callback,
                    signature: signature.clone(),
                    ref_flags: 0,
                };
                Rc::new(Closure::new(Callable::Native(Rc::new(routine)), signature, Vec::new()))
            })
            .collect();
        closures.sort_by_key(|c| c.arity());
        let max_argc = closures.last().map_or(0, |c| c.arity());
        Function {
            name,
            closures,
            ref_flags: 0,
            max_argc,
        }
    }

    pub fn with_closure(name: Rc<str>, closure: Rc<Closure>) -> Result<Self> {
        let mut function = Function::new(name);
        function.add_closure(closure)?;
        Ok(function)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn closures(&self) -> &[Rc<Closure>] {
        &self.closures
    }

    /// Reference flags shared by every overload.
    pub fn ref_flags(&self) -> RefFlags {
        self.ref_flags
    }

    pub fn max_argc(&self) -> usize {
        self.max_argc
    }

    /// Same function with no overloads; what the collector leaves behind.
    pub(crate) fn emptied(&self) -> Function {
        Function::new(Rc::clone(&self.name))
    }

    /// Add an overload. An overload with an identical signature replaces
    /// the existing one.
    pub fn add_closure(&mut self, closure: Rc<Closure>) -> Result<()> {
        let argc = closure.arity();
        if !self.closures.is_empty() {
            let shared = argc.min(self.max_argc);
            for pos in 0..shared {
                let expected = is_ref(self.ref_flags, pos);
                if closure.is_ref(pos) != expected {
                    return Err(Error::reference_error(format!(
                        "This overload of function \"{}\" is not consistent with previous definitions: parameter {} must be passed by {}",
                        self.name,
                        pos + 1,
                        if expected { "reference" } else { "value" }
                    )));
                }
            }
        }

        if let Some(existing) = self
            .closures
            .iter_mut()
            .find(|c| same_signature(&c.signature, &closure.signature))
        {
            tracing::debug!(function = %self.name, "overload replaced");
            *existing = closure;
            return Ok(());
        }

        if self.closures.is_empty() || argc > self.max_argc {
            self.ref_flags = closure.ref_flags();
            self.max_argc = argc;
        }
        let at = self.closures.partition_point(|c| c.arity() <= argc);
        tracing::debug!(function = %self.name, arity = argc, "overload added");
        self.closures.insert(at, closure);
        Ok(())
    }

    /// Pick the overload that best fits `args`.
    ///
    /// The cost of an overload is the sum of the inheritance distances from
    /// each argument's class to the parameter's class; a `null` argument
    /// fits any class at no cost. The cheapest overload wins; a tie is an
    /// error.
    pub fn find_closure(&self, classes: &ClassRegistry, args: &[Variant]) -> Result<Rc<Closure>> {
        let arg_classes: SmallVec<[Option<Rc<Class>>; 8]> = args
            .iter()
            .map(|arg| (!arg.is_null()).then(|| classes.class_of(arg)))
            .collect();

        let mut best: Option<(usize, &Rc<Closure>)> = None;
        let mut tied = false;
        for closure in &self.closures {
            match closure.arity().cmp(&args.len()) {
                std::cmp::Ordering::Less => continue,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Equal => {}
            }
            let Some(cost) = closure.cost(&arg_classes) else {
                continue;
            };
            match best {
                Some((best_cost, _)) if cost > best_cost => {}
                Some((best_cost, _)) if cost == best_cost => tied = true,
                _ => {
                    best = Some((cost, closure));
                    tied = false;
                }
            }
        }

        match best {
            Some((cost, closure)) if !tied => {
                tracing::trace!(function = %self.name, cost, "dispatch");
                Ok(Rc::clone(closure))
            }
            Some((cost, _)) => {
                let candidates: Vec<String> = self
                    .closures
                    .iter()
                    .filter(|c| c.arity() == args.len() && c.cost(&arg_classes) == Some(cost))
                    .map(|c| c.definition(&self.name))
                    .collect();
                Err(Error::runtime(format!(
                    "Cannot resolve ambiguity in call to function '{}' with the following argument types: ({}).\nCandidates are:\n{}",
                    self.name,
                    type_list(classes, args),
                    candidates.join("\n")
                )))
            }
            None => {
                let mut message = format!(
                    "Cannot find a version of function '{}' that accepts the following argument types: ({}).",
                    self.name,
                    type_list(classes, args)
                );
                if !self.closures.is_empty() {
                    message.push_str("\nCandidates are:");
                    for closure in &self.closures {
                        let _ = write!(message, "\n{}", closure.definition(&self.name));
                    }
                }
                Err(Error::type_error(message))
            }
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("overloads", &self.closures.len())
            .finish()
    }
}

fn type_list(classes: &ClassRegistry, args: &[Variant]) -> String {
    args.iter()
        .map(|arg| classes.class_of(arg).name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests;
