//! Rill Runtime - compiler, value model and interpreter for Rill scripts.
//!
//! A [`Runtime`] compiles source text into bytecode [`Routine`]s and runs
//! them on an operand stack. Functions are sets of overloads resolved at
//! call time from the classes of the arguments (multiple dispatch).
//!
//! # Architecture
//!
//! - `compiler`: AST to bytecode, with locals, upvalues and constant pools
//! - `function`: closures, overloaded functions and dispatch
//! - `class`: the class registry and its inheritance distances
//! - `value`: [`Variant`], boxed objects and alias cells
//! - `interpreter`: the instruction loop and the host API
//! - `collector`: reclaims reference cycles between collectable objects
//!
//! # Embedding
//!
//! ```
//! use rill_runtime::{Runtime, Variant};
//!
//! let mut rt = Runtime::new();
//! let result = rt.do_string("return 2 + 3 * 4").unwrap();
//! assert!(matches!(result, Variant::Integer(14)));
//! ```

mod bytecode;
pub mod class;
mod collector;
pub mod compiler;
pub mod config;
pub mod error;
pub mod function;
mod interpreter;
pub mod print_handler;
pub mod value;

pub use bytecode::{Code, Index, Opcode};
pub use class::{Accessor, Capability, Class, ClassRegistry};
pub use collector::{CollectStats, Collector};
pub use config::RuntimeConfig;
pub use error::{Backtrace, Category, Error, Result, TraceFrame};
pub use function::{Closure, Function, NativeCallback, RefFlags, Routine, Signature};
pub use interpreter::Runtime;
pub use print_handler::{buffer_handler, silent_handler, stdout_handler, PrintHandler, SharedPrintHandler};
pub use value::{Alias, Array, Handle, HashKey, NativeData, Object, ObjectData, ScriptModule, Set, Table, Variant};
