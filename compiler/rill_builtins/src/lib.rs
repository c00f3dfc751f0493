//! Rill Builtins - the library every script sees.
//!
//! The runtime itself only knows the core functions (`gc`, `load`,
//! `compile`, `read_line`, `quit`, `error`). This crate adds everything
//! else as overloaded global functions, class initializers and accessors:
//!
//! - [`generic`]: conversions and introspection (`type`, `len`, `str`, ...)
//! - [`math`]: numeric functions and constants
//! - [`string`], [`list`], [`table`], [`set`], [`array`]: container functions
//! - [`file`] and [`system`]: files, paths and directories
//! - [`json`]: `load_json` and `dump_json`
//! - [`pattern`]: the `Regex` class
//! - [`module`]: the `Module` class, a namespace whose members are fields
//!
//! Functions that modify their first argument take it by reference and
//! return `null`, so `append(xs, 1)` changes `xs` in the caller.
//!
//! ```
//! use rill_runtime::{Runtime, Variant};
//!
//! let mut rt = Runtime::new();
//! rill_builtins::register_all(&mut rt).unwrap();
//! let n = rt.do_string("local xs = [3, 1, 2]\nsort(xs)\nreturn xs[1] + len(xs)").unwrap();
//! assert!(matches!(n, Variant::Integer(4)));
//! ```

pub mod array;
pub mod file;
pub mod generic;
mod helpers;
pub mod json;
pub mod list;
pub mod math;
pub mod module;
pub mod pattern;
pub mod set;
pub mod string;
pub mod system;
pub mod table;

use rill_runtime::{Result, Runtime};

/// Register the whole library on `rt`.
#[tracing::instrument(level = "debug", skip(rt))]
pub fn register_all(rt: &mut Runtime) -> Result<()> {
    generic::register(rt)?;
    math::register(rt)?;
    string::register(rt)?;
    list::register(rt)?;
    table::register(rt)?;
    set::register(rt)?;
    array::register(rt)?;
    file::register(rt)?;
    system::register(rt)?;
    json::register(rt)?;
    pattern::register(rt)?;
    module::register(rt)?;
    Ok(())
}
