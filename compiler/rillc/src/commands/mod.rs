//! Command handlers for the `rill` binary.
//!
//! Each handler returns the process exit status instead of exiting, so
//! the binary decides when to stop and tests can call them directly.

mod check;
mod repl;
mod run;

pub use check::check_file;
pub use repl::{repl, run_repl};
pub use run::run_file;
pub use test::{discover_scripts, run_dir, run_script, run_tests, ScriptOutcome, TestSummary};

use std::path::Path;

/// Read a script, reporting failure on standard error.
pub(crate) fn read_source(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(err) => {
            eprintln!("error: cannot read \"{}\": {err}", path.display());
            None
        }
    }
}
