//! The `check` command: compile a script without running it.

use crate::diagnostic::report;
use crate::Options;
use std::path::Path;

use super::read_source;

/// Parse and compile `path`, reporting the first syntax error.
pub fn check_file(path: &Path, options: &Options) -> i32 {
    let Some(source) = read_source(path) else {
        return 1;
    };
    let rt = rill_runtime::Runtime::with_config(options.config());
    let name = path.display().to_string();
    match rt.compile(&source, &name) {
        Ok(routine) => {
            println!("OK: {name} ({} instructions)", routine.code.len());
            0
        }
        Err(err) => {
            report(&err, Some(&source));
            1
        }
    }
}
