//! The `run` command: execute a script file.

use crate::diagnostic::{exit_status, report};
use crate::Options;
use std::path::Path;

use super::read_source;

/// Run the script at `path` on a fresh runtime.
pub fn run_file(path: &Path, options: &Options) -> i32 {
    let Some(source) = read_source(path) else {
        return 1;
    };
    let mut rt = match options.runtime() {
        Ok(rt) => rt,
        Err(err) => {
            report(&err, None);
            return 1;
        }
    };
    let name = path.display().to_string();
    let result = rt.do_string_named(&name, &source);
    if let Err(err) = &result {
        if !err.is_exit() {
            report(err, Some(&source));
        }
    }
    exit_status(&result)
}
