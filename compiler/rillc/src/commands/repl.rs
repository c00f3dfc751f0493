//! The `repl` command: read, evaluate and print interactively.
//!
//! Each entry runs as its own chunk on one runtime, so globals persist
//! between entries and locals do not. An entry that stops at the end of
//! the input (an open `if`, `function`, ...) continues on the next line.
//! An entry that is a single expression has its value printed.

use crate::diagnostic::{report, write_error};
use crate::Options;
use rill_runtime::{Category, Runtime, Variant};
use std::io::{self, BufRead, Write};

const PROMPT: &str = "> ";
const CONTINUE: &str = "... ";

/// Evaluate `entry`, as an expression if it is one so its value is shown.
fn evaluate(rt: &mut Runtime, entry: &str) -> rill_runtime::Result<Variant> {
    let expression = format!("return {entry}");
    if rt.compile(&expression, "[repl]").is_ok() {
        rt.do_string_named("[repl]", &expression)
    } else {
        rt.do_string_named("[repl]", entry)
    }
}

fn needs_more_input(err: &rill_runtime::Error) -> bool {
    err.category == Category::Syntax && err.message.ends_with("end of file")
}

/// Run a session reading from `input` and writing prompts, results and
/// errors to `out`. Returns the exit status requested by `quit`, or 0 at
/// the end of the input.
pub fn repl(rt: &mut Runtime, input: impl BufRead, out: &mut impl Write) -> io::Result<i32> {
    let mut lines = input.lines();
    let mut entry = String::new();
    loop {
        write!(out, "{}", if entry.is_empty() { PROMPT } else { CONTINUE })?;
        out.flush()?;
        let Some(line) = lines.next().transpose()? else {
            writeln!(out)?;
            return Ok(0);
        };
        entry.push_str(&line);
        entry.push('\n');
        if entry.trim().is_empty() {
            entry.clear();
            continue;
        }

        match evaluate(rt, &entry) {
            Ok(Variant::Null) => {}
            Ok(value) => writeln!(out, "{value}")?,
            Err(err) if needs_more_input(&err) => continue,
            Err(err) if err.is_exit() => return Ok(err.status),
            Err(err) => write_error(out, &err, Some(&entry), false)?,
        }
        entry.clear();
    }
}

/// Interactive session on standard input and output.
pub fn run_repl(options: &Options) -> i32 {
    let mut rt = match options.runtime() {
        Ok(rt) => rt,
        Err(err) => {
            report(&err, None);
            return 1;
        }
    };
    println!("Rill {}. Type quit() or press Ctrl-D to leave.", env!("CARGO_PKG_VERSION"));
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match repl(&mut rt, stdin.lock(), &mut stdout) {
        Ok(status) => status,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}
