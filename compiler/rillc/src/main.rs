//! Rill command line.

use rillc::commands::{check_file, run_file, run_repl, run_tests};
use rillc::{init_tracing, Options};
use std::path::Path;

fn main() {
    init_tracing();

    let mut options = Options::from_env();
    let mut verbose = false;
    let mut positional: Vec<String> = Vec::new();
    for arg in std::env::args().skip(1) {
        match options.apply_flag(&arg) {
            Ok(true) => {}
            Ok(false) if arg == "--verbose" || arg == "-v" => verbose = true,
            Ok(false) => positional.push(arg),
            Err(message) => {
                eprintln!("error: {message}");
                std::process::exit(2);
            }
        }
    }

    let Some(command) = positional.first() else {
        print_usage();
        return;
    };

    let status = match command.as_str() {
        "run" => {
            let Some(path) = positional.get(1) else {
                eprintln!("Usage: rill run <file.rill>");
                std::process::exit(2);
            };
            run_file(Path::new(path), &options)
        }
        "check" => {
            let Some(path) = positional.get(1) else {
                eprintln!("Usage: rill check <file.rill>");
                std::process::exit(2);
            };
            check_file(Path::new(path), &options)
        }
        "repl" => run_repl(&options),
        "test" => {
            let dir = positional.get(1).map_or(".", String::as_str);
            run_tests(Path::new(dir), &options, verbose)
        }
        "help" | "--help" | "-h" => {
            print_usage();
            0
        }
        "version" | "--version" | "-V" => {
            println!("rill {}", env!("CARGO_PKG_VERSION"));
            0
        }
        _ => {
            // A bare script path runs it.
            if Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("rill"))
            {
                run_file(Path::new(command), &options)
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                2
            }
        }
    };
    std::process::exit(status);
}

fn print_usage() {
    println!("Rill scripting language");
    println!();
    println!("Usage: rill <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file.rill>      Run a script");
    println!("  check <file.rill>    Compile a script without running it");
    println!("  repl                 Start an interactive session");
    println!("  test [dir]           Run every script under a directory (default: .)");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Options:");
    println!("  --debug              Compile debug blocks");
    println!("  --gc-threshold=<n>   Registrations between collections (0 disables)");
    println!("  --verbose, -v        Show the output of passing test scripts");
    println!();
    println!("Environment:");
    println!("  RILL_DEBUG, RILL_GC_THRESHOLD   Defaults for the options above");
    println!("  RUST_LOG                        Enable tracing output");
    println!("  RILL_LOG_TREE                   Print tracing spans as a tree");
}
