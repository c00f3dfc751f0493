//! Rill command line host.
//!
//! The `rill` binary is a thin argument parser over the commands in
//! [`commands`]; everything it does is available here for embedding and
//! tests.
//!
//! # Environment
//!
//! - `RILL_DEBUG`: compile `debug` blocks (any value except `0`).
//! - `RILL_GC_THRESHOLD`: registrations between automatic collections.
//! - `RUST_LOG`: enable tracing output, e.g. `RUST_LOG=rill_runtime=debug`.
//! - `RILL_LOG_TREE`: with `RUST_LOG`, print spans as an indented tree.

pub mod commands;
pub mod diagnostic;

use rill_runtime::{Runtime, RuntimeConfig};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing. Does nothing unless `RUST_LOG` is set; safe to call
/// more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var_os("RILL_LOG_TREE").is_some() {
            tracing_subscriber::registry()
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Settings shared by every command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub debug: bool,
    pub gc_threshold: Option<usize>,
}

impl Options {
    /// Options from `RILL_DEBUG` and `RILL_GC_THRESHOLD`.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Options from a variable lookup. Malformed values are ignored with a
    /// warning.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Options::default();
        if let Some(value) = lookup("RILL_DEBUG") {
            options.debug = !value.is_empty() && value != "0";
        }
        if let Some(value) = lookup("RILL_GC_THRESHOLD") {
            match value.trim().parse() {
                Ok(n) => options.gc_threshold = Some(n),
                Err(_) => eprintln!("warning: ignoring invalid RILL_GC_THRESHOLD \"{value}\""),
            }
        }
        options
    }

    /// Apply a command line flag. Returns `Ok(false)` if `arg` is not an
    /// option flag.
    pub fn apply_flag(&mut self, arg: &str) -> Result<bool, String> {
        if arg == "--debug" {
            self.debug = true;
        } else if let Some(value) = arg.strip_prefix("--gc-threshold=") {
            let n = value
                .parse()
                .map_err(|_| format!("invalid value for --gc-threshold: \"{value}\""))?;
            self.gc_threshold = Some(n);
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    pub fn config(&self) -> RuntimeConfig {
        let config = RuntimeConfig::new().with_debug(self.debug);
        match self.gc_threshold {
            Some(n) => config.with_gc_threshold(n),
            None => config,
        }
    }

    /// A runtime with the full builtin library.
    pub fn runtime(&self) -> rill_runtime::Result<Runtime> {
        let mut rt = Runtime::with_config(self.config());
        rill_builtins::register_all(&mut rt)?;
        Ok(rt)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| (*v).to_string())
    }

    #[test]
    fn environment_sets_defaults() {
        let options = Options::from_vars(vars(&[("RILL_DEBUG", "1"), ("RILL_GC_THRESHOLD", "50")]));
        assert_eq!(options, Options { debug: true, gc_threshold: Some(50) });
        assert_eq!(Options::from_vars(vars(&[("RILL_DEBUG", "0")])), Options::default());
        assert_eq!(Options::from_vars(vars(&[("RILL_GC_THRESHOLD", "lots")])).gc_threshold, None);
    }

    #[test]
    fn flags_override_the_environment() {
        let mut options = Options::from_vars(vars(&[("RILL_GC_THRESHOLD", "50")]));
        assert!(options.apply_flag("--gc-threshold=0").unwrap());
        assert!(options.apply_flag("--debug").unwrap());
        assert!(!options.apply_flag("script.rill").unwrap());
        assert!(options.apply_flag("--gc-threshold=-1").is_err());

        let config = options.config();
        assert!(config.debug);
        assert_eq!(config.gc_threshold, 0);
    }
}
