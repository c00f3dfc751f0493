//! Destination of `print` statements and collector reports.
//!
//! - [`PrintHandler::Stdout`]: the process's standard output (default)
//! - [`PrintHandler::Buffer`]: captured text, for tests and hosts that
//!   display output themselves
//! - [`PrintHandler::Silent`]: discards everything
//!
//! Enum dispatch keeps the hot `print` path free of virtual calls.

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Output captured by a [`PrintHandler::Buffer`].
#[derive(Default)]
pub struct OutputBuffer {
    text: Mutex<String>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, text: &str, newline: bool) {
        let mut buf = self.text.lock();
        buf.push_str(text);
        if newline {
            buf.push('\n');
        }
    }
}

pub enum PrintHandler {
    Stdout,
    Buffer(OutputBuffer),
    Silent,
}

impl PrintHandler {
    /// Write `text` followed by a newline.
    pub fn println(&self, text: &str) {
        self.write(text, true);
    }

    /// Write `text` as is. Standard output is flushed so prompts appear
    /// before the script blocks on input.
    pub fn print(&self, text: &str) {
        self.write(text, false);
    }

    fn write(&self, text: &str, newline: bool) {
        match self {
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                // A closed stdout is not a script error.
                let _ = if newline {
                    writeln!(out, "{text}")
                } else {
                    write!(out, "{text}").and_then(|()| out.flush())
                };
            }
            Self::Buffer(buffer) => buffer.push(text, newline),
            Self::Silent => {}
        }
    }

    /// Captured output; empty for handlers that do not capture.
    pub fn output(&self) -> String {
        match self {
            Self::Buffer(buffer) => buffer.text.lock().clone(),
            Self::Stdout | Self::Silent => String::new(),
        }
    }

    /// Return the captured output and clear the buffer.
    pub fn take_output(&self) -> String {
        match self {
            Self::Buffer(buffer) => std::mem::take(&mut *buffer.text.lock()),
            Self::Stdout | Self::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(buffer) = self {
            buffer.text.lock().clear();
        }
    }
}

/// Print handler shared between a runtime and its host.
pub type SharedPrintHandler = Arc<PrintHandler>;

pub fn stdout_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Stdout)
}

pub fn buffer_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Buffer(OutputBuffer::new()))
}

pub fn silent_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Silent)
}

#[cfg(test)]
mod tests;
