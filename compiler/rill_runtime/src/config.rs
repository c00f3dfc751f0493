//! Runtime configuration.

/// Limits and switches for one [`Runtime`](crate::Runtime).
///
/// ```
/// use rill_runtime::RuntimeConfig;
///
/// let config = RuntimeConfig::new().with_debug(true).with_gc_threshold(0);
/// assert!(config.debug);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of values on the operand stack.
    pub stack_limit: usize,
    /// Maximum number of nested script calls.
    pub call_depth: usize,
    /// Collector registrations between automatic collections; 0 disables them.
    pub gc_threshold: usize,
    /// Compile `debug` blocks. A file's `option debug` overrides this.
    pub debug: bool,
    /// Extension of script files, with the leading dot.
    pub extension: String,
}

impl RuntimeConfig {
    pub const DEFAULT_STACK_LIMIT: usize = 65_536;
    pub const DEFAULT_CALL_DEPTH: usize = 2_048;
    pub const DEFAULT_GC_THRESHOLD: usize = 10_000;

    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stack_limit(mut self, limit: usize) -> Self {
        self.stack_limit = limit;
        self
    }

    #[must_use]
    pub fn with_call_depth(mut self, depth: usize) -> Self {
        self.call_depth = depth;
        self
    }

    #[must_use]
    pub fn with_gc_threshold(mut self, threshold: usize) -> Self {
        self.gc_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_limit: Self::DEFAULT_STACK_LIMIT,
            call_depth: Self::DEFAULT_CALL_DEPTH,
            gc_threshold: Self::DEFAULT_GC_THRESHOLD,
            debug: false,
            extension: ".rill".to_string(),
        }
    }
}
