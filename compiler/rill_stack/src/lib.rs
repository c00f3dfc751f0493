//! Stack growth for deep recursion.
//!
//! The parser descends once per nesting level, the compiler once per AST
//! node and the interpreter once per script-level call. Each of those entry
//! points goes through [`ensure_sufficient_stack`] so that deeply nested
//! source or deeply recursive scripts hit the runtime's own limits (call
//! depth, operand stack size) instead of the native stack guard page.
//!
//! On `wasm32` the guard is a plain call.

/// Grow when less than this many bytes of native stack remain.
#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
#[cfg(not(target_arch = "wasm32"))]
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first switching to a fresh stack segment if the current one is
/// close to exhaustion.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests;
