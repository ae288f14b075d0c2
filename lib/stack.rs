//! Stack growth for the recursive parts of the pipeline.
//!
//! Deeply nested expressions and deep interpreted recursion both map onto
//! native recursion. Wrapping those paths in [`ensure_sufficient_stack`] makes
//! the configured call-depth limit, not the host thread's stack size, the thing
//! that stops a runaway program.

/// Grow the stack when less than this remains.
const RED_ZONE: usize = 256 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
