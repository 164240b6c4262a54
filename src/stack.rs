/// Grow the native stack before recursing when less than this remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if it is nearly exhausted. Wraps every
/// recursive entry point of the parser and the evaluator, so nesting depth is
/// limited by the interpreter's own caps rather than by the host thread.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
