/// Safety valves against programs that never finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Body executions allowed per `while` loop before it is silently stopped.
    pub max_loop_iterations: usize,
    /// Scope frames allowed before a function call faults with a stack overflow.
    pub max_call_depth: usize,
}

pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 1000;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}
