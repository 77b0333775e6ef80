//! Stack balance checking for tests and debug assertions

use super::state::State;

/// Remembers the stack top at creation and compares it later
///
/// Usage:
/// ```ignore
/// let guard = StackGuard::begin(&state);
/// state.push(42);
/// state.pop(1);
/// guard.assert_balanced(&state);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StackGuard {
    begin: i32,
}

impl StackGuard {
    pub fn begin(state: &State) -> Self {
        Self { begin: state.top() }
    }

    #[inline]
    pub fn begin_top(&self) -> i32 {
        self.begin
    }

    /// Slots gained (or lost, if negative) since `begin`
    #[inline]
    pub fn delta(&self, state: &State) -> i32 {
        state.top() - self.begin
    }

    #[inline]
    pub fn is_balanced(&self, state: &State) -> bool {
        self.delta(state) == 0
    }

    #[track_caller]
    pub fn assert_balanced(&self, state: &State) {
        assert_eq!(
            state.top(),
            self.begin,
            "stack unbalanced: began at {}, now at {}",
            self.begin,
            state.top()
        );
    }
}
