//! Runtime references - host-side names for values that already live in the runtime
//!
//! Pushing one of these copies the referenced value; it is never re-marshalled.

use super::state::State;

/// Absolute position of a live stack slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackRef {
    index: i32,
}

impl StackRef {
    /// Capture a slot; relative indices are resolved against the current top
    pub fn new(state: &State, index: i32) -> Self {
        Self {
            index: state.abs_index(index),
        }
    }

    #[inline]
    pub fn index(self) -> i32 {
        self.index
    }

    /// Push a copy of the referenced slot
    pub fn push(&self, state: &mut State) -> i32 {
        state.push_value(self.index);
        1
    }
}

/// Entry in the state's reference registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryRef(pub(crate) i32);

impl RegistryRef {
    /// Reference to nil (never stored)
    pub const NIL: Self = Self(-1);

    #[inline]
    pub fn id(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn is_nil(self) -> bool {
        self.0 < 0
    }

    /// Push the referenced value (nil for released references)
    pub fn push(&self, state: &mut State) -> i32 {
        state.push_reference(*self);
        1
    }
}
