//! Runtime-reference strategies - values that already live in the runtime
//!
//! These delegate to their own push and never build a container table.

use super::Push;
use crate::runtime::{RegistryRef, StackRef, State, Value};

impl Push for StackRef {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        StackRef::push(&self, state)
    }
}

impl Push for &StackRef {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        StackRef::push(self, state)
    }
}

impl Push for RegistryRef {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        RegistryRef::push(&self, state)
    }
}

impl Push for &RegistryRef {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        RegistryRef::push(self, state)
    }
}

/// Raw slot contents, pushed unchanged
impl Push for Value {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_raw(self);
        1
    }
}

impl Push for &Value {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_raw(self.clone());
        1
    }
}
