//! Optional strategy - nil when empty, the contained value otherwise

use super::{Push, PushKeyed};
use crate::runtime::State;

impl<T: Push> Push for Option<T> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        match self {
            Some(value) => value.push(state),
            None => {
                state.push_nil();
                1
            }
        }
    }
}

impl<T: PushKeyed> PushKeyed for Option<T> {
    #[inline]
    fn push_keyed(self, state: &mut State, key: &str) -> i32 {
        match self {
            Some(value) => value.push_keyed(state, key),
            None => {
                state.push_nil();
                1
            }
        }
    }
}
