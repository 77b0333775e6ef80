//! Callable strategies - native functions and closures
//!
//! Design: Upvalues are pushed first through the ordinary push machinery, so
//! an upvalue may itself occupy several slots; the closure then binds however
//! many slots were produced. Inside the function they are read through
//! `upvalue_index(1..=n)` in capture order.

use super::handle::User;
use super::Push;
use crate::runtime::{upvalue_index, NativeFn, State};

impl Push for NativeFn {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_function(self);
        1
    }
}

/// Native function over upvalues already on the stack
#[derive(Debug, Clone, Copy)]
pub struct CClosure {
    pub function: NativeFn,
    /// Slots on top of the stack to capture
    pub upvalues: i32,
}

impl CClosure {
    pub fn new(function: NativeFn, upvalues: i32) -> Self {
        Self { function, upvalues }
    }
}

impl Push for CClosure {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_closure(self.function, self.upvalues);
        1
    }
}

/// Native function together with the host values it captures
///
/// `upvalues` is usually a tuple; `()` yields a plain function.
#[derive(Debug, Clone)]
pub struct Closure<U> {
    pub function: NativeFn,
    pub upvalues: U,
}

impl<U: Push> Closure<U> {
    pub fn new(function: NativeFn, upvalues: U) -> Self {
        Self { function, upvalues }
    }
}

impl<U: Push> Push for Closure<U> {
    fn push(self, state: &mut State) -> i32 {
        let captured = self.upvalues.push(state);
        CClosure::new(self.function, captured).push(state)
    }
}

/// Rust closure exposed as a runtime function
///
/// The closure is moved into a finalized user block held as the function's
/// only upvalue. The block stays reachable through the running frame, and
/// `State::close` is ignored until the call returns, so the closure is never
/// dropped while it runs.
pub struct AsFunction<F>(pub F);

fn call_boxed<F>(state: &mut State) -> i32
where
    F: Fn(&mut State) -> i32 + 'static,
{
    let Some(block) = state.userdata_handle(upvalue_index(1)) else {
        return 0;
    };
    let Some(f) = block.address_of::<F>() else {
        return 0;
    };
    if f.is_null() {
        return 0;
    }
    // SAFETY: `block` keeps the closure's storage alive for the whole call,
    // and a released block reports a null address.
    let f = unsafe { &*f };
    f(state)
}

impl<F> Push for AsFunction<F>
where
    F: Fn(&mut State) -> i32 + 'static,
{
    fn push(self, state: &mut State) -> i32 {
        User(self.0).push(state);
        state.push_closure(call_boxed::<F>, 1);
        1
    }
}
