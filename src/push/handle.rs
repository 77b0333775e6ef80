//! Owning handle strategies - host objects moved into runtime blocks
//!
//! Design: The object lives inline in the block's handle; `address()` is the
//! uniform access path, so code reading the block never needs to know how it
//! was stored. Destruction is the handle's job: finalizers only locate the
//! collected block (argument 1) and ask it to release its payload.
//!
//! Finalizer registration is keyed by identifier in the state's registry;
//! the first registration installs `__gc` on the identifier's metatable and
//! every later push only records a reuse.

use core::any::{type_name, TypeId};
use core::cell::UnsafeCell;
use core::ffi::c_void;
use core::mem::ManuallyDrop;

use super::{Push, PushKeyed};
use crate::logging;
use crate::runtime::{upvalue_index, Handle, NativeFn, State, Value};
use crate::usertype::Usertype;

/// Handle owning an inline host object
pub struct ValueHandle<T> {
    value: UnsafeCell<ManuallyDrop<T>>,
    live: bool,
}

impl<T: 'static> ValueHandle<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(ManuallyDrop::new(value)),
            live: true,
        }
    }
}

impl<T: 'static> Handle for ValueHandle<T> {
    #[inline]
    fn address(&self) -> *mut c_void {
        if self.live {
            self.value.get().cast()
        } else {
            core::ptr::null_mut()
        }
    }

    fn pointee(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn owns_pointee(&self) -> bool {
        true
    }

    fn release(&mut self) {
        if self.live {
            self.live = false;
            // SAFETY: `live` guards against a second drop; the value is never
            // reachable again once `address()` starts returning null.
            unsafe { ManuallyDrop::drop(self.value.get_mut()) }
        }
    }

    fn pointee_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Finalizer shared by every owning strategy
pub fn release_block(state: &mut State) -> i32 {
    if let Some(block) = state.userdata_handle(1) {
        block.release();
    }
    0
}

/// Get or create the metatable `key` for the block on top and attach it
///
/// The first registration of `key` installs `finalizer` as its `__gc`.
pub(crate) fn attach_metatable(state: &mut State, key: &str, finalizer: NativeFn) {
    state.new_metatable(key);
    if state.finalizers_mut().register(key, finalizer) {
        state.push_function(finalizer);
        state.set_field(-2, "__gc");
    }
    state.set_metatable(-2);
}

/// Move `value` into a finalized block tagged with its usertype identifier
pub fn push_value<T: Usertype>(state: &mut State, value: T) -> i32 {
    let key = state.identifiers().value_key::<T>();
    push_value_keyed(state, &key, value)
}

/// Move `value` into a finalized block tagged with `key`
pub fn push_value_keyed<T: 'static>(state: &mut State, key: &str, value: T) -> i32 {
    state.new_userdata(Box::new(ValueHandle::new(value)));
    logging::log_handle_alloc(key, type_name::<T>(), true);
    attach_metatable(state, key, release_block);
    1
}

/// Plain user block for any `'static` type, no usertype declaration needed
///
/// The finalizer closure carries the block identifier as its upvalue and
/// refuses blocks tagged with anything else.
#[derive(Debug, Clone, Default)]
pub struct User<T>(pub T);

/// User block pushed without a metatable
///
/// No finalizer ever runs for it: the payload's destructor is skipped.
#[derive(Debug, Clone, Default)]
pub struct NoMetatable<T>(pub T);

fn destroy_user(state: &mut State) -> i32 {
    let expected = state.value(upvalue_index(1)).and_then(Value::as_bytes);
    let actual = state.metatable_name_of(1);

    match (expected, actual) {
        (Some(expected), Some(actual)) if expected == actual.as_bytes() => {
            if let Some(block) = state.userdata_handle(1) {
                block.release();
            }
        }
        _ => logging::log_runtime_warning("user finalizer invoked on a foreign block"),
    }
    0
}

fn push_user<T: 'static>(state: &mut State, key: &str, value: T, with_meta: bool) -> i32 {
    state.new_userdata(Box::new(ValueHandle::new(value)));
    logging::log_handle_alloc(key, type_name::<T>(), with_meta);

    if with_meta {
        state.new_metatable(key);
        if state.finalizers_mut().register(key, destroy_user) {
            state.push_str(key);
            state.push_closure(destroy_user, 1);
            state.set_field(-2, "__gc");
        }
        state.set_metatable(-2);
    }
    1
}

impl<T: 'static> Push for User<T> {
    fn push(self, state: &mut State) -> i32 {
        let key = state.identifiers().user_gc_key::<T>();
        push_user(state, &key, self.0, true)
    }
}

impl<T: 'static> PushKeyed for User<T> {
    fn push_keyed(self, state: &mut State, key: &str) -> i32 {
        push_user(state, key, self.0, true)
    }
}

impl<T: 'static> Push for NoMetatable<T> {
    fn push(self, state: &mut State) -> i32 {
        let key = state.identifiers().user_gc_key::<T>();
        push_user(state, &key, self.0, false)
    }
}
