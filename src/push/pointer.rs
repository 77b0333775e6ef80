//! Pointer strategies - borrowed host objects
//!
//! Design: The block stores only the address; the host keeps ownership and
//! must outlive every script-side use. Null collapses to nil. Pointer blocks
//! get the `<NAME>*` metatable and never a finalizer.

use core::any::{type_name, TypeId};
use core::ffi::c_void;
use core::ptr::NonNull;

use super::{Push, PushKeyed};
use crate::logging;
use crate::runtime::{Handle, State};
use crate::usertype::Usertype;

/// Non-owning handle to a host object
pub struct PointerHandle<T> {
    ptr: *mut T,
}

impl<T: 'static> PointerHandle<T> {
    pub fn new(ptr: *mut T) -> Self {
        Self { ptr }
    }
}

impl<T: 'static> Handle for PointerHandle<T> {
    #[inline]
    fn address(&self) -> *mut c_void {
        self.ptr.cast()
    }

    fn pointee(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn owns_pointee(&self) -> bool {
        false
    }

    fn release(&mut self) {}

    fn pointee_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Push `ptr` tagged with `key`; null pushes nil
pub fn push_pointer_keyed<T: 'static>(state: &mut State, key: &str, ptr: *mut T) -> i32 {
    if ptr.is_null() {
        logging::log_null_collapse(type_name::<*mut T>());
        state.push_nil();
        return 1;
    }

    state.new_userdata(Box::new(PointerHandle::new(ptr)));
    logging::log_handle_alloc(key, type_name::<T>(), false);
    state.new_metatable(key);
    state.set_metatable(-2);
    1
}

fn push_pointer<T: Usertype>(state: &mut State, ptr: *mut T) -> i32 {
    let key = state.identifiers().pointer_key::<T>();
    push_pointer_keyed(state, &key, ptr)
}

impl<T: Usertype> Push for *mut T {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_pointer(state, self)
    }
}

impl<T: Usertype> PushKeyed for *mut T {
    #[inline]
    fn push_keyed(self, state: &mut State, key: &str) -> i32 {
        push_pointer_keyed(state, key, self)
    }
}

impl<T: Usertype> Push for *const T {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_pointer(state, self as *mut T)
    }
}

impl<T: Usertype> PushKeyed for *const T {
    #[inline]
    fn push_keyed(self, state: &mut State, key: &str) -> i32 {
        push_pointer_keyed(state, key, self as *mut T)
    }
}

impl<T: Usertype> Push for NonNull<T> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_pointer(state, self.as_ptr())
    }
}

impl<T: Usertype> PushKeyed for NonNull<T> {
    #[inline]
    fn push_keyed(self, state: &mut State, key: &str) -> i32 {
        push_pointer_keyed(state, key, self.as_ptr())
    }
}

/// Push a host object by address instead of by value
///
/// The referent must outlive every script-side use of the handle.
#[derive(Debug)]
pub struct ByRef<'a, T>(pub &'a T);

impl<'a, T: Usertype> Push for ByRef<'a, T> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_pointer(state, self.0 as *const T as *mut T)
    }
}

impl<'a, T: Usertype> PushKeyed for ByRef<'a, T> {
    #[inline]
    fn push_keyed(self, state: &mut State, key: &str) -> i32 {
        push_pointer_keyed(state, key, self.0 as *const T as *mut T)
    }
}

/// Mutable counterpart of [`ByRef`]
#[derive(Debug)]
pub struct ByMut<'a, T>(pub &'a mut T);

impl<'a, T: Usertype> Push for ByMut<'a, T> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        push_pointer(state, self.0 as *mut T)
    }
}

impl<'a, T: Usertype> PushKeyed for ByMut<'a, T> {
    #[inline]
    fn push_keyed(self, state: &mut State, key: &str) -> i32 {
        push_pointer_keyed(state, key, self.0 as *mut T)
    }
}
