//! Managed handle strategy - ownership wrappers of usertypes
//!
//! Design: The block keeps the wrapper inline next to the raw pointee address
//! extracted at push time. The finalizer drops the wrapper, never the pointee
//! directly, so shared wrappers only give up their own share.

use core::any::{type_name, TypeId};
use core::ffi::c_void;
use core::mem::ManuallyDrop;
use std::rc::Rc;
use std::sync::Arc;

use super::handle::{attach_metatable, release_block};
use super::{Push, PushKeyed};
use crate::logging;
use crate::runtime::{Handle, State};
use crate::usertype::{UniqueUsertype, Usertype};

/// Handle owning an ownership wrapper
pub struct UniqueHandle<W: UniqueUsertype> {
    wrapper: ManuallyDrop<W>,
    pointee: *mut W::Pointee,
    live: bool,
}

impl<W: UniqueUsertype> UniqueHandle<W> {
    pub fn new(wrapper: W) -> Self {
        let pointee = wrapper.get();
        Self {
            wrapper: ManuallyDrop::new(wrapper),
            pointee,
            live: true,
        }
    }
}

impl<W: UniqueUsertype> Handle for UniqueHandle<W> {
    #[inline]
    fn address(&self) -> *mut c_void {
        if self.live {
            self.pointee.cast()
        } else {
            core::ptr::null_mut()
        }
    }

    fn pointee(&self) -> TypeId {
        TypeId::of::<W::Pointee>()
    }

    fn owns_pointee(&self) -> bool {
        true
    }

    fn release(&mut self) {
        if self.live {
            self.live = false;
            // SAFETY: guarded by `live`; the wrapper is dropped exactly once
            unsafe { ManuallyDrop::drop(&mut self.wrapper) }
        }
    }

    fn pointee_name(&self) -> &'static str {
        type_name::<W::Pointee>()
    }
}

/// Push `wrapper` tagged with its wrapper-specific identifier; null pushes nil
pub fn push_unique<W: UniqueUsertype>(state: &mut State, wrapper: W) -> i32 {
    if wrapper.is_null() {
        logging::log_null_collapse(type_name::<W>());
        state.push_nil();
        return 1;
    }
    let key = state.identifiers().unique_key::<W>();
    push_unique_keyed(state, &key, wrapper)
}

/// Push `wrapper` tagged with `key`; null pushes nil
pub fn push_unique_keyed<W: UniqueUsertype>(state: &mut State, key: &str, wrapper: W) -> i32 {
    if wrapper.is_null() {
        logging::log_null_collapse(type_name::<W>());
        state.push_nil();
        return 1;
    }

    state.new_userdata(Box::new(UniqueHandle::new(wrapper)));
    logging::log_handle_alloc(key, type_name::<W::Pointee>(), true);
    attach_metatable(state, key, release_block);
    1
}

macro_rules! impl_push_unique {
    ($($wrapper:ident),*) => {
        $(
            impl<T: Usertype> Push for $wrapper<T> {
                #[inline]
                fn push(self, state: &mut State) -> i32 {
                    push_unique(state, self)
                }
            }

            impl<T: Usertype> PushKeyed for $wrapper<T> {
                #[inline]
                fn push_keyed(self, state: &mut State, key: &str) -> i32 {
                    push_unique_keyed(state, key, self)
                }
            }
        )*
    };
}

impl_push_unique!(Box, Rc, Arc);
