//! Userdata blocks - runtime-owned storage for host objects
//!
//! Design: A block owns a boxed [`Handle`] instead of raw bytes. Every handle
//! answers `address()`, so pointer-backed and value-backed blocks share one
//! dereference path no matter how the object was stored.

use core::any::{Any, TypeId};
use core::ffi::c_void;
use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::table::TableRef;

/// Uniform access to whatever a userdata block holds
pub trait Handle: Any {
    /// Address of the host object
    fn address(&self) -> *mut c_void;

    /// Type of the object `address()` points at
    fn pointee(&self) -> TypeId;

    /// Whether the block owns the object (and must destroy it)
    fn owns_pointee(&self) -> bool;

    /// Run the host destructor of an owned payload. Must be idempotent.
    fn release(&mut self);

    /// Type name of the pointee, for diagnostics
    fn pointee_name(&self) -> &'static str;
}

/// Full userdata block
pub struct UserdataBlock {
    handle: RefCell<Box<dyn Handle>>,
    metatable: RefCell<Option<TableRef>>,
    finalized: Cell<bool>,
}

impl UserdataBlock {
    fn new(handle: Box<dyn Handle>) -> Self {
        Self {
            handle: RefCell::new(handle),
            metatable: RefCell::new(None),
            finalized: Cell::new(false),
        }
    }

    /// Address of the embedded or referenced host object
    #[inline]
    pub fn address(&self) -> *mut c_void {
        self.handle.borrow().address()
    }

    #[inline]
    pub fn pointee(&self) -> TypeId {
        self.handle.borrow().pointee()
    }

    #[inline]
    pub fn owns_pointee(&self) -> bool {
        self.handle.borrow().owns_pointee()
    }

    #[inline]
    pub fn pointee_name(&self) -> &'static str {
        self.handle.borrow().pointee_name()
    }

    /// Typed address; `None` when the block holds a different type
    pub fn address_of<T: 'static>(&self) -> Option<*mut T> {
        let handle = self.handle.borrow();
        (handle.pointee() == TypeId::of::<T>()).then(|| handle.address() as *mut T)
    }

    /// Destroy the owned payload (no-op for borrowed pointers)
    pub fn release(&self) {
        self.handle.borrow_mut().release();
    }

    pub fn metatable(&self) -> Option<TableRef> {
        self.metatable.borrow().clone()
    }

    pub fn set_metatable(&self, metatable: Option<TableRef>) {
        *self.metatable.borrow_mut() = metatable;
    }

    #[inline]
    pub(crate) fn is_finalized(&self) -> bool {
        self.finalized.get()
    }

    #[inline]
    pub(crate) fn mark_finalized(&self) {
        self.finalized.set(true);
    }
}

impl fmt::Debug for UserdataBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handle = self.handle.borrow();
        f.debug_struct("UserdataBlock")
            .field("pointee", &handle.pointee_name())
            .field("address", &handle.address())
            .field("owned", &handle.owns_pointee())
            .field("finalized", &self.finalized.get())
            .finish()
    }
}

/// Shared handle to a userdata block
#[derive(Debug, Clone)]
pub struct UserdataRef(Rc<UserdataBlock>);

impl UserdataRef {
    pub(crate) fn new(handle: Box<dyn Handle>) -> Self {
        Self(Rc::new(UserdataBlock::new(handle)))
    }

    /// Identity of the block (not of the host object)
    #[inline]
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live references, the heap's own included
    #[inline]
    pub(crate) fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl core::ops::Deref for UserdataRef {
    type Target = UserdataBlock;

    #[inline]
    fn deref(&self) -> &UserdataBlock {
        &self.0
    }
}
