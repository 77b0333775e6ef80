//! Marker types with fixed representations

use core::ffi::c_void;

use super::Push;
use crate::runtime::State;

/// Pushes nil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Nil;

impl Push for Nil {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_nil();
        1
    }
}

/// The calling context itself; pushes nothing
///
/// Lets a function signature mention the state among its results without
/// producing a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThisState;

impl Push for ThisState {
    #[inline]
    fn push(self, _state: &mut State) -> i32 {
        0
    }
}

/// Pushes the running thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CurrentThread;

impl Push for CurrentThread {
    fn push(self, state: &mut State) -> i32 {
        state.push_thread();
        1
    }
}

/// Key under which usertype metatables are exposed to scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetatableKey;

impl MetatableKey {
    pub const NAME: &'static str = "__mt";
}

impl Push for MetatableKey {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_str(Self::NAME);
        1
    }
}

/// Metamethod names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaFunction {
    Index,
    NewIndex,
    Mode,
    Call,
    Metatable,
    ToString,
    Length,
    UnaryMinus,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulus,
    PowerOf,
    Concatenation,
    EqualTo,
    LessThan,
    LessThanOrEqualTo,
    GarbageCollect,
}

impl MetaFunction {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Index => "__index",
            Self::NewIndex => "__newindex",
            Self::Mode => "__mode",
            Self::Call => "__call",
            Self::Metatable => "__metatable",
            Self::ToString => "__tostring",
            Self::Length => "__len",
            Self::UnaryMinus => "__unm",
            Self::Addition => "__add",
            Self::Subtraction => "__sub",
            Self::Multiplication => "__mul",
            Self::Division => "__div",
            Self::Modulus => "__mod",
            Self::PowerOf => "__pow",
            Self::Concatenation => "__concat",
            Self::EqualTo => "__eq",
            Self::LessThan => "__lt",
            Self::LessThanOrEqualTo => "__le",
            Self::GarbageCollect => "__gc",
        }
    }
}

impl Push for MetaFunction {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_str(self.name());
        1
    }
}

/// Untyped address pushed as light userdata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightUserdata(pub *mut c_void);

impl Push for LightUserdata {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_light_userdata(self.0);
        1
    }
}

/// Typed address pushed as light userdata (no handle, no metatable)
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Light<T>(pub *mut T);

impl<T> Light<T> {
    pub fn new(value: &mut T) -> Self {
        Self(value as *mut T)
    }
}

impl<T> Clone for Light<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Light<T> {}

impl<T> Push for Light<T> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_light_userdata(self.0.cast());
        1
    }
}

/// Untyped address stored in a full userdata block without a metatable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserdataValue(pub *mut c_void);

struct AddressHandle {
    address: *mut c_void,
}

impl crate::runtime::Handle for AddressHandle {
    fn address(&self) -> *mut c_void {
        self.address
    }

    fn pointee(&self) -> core::any::TypeId {
        core::any::TypeId::of::<c_void>()
    }

    fn owns_pointee(&self) -> bool {
        false
    }

    fn release(&mut self) {}

    fn pointee_name(&self) -> &'static str {
        "void"
    }
}

impl Push for UserdataValue {
    fn push(self, state: &mut State) -> i32 {
        state.new_userdata(Box::new(AddressHandle { address: self.0 }));
        1
    }
}
