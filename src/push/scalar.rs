//! Scalar strategies - booleans, numbers and enumerations
//!
//! Integers of every width become the runtime's native integer through a
//! plain `as` conversion; `u64` values above `i64::MAX` wrap.

use super::Push;
use crate::runtime::{Integer, Number, State};

impl Push for bool {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_boolean(self);
        1
    }
}

impl Push for &bool {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        (*self).push(state)
    }
}

macro_rules! impl_push_integer {
    ($($t:ty),*) => {
        $(
            impl Push for $t {
                #[inline]
                fn push(self, state: &mut State) -> i32 {
                    state.push_integer(self as Integer);
                    1
                }
            }

            impl Push for &$t {
                #[inline]
                fn push(self, state: &mut State) -> i32 {
                    (*self).push(state)
                }
            }
        )*
    };
}

impl_push_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_push_float {
    ($($t:ty),*) => {
        $(
            impl Push for $t {
                #[inline]
                fn push(self, state: &mut State) -> i32 {
                    state.push_number(self as Number);
                    1
                }
            }

            impl Push for &$t {
                #[inline]
                fn push(self, state: &mut State) -> i32 {
                    (*self).push(state)
                }
            }
        )*
    };
}

impl_push_float!(f32, f64);

/// Underlying representation of an enumeration
pub trait Integral: Copy + 'static {
    /// Width in bytes
    const BYTES: usize;

    fn to_integer(self) -> Integer;
}

macro_rules! impl_integral {
    ($($t:ty),*) => {
        $(
            impl Integral for $t {
                const BYTES: usize = core::mem::size_of::<$t>();

                #[inline]
                fn to_integer(self) -> Integer {
                    self as Integer
                }
            }
        )*
    };
}

impl_integral!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Fieldless enumeration pushed as its underlying integer
///
/// Declare with [`impl_enum_push!`](crate::impl_enum_push).
pub trait Enumeration: Copy + 'static {
    type Repr: Integral;

    fn to_repr(self) -> Self::Repr;
}

/// Push an enumeration as a number
///
/// Byte-sized representations go through the `i32` path so they can never be
/// mistaken for a character.
pub fn push_enum<E: Enumeration>(state: &mut State, value: E) -> i32 {
    let repr = value.to_repr();
    if <E::Repr as Integral>::BYTES == 1 {
        return (repr.to_integer() as i32).push(state);
    }
    state.push_integer(repr.to_integer());
    1
}

/// Declare the underlying representation of fieldless enumerations
///
/// ```ignore
/// #[derive(Clone, Copy)]
/// #[repr(u8)]
/// enum Mode { Read = 1, Write = 2 }
/// impl_enum_push!(Mode as u8);
/// ```
#[macro_export]
macro_rules! impl_enum_push {
    ($($ty:ty as $repr:ty),+ $(,)?) => {
        $(
            impl $crate::push::Enumeration for $ty {
                type Repr = $repr;

                #[inline]
                fn to_repr(self) -> $repr {
                    self as $repr
                }
            }

            impl $crate::push::Push for $ty {
                #[inline]
                fn push(self, state: &mut $crate::runtime::State) -> i32 {
                    $crate::push::push_enum(state, self)
                }
            }

            impl $crate::push::Push for &$ty {
                #[inline]
                fn push(self, state: &mut $crate::runtime::State) -> i32 {
                    $crate::push::push_enum(state, *self)
                }
            }
        )+
    };
}
