//! Push engine - host values onto the runtime's value stack
//!
//! Design: One trait, resolved at compile time. A type either has a [`Push`]
//! implementation or it cannot be pushed at all; there is no runtime type
//! switch. Composite implementations (tuples, containers, options, closures)
//! recurse through the same trait, so nesting is free.
//!
//! Architecture:
//! - `marker.rs` - nil, context, metatable-key and light-handle markers
//! - `scalar.rs` - booleans, numbers, enumerations
//! - `string.rs` - text and byte strings
//! - `pointer.rs` - raw pointers and borrowed references
//! - `handle.rs` - by-value blocks, plain user blocks, finalizers
//! - `unique.rs` - `Box`, `Rc`, `Arc` of usertypes
//! - `container.rs` - sequences and associative containers as tables
//! - `tuple.rs` - multi-slot pushes
//! - `optional.rs` - `Option`
//! - `closure.rs` - native functions and closures with upvalues
//! - `reference.rs` - values already living in the runtime

mod marker;
mod scalar;
mod string;
mod pointer;
mod handle;
mod unique;
mod container;
mod tuple;
mod optional;
mod closure;
mod reference;


pub use marker::{CurrentThread, Light, LightUserdata, MetaFunction, MetatableKey, Nil, ThisState, UserdataValue};
pub use scalar::{push_enum, Enumeration, Integral};
pub use string::{push_cstr_ptr, push_sized, Bytes};
pub use pointer::{push_pointer_keyed, ByMut, ByRef, PointerHandle};
pub use handle::{push_value, push_value_keyed, release_block, NoMetatable, User, ValueHandle};
pub use unique::{push_unique, push_unique_keyed, UniqueHandle};
pub use container::{Associative, Sequence};
pub use closure::{AsFunction, CClosure, Closure};

use std::any::type_name;

use crate::logging;
use crate::runtime::State;

/// Marshalling strategy of a host type
///
/// `push` writes the value's representation and returns how many slots it
/// produced. The slots are contiguous, in left-to-right order.
pub trait Push {
    fn push(self, state: &mut State) -> i32;
}

/// Strategy that tags its handle with an identifier
///
/// Implemented by the handle-producing strategies; the identifier replaces
/// the type's registered default.
pub trait PushKeyed: Push {
    fn push_keyed(self, state: &mut State, key: &str) -> i32;
}

/// Push `value`; returns the number of slots produced
#[inline]
pub fn push<T: Push>(state: &mut State, value: T) -> i32 {
    let slots = value.push(state);
    logging::log_push(type_name::<T>(), slots);
    slots
}

/// Push `value` tagged with `key` instead of its default identifier
#[inline]
pub fn push_keyed<T: PushKeyed>(state: &mut State, key: &str, value: T) -> i32 {
    let slots = value.push_keyed(state, key);
    logging::log_push(type_name::<T>(), slots);
    slots
}

/// Push several values of one type; returns the total slot count
pub fn multi_push<I>(state: &mut State, values: I) -> i32
where
    I: IntoIterator,
    I::Item: Push,
{
    values.into_iter().map(|value| value.push(state)).sum()
}
