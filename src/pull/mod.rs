//! Pull engine - stack slots back into host values
//!
//! Design: Mirror of the push side. Single-slot types convert one `Value`;
//! tuples walk consecutive slots and report how many they consumed through
//! [`Tracking`]. Reads never modify the stack.

use core::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::error::{StackError, StackResult};
use crate::push::{Bytes, LightUserdata, Nil};
use crate::runtime::{StackRef, State, Type, UserdataRef, Value};


/// Slots consumed by a pull
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tracking {
    pub used: i32,
}

impl Tracking {
    #[inline]
    pub fn use_slots(&mut self, n: i32) {
        self.used += n;
    }
}

/// Host type readable from the stack
pub trait Pull: Sized {
    /// Convert the slot at the absolute `index`
    fn pull(state: &State, index: i32, tracking: &mut Tracking) -> StackResult<Self> {
        tracking.use_slots(1);
        Self::from_value(state.value(index), index)
    }

    /// Convert one slot's contents; `None` for an invalid index
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self>;
}

/// Read `T` starting at `index`
pub fn get<T: Pull>(state: &State, index: i32) -> StackResult<T> {
    let mut tracking = Tracking::default();
    T::pull(state, state.abs_index(index), &mut tracking)
}

/// Read `T` starting at `index`, also returning the slots it consumed
pub fn get_tracked<T: Pull>(state: &State, index: i32) -> StackResult<(T, i32)> {
    let mut tracking = Tracking::default();
    let value = T::pull(state, state.abs_index(index), &mut tracking)?;
    Ok((value, tracking.used))
}

#[inline]
fn found(value: Option<&Value>) -> Type {
    value.map_or(Type::None, Value::type_tag)
}

#[inline]
fn mismatch(value: Option<&Value>, index: i32, expected: &'static str) -> StackError {
    StackError::TypeMismatch {
        index,
        expected,
        found: found(value),
    }
}

impl Pull for bool {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        match value {
            Some(Value::Boolean(b)) => Ok(*b),
            other => Err(mismatch(other, index, "boolean")),
        }
    }
}

fn integer_of(value: Option<&Value>, index: i32) -> StackResult<i64> {
    value
        .and_then(Value::as_integer)
        .ok_or_else(|| mismatch(value, index, "integer"))
}

macro_rules! impl_pull_integer {
    ($($t:ty),*) => {
        $(
            impl Pull for $t {
                fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
                    let n = integer_of(value, index)?;
                    <$t>::try_from(n).map_err(|_| StackError::IntegerOverflow {
                        index,
                        value: n as i128,
                        target: stringify!($t),
                    })
                }
            }
        )*
    };
}

impl_pull_integer!(i8, i16, i32, i64, isize, u8, u16, u32, usize);

/// Mirrors the wrapping push: negative integers map back above `i64::MAX`
impl Pull for u64 {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        integer_of(value, index).map(|n| n as u64)
    }
}

impl Pull for f64 {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        value
            .and_then(Value::as_number)
            .ok_or_else(|| mismatch(value, index, "number"))
    }
}

impl Pull for f32 {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        f64::from_value(value, index).map(|n| n as f32)
    }
}

fn bytes_of(value: Option<&Value>, index: i32) -> StackResult<&[u8]> {
    value
        .and_then(Value::as_bytes)
        .ok_or_else(|| mismatch(value, index, "string"))
}

impl Pull for String {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        let bytes = bytes_of(value, index)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| StackError::InvalidUtf8 { index, source })
    }
}

impl Pull for char {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        let text = String::from_value(value, index)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(mismatch(value, index, "single-character string")),
        }
    }
}

impl Pull for Bytes {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        bytes_of(value, index).map(|bytes| Bytes(bytes.to_vec()))
    }
}

impl Pull for Nil {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        match value {
            None | Some(Value::Nil) => Ok(Nil),
            other => Err(mismatch(other, index, "nil")),
        }
    }
}

impl Pull for Value {
    fn from_value(value: Option<&Value>, _index: i32) -> StackResult<Self> {
        Ok(value.cloned().unwrap_or(Value::Nil))
    }
}

impl Pull for LightUserdata {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        match value {
            Some(Value::LightUserdata(p)) => Ok(LightUserdata(*p)),
            other => Err(mismatch(other, index, "lightuserdata")),
        }
    }
}

impl Pull for UserdataRef {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        match value {
            Some(Value::Userdata(u)) => Ok(u.clone()),
            other => Err(mismatch(other, index, "userdata")),
        }
    }
}

impl Pull for StackRef {
    fn pull(state: &State, index: i32, tracking: &mut Tracking) -> StackResult<Self> {
        tracking.use_slots(1);
        if state.value(index).is_none() {
            return Err(StackError::InvalidIndex { index });
        }
        Ok(StackRef::new(state, index))
    }

    fn from_value(_value: Option<&Value>, index: i32) -> StackResult<Self> {
        Err(StackError::InvalidIndex { index })
    }
}

impl<T: Pull> Pull for Option<T> {
    fn pull(state: &State, index: i32, tracking: &mut Tracking) -> StackResult<Self> {
        match state.value(index) {
            None | Some(Value::Nil) => {
                tracking.use_slots(1);
                Ok(None)
            }
            Some(_) => T::pull(state, index, tracking).map(Some),
        }
    }

    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        match value {
            None | Some(Value::Nil) => Ok(None),
            some => T::from_value(some, index).map(Some),
        }
    }
}

/// Address held by a handle of `T`, light userdata, or null for nil
fn address_of<T: 'static>(value: Option<&Value>, index: i32) -> StackResult<*mut T> {
    match value {
        None | Some(Value::Nil) => Ok(core::ptr::null_mut()),
        Some(Value::LightUserdata(p)) => Ok(p.cast()),
        Some(Value::Userdata(block)) => {
            block
                .address_of::<T>()
                .ok_or(StackError::InvalidHandle {
                    index,
                    expected: type_name::<T>(),
                })
        }
        other => Err(mismatch(other, index, "userdata")),
    }
}

impl<T: 'static> Pull for *mut T {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        address_of::<T>(value, index)
    }
}

impl<T: 'static> Pull for *const T {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        address_of::<T>(value, index).map(|p| p as *const T)
    }
}

fn table_of(value: Option<&Value>, index: i32) -> StackResult<&crate::runtime::TableRef> {
    match value {
        Some(Value::Table(t)) => Ok(t),
        other => Err(mismatch(other, index, "table")),
    }
}

/// Positions 1..=len of a sequence table
impl<T: Pull> Pull for Vec<T> {
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        let table = table_of(value, index)?.borrow();
        (1..=table.len() as i64)
            .map(|i| {
                let element = table.get_int(i);
                T::from_value(Some(&element), index)
            })
            .collect()
    }
}

impl<K, V> Pull for HashMap<K, V>
where
    K: Pull + Eq + Hash,
    V: Pull,
{
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        let pairs = table_of(value, index)?.borrow().pairs();
        pairs
            .iter()
            .map(|(k, v)| -> StackResult<(K, V)> {
                Ok((K::from_value(Some(k), index)?, V::from_value(Some(v), index)?))
            })
            .collect()
    }
}

impl<K, V> Pull for BTreeMap<K, V>
where
    K: Pull + Ord,
    V: Pull,
{
    fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
        let pairs = table_of(value, index)?.borrow().pairs();
        pairs
            .iter()
            .map(|(k, v)| -> StackResult<(K, V)> {
                Ok((K::from_value(Some(k), index)?, V::from_value(Some(v), index)?))
            })
            .collect()
    }
}

macro_rules! impl_pull_tuple {
    ($($name:ident)+) => {
        impl<$($name: Pull),+> Pull for ($($name,)+) {
            #[allow(non_snake_case)]
            fn pull(state: &State, index: i32, tracking: &mut Tracking) -> StackResult<Self> {
                let mut offset = 0;
                $(
                    let mut inner = Tracking::default();
                    let $name = $name::pull(state, index + offset, &mut inner)?;
                    offset += inner.used;
                )+
                tracking.use_slots(offset);
                Ok(($($name,)+))
            }

            fn from_value(value: Option<&Value>, index: i32) -> StackResult<Self> {
                Err(mismatch(value, index, "consecutive slots"))
            }
        }
    };
}

impl_pull_tuple!(A);
impl_pull_tuple!(A B);
impl_pull_tuple!(A B C);
impl_pull_tuple!(A B C D);
impl_pull_tuple!(A B C D E);
impl_pull_tuple!(A B C D E F);
impl_pull_tuple!(A B C D E F G);
impl_pull_tuple!(A B C D E F G H);
impl_pull_tuple!(A B C D E F G H I);
impl_pull_tuple!(A B C D E F G H I J);
impl_pull_tuple!(A B C D E F G H I J K);
impl_pull_tuple!(A B C D E F G H I J K L);
