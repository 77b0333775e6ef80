//! Usertype registry - identifiers that tag handles and key finalizers
//!
//! Design: A usertype names itself once through [`Usertype::NAME`]. Every
//! other identifier (pointer, unique wrapper, plain user block) is derived
//! from it and the state's configured prefix, then cached per state so the
//! formatting cost is paid once per type.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Host type with a registered identifier
///
/// Declare with [`impl_usertype!`](crate::impl_usertype), which also gives
/// the type its by-value push strategy.
pub trait Usertype: 'static {
    const NAME: &'static str;
}

/// Ownership wrapper whose pointee is a usertype
///
/// The wrapper is stored inline in the userdata block and dropped by the
/// finalizer; `get` supplies the pointee address used for dereferencing.
pub trait UniqueUsertype: 'static {
    type Pointee: Usertype;

    /// Whether the wrapper currently owns nothing (pushed as nil)
    fn is_null(&self) -> bool {
        false
    }

    /// Address of the owned pointee
    fn get(&self) -> *mut Self::Pointee;
}

impl<T: Usertype> UniqueUsertype for Box<T> {
    type Pointee = T;

    #[inline]
    fn get(&self) -> *mut T {
        &**self as *const T as *mut T
    }
}

impl<T: Usertype> UniqueUsertype for Rc<T> {
    type Pointee = T;

    #[inline]
    fn get(&self) -> *mut T {
        Rc::as_ptr(self) as *mut T
    }
}

impl<T: Usertype> UniqueUsertype for Arc<T> {
    type Pointee = T;

    #[inline]
    fn get(&self) -> *mut T {
        Arc::as_ptr(self) as *mut T
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyKind {
    Value,
    Pointer,
    Unique,
    UserGc,
}

/// Per-state identifier cache
#[derive(Debug)]
pub struct Identifiers {
    prefix: String,
    cache: HashMap<(KeyKind, TypeId), Rc<str>>,
}

impl Identifiers {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            cache: HashMap::new(),
        }
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key<T: 'static>(&mut self, kind: KeyKind, make: impl FnOnce(&str) -> String) -> Rc<str> {
        let prefix = &self.prefix;
        self.cache
            .entry((kind, TypeId::of::<T>()))
            .or_insert_with(|| Rc::from(make(prefix)))
            .clone()
    }

    /// Identifier of a by-value `T` block: `<prefix><NAME>`
    pub fn value_key<T: Usertype>(&mut self) -> Rc<str> {
        self.key::<T>(KeyKind::Value, |prefix| format!("{}{}", prefix, T::NAME))
    }

    /// Identifier of a borrowed `T` block: `<prefix><NAME>*`
    pub fn pointer_key<T: Usertype>(&mut self) -> Rc<str> {
        self.key::<T>(KeyKind::Pointer, |prefix| format!("{}{}*", prefix, T::NAME))
    }

    /// Identifier of a block holding wrapper `W`; distinct per wrapper type
    pub fn unique_key<W: UniqueUsertype>(&mut self) -> Rc<str> {
        self.key::<W>(KeyKind::Unique, |prefix| {
            format!("{}unique<{}>", prefix, type_name::<W>())
        })
    }

    /// Identifier of a plain user block of `T`, which need not be a usertype
    pub fn user_gc_key<T: 'static>(&mut self) -> Rc<str> {
        self.key::<T>(KeyKind::UserGc, |prefix| {
            format!("{}user<{}>.gc", prefix, type_name::<T>())
        })
    }

    /// Number of cached identifiers
    #[inline]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Declare usertypes
///
/// ```ignore
/// struct Player { hp: i32 }
/// impl_usertype!(Player);                 // identifier "Player"
/// impl_usertype!(Enemy => "game.Enemy");  // explicit identifier
/// ```
///
/// Each type gets [`Usertype`], plus [`Push`](crate::push::Push) and
/// [`PushKeyed`](crate::push::PushKeyed) moving the value into a finalized block.
#[macro_export]
macro_rules! impl_usertype {
    ($ty:ty) => {
        $crate::impl_usertype!($ty => stringify!($ty));
    };
    ($ty:ty => $name:expr) => {
        impl $crate::usertype::Usertype for $ty {
            const NAME: &'static str = $name;
        }

        impl $crate::push::Push for $ty {
            #[inline]
            fn push(self, state: &mut $crate::runtime::State) -> i32 {
                $crate::push::push_value(state, self)
            }
        }

        impl $crate::push::PushKeyed for $ty {
            #[inline]
            fn push_keyed(self, state: &mut $crate::runtime::State, key: &str) -> i32 {
                $crate::push::push_value_keyed(state, key, self)
            }
        }
    };
    ($($ty:ty),+ $(,)?) => {
        $($crate::impl_usertype!($ty);)+
    };
}
