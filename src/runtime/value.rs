//! Value model - what a stack slot can hold
//!
//! Design: A slot is a small tagged enum. Strings are immutable shared byte
//! buffers, aggregates are reference-counted so copying a slot never copies
//! the aggregate, and equality follows raw identity for reference types.

use core::ffi::c_void;
use core::fmt;
use std::rc::Rc;

use super::function::FunctionRef;
use super::table::TableRef;
use super::userdata::UserdataRef;

/// Native integer representation of the runtime
pub type Integer = i64;

/// Native floating representation of the runtime
pub type Number = f64;

/// Observable tag of a stack slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// Index does not refer to a valid slot
    None,
    Nil,
    Boolean,
    LightUserdata,
    Number,
    String,
    Table,
    Function,
    Userdata,
    Thread,
}

impl Type {
    /// Name used by the runtime in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "no value",
            Self::Nil => "nil",
            Self::Boolean => "boolean",
            Self::LightUserdata => "lightuserdata",
            Self::Number => "number",
            Self::String => "string",
            Self::Table => "table",
            Self::Function => "function",
            Self::Userdata => "userdata",
            Self::Thread => "thread",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of a runtime thread (only the main thread exists in this model)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u32);

/// Contents of one stack slot
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(Integer),
    Number(Number),
    String(Rc<[u8]>),
    Table(TableRef),
    Function(FunctionRef),
    Userdata(UserdataRef),
    LightUserdata(*mut c_void),
    Thread(ThreadId),
}

impl Value {
    /// Tag of this value
    #[inline]
    pub fn type_tag(&self) -> Type {
        match self {
            Self::Nil => Type::Nil,
            Self::Boolean(_) => Type::Boolean,
            Self::Integer(_) | Self::Number(_) => Type::Number,
            Self::String(_) => Type::String,
            Self::Table(_) => Type::Table,
            Self::Function(_) => Type::Function,
            Self::Userdata(_) => Type::Userdata,
            Self::LightUserdata(_) => Type::LightUserdata,
            Self::Thread(_) => Type::Thread,
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Build a string value from raw bytes
    pub fn string(bytes: &[u8]) -> Self {
        Self::String(Rc::from(bytes))
    }

    /// Bytes of a string value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Integer view, accepting floats with an exact integral value
    pub fn as_integer(&self) -> Option<Integer> {
        match *self {
            Self::Integer(i) => Some(i),
            Self::Number(n) => float_to_integer(n),
            _ => None,
        }
    }

    /// Float view of a numeric value
    pub fn as_number(&self) -> Option<Number> {
        match *self {
            Self::Integer(i) => Some(i as Number),
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Address used for identity of reference values
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Self::Table(t) => Some(t.address()),
            Self::Function(f) => Some(f.address()),
            Self::Userdata(u) => Some(u.address()),
            Self::LightUserdata(p) => Some(*p as usize),
            _ => None,
        }
    }
}

/// Exact float to integer conversion (no rounding)
pub(crate) fn float_to_integer(n: Number) -> Option<Integer> {
    // 2^63 is exactly representable; anything at or above it overflows
    const LIMIT: Number = 9_223_372_036_854_775_808.0;
    if n.fract() == 0.0 && n >= -LIMIT && n < LIMIT {
        Some(n as Integer)
    } else {
        None
    }
}

impl PartialEq for Value {
    /// Raw equality: numbers by value, strings by bytes, everything else by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Integer(i), Self::Number(n)) | (Self::Number(n), Self::Integer(i)) => {
                float_to_integer(*n) == Some(*i)
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Thread(a), Self::Thread(b)) => a == b,
            (a, b) => match (a.identity(), b.identity()) {
                (Some(x), Some(y)) => x == y && a.type_tag() == b.type_tag(),
                _ => false,
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Number(n) => write!(f, "{:?}", n),
            Self::String(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            Self::Thread(id) => write!(f, "thread: {}", id.0),
            other => write!(
                f,
                "{}: {:#x}",
                other.type_tag(),
                other.identity().unwrap_or_default()
            ),
        }
    }
}

/// Hashable form of a table key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    Integer(Integer),
    Float(u64),
    Boolean(bool),
    String(Rc<[u8]>),
    Identity(Type, usize),
    Thread(u32),
}

impl Key {
    /// Normalize a value into a key; `None` for nil and NaN
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Nil => None,
            Value::Boolean(b) => Some(Self::Boolean(*b)),
            Value::Integer(i) => Some(Self::Integer(*i)),
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) => Some(match float_to_integer(*n) {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.to_bits()),
            }),
            Value::String(bytes) => Some(Self::String(bytes.clone())),
            Value::Thread(id) => Some(Self::Thread(id.0)),
            other => other
                .identity()
                .map(|address| Self::Identity(other.type_tag(), address)),
        }
    }
}
