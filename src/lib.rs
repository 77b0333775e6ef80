//! stackbind - compile-time marshalling onto an embedded runtime's value stack
//!
//! Host values are pushed through the [`Push`] trait: the static type picks
//! the strategy, and a type without one does not compile. The [`runtime`]
//! module provides the stack-based runtime the strategies write to.

// Core modules
pub mod runtime;
pub mod usertype;
pub mod push;
pub mod pull;

// Ambient
pub mod error;
pub mod config;
pub mod logging;

// Re-export commonly used items
pub use runtime::{
    upvalue_index, NativeFn, RegistryRef, StackGuard, StackRef, State, Type, Value, MULTRET,
};
pub use usertype::{Identifiers, UniqueUsertype, Usertype};
pub use push::{
    push, push_keyed, AsFunction, ByMut, ByRef, Bytes, CClosure, Closure, Light, LightUserdata,
    MetaFunction, MetatableKey, Nil, NoMetatable, Push, PushKeyed, Sequence, Associative,
    ThisState, User, UserdataValue,
};
pub use pull::{get, Pull, Tracking};
pub use error::{ConfigError, ConfigResult, StackError, StackResult};
pub use config::BindConfig;
