//! Runtime model - in-process stand-in for an embedded scripting runtime
//!
//! Design: Lua-flavoured stack API with just enough semantics to exercise the
//! marshalling layer: tagged slots, tables, userdata with metatables, native
//! closures with upvalues, a reference registry and finalizers.
//!
//! Architecture:
//! - `value.rs` - slot contents and tags
//! - `table.rs` - array + hash tables
//! - `userdata.rs` - handle-owning blocks
//! - `function.rs` - native closures
//! - `state.rs` - the stack API itself
//! - `finalizer.rs` - per-state `__gc` registry
//! - `reference.rs` - stack and registry references
//! - `guard.rs` - stack balance checks

mod value;
mod table;
mod userdata;
mod function;
mod state;
mod finalizer;
mod reference;
mod guard;

#[cfg(test)]
mod tests;

pub use value::{Integer, Number, ThreadId, Type, Value};
pub use table::{Table, TableRef};
pub use userdata::{Handle, UserdataBlock, UserdataRef};
pub use function::{Function, FunctionRef, NativeFn};
pub use state::{upvalue_index, State, MULTRET, PSEUDO_BASE};
pub use finalizer::{FinalizerEntry, FinalizerRegistry};
pub use reference::{RegistryRef, StackRef};
pub use guard::StackGuard;
