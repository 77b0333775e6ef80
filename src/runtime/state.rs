//! Runtime state - value stack, call frames, registry and userdata heap
//!
//! Design: Models a Lua-style stack API. Positive indices count from the base
//! of the current call frame, negative indices count back from the top, and
//! indices at or below [`PSEUDO_BASE`] address the running closure's upvalues.
//! The heap keeps one strong reference to every userdata block, so a block
//! whose count drops to one is unreachable and eligible for its `__gc`.

use core::ffi::c_void;
use std::collections::HashMap;

use super::finalizer::FinalizerRegistry;
use super::function::{FunctionRef, NativeFn};
use super::reference::RegistryRef;
use super::table::TableRef;
use super::userdata::{Handle, UserdataBlock, UserdataRef};
use super::value::{Integer, Number, ThreadId, Type, Value};
use crate::config::BindConfig;
use crate::error::{StackError, StackResult};
use crate::logging;
use crate::pull::Pull;
use crate::usertype::Identifiers;

/// Request every result of a call
pub const MULTRET: i32 = -1;

/// First pseudo-index; upvalue `i` lives at `PSEUDO_BASE - i`
pub const PSEUDO_BASE: i32 = -1_001_000;

/// Pseudo-index of the running closure's `i`-th upvalue (1-based)
#[inline]
pub const fn upvalue_index(i: i32) -> i32 {
    PSEUDO_BASE - i
}

/// Activation record of a native call
#[derive(Debug)]
struct Frame {
    base: usize,
    function: FunctionRef,
}

/// Runtime instance
///
/// Owns everything pushed into it. Not `Send`: slots hold `Rc` payloads and
/// raw pointers, so a state stays on the thread that created it.
pub struct State {
    stack: Vec<Value>,
    frames: Vec<Frame>,
    metatables: HashMap<String, TableRef>,
    refs: Vec<Value>,
    free_refs: Vec<usize>,
    globals: TableRef,
    heap: Vec<UserdataRef>,
    finalizers: FinalizerRegistry,
    identifiers: Identifiers,
    config: BindConfig,
    closed: bool,
}

impl State {
    /// Create a state with the default configuration
    pub fn new() -> Self {
        Self::with_config(BindConfig::default())
    }

    pub fn with_config(config: BindConfig) -> Self {
        logging::log_state_created(config.stack.initial_capacity, config.stack.max_slots);

        Self {
            stack: Vec::with_capacity(config.stack.initial_capacity),
            frames: Vec::new(),
            metatables: HashMap::new(),
            refs: Vec::new(),
            free_refs: Vec::new(),
            globals: TableRef::new(0, 0),
            heap: Vec::new(),
            finalizers: FinalizerRegistry::new(),
            identifiers: Identifiers::new(&config.identifier_prefix),
            config,
            closed: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    #[inline]
    pub fn finalizers(&self) -> &FinalizerRegistry {
        &self.finalizers
    }

    #[inline]
    pub fn finalizers_mut(&mut self) -> &mut FinalizerRegistry {
        &mut self.finalizers
    }

    #[inline]
    pub fn identifiers(&mut self) -> &mut Identifiers {
        &mut self.identifiers
    }

    // ========================================================================
    // Marshalling entry points
    // ========================================================================

    /// Push `value` with its type's default strategy; returns slots produced
    #[inline]
    pub fn push<T: crate::push::Push>(&mut self, value: T) -> i32 {
        crate::push::push(self, value)
    }

    /// Push `value` tagged with an explicit identifier
    #[inline]
    pub fn push_keyed<T: crate::push::PushKeyed>(&mut self, key: &str, value: T) -> i32 {
        crate::push::push_keyed(self, key, value)
    }

    /// Read the slot at `index` as `T`
    #[inline]
    pub fn get<T: Pull>(&self, index: i32) -> StackResult<T> {
        crate::pull::get(self, index)
    }

    // ========================================================================
    // Stack
    // ========================================================================

    #[inline]
    fn base(&self) -> usize {
        self.frames.last().map_or(0, |frame| frame.base)
    }

    /// Number of slots in the current frame
    #[inline]
    pub fn top(&self) -> i32 {
        (self.stack.len() - self.base()) as i32
    }

    /// Grow (with nils) or shrink the current frame to `index`
    pub fn set_top(&mut self, index: i32) {
        let base = self.base();
        let target = if index >= 0 {
            base + index as usize
        } else {
            let drop = (-index - 1) as usize;
            self.stack.len().saturating_sub(drop).max(base)
        };
        self.stack.resize(target, Value::Nil);
    }

    /// Remove `n` slots from the top
    #[inline]
    pub fn pop(&mut self, n: i32) {
        self.set_top(-n - 1);
    }

    /// Convert a top-relative index into a frame-relative one
    #[inline]
    pub fn abs_index(&self, index: i32) -> i32 {
        if index > 0 || index <= PSEUDO_BASE {
            index
        } else {
            self.top() + index + 1
        }
    }

    /// Ensure room for `extra` more slots
    pub fn check_stack(&mut self, extra: usize) -> StackResult<()> {
        let requested = self.stack.len() + extra;
        let limit = self.config.stack.max_slots;
        if requested > limit {
            return Err(StackError::StackOverflow { requested, limit });
        }
        self.stack.reserve(extra);
        Ok(())
    }

    fn position(&self, index: i32) -> Option<usize> {
        let base = self.base();
        if index > 0 {
            let pos = base + index as usize - 1;
            (pos < self.stack.len()).then_some(pos)
        } else if index < 0 && index > PSEUDO_BASE {
            let back = (-index) as usize;
            let pos = self.stack.len().checked_sub(back)?;
            (pos >= base).then_some(pos)
        } else {
            None
        }
    }

    /// Slot at `index`, upvalue pseudo-indices included
    pub fn value(&self, index: i32) -> Option<&Value> {
        if index < PSEUDO_BASE {
            let n = (PSEUDO_BASE - index) as usize;
            let frame = self.frames.last()?;
            return frame.function.upvalues().get(n - 1);
        }
        self.position(index).map(|pos| &self.stack[pos])
    }

    /// Tag of the slot at `index`; [`Type::None`] when invalid
    #[inline]
    pub fn type_of(&self, index: i32) -> Type {
        self.value(index).map_or(Type::None, Value::type_tag)
    }

    #[inline]
    pub fn is_none_or_nil(&self, index: i32) -> bool {
        matches!(self.type_of(index), Type::None | Type::Nil)
    }

    /// Push a copy of the slot at `index` (nil when invalid)
    pub fn push_value(&mut self, index: i32) {
        let value = self.value(index).cloned().unwrap_or(Value::Nil);
        self.stack.push(value);
    }

    /// Push an already-built value
    #[inline]
    pub fn push_raw(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Remove and return the top slot
    pub fn pop_value(&mut self) -> Value {
        if self.stack.len() > self.base() {
            self.stack.pop().unwrap_or(Value::Nil)
        } else {
            Value::Nil
        }
    }

    // ========================================================================
    // Primitive pushes
    // ========================================================================

    #[inline]
    pub fn push_nil(&mut self) {
        self.stack.push(Value::Nil);
    }

    #[inline]
    pub fn push_boolean(&mut self, b: bool) {
        self.stack.push(Value::Boolean(b));
    }

    #[inline]
    pub fn push_integer(&mut self, n: Integer) {
        self.stack.push(Value::Integer(n));
    }

    #[inline]
    pub fn push_number(&mut self, n: Number) {
        self.stack.push(Value::Number(n));
    }

    /// Push a byte string of exactly `bytes.len()` bytes (NULs included)
    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.stack.push(Value::string(bytes));
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    #[inline]
    pub fn push_light_userdata(&mut self, p: *mut c_void) {
        self.stack.push(Value::LightUserdata(p));
    }

    /// Push the running thread; returns whether it is the main thread
    pub fn push_thread(&mut self) -> bool {
        self.stack.push(Value::Thread(ThreadId(0)));
        true
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn table_at(&self, index: i32) -> Option<TableRef> {
        match self.value(index) {
            Some(Value::Table(t)) => Some(t.clone()),
            _ => None,
        }
    }

    /// Push a new table with preallocated array and hash parts
    pub fn create_table(&mut self, narr: i32, nrec: i32) {
        let table = TableRef::new(narr.max(0) as usize, nrec.max(0) as usize);
        self.stack.push(Value::Table(table));
    }

    /// `t[n] = top`, popping the value
    pub fn raw_set_index(&mut self, index: i32, n: Integer) {
        let table = self.table_at(index);
        let value = self.pop_value();
        match table {
            Some(t) => t.borrow_mut().set_int(n, value),
            None => self.warn_not_table(index, "raw_set_index"),
        }
    }

    /// `t[key] = value` with key at -2 and value at -1, popping both
    pub fn set_table(&mut self, index: i32) -> StackResult<()> {
        let table = self.table_at(index);
        let found = self.type_of(index);
        let value = self.pop_value();
        let key = self.pop_value();
        match table {
            Some(t) => t.borrow_mut().set(key, value),
            None => Err(StackError::TypeMismatch {
                index,
                expected: "table",
                found,
            }),
        }
    }

    /// `t[name] = top`, popping the value
    pub fn set_field(&mut self, index: i32, name: &str) {
        let table = self.table_at(index);
        let value = self.pop_value();
        match table {
            Some(t) => t.borrow_mut().set_str(name, value),
            None => self.warn_not_table(index, "set_field"),
        }
    }

    /// Push `t[n]`; returns its tag
    pub fn raw_get_index(&mut self, index: i32, n: Integer) -> Type {
        let value = self
            .table_at(index)
            .map_or(Value::Nil, |t| t.borrow().get_int(n));
        let tag = value.type_tag();
        self.stack.push(value);
        tag
    }

    /// Push `t[name]`; returns its tag
    pub fn get_field(&mut self, index: i32, name: &str) -> Type {
        let value = self
            .table_at(index)
            .map_or(Value::Nil, |t| t.borrow().get_str(name));
        let tag = value.type_tag();
        self.stack.push(value);
        tag
    }

    /// Raw length: border of a table, byte length of a string
    pub fn raw_len(&self, index: i32) -> usize {
        match self.value(index) {
            Some(Value::Table(t)) => t.borrow().len(),
            Some(Value::String(bytes)) => bytes.len(),
            _ => 0,
        }
    }

    /// Snapshot of every key/value pair of the table at `index`
    pub fn table_pairs(&self, index: i32) -> Vec<(Value, Value)> {
        self.table_at(index)
            .map(|t| t.borrow().pairs())
            .unwrap_or_default()
    }

    fn warn_not_table(&self, index: i32, operation: &str) {
        logging::log_runtime_warning(&format!(
            "{}: index {} holds {}, not a table",
            operation,
            index,
            self.type_of(index)
        ));
    }

    // ========================================================================
    // Userdata and metatables
    // ========================================================================

    /// Allocate a block owning `handle` and push it
    pub fn new_userdata(&mut self, handle: Box<dyn Handle>) -> UserdataRef {
        let block = UserdataRef::new(handle);
        self.heap.push(block.clone());
        self.stack.push(Value::Userdata(block.clone()));
        block
    }

    /// Block at `index`, if it holds full userdata
    pub fn userdata_handle(&self, index: i32) -> Option<UserdataRef> {
        match self.value(index) {
            Some(Value::Userdata(u)) => Some(u.clone()),
            _ => None,
        }
    }

    /// Address carried by full or light userdata at `index`; null otherwise
    pub fn to_userdata(&self, index: i32) -> *mut c_void {
        match self.value(index) {
            Some(Value::Userdata(u)) => UserdataBlock::address(u),
            Some(Value::LightUserdata(p)) => *p,
            _ => core::ptr::null_mut(),
        }
    }

    /// Push the registry metatable `name`, creating it when absent
    ///
    /// Returns whether it was created. New metatables carry `__name`.
    pub fn new_metatable(&mut self, name: &str) -> bool {
        if let Some(existing) = self.metatables.get(name) {
            let existing = existing.clone();
            self.stack.push(Value::Table(existing));
            return false;
        }

        let metatable = TableRef::new(0, 2);
        metatable
            .borrow_mut()
            .set_str("__name", Value::string(name.as_bytes()));
        self.metatables.insert(name.to_owned(), metatable.clone());
        self.stack.push(Value::Table(metatable));
        true
    }

    /// Push the registry metatable `name` (nil when absent)
    pub fn get_metatable_named(&mut self, name: &str) -> Type {
        match self.metatables.get(name) {
            Some(metatable) => {
                let metatable = metatable.clone();
                self.stack.push(Value::Table(metatable));
                Type::Table
            }
            None => {
                self.stack.push(Value::Nil);
                Type::Nil
            }
        }
    }

    /// Pop a table (or nil) and make it the metatable of the value at `index`
    pub fn set_metatable(&mut self, index: i32) {
        let target = self.value(index).cloned();
        let metatable = match self.pop_value() {
            Value::Table(t) => Some(t),
            _ => None,
        };

        match target {
            Some(Value::Table(t)) => t.borrow_mut().set_metatable(metatable),
            Some(Value::Userdata(u)) => u.set_metatable(metatable),
            other => logging::log_runtime_warning(&format!(
                "set_metatable: {} cannot carry a metatable",
                other.map_or(Type::None, |v| v.type_tag())
            )),
        }
    }

    /// Push the metatable of the value at `index`; false (and nothing pushed) if none
    pub fn get_metatable(&mut self, index: i32) -> bool {
        let metatable = match self.value(index) {
            Some(Value::Table(t)) => t.borrow().metatable().cloned(),
            Some(Value::Userdata(u)) => u.metatable(),
            _ => None,
        };

        match metatable {
            Some(t) => {
                self.stack.push(Value::Table(t));
                true
            }
            None => false,
        }
    }

    /// `__name` of the metatable attached to the value at `index`
    pub fn metatable_name_of(&self, index: i32) -> Option<String> {
        let metatable = match self.value(index)? {
            Value::Table(t) => t.borrow().metatable().cloned(),
            Value::Userdata(u) => u.metatable(),
            _ => None,
        }?;
        let name = metatable.borrow().get_str("__name");
        name.as_bytes()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Pop `n` upvalues and push a closure over them
    pub fn push_closure(&mut self, f: NativeFn, n: i32) {
        let n = (n.max(0) as usize).min(self.stack.len() - self.base());
        let upvalues = self.stack.split_off(self.stack.len() - n);
        self.stack.push(Value::Function(FunctionRef::new(f, upvalues)));
    }

    #[inline]
    pub fn push_function(&mut self, f: NativeFn) {
        self.push_closure(f, 0);
    }

    /// Call the function below the top `nargs` slots
    ///
    /// Function and arguments are replaced by `nresults` results (all of them
    /// for [`MULTRET`]), padded with nil. Returns the number of results left.
    pub fn call(&mut self, nargs: i32, nresults: i32) -> StackResult<i32> {
        let available = self.stack.len() - self.base();
        let nargs_usize = usize::try_from(nargs)
            .ok()
            .filter(|&n| n < available)
            .ok_or(StackError::InvalidIndex {
                index: nargs.saturating_neg().saturating_sub(1),
            })?;

        let func_pos = self.stack.len() - nargs_usize - 1;
        let function = match &self.stack[func_pos] {
            Value::Function(f) => f.clone(),
            other => {
                return Err(StackError::NotCallable {
                    found: other.type_tag(),
                })
            }
        };

        logging::log_call(nargs_usize, function.upvalues().len());

        let base = func_pos + 1;
        self.frames.push(Frame {
            base,
            function: function.clone(),
        });
        let returned = (function.native())(self);
        self.frames.pop();

        let produced = self.stack.len().saturating_sub(base);
        let returned = usize::try_from(returned).unwrap_or(0).min(produced);
        let mut results = self.stack.split_off(self.stack.len() - returned);
        self.stack.truncate(func_pos);

        if nresults != MULTRET {
            results.resize(nresults.max(0) as usize, Value::Nil);
        }
        let count = results.len() as i32;
        self.stack.extend(results);
        Ok(count)
    }

    /// Whether a native function is currently running
    #[inline]
    pub fn in_call(&self) -> bool {
        !self.frames.is_empty()
    }

    // ========================================================================
    // References and globals
    // ========================================================================

    /// Store a copy of the value at `index` in the registry
    ///
    /// Nil yields [`RegistryRef::NIL`] and stores nothing.
    pub fn reference(&mut self, index: i32) -> RegistryRef {
        let value = self.value(index).cloned().unwrap_or(Value::Nil);
        if value.is_nil() {
            return RegistryRef::NIL;
        }

        let slot = match self.free_refs.pop() {
            Some(slot) => {
                self.refs[slot] = value;
                slot
            }
            None => {
                self.refs.push(value);
                self.refs.len() - 1
            }
        };
        RegistryRef(slot as i32)
    }

    /// Push the value stored under `r` (nil when released or NIL)
    pub fn push_reference(&mut self, r: RegistryRef) {
        let value = usize::try_from(r.0)
            .ok()
            .and_then(|slot| self.refs.get(slot).cloned())
            .unwrap_or(Value::Nil);
        self.stack.push(value);
    }

    /// Release `r`; its slot may be reused
    pub fn unreference(&mut self, r: RegistryRef) {
        let Ok(slot) = usize::try_from(r.0) else {
            return;
        };
        if let Some(stored) = self.refs.get_mut(slot) {
            if !stored.is_nil() {
                *stored = Value::Nil;
                self.free_refs.push(slot);
            }
        }
    }

    /// Pop the top and store it as global `name`
    pub fn set_global(&mut self, name: &str) {
        let value = self.pop_value();
        self.globals.borrow_mut().set_str(name, value);
    }

    /// Push global `name`; returns its tag
    pub fn get_global(&mut self, name: &str) -> Type {
        let value = self.globals.borrow().get_str(name);
        let tag = value.type_tag();
        self.stack.push(value);
        tag
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Userdata blocks still tracked by the heap
    #[inline]
    pub fn live_userdata(&self) -> usize {
        self.heap.len()
    }

    /// Finalize every unreachable userdata block; returns how many were collected
    pub fn collect_garbage(&mut self) -> usize {
        let mut collected = 0;

        loop {
            let (dead, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.heap)
                .into_iter()
                .partition(|block| block.strong_count() == 1);
            self.heap = live;

            if dead.is_empty() {
                break;
            }
            for block in &dead {
                self.finalize(block);
            }
            collected += dead.len();
        }

        logging::log_gc_cycle(collected, self.heap.len());
        collected
    }

    /// Run the `__gc` of `block` once, with the block as argument 1
    fn finalize(&mut self, block: &UserdataRef) {
        if block.is_finalized() {
            return;
        }
        block.mark_finalized();

        let Some(metatable) = block.metatable() else {
            return;
        };
        let gc = metatable.borrow().get_str("__gc");
        let name = metatable.borrow().get_str("__name");
        let key = name
            .as_bytes()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();

        if !matches!(gc, Value::Function(_)) {
            return;
        }

        let top = self.stack.len();
        self.stack.push(gc);
        self.stack.push(Value::Userdata(block.clone()));
        match self.call(1, 0) {
            Ok(_) => {
                self.finalizers.note_run(&key);
                logging::log_finalizer_run(&key, block.pointee_name());
            }
            Err(e) => {
                self.stack.truncate(top);
                logging::log_runtime_error(&format!("__gc for {}: {}", key, e));
            }
        }
    }

    /// Finalize every remaining block exactly once and clear the stack
    ///
    /// Ignored while a native function is running: its own upvalues would be
    /// finalized under it. Close after the call returns.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.in_call() {
            logging::log_runtime_warning("close ignored inside a running native function");
            return;
        }

        let mut finalized = 0;
        while !self.heap.is_empty() {
            let blocks = std::mem::take(&mut self.heap);
            for block in blocks.iter().rev() {
                self.finalize(block);
            }
            finalized += blocks.len();
        }

        self.stack.clear();
        self.frames.clear();
        self.closed = true;
        logging::log_state_closed(finalized);
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for State {
    fn drop(&mut self) {
        if self.config.gc.finalize_on_close {
            self.close();
        }
    }
}

impl core::fmt::Debug for State {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("State")
            .field("top", &self.top())
            .field("frames", &self.frames.len())
            .field("metatables", &self.metatables.len())
            .field("userdata", &self.heap.len())
            .field("finalizers", &self.finalizers.len())
            .finish()
    }
}
