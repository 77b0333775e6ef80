//! Table storage - the runtime's single composite value
//!
//! Design: Array part for the dense 1-based prefix, insertion-ordered hash part
//! for everything else. Keys migrate from the hash part into the array part
//! when the prefix grows to reach them.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use super::value::{Integer, Key, Value};
use crate::error::{StackError, StackResult};

/// Table contents
#[derive(Debug, Default)]
pub struct Table {
    array: Vec<Value>,
    entries: Vec<(Value, Value)>,
    index: HashMap<Key, usize>,
    metatable: Option<TableRef>,
}

impl Table {
    /// Create table with preallocated array and hash parts
    pub fn with_capacity(narr: usize, nrec: usize) -> Self {
        Self {
            array: Vec::with_capacity(narr),
            entries: Vec::with_capacity(nrec),
            index: HashMap::with_capacity(nrec),
            metatable: None,
        }
    }

    /// Raw read
    pub fn get(&self, key: &Value) -> Value {
        match Key::from_value(key) {
            Some(Key::Integer(i)) => self.get_int(i),
            Some(k) => self.lookup(&k),
            None => Value::Nil,
        }
    }

    /// Raw read of an integer key
    pub fn get_int(&self, n: Integer) -> Value {
        if n >= 1 && (n as usize) <= self.array.len() {
            return self.array[n as usize - 1].clone();
        }
        self.lookup(&Key::Integer(n))
    }

    /// Raw read of a string key
    pub fn get_str(&self, name: &str) -> Value {
        self.lookup(&Key::String(Rc::from(name.as_bytes())))
    }

    fn lookup(&self, key: &Key) -> Value {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1.clone())
            .unwrap_or(Value::Nil)
    }

    /// Raw write; nil and NaN keys are rejected
    pub fn set(&mut self, key: Value, value: Value) -> StackResult<()> {
        match Key::from_value(&key) {
            Some(Key::Integer(i)) => {
                self.set_int(i, value);
                Ok(())
            }
            Some(k) => {
                self.store(k, key, value);
                Ok(())
            }
            None => Err(StackError::InvalidKey {
                found: if key.is_nil() { "nil" } else { "NaN" },
            }),
        }
    }

    /// Raw write of an integer key
    pub fn set_int(&mut self, n: Integer, value: Value) {
        let len = self.array.len();

        if n >= 1 && (n as usize) <= len {
            self.array[n as usize - 1] = value;
            if n as usize == len {
                self.trim_array();
            }
            return;
        }

        if n >= 1 && n as usize == len + 1 && !value.is_nil() {
            self.remove(&Key::Integer(n));
            self.array.push(value);
            self.migrate();
            return;
        }

        self.store(Key::Integer(n), Value::Integer(n), value);
    }

    /// Raw write of a string key
    pub fn set_str(&mut self, name: &str, value: Value) {
        let bytes: Rc<[u8]> = Rc::from(name.as_bytes());
        self.store(Key::String(bytes.clone()), Value::String(bytes), value);
    }

    fn store(&mut self, key: Key, key_value: Value, value: Value) {
        if value.is_nil() {
            self.remove(&key);
            return;
        }

        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key_value, value));
            }
        }
    }

    fn remove(&mut self, key: &Key) -> Option<Value> {
        let slot = self.index.remove(key)?;
        let (_, value) = self.entries.swap_remove(slot);

        // Re-point the entry that was moved into the vacated slot
        if slot < self.entries.len() {
            if let Some(moved) = Key::from_value(&self.entries[slot].0) {
                self.index.insert(moved, slot);
            }
        }
        Some(value)
    }

    /// Pull consecutive integer keys out of the hash part
    fn migrate(&mut self) {
        loop {
            let next = self.array.len() as Integer + 1;
            match self.remove(&Key::Integer(next)) {
                Some(value) => self.array.push(value),
                None => break,
            }
        }
    }

    fn trim_array(&mut self) {
        while matches!(self.array.last(), Some(Value::Nil)) {
            self.array.pop();
        }
    }

    /// Border of the array part (raw length)
    #[inline]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.entries.is_empty()
    }

    /// Every non-nil key/value pair, array part first
    pub fn pairs(&self) -> Vec<(Value, Value)> {
        let mut out = Vec::with_capacity(self.array.len() + self.entries.len());
        for (i, value) in self.array.iter().enumerate() {
            if !value.is_nil() {
                out.push((Value::Integer(i as Integer + 1), value.clone()));
            }
        }
        out.extend(self.entries.iter().cloned());
        out
    }

    #[inline]
    pub fn metatable(&self) -> Option<&TableRef> {
        self.metatable.as_ref()
    }

    #[inline]
    pub fn set_metatable(&mut self, metatable: Option<TableRef>) {
        self.metatable = metatable;
    }
}

/// Shared handle to a table
#[derive(Debug, Clone)]
pub struct TableRef(Rc<RefCell<Table>>);

impl TableRef {
    pub fn new(narr: usize, nrec: usize) -> Self {
        Self(Rc::new(RefCell::new(Table::with_capacity(narr, nrec))))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, Table> {
        self.0.borrow()
    }

    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, Table> {
        self.0.borrow_mut()
    }

    /// Identity of the table
    #[inline]
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
