//! Finalizer registry - which handle identifiers own a `__gc` routine
//!
//! Design: One registry per runtime instance, reached through the state.
//! Inserts are idempotent: the first registration for an identifier wins and
//! later attempts only bump a reuse counter.

use core::fmt;
use std::collections::HashMap;

use super::function::NativeFn;

/// Bookkeeping for one registered identifier
#[derive(Clone, Copy)]
pub struct FinalizerEntry {
    /// Routine installed as `__gc`
    pub finalizer: NativeFn,
    /// Pushes that found the identifier already registered
    pub reuses: usize,
    /// Times the runtime invoked the finalizer
    pub runs: usize,
}

impl fmt::Debug for FinalizerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizerEntry")
            .field("finalizer", &(self.finalizer as usize as *const ()))
            .field("reuses", &self.reuses)
            .field("runs", &self.runs)
            .finish()
    }
}

/// Per-state mapping from type identifier to finalizer
#[derive(Debug, Default)]
pub struct FinalizerRegistry {
    entries: HashMap<String, FinalizerEntry>,
}

impl FinalizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `finalizer` under `key`; returns false if `key` was already taken
    pub fn register(&mut self, key: &str, finalizer: NativeFn) -> bool {
        if self.entries.contains_key(key) {
            self.note_reuse(key);
            return false;
        }

        self.entries.insert(
            key.to_owned(),
            FinalizerEntry {
                finalizer,
                reuses: 0,
                runs: 0,
            },
        );
        crate::logging::log_finalizer_registered(key);
        true
    }

    /// Record a push that reused an existing registration
    pub fn note_reuse(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.reuses += 1;
            crate::logging::log_finalizer_reused(key, entry.reuses);
        }
    }

    pub(crate) fn note_run(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.runs += 1;
        }
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&FinalizerEntry> {
        self.entries.get(key)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identifiers, in no particular order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
