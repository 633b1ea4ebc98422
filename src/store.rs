//! Durable key-value storage abstraction
//!
//! This module defines the trait through which the core reaches the host's
//! durable, origin-scoped key-value store (browser local storage in
//! production). Injecting the store rather than reaching into a global
//! keeps the timer state machine testable with in-memory doubles.
//!
//! Store access is synchronous and assumed infallible; there is no retry
//! or backoff policy. The store is shared across all pages and tabs of one
//! browser profile, so writes from one page are visible to the next.

use std::collections::HashMap;

/// Trait for durable, origin-scoped key-value storage
///
/// Implementations might wrap browser local storage, a file, or a plain
/// map. Keys are namespaced by the callers; values are opaque strings.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, overwriting any previous value
    fn set(&mut self, key: &str, value: &str);

    /// Removes the entry under `key`; absent keys are a no-op
    fn remove(&mut self, key: &str);
}

/// In-memory store backed by a hash map
///
/// Suitable as a test double and for native hosts that do not need
/// persistence across runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    /// Stored entries
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
