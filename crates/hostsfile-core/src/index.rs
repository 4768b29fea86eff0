//! Key → record position lookup
//!
//! The store keeps one index for addresses and one for names. Each index
//! serializes every reader and writer behind its own mutex, so concurrent
//! lookups never see a half-updated map.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mapping from a key to the positions of records that reference it
#[derive(Debug, Default)]
pub struct Index {
    positions: Mutex<HashMap<String, Vec<usize>>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every method goes through here. The map is never left half-edited,
    /// so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<usize>>> {
        self.positions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `pos` references `key`
    pub fn add(&self, key: &str, pos: usize) {
        self.lock().entry(key.to_string()).or_default().push(pos);
    }

    /// Positions referencing `key`, in insertion order
    ///
    /// Returns a copy; empty when the key is unknown.
    pub fn get(&self, key: &str) -> Vec<usize> {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Forget that `pos` references `key`
    ///
    /// The key itself is dropped once nothing references it.
    pub fn remove(&self, key: &str, pos: usize) {
        let mut map = self.lock();
        if let Some(positions) = map.get_mut(key) {
            positions.retain(|p| *p != pos);
            if positions.is_empty() {
                map.remove(key);
            }
        }
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Swap in a freshly built mapping
    pub(crate) fn replace(&self, positions: HashMap<String, Vec<usize>>) {
        *self.lock() = positions;
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> Vec<(String, Vec<usize>)> {
        self.lock()
            .iter()
            .map(|(key, positions)| (key.clone(), positions.clone()))
            .collect()
    }
}
