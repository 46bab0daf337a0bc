//! Secondary key -> positions indices, kept consistent with ring eviction.
//!
//! This is "the hardest correctness obligation in the system" (§4.2): every
//! [`CorrelationIndex::insert`] must be paired with an
//! [`CorrelationIndex::evict`] call from inside the same lock that performed
//! the ring overwrite, or the index leaks position entries for keys whose
//! backing item no longer exists.

use std::collections::HashMap;

/// A map from an arbitrary string key (trace id, service name, metric name,
/// ...) to the list of buffer positions currently carrying that key.
#[derive(Default)]
pub struct CorrelationIndex {
    positions_by_key: HashMap<String, Vec<u64>>,
}

impl CorrelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `position` was just appended under `key`.
    pub fn insert(&mut self, key: &str, position: u64) {
        self.positions_by_key
            .entry(key.to_owned())
            .or_default()
            .push(position);
    }

    /// Remove `position` from `key`'s list (called when the ring evicts the
    /// item that carried it). Deletes the key entirely once its position
    /// list is empty, which is the invariant that bounds index growth.
    pub fn evict(&mut self, key: &str, position: u64) {
        if let Some(positions) = self.positions_by_key.get_mut(key) {
            positions.retain(|&p| p != position);
            if positions.is_empty() {
                self.positions_by_key.remove(key);
            }
        }
    }

    /// Positions ever recorded under `key`, not yet filtered for liveness.
    /// Callers must check each position against the buffer's current
    /// `oldest()`/`newest()` before translating it back to a value (§4.2).
    pub fn positions(&self, key: &str) -> &[u64] {
        self.positions_by_key
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct keys currently tracked (used for `distinct trace
    /// count` / `distinct service count` stats).
    pub fn distinct_keys(&self) -> usize {
        self.positions_by_key.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.positions_by_key.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.positions_by_key.clear();
    }
}
