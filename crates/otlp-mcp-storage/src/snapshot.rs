//! Named, immutable position bookmarks (§4.4).
//!
//! A snapshot is three integers, not a copy of data — taking one is O(1) and
//! holds no lock beyond the snapshot manager's own mutex.

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, StoreError};

/// A named bookmark into the three signal buffers' position spaces (§3).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Snapshot {
    pub trace_position: u64,
    pub log_position: u64,
    pub metric_position: u64,
    pub created_at_unix_nanos: u128,
}

pub(crate) fn now_unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos()
}

/// Insertion-ordered, keyed collection of snapshots, one mutex shared by all
/// three signals (§5: "a separate mutex for the snapshot manager").
#[derive(Default)]
pub struct SnapshotManager {
    snapshots: Mutex<IndexMap<String, Snapshot>>,
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name -> snapshot`. Fails with [`StoreError::InvalidInput`] for
    /// an empty name and [`StoreError::DuplicateName`] if `name` is already
    /// in use — snapshots are never silently overwritten.
    pub fn create(&self, name: &str, snapshot: Snapshot) -> Result<()> {
        if name.is_empty() {
            return Err(StoreError::InvalidInput(
                "snapshot name must not be empty".into(),
            ));
        }
        let mut snapshots = self.snapshots.lock().expect("snapshot mutex poisoned");
        if snapshots.contains_key(name) {
            return Err(StoreError::DuplicateName(name.to_string()));
        }
        snapshots.insert(name.to_string(), snapshot);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Snapshot> {
        self.snapshots
            .lock()
            .expect("snapshot mutex poisoned")
            .get(name)
            .copied()
    }

    /// All snapshots in creation order, oldest first.
    pub fn list(&self) -> Vec<(String, Snapshot)> {
        self.snapshots
            .lock()
            .expect("snapshot mutex poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let mut snapshots = self.snapshots.lock().expect("snapshot mutex poisoned");
        snapshots
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().expect("snapshot mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every named snapshot (§4.5 `Clear()`: "clears all three buffers
    /// and all snapshots").
    pub fn clear(&self) {
        self.snapshots.lock().expect("snapshot mutex poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(n: u64) -> Snapshot {
        Snapshot {
            trace_position: n,
            log_position: n,
            metric_position: n,
            created_at_unix_nanos: 0,
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let mgr = SnapshotManager::new();
        mgr.create("before-deploy", snap(10)).unwrap();
        assert_eq!(mgr.get("before-deploy").unwrap().trace_position, 10);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mgr = SnapshotManager::new();
        mgr.create("a", snap(0)).unwrap();
        assert_eq!(
            mgr.create("a", snap(1)).unwrap_err(),
            StoreError::DuplicateName("a".into())
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        let mgr = SnapshotManager::new();
        assert!(matches!(
            mgr.create("", snap(0)),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mgr = SnapshotManager::new();
        mgr.create("first", snap(1)).unwrap();
        mgr.create("second", snap(2)).unwrap();
        let names: Vec<_> = mgr.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn delete_missing_snapshot_is_not_found() {
        let mgr = SnapshotManager::new();
        assert_eq!(
            mgr.delete("nope").unwrap_err(),
            StoreError::NotFound("nope".into())
        );
    }

    #[test]
    fn clear_removes_every_snapshot() {
        let mgr = SnapshotManager::new();
        mgr.create("first", snap(1)).unwrap();
        mgr.create("second", snap(2)).unwrap();
        mgr.clear();
        assert!(mgr.is_empty());
        assert!(mgr.get("first").is_none());
    }
}
