//! In-Memory Store Backend
//!
//! A shared map standing in for the host's key/value store. Used by tests
//! and by hosts without persistence. Handles created with
//! [`MemoryStore::with_namespace`] share the same map under different
//! namespaces, which models a backing store shared between applications.
//!
//! External mutations (another tab writing the same namespace) are modeled
//! by the `publish_*` methods: they mutate the map and broadcast a
//! [`StoreChange`]. Writes through the [`StoreBackend`] interface do not
//! broadcast, matching hosts where change events fire only in
//! non-originating contexts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::error::{StoreError, StoreResult};
use super::{encode_value, StoreBackend, StoreChange};

/// Capacity of the change-event broadcast channel
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// In-memory key/value store scoped to one namespace
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Mutex<SharedMap>>,
    namespace: String,
    changes: broadcast::Sender<StoreChange>,
}

/// Map state shared across all namespace handles
struct SharedMap {
    entries: HashMap<String, Vec<u8>>,
    quota_bytes: Option<u64>,
    available: bool,
}

impl MemoryStore {
    /// Create an empty store scoped to `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Mutex::new(SharedMap {
                entries: HashMap::new(),
                quota_bytes: None,
                available: true,
            })),
            namespace: namespace.into(),
            changes,
        }
    }

    /// Limit the total stored value bytes across the whole shared map
    pub fn with_quota(self, bytes: u64) -> Self {
        if let Ok(mut shared) = self.shared.lock() {
            shared.quota_bytes = Some(bytes);
        }
        self
    }

    /// A handle onto the same shared map under a different namespace
    ///
    /// Change events are per-namespace, so the new handle gets its own
    /// broadcast channel.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            shared: Arc::clone(&self.shared),
            namespace: namespace.into(),
            changes,
        }
    }

    /// Toggle availability; while unavailable every operation fails with
    /// [`StoreError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.available = available;
        }
    }

    /// Apply a write as if another tab performed it, broadcasting the change
    pub fn publish_write(&self, key: &str, value: &serde_json::Value) -> StoreResult<()> {
        let bytes = encode_value(value)?;
        {
            let mut shared = self.lock()?;
            let scoped = self.scoped(key);
            shared.check_quota(&scoped, bytes.len() as u64)?;
            shared.entries.insert(scoped, bytes.clone());
        }

        let _ = self.changes.send(StoreChange::Write {
            key: key.to_string(),
            bytes,
        });
        Ok(())
    }

    /// Apply a removal as if another tab performed it
    pub fn publish_remove(&self, key: &str) -> StoreResult<()> {
        self.lock()?.entries.remove(&self.scoped(key));
        let _ = self.changes.send(StoreChange::Remove {
            key: key.to_string(),
        });
        Ok(())
    }

    /// Clear the namespace as if another tab performed it
    pub fn publish_clear(&self) -> StoreResult<()> {
        let prefix = self.prefix();
        self.lock()?.entries.retain(|k, _| !k.starts_with(&prefix));
        let _ = self.changes.send(StoreChange::Clear);
        Ok(())
    }

    fn prefix(&self) -> String {
        format!("{}/", self.namespace)
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}/{}", self.namespace, key)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, SharedMap>> {
        let shared = self
            .shared
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

        if !shared.available {
            return Err(StoreError::Unavailable(
                "storage disabled by host environment".to_string(),
            ));
        }

        Ok(shared)
    }
}

impl SharedMap {
    /// Reject a write of `incoming` bytes for `scoped_key` if it would push
    /// the map past its quota
    fn check_quota(&self, scoped_key: &str, incoming: u64) -> StoreResult<()> {
        let Some(quota) = self.quota_bytes else {
            return Ok(());
        };

        let current: u64 = self.entries.values().map(|v| v.len() as u64).sum();
        let replaced = self
            .entries
            .get(scoped_key)
            .map(|v| v.len() as u64)
            .unwrap_or(0);
        let projected = current - replaced + incoming;

        if projected > quota {
            return Err(StoreError::QuotaExceeded(projected, quota));
        }

        Ok(())
    }
}

impl StoreBackend for MemoryStore {
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.lock()?.entries.get(&self.scoped(key)).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let mut shared = self.lock()?;
        let scoped = self.scoped(key);
        shared.check_quota(&scoped, bytes.len() as u64)?;
        shared.entries.insert(scoped, bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.lock()?.entries.remove(&self.scoped(key));
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let prefix = self.prefix();
        Ok(self
            .lock()?
            .entries
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .map(String::from)
            .collect())
    }

    fn delete_all(&self) -> StoreResult<()> {
        let prefix = self.prefix();
        self.lock()?.entries.retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    fn watch(&self) -> Option<broadcast::Receiver<StoreChange>> {
        Some(self.changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_read_round_trip() {
        let store = MemoryStore::new("app");
        store.write("greeting", b"\"hi\"").unwrap();
        assert_eq!(store.read("greeting").unwrap(), Some(b"\"hi\"".to_vec()));
    }

    #[test]
    fn test_read_absent_key() {
        let store = MemoryStore::new("app");
        assert_eq!(store.read("missing").unwrap(), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryStore::new("app");
        store.write("k", b"1").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None);
    }

    #[test]
    fn test_namespace_isolation() {
        let app = MemoryStore::new("app");
        let other = app.with_namespace("other");

        app.write("k", b"1").unwrap();
        other.write("k", b"2").unwrap();

        app.delete_all().unwrap();

        assert_eq!(app.read("k").unwrap(), None);
        assert_eq!(other.read("k").unwrap(), Some(b"2".to_vec()));
        assert_eq!(other.keys().unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let store = MemoryStore::new("app").with_quota(8);
        store.write("a", b"1234").unwrap();

        let err = store.write("b", b"123456").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded(10, 8)));

        // Replacing an existing entry only counts the difference
        store.write("a", b"12345678").unwrap();
    }

    #[test]
    fn test_unavailable_store_fails_every_operation() {
        let store = MemoryStore::new("app");
        store.write("k", b"1").unwrap();
        store.set_available(false);

        assert!(matches!(
            store.read("k").unwrap_err(),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            store.write("k", b"2").unwrap_err(),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            store.keys().unwrap_err(),
            StoreError::Unavailable(_)
        ));

        store.set_available(true);
        assert_eq!(store.read("k").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_publish_write_broadcasts_and_stores() {
        let store = MemoryStore::new("app");
        let mut rx = store.watch().unwrap();

        store.publish_write("shared", &json!({"from": "other tab"})).unwrap();

        match rx.try_recv().unwrap() {
            StoreChange::Write { key, bytes } => {
                assert_eq!(key, "shared");
                assert_eq!(
                    serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(),
                    json!({"from": "other tab"})
                );
            }
            other => panic!("expected Write change, got {:?}", other),
        }

        assert!(store.read("shared").unwrap().is_some());
    }

    #[test]
    fn test_publish_clear_scopes_to_namespace() {
        let app = MemoryStore::new("app");
        let other = app.with_namespace("other");
        app.write("k", b"1").unwrap();
        other.write("k", b"2").unwrap();

        let mut rx = app.watch().unwrap();
        app.publish_clear().unwrap();

        assert!(matches!(rx.try_recv().unwrap(), StoreChange::Clear));
        assert_eq!(app.read("k").unwrap(), None);
        assert_eq!(other.read("k").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_bridge_writes_do_not_broadcast() {
        let store = MemoryStore::new("app");
        let mut rx = store.watch().unwrap();

        store.write("k", b"1").unwrap();
        assert!(rx.try_recv().is_err());
    }
}
