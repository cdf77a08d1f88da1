//! Storage Backends
//!
//! This module adapts the host's key/value primitive behind a narrow,
//! synchronous interface so the dispatcher never assumes a specific host API:
//!
//! - **memory**: shared in-memory map (tests, ephemeral hosts)
//! - **file**: one file per key on disk (persistent non-browser hosts)
//! - **error**: error taxonomy surfaced to the bridge
//!
//! Every backend is constructed for a single namespace. Operations never
//! observe or mutate entries outside that namespace, even when the
//! underlying store is shared with other applications or tabs.

pub mod error;
pub mod file;
pub mod memory;

use serde_json::Value;
use tokio::sync::broadcast;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;

/// A change applied to the backing store by something other than this
/// process's bridge (e.g. another tab writing the same namespace).
#[derive(Debug, Clone)]
pub enum StoreChange {
    /// An entry was written or overwritten
    Write { key: String, bytes: Vec<u8> },
    /// An entry was removed
    Remove { key: String },
    /// The whole namespace was cleared
    Clear,
}

/// Narrow adapter interface over the host's key/value store.
///
/// All operations are synchronous round trips; no cross-call state is
/// retained by the adapter beyond its namespace handle. `delete` is a no-op
/// for absent keys and `keys` returns entries in unspecified order.
pub trait StoreBackend: Send + 'static {
    /// Look up the bytes stored under `key`, if any
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing any existing entry
    fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()>;

    /// Delete the entry for `key`; succeeds if it was already absent
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// All keys currently present in the namespace
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Delete every entry in the namespace
    fn delete_all(&self) -> StoreResult<()>;

    /// Subscribe to external change events, for backends that surface them
    fn watch(&self) -> Option<broadcast::Receiver<StoreChange>> {
        None
    }
}

// The bootstrap sequencer selects a backend at runtime, so the bridge also
// accepts a boxed adapter.
impl StoreBackend for Box<dyn StoreBackend> {
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        (**self).write(key, bytes)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }

    fn delete_all(&self) -> StoreResult<()> {
        (**self).delete_all()
    }

    fn watch(&self) -> Option<broadcast::Receiver<StoreChange>> {
        (**self).watch()
    }
}

/// Encode a value for storage.
///
/// This is the serialization capability the bridge requires of any stored
/// value: shapes that cannot be encoded fail with
/// [`StoreError::Serialization`] rather than being silently coerced.
pub fn encode_value(value: &Value) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode previously stored bytes back into a value
pub fn decode_value(bytes: &[u8]) -> StoreResult<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_round_trip() {
        let value = json!({"title": "draft", "tags": ["a", "b"], "rev": 3});
        let bytes = encode_value(&value).unwrap();
        assert_eq!(decode_value(&bytes).unwrap(), value);
    }

    #[test]
    fn test_decode_rejects_corrupt_bytes() {
        let err = decode_value(b"{not json").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
