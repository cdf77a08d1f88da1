//! File Store Backend
//!
//! Persists each key as one file under `<data_dir>/<namespace>/`, for hosts
//! without a browser-style key/value primitive. Keys are percent-encoded to
//! form safe file names, so arbitrary key text round-trips. This backend
//! has no change watching.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::error::{StoreError, StoreResult};
use super::StoreBackend;

/// File extension for stored entries
const ENTRY_EXT: &str = ".json";

/// File-backed key/value store scoped to one namespace directory
pub struct FileStore {
    root: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileStore {
    /// Open (creating if needed) the store for `namespace` under `data_dir`
    pub fn new(data_dir: impl AsRef<Path>, namespace: &str) -> StoreResult<Self> {
        let root = data_dir.as_ref().join(namespace);
        fs::create_dir_all(&root).map_err(|e| {
            StoreError::Unavailable(format!("cannot create store directory {:?}: {}", root, e))
        })?;

        Ok(Self {
            root,
            quota_bytes: None,
        })
    }

    /// Limit the total bytes stored in this namespace
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}{}", urlencoding::encode(key), ENTRY_EXT))
    }

    /// Total bytes currently stored, excluding the entry for `replacing`
    fn used_bytes(&self, replacing: &Path) -> StoreResult<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path() == replacing {
                continue;
            }
            total += entry.metadata()?.len();
        }
        Ok(total)
    }
}

impl StoreBackend for FileStore {
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.entry_path(key);

        if let Some(quota) = self.quota_bytes {
            let projected = self.used_bytes(&path)? + bytes.len() as u64;
            if projected > quota {
                return Err(StoreError::QuotaExceeded(projected, quota));
            }
        }

        fs::write(path, bytes)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(ENTRY_EXT) else {
                continue;
            };

            match urlencoding::decode(encoded) {
                Ok(key) => keys.push(key.into_owned()),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Skipping undecodable entry name");
                }
            }
        }

        Ok(keys)
    }

    fn delete_all(&self) -> StoreResult<()> {
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_entry = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(ENTRY_EXT));

            if is_entry {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "app").unwrap();

        store.write("draft", b"{\"rev\":1}").unwrap();
        assert_eq!(store.read("draft").unwrap(), Some(b"{\"rev\":1}".to_vec()));
    }

    #[test]
    fn test_read_absent_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "app").unwrap();
        assert_eq!(store.read("missing").unwrap(), None);
    }

    #[test]
    fn test_awkward_keys_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "app").unwrap();

        let key = "user/profile picture?v=2";
        store.write(key, b"1").unwrap();

        assert_eq!(store.read(key).unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.keys().unwrap(), vec![key.to_string()]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "app").unwrap();

        store.write("k", b"1").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None);
    }

    #[test]
    fn test_delete_all_scoped_to_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let app = FileStore::new(dir.path(), "app").unwrap();
        let other = FileStore::new(dir.path(), "other").unwrap();

        app.write("k", b"1").unwrap();
        other.write("k", b"2").unwrap();

        app.delete_all().unwrap();

        assert!(app.keys().unwrap().is_empty());
        assert_eq!(other.read("k").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "app")
            .unwrap()
            .with_quota(8);

        store.write("a", b"1234").unwrap();
        let err = store.write("b", b"123456").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded(10, 8)));

        // Replacing an entry only counts the difference
        store.write("a", b"12345678").unwrap();
    }
}
