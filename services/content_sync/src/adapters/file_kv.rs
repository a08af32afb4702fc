//! services/content_sync/src/adapters/file_kv.rs
//!
//! Device storage as one file per key under a cache directory. Writes go to a
//! temporary file first and are renamed into place, so a reader sees either the
//! old value or the new one.

use async_trait::async_trait;
use party_content_core::ports::{KeyValueStore, StorageError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Clone, Debug)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(key)))
    }
}

/// Keys may contain separators; anything outside `[A-Za-z0-9_-]` is hex-escaped.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => stem.push(byte as char),
            other => stem.push_str(&format!("%{other:02x}")),
        }
    }
    stem
}

fn storage_error(action: &str, path: &Path, e: std::io::Error) -> StorageError {
    StorageError(format!("failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", &path, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| storage_error("create", &self.root, e))?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .await
            .map_err(|e| storage_error("write", &tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| storage_error("replace", &path, e))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_a_new_handle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileKeyValueStore::new(dir.path().join("cache"));
        store
            .set("party_content:theme:basic", "[]")
            .await
            .expect("set");

        let reopened = FileKeyValueStore::new(dir.path().join("cache"));
        assert_eq!(
            reopened.get("party_content:theme:basic").await.expect("get"),
            Some("[]".to_string())
        );
        assert_eq!(reopened.get("party_content:pair:basic").await.expect("get"), None);
    }

    #[tokio::test]
    async fn overwrite_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileKeyValueStore::new(dir.path());
        store.set("k", "one").await.expect("set");
        store.set("k", "two").await.expect("overwrite");
        assert_eq!(store.get("k").await.expect("get"), Some("two".to_string()));

        store.remove("k").await.expect("remove");
        store.remove("k").await.expect("removing twice is fine");
        assert_eq!(store.get("k").await.expect("get"), None);
    }

    #[test]
    fn separators_do_not_collide() {
        assert_ne!(file_stem("a:b"), file_stem("a_b"));
        assert_eq!(file_stem("party_content:theme"), "party_content%3atheme");
    }
}
