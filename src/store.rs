// src/store.rs
//! Object store: the externally-owned key/value home for everything that must
//! outlive one process (the processed-history ledger, the drafting cache).
//!
//! Expiry policy: a value written with a TTL is treated as absent once
//! `now >= written_at + ttl`. Expired entries are removed lazily on `get` and
//! eagerly by `purge_expired`. Values without a TTL never expire.
//!
//! `FsObjectStore` keeps each value as a plain file under a root directory (so
//! the ledger stays a readable JSON document) with a `.meta.json` sidecar only
//! when a TTL is set. Writes go through a temp file + rename.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// `Ok(None)` for missing or expired keys.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Overwrite semantics.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Remove every expired entry; returns how many were removed.
    async fn purge_expired(&self) -> Result<usize>;
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn expiry_from(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|d| now_ms().saturating_add(i64::try_from(d.as_millis()).unwrap_or(i64::MAX)))
}

fn is_expired(expires_at_ms: Option<i64>) -> bool {
    expires_at_ms.is_some_and(|t| now_ms() >= t)
}

/// Keys are relative, `/`-separated, and may not climb out of the root.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        bail!("invalid object key `{key}`");
    }
    if key.ends_with(".meta.json") || key.ends_with(".tmp") {
        bail!("object key `{key}` uses a reserved suffix");
    }
    Ok(())
}

/* ----------------------------
Filesystem store
---------------------------- */

#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    expires_at_ms: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of a key (useful for logs and operators).
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.meta.json"))
    }

    async fn read_meta(&self, key: &str) -> Result<Option<Meta>> {
        match tokio::fs::read(self.meta_path(key)).await {
            Ok(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).with_context(|| format!("meta for `{key}`"))?,
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading meta for `{key}`")),
        }
    }

    async fn remove_quiet(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
        }
    }
}

/// Write to `<path>.tmp`, then rename over `path`.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        if let Some(meta) = self.read_meta(key).await? {
            if is_expired(meta.expires_at_ms) {
                self.delete(key).await?;
                return Ok(None);
            }
        }
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading object `{key}`")),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        validate_key(key)?;
        write_atomic(&self.path_for(key), &value).await?;
        match expiry_from(ttl) {
            Some(expires_at_ms) => {
                let meta = serde_json::to_vec(&Meta {
                    expires_at_ms: Some(expires_at_ms),
                })?;
                write_atomic(&self.meta_path(key), &meta).await?;
            }
            None => Self::remove_quiet(&self.meta_path(key)).await?,
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        Self::remove_quiet(&self.path_for(key)).await?;
        Self::remove_quiet(&self.meta_path(key)).await
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut removed = 0usize;
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let mut rd = match tokio::fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e).with_context(|| format!("listing {}", dir.display())),
            };
            while let Some(entry) = rd.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    stack.push(path);
                    continue;
                }
                let Some(name) = path.to_str() else { continue };
                let Some(data_path) = name.strip_suffix(".meta.json") else {
                    continue;
                };
                let meta: Meta = match tokio::fs::read(&path).await {
                    Ok(b) => serde_json::from_slice(&b).unwrap_or(Meta {
                        expires_at_ms: None,
                    }),
                    Err(_) => continue,
                };
                if is_expired(meta.expires_at_ms) {
                    Self::remove_quiet(Path::new(data_path)).await?;
                    Self::remove_quiet(&path).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

/* ----------------------------
In-memory store (tests, dry runs)
---------------------------- */

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    inner: Mutex<HashMap<String, (Vec<u8>, Option<i64>)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently held, expired or not.
    pub fn keys(&self) -> Vec<String> {
        let g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let mut keys: Vec<String> = g.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match g.get(key) {
            Some((_, exp)) if is_expired(*exp) => {
                g.remove(key);
                Ok(None)
            }
            Some((v, _)) => Ok(Some(v.clone())),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        validate_key(key)?;
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        g.insert(key.to_string(), (value, expiry_from(ttl)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        g.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let before = g.len();
        g.retain(|_, (_, exp)| !is_expired(*exp));
        Ok(before - g.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_validated() {
        for bad in ["", "/abs", "a/../b", "..", "a//b", "./a", "x.meta.json", "y.tmp", "a\\b"] {
            assert!(validate_key(bad).is_err(), "{bad} should be rejected");
        }
        for good in ["processed_history.json", "cache/drafts/abc.json"] {
            validate_key(good).unwrap();
        }
    }

    #[tokio::test]
    async fn fs_round_trip_without_ttl_is_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        assert!(store.get("state.json").await.unwrap().is_none());

        store
            .put("state.json", br#"{"urls":[]}"#.to_vec(), None)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("state.json")).unwrap(),
            r#"{"urls":[]}"#
        );
        assert!(!dir.path().join("state.json.meta.json").exists());
        assert!(!dir.path().join("state.json.tmp").exists());

        store.put("state.json", b"v2".to_vec(), None).await.unwrap();
        assert_eq!(store.get("state.json").await.unwrap().unwrap(), b"v2");
    }

    #[tokio::test]
    async fn fs_ttl_expiry_and_purge() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store
            .put("cache/a.json", b"a".to_vec(), Some(Duration::ZERO))
            .await
            .unwrap();
        store
            .put("cache/b.json", b"b".to_vec(), Some(Duration::ZERO))
            .await
            .unwrap();
        store
            .put("cache/c.json", b"c".to_vec(), Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        assert!(store.get("cache/a.json").await.unwrap().is_none());
        assert!(!dir.path().join("cache/a.json").exists(), "lazy removal on get");

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(!dir.path().join("cache/b.json").exists());
        assert_eq!(store.get("cache/c.json").await.unwrap().unwrap(), b"c");

        // Re-putting without TTL drops the old expiry.
        store
            .put("cache/c.json", b"c2".to_vec(), None)
            .await
            .unwrap();
        assert!(!dir.path().join("cache/c.json.meta.json").exists());
    }

    #[tokio::test]
    async fn memory_store_honours_ttl() {
        let store = MemoryObjectStore::new();
        store.put("k", b"v".to_vec(), None).await.unwrap();
        store
            .put("gone", b"x".to_vec(), Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap(), b"v");
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.keys(), vec!["k".to_string()]);
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
