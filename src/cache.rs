//! Durable response cache.
//!
//! Catalog responses are stored as one JSON file per request under the cache
//! directory, keyed by a SHA-256 of the endpoint and the sorted query
//! parameters. Entries survive restarts and expire after [`CACHE_TTL`].

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const CACHE_TTL: Duration = Duration::from_secs(86400 * 7);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache entry is not valid json: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: i64,
    endpoint: String,
    value: Value,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now().timestamp() - self.stored_at;
        age < 0 || age as u64 >= ttl.as_secs()
    }
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_ttl(root, CACHE_TTL)
    }

    pub fn with_ttl(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache key for a request: endpoint plus every parameter, order-independent.
    pub fn key(endpoint: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        for (name, value) in sorted {
            hasher.update(b"\x1f");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Returns the cached value, or `None` when absent or expired. Expired
    /// entries are removed on the way out.
    pub async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Option<Value>, CacheError> {
        let path = self.entry_path(endpoint, params);
        let content = match async_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_str(&content)?;
        if entry.is_expired(self.ttl) {
            let _ = async_fs::remove_file(&path).await;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    pub async fn put(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        value: &Value,
    ) -> Result<(), CacheError> {
        async_fs::create_dir_all(&self.root).await?;

        let entry = CacheEntry {
            stored_at: Utc::now().timestamp(),
            endpoint: endpoint.to_string(),
            value: value.clone(),
        };
        let json = serde_json::to_string(&entry)?;
        async_fs::write(self.entry_path(endpoint, params), json).await?;
        Ok(())
    }

    /// Removes every entry.
    pub async fn clear(&self) -> Result<(), CacheError> {
        match async_fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes expired or unreadable entries and returns how many were dropped.
    pub async fn purge_expired(&self) -> Result<usize, CacheError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let stale = match async_fs::read_to_string(&path).await {
                Ok(content) => serde_json::from_str::<CacheEntry>(&content)
                    .map(|e| e.is_expired(self.ttl))
                    .unwrap_or(true),
                Err(_) => true,
            };
            if stale {
                async_fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn entry_path(&self, endpoint: &str, params: &[(String, String)]) -> PathBuf {
        self.root
            .join(format!("{key}.json", key = Self::key(endpoint, params)))
    }
}
