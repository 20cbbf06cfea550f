//! In-memory [`BlobStore`] implementation for tests and embedding.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Versions start at 1 and
//! increase by one on every successful swap.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{BlobStore, VersionedBlob};

/// In-memory blob backend.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, VersionedBlob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn load(&self, key: &str) -> Result<Option<VersionedBlob>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| anyhow!("blob map lock poisoned"))?;
        Ok(blobs.get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> Result<Option<u64>> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| anyhow!("blob map lock poisoned"))?;
        let current = blobs.get(key).map(|b| b.version);
        if current != expected {
            return Ok(None);
        }
        let version = current.unwrap_or(0) + 1;
        blobs.insert(
            key.to_string(),
            VersionedBlob {
                version,
                value: value.to_string(),
            },
        );
        Ok(Some(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn swap_requires_matching_version() {
        let store = InMemoryBlobStore::new();
        assert!(store.load("k").await.unwrap().is_none());

        assert_eq!(store.compare_and_swap("k", None, "a").await.unwrap(), Some(1));
        assert_eq!(store.compare_and_swap("k", None, "b").await.unwrap(), None);
        assert_eq!(store.compare_and_swap("k", Some(2), "b").await.unwrap(), None);
        assert_eq!(store.compare_and_swap("k", Some(1), "b").await.unwrap(), Some(2));

        let blob = store.load("k").await.unwrap().unwrap();
        assert_eq!(blob.version, 2);
        assert_eq!(blob.value, "b");
    }
}
