use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{BlobStore, ObjectKey, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory blob store for tests/dev.
#[derive(Debug)]
pub struct InMemoryBlobStore {
    base_url: String,
    inner: RwLock<HashMap<ObjectKey, StoredBlob>>,
}

impl InMemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &ObjectKey) -> Option<StoredBlob> {
        self.inner.read().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StorageError::Backend("in-memory blob store lock poisoned".to_string()))?;
        map.insert(
            key.clone(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StorageError::Backend("in-memory blob store lock poisoned".to_string()))?;
        if map.remove(key).is_none() {
            tracing::debug!(key = %key, "blob to delete was already gone");
        }
        Ok(())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
