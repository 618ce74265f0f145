//! In-memory blob storage

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::{Blob, ObjectBody};

/// HashMap-backed blob store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBlob {
    objects: RwLock<HashMap<(String, String), Bytes>>,
}

impl MemoryBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl Blob for MemoryBlob {
    async fn create(&self, bucket: &str, key: &str, contents: Bytes) -> Result<()> {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), contents);
        Ok(())
    }

    async fn open(&self, bucket: &str, key: &str) -> Result<ObjectBody> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .map(ObjectBody::Inline)
            .ok_or(Error::NotFound)
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .await
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
