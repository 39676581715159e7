//! Image store abstraction
//!
//! Recipe and instruction images live in object storage behind an opaque
//! reference. The store sits outside the edit transaction: calls are best
//! effort and callers decide whether a failure aborts (recipe main image)
//! or degrades (instruction images).

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Trait for image storage backends
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the bytes and return an opaque reference
    async fn upload(&self, bytes: &[u8]) -> Result<String>;

    /// Delete by reference. Deleting a missing reference is not an error.
    async fn delete(&self, reference: &str) -> Result<()>;
}

/// S3-backed image store
pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    key_prefix: String,
}

impl S3ImageStore {
    /// Create a store from configuration, loading AWS credentials from the
    /// environment
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(ref endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            key_prefix: config.key_prefix.clone(),
        }
    }

    fn new_key(&self) -> String {
        format!("{}{}", self.key_prefix, Uuid::new_v4())
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(&self, bytes: &[u8]) -> Result<String> {
        let key = self.new_key();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(bytes.to_vec().into())
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("put_object failed: {}", e),
            })?;

        Ok(key)
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        // S3 DeleteObject is idempotent: deleting a missing key succeeds.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("delete_object failed: {}", e),
            })?;

        Ok(())
    }
}

/// In-memory image store for tests and local development
#[derive(Default)]
pub struct MemoryImageStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the reference currently holds an object
    pub fn contains(&self, reference: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(reference))
            .unwrap_or(false)
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, bytes: &[u8]) -> Result<String> {
        let reference = format!("mem://{}", Uuid::new_v4());
        let mut objects = self.objects.lock().map_err(|_| AppError::Internal {
            message: "image store lock poisoned".into(),
        })?;
        objects.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        let mut objects = self.objects.lock().map_err(|_| AppError::Internal {
            message: "image store lock poisoned".into(),
        })?;
        if objects.remove(reference).is_none() {
            tracing::debug!(reference = %reference, "Delete of missing image reference");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryImageStore::new();
        let reference = store.upload(b"bytes").await.unwrap();
        assert!(store.contains(&reference));

        store.delete(&reference).await.unwrap();
        assert!(!store.contains(&reference));
    }

    #[tokio::test]
    async fn test_memory_store_delete_is_idempotent() {
        let store = MemoryImageStore::new();
        store.delete("mem://missing").await.unwrap();
    }
}
