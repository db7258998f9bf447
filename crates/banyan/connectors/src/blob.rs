use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

/// Blob store errors.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object already exists at {0}")]
    AlreadyExists(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// A stored object's payload and metadata.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
    pub stored_at: DateTime<Utc>,
}

/// Binary object storage. Paths are opaque strings chosen by the caller;
/// the data core stores them as `filePath` pointers on paper records.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes at `path`. An occupied path is an error, never an
    /// overwrite.
    async fn put_object(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BlobError>;

    /// Remove the object at `path`.
    async fn delete_object(&self, path: &str) -> Result<(), BlobError>;

    /// Time-limited download URL for the object at `path`.
    async fn create_signed_url(&self, path: &str, ttl_seconds: u64) -> Result<String, BlobError>;
}

/// In-memory blob store for tests and single-process runs.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: DashMap<String, StoredObject>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at a stored object. Test helper.
    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.get(path).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_object(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BlobError> {
        match self.objects.entry(path.to_string()) {
            Entry::Occupied(_) => Err(BlobError::AlreadyExists(path.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                    stored_at: Utc::now(),
                });
                debug!(path = %path, "stored object");
                Ok(())
            }
        }
    }

    async fn delete_object(&self, path: &str) -> Result<(), BlobError> {
        match self.objects.remove(path) {
            Some(_) => {
                debug!(path = %path, "deleted object");
                Ok(())
            }
            None => Err(BlobError::NotFound(path.to_string())),
        }
    }

    async fn create_signed_url(&self, path: &str, ttl_seconds: u64) -> Result<String, BlobError> {
        if !self.objects.contains_key(path) {
            return Err(BlobError::NotFound(path.to_string()));
        }
        let expires = Utc::now().timestamp() + ttl_seconds as i64;
        Ok(format!("memory://papers/{path}?expires={expires}"))
    }
}
