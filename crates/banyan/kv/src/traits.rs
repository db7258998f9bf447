use crate::KvResult;
use async_trait::async_trait;
use serde_json::Value;

/// Storage contract for the flat key-value table.
///
/// Each operation touches exactly one key, except `scan_prefix`, which is a
/// read-only range enumeration. Multi-key sequences (entity plus pointers)
/// are ordered by the callers above this trait.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Point read. `None` when the key is absent.
    async fn get(&self, key: &str) -> KvResult<Option<Value>>;

    /// Upsert. Overwrites any previous value under the key.
    async fn set(&self, key: &str, value: Value) -> KvResult<()>;

    /// Remove the key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> KvResult<()>;

    /// All values whose key starts with `prefix`, in key order.
    async fn scan_prefix(&self, prefix: &str) -> KvResult<Vec<Value>>;
}
