//! In-memory reference backend for the key-value contract.
//!
//! Deterministic and test-friendly: keys live in an ordered map, so prefix
//! scans return values in key order exactly like the PostgreSQL backend.

use crate::traits::KvStore;
use crate::{KvError, KvResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

/// In-memory key-value backend.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys. Test helper.
    pub fn len(&self) -> usize {
        self.entries.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<Value>> {
        let guard = self
            .entries
            .read()
            .map_err(|_| KvError::Backend("entries lock poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> KvResult<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| KvError::Backend("entries lock poisoned".to_string()))?;
        guard.insert(key.to_string(), value);
        debug!(key = %key, "stored value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| KvError::Backend("entries lock poisoned".to_string()))?;
        guard.remove(key);
        debug!(key = %key, "deleted key");
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> KvResult<Vec<Value>> {
        if prefix.is_empty() {
            return Err(KvError::InvalidInput(
                "scan prefix must not be empty".to_string(),
            ));
        }

        let guard = self
            .entries
            .read()
            .map_err(|_| KvError::Backend("entries lock poisoned".to_string()))?;
        Ok(guard
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, value)| value.clone())
            .collect())
    }
}
