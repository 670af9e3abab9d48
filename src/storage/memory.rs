//! In-process cache and store.
//!
//! Both types record every attempted write and can be told to fail specific
//! keys or ids, which makes them the backing for `--dry-run` and for the
//! pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{CacheError, StoreError};

use super::schema::MAX_PAYLOAD_LEN;
use super::{EventCache, EventStore};

/// In-memory key-value cache with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
    attempts: RwLock<HashMap<String, usize>>,
    failing_keys: HashSet<String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `put` for `key` fail.
    pub fn failing_on(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .expect("cache read lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache read lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `put` calls seen for `key`, successful or not.
    pub fn attempts(&self, key: &str) -> usize {
        self.attempts
            .read()
            .expect("attempts read lock poisoned")
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Total `put` calls across all keys.
    pub fn total_attempts(&self) -> usize {
        self.attempts
            .read()
            .expect("attempts read lock poisoned")
            .values()
            .sum()
    }
}

#[async_trait]
impl EventCache for MemoryCache {
    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        *self
            .attempts
            .write()
            .expect("attempts write lock poisoned")
            .entry(key.to_string())
            .or_insert(0) += 1;

        if self.failing_keys.contains(key) {
            return Err(CacheError::Rejected {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        self.entries
            .write()
            .expect("cache write lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// In-memory durable store keyed by event id.
///
/// Mirrors the PostgreSQL table: duplicate ids and payloads longer than the
/// column width are rejected.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<i64, String>>,
    attempts: RwLock<HashMap<i64, usize>>,
    failing_ids: HashSet<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `insert` for `id` fail.
    pub fn failing_on(mut self, id: i64) -> Self {
        self.failing_ids.insert(id);
        self
    }

    /// Pre-populates a row, as if left behind by an earlier run.
    pub fn with_row(self, id: i64, payload: impl Into<String>) -> Self {
        self.rows
            .write()
            .expect("store write lock poisoned")
            .insert(id, payload.into());
        self
    }

    pub fn get(&self, id: i64) -> Option<String> {
        self.rows
            .read()
            .expect("store read lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Stored ids in ascending order.
    pub fn ids(&self) -> Vec<i64> {
        self.rows
            .read()
            .expect("store read lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    pub fn attempts(&self, id: i64) -> usize {
        self.attempts
            .read()
            .expect("attempts read lock poisoned")
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_attempts(&self) -> usize {
        self.attempts
            .read()
            .expect("attempts read lock poisoned")
            .values()
            .sum()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, id: i64, payload: &str) -> Result<(), StoreError> {
        *self
            .attempts
            .write()
            .expect("attempts write lock poisoned")
            .entry(id)
            .or_insert(0) += 1;

        if self.failing_ids.contains(&id) {
            return Err(StoreError::Rejected {
                id,
                reason: "injected failure".to_string(),
            });
        }

        if payload.chars().count() > MAX_PAYLOAD_LEN {
            return Err(StoreError::Rejected {
                id,
                reason: format!("payload exceeds {} characters", MAX_PAYLOAD_LEN),
            });
        }

        let mut rows = self.rows.write().expect("store write lock poisoned");
        if rows.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        rows.insert(id, payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_put_and_get() {
        let cache = MemoryCache::new();
        cache.put("event:1", "one").await.expect("put");
        cache.put("event:1", "uno").await.expect("overwrite");

        assert_eq!(cache.get("event:1").as_deref(), Some("uno"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.attempts("event:1"), 2);
    }

    #[tokio::test]
    async fn test_memory_cache_injected_failure() {
        let cache = MemoryCache::new().failing_on("event:2");
        let err = cache.put("event:2", "two").await.unwrap_err();

        assert!(matches!(err, CacheError::Rejected { .. }));
        assert!(cache.get("event:2").is_none());
        assert_eq!(cache.attempts("event:2"), 1);
    }

    #[tokio::test]
    async fn test_memory_store_rejects_duplicates() {
        let store = MemoryStore::new().with_row(3, "left over");
        store.insert(1, "one").await.expect("insert");

        let err = store.insert(3, "three").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(3)));
        assert_eq!(store.get(3).as_deref(), Some("left over"));
        assert_eq!(store.ids(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_memory_store_rejects_oversized_payload() {
        let store = MemoryStore::new();
        let payload = "x".repeat(MAX_PAYLOAD_LEN + 1);

        assert!(store.insert(1, &payload).await.is_err());
        assert!(store.insert(2, &"x".repeat(MAX_PAYLOAD_LEN)).await.is_ok());
        assert_eq!(store.total_attempts(), 2);
    }

    #[tokio::test]
    async fn test_payload_limit_counts_characters_not_bytes() {
        let store = MemoryStore::new();
        // 255 two-byte characters: 510 bytes, still fits VARCHAR(255).
        let at_limit = "é".repeat(MAX_PAYLOAD_LEN);
        assert!(at_limit.len() > MAX_PAYLOAD_LEN);

        store.insert(1, &at_limit).await.expect("fits by character count");
        assert_eq!(store.get(1).as_deref(), Some(at_limit.as_str()));

        let over = "日".repeat(MAX_PAYLOAD_LEN + 1);
        let err = store.insert(2, &over).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { id: 2, .. }));
    }
}
