//! Cache and durable-store capabilities.
//!
//! The pipeline only ever talks to two traits:
//! - **EventCache**: key-value `put` with no expiry (Redis in production)
//! - **EventStore**: durable `insert` keyed by event id (PostgreSQL in production)
//!
//! Implementations must tolerate concurrent independent calls, since one
//! handle is shared by every worker.
//!
//! # Usage
//!
//! ```rust,ignore
//! use event_fanout::storage::{PgEventStore, RedisCache};
//!
//! let cache = RedisCache::connect("redis://localhost:6379").await?;
//! let store = PgEventStore::connect("postgres://localhost/event_fanout", 10).await?;
//! store.ensure_schema().await?;
//! ```

pub mod cache;
pub mod database;
pub mod memory;
pub mod schema;

use async_trait::async_trait;

use crate::error::{CacheError, StoreError};

pub use cache::RedisCache;
pub use database::PgEventStore;
pub use memory::{MemoryCache, MemoryStore};

/// Fast, non-durable key-value write target.
#[async_trait]
pub trait EventCache: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// Durable insert target keyed by event id.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Inserts a row. A duplicate `id` is an error, not an upsert.
    async fn insert(&self, id: i64, payload: &str) -> Result<(), StoreError>;
}
