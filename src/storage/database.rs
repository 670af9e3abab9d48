//! PostgreSQL event store.
//!
//! Inserts go straight to the `events` table; a primary-key violation is
//! mapped to `StoreError::Duplicate` so callers can tell it apart from
//! connectivity problems.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::StoreError;

use super::schema;
use super::EventStore;

/// PostgreSQL-backed durable store.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Connects to the database.
    ///
    /// # Arguments
    ///
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - Pool size; should be at least the worker count
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips `SELECT 1`.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Creates the `events` table if it does not exist yet.
    ///
    /// Every statement is `IF NOT EXISTS`, so this runs on each startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in schema::all_schema_statements() {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Returns the stored payload for `id`, if any.
    pub async fn payload(&self, id: i64) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(schema::SELECT_EVENT_PAYLOAD)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(payload,)| payload))
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(schema::COUNT_EVENTS)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert(&self, id: i64, payload: &str) -> Result<(), StoreError> {
        sqlx::query(schema::INSERT_EVENT)
            .bind(id)
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(id, e))?;

        Ok(())
    }
}

fn map_insert_error(id: i64, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Duplicate(id),
        _ => StoreError::QueryFailed(err),
    }
}
