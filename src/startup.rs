//! Pre-flight setup of the external capabilities.
//!
//! Runs once before any pipeline run: connect to Redis and PostgreSQL,
//! check both respond, and make sure the `events` table exists. Any failure
//! here is fatal and is reported as a [`StartupError`].

use tracing::info;

use crate::error::StartupError;
use crate::pipeline::PipelineConfig;
use crate::storage::{PgEventStore, RedisCache};

/// Connected, verified handles to both stores.
pub struct Backends {
    pub cache: RedisCache,
    pub store: PgEventStore,
}

/// Connects to Redis and checks it answers `PING`.
pub async fn connect_cache(config: &PipelineConfig) -> Result<RedisCache, StartupError> {
    let cache = RedisCache::connect(&config.redis_url)
        .await
        .map_err(|e| StartupError::new("redis", e))?
        .with_ttl(config.cache_ttl);
    cache.ping().await.map_err(|e| StartupError::new("redis", e))?;
    info!(url = %config.redis_url, "Connected to Redis");
    Ok(cache)
}

/// Connects to PostgreSQL, checks it answers and applies the schema.
pub async fn connect_store(config: &PipelineConfig) -> Result<PgEventStore, StartupError> {
    let store = PgEventStore::connect(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| StartupError::new("postgres", e))?;
    store
        .ping()
        .await
        .map_err(|e| StartupError::new("postgres", e))?;
    info!("Connected to PostgreSQL");

    store
        .ensure_schema()
        .await
        .map_err(|e| StartupError::new("schema", e))?;
    info!("Event schema ready");

    Ok(store)
}

/// Performs every pre-flight step.
pub async fn prepare(config: &PipelineConfig) -> Result<Backends, StartupError> {
    let cache = connect_cache(config).await?;
    let store = connect_store(config).await?;
    Ok(Backends { cache, store })
}
