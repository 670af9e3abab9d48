//! Error types for event-fanout operations.
//!
//! Defines the error types used across the pipeline:
//! - Cache and durable-store capability failures
//! - Per-event failures reported by workers
//! - Run preconditions checked by the coordinator
//! - Startup (connectivity and schema) failures

use thiserror::Error;

/// Errors returned by a cache capability.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Redis operation failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache rejected key '{key}': {reason}")]
    Rejected { key: String, reason: String },
}

/// Errors returned by a durable-store capability.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Duplicate event id {0}")]
    Duplicate(i64),

    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("Store rejected event {id}: {reason}")]
    Rejected { id: i64, reason: String },
}

/// A failure confined to a single event.
///
/// Workers report these through a [`Reporter`](crate::pipeline::Reporter)
/// and move on to the next event. They never surface as a run-level error.
#[derive(Debug, Error)]
pub enum EventFailure {
    #[error("Cache write failed for event {event_id}: {cause}")]
    CacheWriteFailed {
        event_id: i64,
        #[source]
        cause: CacheError,
    },

    #[error("Store write failed for event {event_id}: {cause}")]
    StoreWriteFailed {
        event_id: i64,
        #[source]
        cause: StoreError,
    },

    /// The processing step or a capability call panicked mid-event.
    #[error("Handling event {event_id} panicked: {message}")]
    Panicked { event_id: i64, message: String },
}

impl EventFailure {
    /// Returns the id of the event that failed.
    pub fn event_id(&self) -> i64 {
        match self {
            Self::CacheWriteFailed { event_id, .. }
            | Self::StoreWriteFailed { event_id, .. }
            | Self::Panicked { event_id, .. } => *event_id,
        }
    }

    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CacheWriteFailed { .. } => "cache_failed",
            Self::StoreWriteFailed { .. } => "store_failed",
            Self::Panicked { .. } => "panicked",
        }
    }
}

/// Precondition violations that prevent a run from starting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("Event id {0} appears more than once in the batch")]
    DuplicateEventId(i64),
}

/// Fatal failures while preparing the external capabilities.
#[derive(Debug, Error)]
#[error("Startup failed for {component}: {cause}")]
pub struct StartupError {
    pub component: &'static str,
    pub cause: String,
}

impl StartupError {
    pub fn new(component: &'static str, cause: impl ToString) -> Self {
        Self {
            component,
            cause: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_failure_accessors() {
        let failure = EventFailure::StoreWriteFailed {
            event_id: 3,
            cause: StoreError::Duplicate(3),
        };
        assert_eq!(failure.event_id(), 3);
        assert_eq!(failure.kind(), "store_failed");
        assert!(failure.to_string().contains("Duplicate event id 3"));

        let failure = EventFailure::CacheWriteFailed {
            event_id: 2,
            cause: CacheError::Rejected {
                key: "event:2".to_string(),
                reason: "injected".to_string(),
            },
        };
        assert_eq!(failure.event_id(), 2);
        assert_eq!(failure.kind(), "cache_failed");

        let failure = EventFailure::Panicked {
            event_id: 5,
            message: "store client blew up".to_string(),
        };
        assert_eq!(failure.event_id(), 5);
        assert_eq!(failure.kind(), "panicked");
        assert!(failure.to_string().contains("store client blew up"));
    }

    #[test]
    fn test_startup_error_display() {
        let err = StartupError::new("redis", "connection refused");
        assert_eq!(err.component, "redis");
        assert_eq!(
            err.to_string(),
            "Startup failed for redis: connection refused"
        );
    }

    #[test]
    fn test_run_error_display() {
        assert!(RunError::InvalidWorkerCount.to_string().contains("at least 1"));
        assert!(RunError::DuplicateEventId(7).to_string().contains('7'));
    }
}
