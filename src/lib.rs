//! event-fanout: a fixed-size worker pool that writes a batch of events
//! through to a Redis cache and a PostgreSQL store.
//!
//! Per-event write failures are isolated: they are reported and skipped,
//! never retried, and never fail the run.

pub mod cli;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod startup;
pub mod storage;

// Re-export commonly used types
pub use error::{CacheError, EventFailure, RunError, StartupError, StoreError};
pub use event::Event;
pub use pipeline::{Coordinator, PipelineConfig, RunSummary};
