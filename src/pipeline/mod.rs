//! Event fan-out pipeline.
//!
//! A coordinator feeds a finite batch of events through a bounded dispatch
//! queue to a fixed pool of workers. Each worker processes an event, writes
//! it to the cache and, if that succeeded, inserts it into the durable store.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │ Coordinator  │
//!                      └──────┬───────┘
//!                             │ push × n, close
//!                      ┌──────▼───────┐
//!                      │   Dispatch   │
//!                      │    Queue     │
//!                      └──────┬───────┘
//!         ┌───────────────────┼───────────────────┐
//!         ▼                   ▼                   ▼
//!    ┌─────────┐         ┌─────────┐         ┌─────────┐
//!    │ Worker 1│         │ Worker 2│         │ Worker k│
//!    └────┬────┘         └────┬────┘         └────┬────┘
//!         └──── cache put, then store insert ─────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use event_fanout::pipeline::Coordinator;
//! use event_fanout::storage::{MemoryCache, MemoryStore};
//! use std::sync::Arc;
//!
//! let coordinator = Coordinator::new(Arc::new(MemoryCache::new()), Arc::new(MemoryStore::new()));
//! let summary = coordinator.run(event_fanout::event::sample_batch(), 3).await?;
//! assert_eq!(summary.processed, 5);
//! ```
//!
//! # Failure handling
//!
//! - A cache failure skips the store write for that event only
//! - A store failure (duplicate key, connectivity) is reported and skipped
//! - Nothing is retried, and no per-event failure fails the run

pub mod config;
pub mod coordinator;
pub mod processor;
pub mod queue;
pub mod report;
pub mod stats;
pub mod tracker;
pub mod worker;

pub use config::{ConfigError, PipelineConfig};
pub use coordinator::Coordinator;
pub use processor::{DelayProcessor, Processor};
pub use queue::{dispatch_queue, DispatchReceiver, DispatchSender, QueueError};
pub use report::{FanoutReporter, LogReporter, Reporter};
pub use stats::RunSummary;
pub use tracker::{CompletionTracker, PoolCompletion, WorkerExit};
pub use worker::WorkerState;
