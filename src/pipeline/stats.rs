//! Run statistics shared by all workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// Summary of one run, returned by the coordinator.
///
/// This is an outcome record, not an error report: a run with failed writes
/// still returns `Ok(RunSummary)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub worker_count: usize,
    /// Events pushed into the dispatch queue.
    pub dispatched: u64,
    /// Events a worker finished with, whatever the outcome.
    pub processed: u64,
    pub cached: u64,
    pub stored: u64,
    pub cache_failures: u64,
    pub store_failures: u64,
    /// Events abandoned because handling them panicked.
    pub panicked: u64,
    /// Workers that reached the drained state and returned.
    pub workers_drained: usize,
    /// Workers whose task ended abnormally.
    pub workers_failed: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Total per-event failures.
    pub fn failures(&self) -> u64 {
        self.cache_failures + self.store_failures + self.panicked
    }

    /// True when every dispatched event reached the durable store.
    pub fn fully_stored(&self) -> bool {
        self.stored == self.dispatched
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Atomic counters updated by workers during a run.
#[derive(Debug, Default)]
pub(crate) struct SharedRunStats {
    processed: AtomicU64,
    cached: AtomicU64,
    stored: AtomicU64,
    cache_failures: AtomicU64,
    store_failures: AtomicU64,
    panicked: AtomicU64,
}

impl SharedRunStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cached(&self) {
        self.cached.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_cache_failure(&self) {
        self.cache_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_panic(&self) {
        self.panicked.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    /// Copies the counters into `summary`.
    pub(crate) fn fill(&self, summary: &mut RunSummary) {
        summary.processed = self.processed.load(Ordering::SeqCst);
        summary.cached = self.cached.load(Ordering::SeqCst);
        summary.stored = self.stored.load(Ordering::SeqCst);
        summary.cache_failures = self.cache_failures.load(Ordering::SeqCst);
        summary.store_failures = self.store_failures.load(Ordering::SeqCst);
        summary.panicked = self.panicked.load(Ordering::SeqCst);
    }
}
