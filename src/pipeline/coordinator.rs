//! Coordinator: owns the dispatch queue and the worker pool for one run.
//!
//! A run sizes the queue to the batch, starts the workers, pushes every
//! event in order, closes the queue and waits until each worker has drained.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::error::RunError;
use crate::event::{ensure_unique_ids, Event};
use crate::storage::{EventCache, EventStore};

use super::config::PipelineConfig;
use super::processor::{DelayProcessor, Processor};
use super::queue::dispatch_queue;
use super::report::{LogReporter, Reporter};
use super::stats::{RunSummary, SharedRunStats};
use super::tracker::CompletionTracker;
use super::worker::{Worker, WorkerContext};

const DEFAULT_CACHE_KEY_PREFIX: &str = "event:";

/// Runs batches of events through a fixed-size worker pool.
pub struct Coordinator {
    cache: Arc<dyn EventCache>,
    store: Arc<dyn EventStore>,
    processor: Arc<dyn Processor>,
    reporter: Arc<dyn Reporter>,
    cache_key_prefix: Arc<str>,
}

impl Coordinator {
    /// Creates a coordinator with a pass-through processor and log reporting.
    pub fn new(cache: Arc<dyn EventCache>, store: Arc<dyn EventStore>) -> Self {
        Self {
            cache,
            store,
            processor: Arc::new(DelayProcessor::new(Duration::ZERO)),
            reporter: Arc::new(LogReporter),
            cache_key_prefix: Arc::from(DEFAULT_CACHE_KEY_PREFIX),
        }
    }

    /// Creates a coordinator using the processing delay and key prefix from `config`.
    pub fn from_config(
        config: &PipelineConfig,
        cache: Arc<dyn EventCache>,
        store: Arc<dyn EventStore>,
    ) -> Self {
        Self::new(cache, store)
            .with_processor(Arc::new(DelayProcessor::new(config.processing_delay)))
            .with_cache_key_prefix(config.cache_key_prefix.as_str())
    }

    pub fn with_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cache_key_prefix(mut self, prefix: &str) -> Self {
        self.cache_key_prefix = Arc::from(prefix);
        self
    }

    /// Processes `events` with `worker_count` concurrent workers.
    ///
    /// Returns once every event has been through its cache and store write
    /// attempts in exactly one worker. Per-event failures are reported, not
    /// returned.
    ///
    /// # Errors
    ///
    /// - `RunError::InvalidWorkerCount` if `worker_count` is zero
    /// - `RunError::DuplicateEventId` if two events share an id
    pub async fn run(
        &self,
        events: Vec<Event>,
        worker_count: usize,
    ) -> Result<RunSummary, RunError> {
        if worker_count == 0 {
            return Err(RunError::InvalidWorkerCount);
        }
        ensure_unique_ids(&events)?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", run_id = %run_id);
        let summary = self
            .execute(run_id, events, worker_count)
            .instrument(span)
            .await;
        Ok(summary)
    }

    async fn execute(&self, run_id: Uuid, events: Vec<Event>, worker_count: usize) -> RunSummary {
        let start = Instant::now();
        let total = events.len();
        info!(events = total, workers = worker_count, "Run started");

        let stats = Arc::new(SharedRunStats::new());
        let (mut sender, receiver) = dispatch_queue(total);

        let ctx = WorkerContext {
            cache: Arc::clone(&self.cache),
            store: Arc::clone(&self.store),
            processor: Arc::clone(&self.processor),
            reporter: Arc::clone(&self.reporter),
            stats: Arc::clone(&stats),
            cache_key_prefix: Arc::clone(&self.cache_key_prefix),
        };

        let mut tracker = CompletionTracker::new();
        for worker_id in 1..=worker_count {
            let worker = Worker::new(worker_id, receiver.clone(), ctx.clone());
            tracker.spawn(worker.run().in_current_span());
        }
        // Workers hold the only receivers from here on.
        drop(receiver);

        for event in events {
            if let Err(e) = sender.push(event).await {
                error!(error = %e, "Stopped dispatching");
                break;
            }
        }
        let dispatched = sender.close();
        self.reporter.dispatch_closed(dispatched);

        let completion = tracker.wait().await;

        let mut summary = RunSummary {
            run_id,
            worker_count,
            dispatched: dispatched as u64,
            workers_drained: completion.drained(),
            workers_failed: completion.failed,
            elapsed: start.elapsed(),
            ..Default::default()
        };
        stats.fill(&mut summary);

        info!(
            dispatched = summary.dispatched,
            processed = summary.processed,
            stored = summary.stored,
            cache_failures = summary.cache_failures,
            store_failures = summary.store_failures,
            panicked = summary.panicked,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Run complete"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventFailure;
    use crate::event::sample_batch;
    use crate::storage::{MemoryCache, MemoryStore};
    use std::sync::Mutex;

    fn coordinator(cache: &Arc<MemoryCache>, store: &Arc<MemoryStore>) -> Coordinator {
        Coordinator::new(cache.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let result = coordinator(&cache, &store).run(sample_batch(), 0).await;

        assert_eq!(result.unwrap_err(), RunError::InvalidWorkerCount);
        assert_eq!(cache.total_attempts(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected_before_dispatch() {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let events = vec![Event::new(1, "a"), Event::new(1, "b")];
        let result = coordinator(&cache, &store).run(events, 2).await;

        assert_eq!(result.unwrap_err(), RunError::DuplicateEventId(1));
        assert_eq!(cache.total_attempts(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_drains_idle_workers() {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let summary = coordinator(&cache, &store)
            .run(Vec::new(), 4)
            .await
            .expect("run");

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.workers_drained, 4);
        assert_eq!(summary.workers_failed, 0);
    }

    #[tokio::test]
    async fn test_sample_batch_all_succeed() {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let summary = coordinator(&cache, &store)
            .run(sample_batch(), 3)
            .await
            .expect("run");

        assert_eq!(summary.dispatched, 5);
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.cached, 5);
        assert_eq!(summary.stored, 5);
        assert!(summary.fully_stored());
        assert_eq!(summary.workers_drained, 3);
        assert_eq!(store.ids(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_custom_prefix_from_config() {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let config = PipelineConfig::default()
            .with_processing_delay(Duration::ZERO)
            .with_cache_key_prefix("evt/");
        let summary = Coordinator::from_config(&config, cache.clone(), store.clone())
            .run(vec![Event::new(42, "answer")], 1)
            .await
            .expect("run");

        assert_eq!(summary.cached, 1);
        assert_eq!(cache.get("evt/42").as_deref(), Some("answer"));
    }

    /// Orders queue-side and worker-side notifications on one timeline.
    #[derive(Default)]
    struct Timeline {
        entries: Mutex<Vec<String>>,
    }

    impl Reporter for Timeline {
        fn event_received(&self, _worker_id: usize, event: &Event) {
            self.entries
                .lock()
                .expect("lock")
                .push(format!("recv {}", event.id));
        }

        fn failed(&self, _worker_id: usize, _failure: &EventFailure) {}

        fn dispatch_closed(&self, dispatched: usize) {
            self.entries
                .lock()
                .expect("lock")
                .push(format!("closed {}", dispatched));
        }
    }

    // Single-threaded runtime: spawned workers only run once the producer
    // yields, so a push that waited for room would let a receive in first.
    #[tokio::test]
    async fn test_every_push_completes_before_first_receive() {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let timeline = Arc::new(Timeline::default());
        let events: Vec<Event> = (1..=50).map(|id| Event::new(id, "x")).collect();

        let summary = coordinator(&cache, &store)
            .with_reporter(timeline.clone())
            .run(events, 2)
            .await
            .expect("run");

        let entries = timeline.entries.lock().expect("lock").clone();
        assert_eq!(entries.first().map(String::as_str), Some("closed 50"));
        assert_eq!(entries.len(), 51);
        assert_eq!(summary.processed, 50);
    }
}
