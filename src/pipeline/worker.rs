//! Worker loop: receive, process, write through to cache, then store.
//!
//! Each worker handles one event at a time to completion. A failed cache
//! write skips the store write for that event only; a failed store write is
//! reported and forgotten. A panic while handling an event is caught and
//! reported the same way. Nothing stops the loop, and nothing is retried.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error};

use crate::error::EventFailure;
use crate::event::Event;
use crate::storage::{EventCache, EventStore};

use super::processor::Processor;
use super::queue::DispatchReceiver;
use super::report::Reporter;
use super::stats::SharedRunStats;
use super::tracker::WorkerExit;

/// Where a worker is in its per-event cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Receiving,
    Processing,
    CacheWrite,
    StoreWrite,
    SkipStore,
    /// Queue closed and empty. Terminal.
    Drained,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Receiving => "receiving",
            Self::Processing => "processing",
            Self::CacheWrite => "cache_write",
            Self::StoreWrite => "store_write",
            Self::SkipStore => "skip_store",
            Self::Drained => "drained",
        };
        f.write_str(name)
    }
}

/// Collaborators every worker in a pool shares.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub cache: Arc<dyn EventCache>,
    pub store: Arc<dyn EventStore>,
    pub processor: Arc<dyn Processor>,
    pub reporter: Arc<dyn Reporter>,
    pub stats: Arc<SharedRunStats>,
    pub cache_key_prefix: Arc<str>,
}

/// A single worker draining the dispatch queue.
pub(crate) struct Worker {
    id: usize,
    queue: DispatchReceiver,
    ctx: WorkerContext,
    state: WorkerState,
}

impl Worker {
    pub(crate) fn new(id: usize, queue: DispatchReceiver, ctx: WorkerContext) -> Self {
        Self {
            id,
            queue,
            ctx,
            state: WorkerState::Idle,
        }
    }

    /// Main worker loop. Returns once the queue is closed and drained.
    pub(crate) async fn run(mut self) -> WorkerExit {
        debug!(worker_id = self.id, "Worker started");
        let mut handled = 0;

        loop {
            self.transition(WorkerState::Receiving);
            let Some(event) = self.queue.recv().await else {
                break;
            };
            let event_id = event.id;
            if let Err(panic) = AssertUnwindSafe(self.handle(event)).catch_unwind().await {
                self.contain_panic(event_id, panic);
            }
            handled += 1;
        }

        self.transition(WorkerState::Drained);
        self.ctx.reporter.worker_drained(self.id, handled);

        WorkerExit {
            worker_id: self.id,
            events_handled: handled,
        }
    }

    async fn handle(&mut self, event: Event) {
        self.ctx.reporter.event_received(self.id, &event);

        self.transition(WorkerState::Processing);
        let event = self.ctx.processor.process(event).await;

        self.transition(WorkerState::CacheWrite);
        let key = format!("{}{}", self.ctx.cache_key_prefix, event.id);
        match self.ctx.cache.put(&key, &event.payload).await {
            Ok(()) => {
                self.ctx.stats.record_cached();
                self.ctx.reporter.cached(self.id, event.id);
            }
            Err(cause) => {
                self.ctx.stats.record_cache_failure();
                self.ctx.reporter.failed(
                    self.id,
                    &EventFailure::CacheWriteFailed {
                        event_id: event.id,
                        cause,
                    },
                );
                self.transition(WorkerState::SkipStore);
                self.ctx.stats.record_processed();
                return;
            }
        }

        self.transition(WorkerState::StoreWrite);
        match self.ctx.store.insert(event.id, &event.payload).await {
            Ok(()) => {
                self.ctx.stats.record_stored();
                self.ctx.reporter.stored(self.id, event.id);
            }
            Err(cause) => {
                self.ctx.stats.record_store_failure();
                self.ctx.reporter.failed(
                    self.id,
                    &EventFailure::StoreWriteFailed {
                        event_id: event.id,
                        cause,
                    },
                );
            }
        }
        self.ctx.stats.record_processed();
    }

    fn contain_panic(&self, event_id: i64, panic: Box<dyn Any + Send>) {
        let message = panic_message(panic.as_ref());
        error!(
            worker_id = self.id,
            event_id,
            state = %self.state,
            panic = %message,
            "Event handling panicked"
        );
        self.ctx.stats.record_panic();
        self.ctx.stats.record_processed();
        self.ctx
            .reporter
            .failed(self.id, &EventFailure::Panicked { event_id, message });
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(worker_id = self.id, from = %self.state, to = %next, "Worker state");
        self.state = next;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processor::DelayProcessor;
    use crate::pipeline::queue::dispatch_queue;
    use crate::pipeline::report::LogReporter;
    use crate::storage::{MemoryCache, MemoryStore};
    use std::time::Duration;

    fn context(cache: Arc<MemoryCache>, store: Arc<MemoryStore>) -> WorkerContext {
        WorkerContext {
            cache,
            store,
            processor: Arc::new(DelayProcessor::new(Duration::ZERO)),
            reporter: Arc::new(LogReporter),
            stats: Arc::new(SharedRunStats::new()),
            cache_key_prefix: Arc::from("event:"),
        }
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let (mut tx, rx) = dispatch_queue(2);
        tx.push(Event::new(1, "one")).await.expect("push");
        tx.push(Event::new(2, "two")).await.expect("push");
        tx.close();

        let exit = Worker::new(7, rx, context(cache.clone(), store.clone()))
            .run()
            .await;

        assert_eq!(
            exit,
            WorkerExit {
                worker_id: 7,
                events_handled: 2
            }
        );
        assert_eq!(cache.get("event:1").as_deref(), Some("one"));
        assert_eq!(store.ids(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_cache_failure_skips_store() {
        let cache = Arc::new(MemoryCache::new().failing_on("event:1"));
        let store = Arc::new(MemoryStore::new());
        let ctx = context(cache.clone(), store.clone());
        let stats = ctx.stats.clone();
        let (mut tx, rx) = dispatch_queue(2);
        tx.push(Event::new(1, "one")).await.expect("push");
        tx.push(Event::new(2, "two")).await.expect("push");
        tx.close();

        Worker::new(1, rx, ctx).run().await;

        assert_eq!(store.attempts(1), 0);
        assert_eq!(store.ids(), vec![2]);

        let mut summary = crate::pipeline::RunSummary::default();
        stats.fill(&mut summary);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.cache_failures, 1);
        assert_eq!(summary.stored, 1);
    }

    struct PanickingStore {
        inner: MemoryStore,
        panic_on: i64,
    }

    #[async_trait::async_trait]
    impl EventStore for PanickingStore {
        async fn insert(&self, id: i64, payload: &str) -> Result<(), crate::error::StoreError> {
            if id == self.panic_on {
                panic!("store client blew up on {}", id);
            }
            self.inner.insert(id, payload).await
        }
    }

    #[tokio::test]
    async fn test_panic_in_store_does_not_end_worker() {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(PanickingStore {
            inner: MemoryStore::new(),
            panic_on: 2,
        });
        let mut ctx = context(cache.clone(), Arc::new(MemoryStore::new()));
        let shared: Arc<dyn EventStore> = store.clone();
        ctx.store = shared;
        let stats = ctx.stats.clone();
        let (mut tx, rx) = dispatch_queue(3);
        for id in 1..=3 {
            tx.push(Event::new(id, "x")).await.expect("push");
        }
        tx.close();

        let exit = Worker::new(1, rx, ctx).run().await;

        assert_eq!(exit.events_handled, 3);
        assert_eq!(store.inner.ids(), vec![1, 3]);
        assert_eq!(cache.len(), 3);

        let mut summary = crate::pipeline::RunSummary::default();
        stats.fill(&mut summary);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.panicked, 1);
        assert_eq!(summary.stored, 2);
    }

    #[test]
    fn test_panic_message_extracts_text() {
        let boxed: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(boxed.as_ref()), "static text");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned text"));
        assert_eq!(panic_message(boxed.as_ref()), "owned text");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkerState::SkipStore.to_string(), "skip_store");
        assert_eq!(WorkerState::Drained.to_string(), "drained");
    }
}
