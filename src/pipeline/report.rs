//! Side-channel reporting for pipeline progress and per-event failures.
//!
//! Per-event failures never travel back to the coordinator as errors; they
//! are handed to a [`Reporter`] and the worker moves on. `LogReporter` is the
//! default and turns every notification into a `tracing` event.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::EventFailure;
use crate::event::Event;

/// Receives notifications from workers. Called concurrently from every worker.
pub trait Reporter: Send + Sync {
    fn event_received(&self, _worker_id: usize, _event: &Event) {}

    fn cached(&self, _worker_id: usize, _event_id: i64) {}

    fn stored(&self, _worker_id: usize, _event_id: i64) {}

    /// Called exactly once per failed write or panicked event.
    fn failed(&self, worker_id: usize, failure: &EventFailure);

    /// Called by the coordinator after the last push, when the queue closes.
    fn dispatch_closed(&self, _dispatched: usize) {}

    fn worker_drained(&self, _worker_id: usize, _events_handled: usize) {}
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn event_received(&self, worker_id: usize, event: &Event) {
        info!(
            worker_id,
            event_id = event.id,
            payload = %event.payload,
            "Processing event"
        );
    }

    fn stored(&self, worker_id: usize, event_id: i64) {
        info!(worker_id, event_id, "Event stored");
    }

    fn failed(&self, worker_id: usize, failure: &EventFailure) {
        warn!(
            worker_id,
            event_id = failure.event_id(),
            kind = failure.kind(),
            error = %failure,
            "Event failed"
        );
    }

    fn dispatch_closed(&self, dispatched: usize) {
        info!(dispatched, "Dispatch queue closed");
    }

    fn worker_drained(&self, worker_id: usize, events_handled: usize) {
        info!(worker_id, events_handled, "Worker drained");
    }
}

/// Forwards every notification to each inner reporter in order.
#[derive(Clone, Default)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for FanoutReporter {
    fn event_received(&self, worker_id: usize, event: &Event) {
        for r in &self.reporters {
            r.event_received(worker_id, event);
        }
    }

    fn cached(&self, worker_id: usize, event_id: i64) {
        for r in &self.reporters {
            r.cached(worker_id, event_id);
        }
    }

    fn stored(&self, worker_id: usize, event_id: i64) {
        for r in &self.reporters {
            r.stored(worker_id, event_id);
        }
    }

    fn failed(&self, worker_id: usize, failure: &EventFailure) {
        for r in &self.reporters {
            r.failed(worker_id, failure);
        }
    }

    fn dispatch_closed(&self, dispatched: usize) {
        for r in &self.reporters {
            r.dispatch_closed(dispatched);
        }
    }

    fn worker_drained(&self, worker_id: usize, events_handled: usize) {
        for r in &self.reporters {
            r.worker_drained(worker_id, events_handled);
        }
    }
}
