//! Prometheus counters for pipeline runs.
//!
//! Each `PrometheusReporter` owns its own registry, so several runs (or tests)
//! in one process never collide on metric registration.

use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::error::EventFailure;
use crate::event::Event;
use crate::pipeline::Reporter;

/// Counts pipeline outcomes in a private Prometheus registry.
pub struct PrometheusReporter {
    registry: Registry,
    events_total: CounterVec,
    workers_drained: Counter,
}

impl PrometheusReporter {
    /// Creates the counters and registers them.
    ///
    /// # Errors
    ///
    /// Returns a `prometheus::Error` if a metric definition is invalid.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_total = CounterVec::new(
            Opts::new(
                "event_fanout_events_total",
                "Events seen by workers, labeled by outcome",
            ),
            &["outcome"],
        )?;

        let workers_drained = Counter::new(
            "event_fanout_workers_drained_total",
            "Workers that drained the dispatch queue",
        )?;

        registry.register(Box::new(events_total.clone()))?;
        registry.register(Box::new(workers_drained.clone()))?;

        Ok(Self {
            registry,
            events_total,
            workers_drained,
        })
    }

    /// Current value of `event_fanout_events_total{outcome}`.
    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.events_total.with_label_values(&[outcome]).get() as u64
    }

    pub fn workers_drained(&self) -> u64 {
        self.workers_drained.get() as u64
    }

    /// Renders every metric in the Prometheus text exposition format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            return format!("# Error encoding metrics: {}\n", e);
        }

        String::from_utf8(buffer)
            .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
    }
}

impl Reporter for PrometheusReporter {
    fn event_received(&self, _worker_id: usize, _event: &Event) {
        self.events_total.with_label_values(&["received"]).inc();
    }

    fn cached(&self, _worker_id: usize, _event_id: i64) {
        self.events_total.with_label_values(&["cached"]).inc();
    }

    fn stored(&self, _worker_id: usize, _event_id: i64) {
        self.events_total.with_label_values(&["stored"]).inc();
    }

    fn failed(&self, _worker_id: usize, failure: &EventFailure) {
        self.events_total
            .with_label_values(&[failure.kind()])
            .inc();
    }

    fn worker_drained(&self, _worker_id: usize, _events_handled: usize) {
        self.workers_drained.inc();
    }
}
