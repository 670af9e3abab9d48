//! The per-event processing step that runs before the store writes.

use std::time::Duration;

use async_trait::async_trait;

use crate::event::Event;

/// Transforms an event before it is written through to the cache and store.
///
/// Implementations must be side-effect free with respect to the stores.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, event: Event) -> Event;
}

/// Waits for a fixed delay and passes the event through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayProcessor {
    delay: Duration,
}

impl DelayProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Processor for DelayProcessor {
    async fn process(&self, event: Event) -> Event {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        event
    }
}
