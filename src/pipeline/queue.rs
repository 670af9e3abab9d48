//! Bounded, closable dispatch queue.
//!
//! A tokio mpsc channel with its receiver shared behind an async mutex, so
//! any number of workers can compete for items while each item is delivered
//! to exactly one of them. Closing happens by consuming the sender, which
//! makes a second close or a push after close impossible to write.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::event::Event;

/// Errors that can occur while feeding the queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Every receiver was dropped before the event could be pushed.
    #[error("Dispatch queue has no consumers left; event {0} was not delivered")]
    NoConsumers(i64),
}

/// Creates a queue that holds up to `capacity` events (at least one).
pub fn dispatch_queue(capacity: usize) -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        DispatchSender { tx, pushed: 0 },
        DispatchReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer half. Owned by the coordinator.
#[derive(Debug)]
pub struct DispatchSender {
    tx: mpsc::Sender<Event>,
    pushed: usize,
}

impl DispatchSender {
    /// Pushes one event, waiting for room if the queue is full.
    pub async fn push(&mut self, event: Event) -> Result<(), QueueError> {
        let id = event.id;
        self.tx
            .send(event)
            .await
            .map_err(|_| QueueError::NoConsumers(id))?;
        self.pushed += 1;
        Ok(())
    }

    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Signals "no more work". Consumers drain what is left, then see `None`.
    pub fn close(self) -> usize {
        self.pushed
    }
}

/// Consumer half. Cheap to clone; every clone competes for the same items.
#[derive(Debug, Clone)]
pub struct DispatchReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Event>>>,
}

impl DispatchReceiver {
    /// Waits for the next event. Returns `None` once the queue is closed and empty.
    pub async fn recv(&self) -> Option<Event> {
        self.rx.lock().await.recv().await
    }
}
