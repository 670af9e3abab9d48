//! Completion tracking for the worker pool.
//!
//! Workers are spawned into a `JoinSet`, so registration and start are one
//! step and every worker produces exactly one completion, including when it
//! panics. `wait` consumes the tracker and returns once all have completed.

use std::future::Future;

use tokio::task::JoinSet;
use tracing::error;

/// What a worker hands back when it reaches the drained state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub worker_id: usize,
    pub events_handled: usize,
}

/// Outcome of waiting on the whole pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolCompletion {
    /// Workers that returned normally, in completion order.
    pub exits: Vec<WorkerExit>,
    /// Workers whose task panicked or was aborted.
    pub failed: usize,
}

impl PoolCompletion {
    pub fn drained(&self) -> usize {
        self.exits.len()
    }
}

/// Counts registered workers and blocks until each has signalled completion.
#[derive(Default)]
pub struct CompletionTracker {
    set: JoinSet<WorkerExit>,
    registered: usize,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers and starts a worker.
    pub fn spawn<F>(&mut self, worker: F)
    where
        F: Future<Output = WorkerExit> + Send + 'static,
    {
        self.set.spawn(worker);
        self.registered += 1;
    }

    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Waits for every registered worker.
    pub async fn wait(mut self) -> PoolCompletion {
        let mut completion = PoolCompletion::default();
        while let Some(joined) = self.set.join_next().await {
            match joined {
                Ok(exit) => completion.exits.push(exit),
                Err(e) => {
                    error!(error = %e, "Worker task ended abnormally");
                    completion.failed += 1;
                }
            }
        }
        completion
    }
}
