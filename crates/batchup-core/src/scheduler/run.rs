//! Event loop driving the scheduler.

use std::time::Duration;

use crate::queue::UploadStatus;
use crate::transport::Transport;

use super::UploadScheduler;

impl<T: Transport> UploadScheduler<T> {
    /// Wait for the next event and apply it. Cancel-safe: dropping the future
    /// before an event arrives loses nothing.
    pub async fn next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Apply every event that is already waiting, without blocking. For callers
    /// that poll from their own loop (e.g. a UI tick). Returns how many were applied.
    pub fn apply_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Nothing in flight and no deferred admission pass outstanding.
    pub fn is_idle(&self) -> bool {
        self.deferred_reconciles == 0 && self.queue.count(UploadStatus::Active) == 0
    }

    /// Stop admitting, signal every active transfer, and apply events until
    /// their `Cancelled` outcomes have landed or `within` elapses. Returns how
    /// many items are still active.
    pub async fn shutdown(&mut self, within: Duration) -> usize {
        self.shutting_down = true;
        let signalled = self.cancel_all();
        tracing::info!(signalled, "shutting down upload queue");
        let deadline = tokio::time::Instant::now() + within;
        while self.queue.count(UploadStatus::Active) > 0 {
            match tokio::time::timeout_at(deadline, self.next_event()).await {
                Ok(true) => {}
                Ok(false) | Err(_) => break,
            }
        }
        let still_active = self.queue.count(UploadStatus::Active);
        if still_active > 0 {
            tracing::warn!(still_active, "transfers did not stop before the deadline");
        }
        still_active
    }

    /// Admit and keep applying events until every item has settled into
    /// success or error (or the queue is empty).
    pub async fn run_until_idle(&mut self) {
        self.reconcile();
        while !self.is_idle() {
            if !self.next_event().await {
                break;
            }
        }
        let stats = self.queue.stats();
        tracing::info!(
            success = stats.success,
            error = stats.error,
            pending = stats.pending,
            "upload queue idle"
        );
    }
}
