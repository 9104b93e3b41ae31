//! Caller-driven retry and cancel.
//!
//! Nothing here retries on its own: there is no backoff and no attempt ceiling,
//! so bounding repeated retries is up to the caller.

use crate::queue::{ItemId, UploadStatus};
use crate::transport::Transport;

use super::UploadScheduler;

impl<T: Transport> UploadScheduler<T> {
    /// Move every failed item back to pending, then run one admission pass.
    /// Returns how many items were re-queued.
    pub fn retry_all_failed(&mut self) -> usize {
        let failed = self.queue.ids_with_status(UploadStatus::Error);
        for id in &failed {
            if let Some(item) = self.queue.get_mut(*id) {
                item.requeue();
            }
        }
        if !failed.is_empty() {
            tracing::info!(count = failed.len(), "re-queued failed uploads");
            self.publish();
        }
        self.reconcile();
        failed.len()
    }

    /// Re-queue one item. No-op (returns false) while it is active, once it has
    /// succeeded, or if the id is unknown.
    pub fn retry_one(&mut self, id: ItemId) -> bool {
        let Some(item) = self.queue.get_mut(id) else {
            return false;
        };
        if !item.requeue() {
            tracing::debug!(item = %id, status = %item.status(), "retry ignored");
            return false;
        }
        self.publish();
        self.reconcile();
        true
    }

    /// Ask the transport to abort an active item. State is not touched here:
    /// the transfer's `Cancelled` outcome moves the item back to pending.
    pub fn cancel(&self, id: ItemId) -> bool {
        let Some(item) = self.queue.get(id) else {
            return false;
        };
        if item.status() != UploadStatus::Active {
            return false;
        }
        match item.cancel_handle() {
            Some(handle) => {
                tracing::debug!(item = %id, "cancel requested");
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Signal every active transfer. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let mut signalled = 0;
        for id in self.queue.ids_with_status(UploadStatus::Active) {
            if self.cancel(id) {
                signalled += 1;
            }
        }
        signalled
    }
}
