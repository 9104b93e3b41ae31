//! Admission control: promote pending items while slots are free.

use tokio::time::Instant;

use crate::queue::{ItemId, UploadStatus};
use crate::transport::Transport;

use super::UploadScheduler;

impl<T: Transport> UploadScheduler<T> {
    /// Admit up to `concurrency - active` pending items in queue order.
    ///
    /// Idempotent and safe to call any number of times: the active count is
    /// read fresh on every call, never cached. Returns how many were admitted;
    /// always 0 after `shutdown`.
    pub fn reconcile(&mut self) -> usize {
        if self.shutting_down {
            return 0;
        }
        let active = self.queue.count(UploadStatus::Active);
        if active >= self.concurrency {
            return 0;
        }
        let slots = self.concurrency - active;
        let next: Vec<ItemId> = self
            .queue
            .ids_with_status(UploadStatus::Pending)
            .into_iter()
            .take(slots)
            .collect();

        let now = Instant::now();
        let mut admitted = 0;
        for id in next {
            if self.dispatch(id, now) {
                admitted += 1;
            }
        }
        if admitted > 0 {
            tracing::debug!(admitted, active = active + admitted, "admitted uploads");
            self.publish();
        }
        admitted
    }
}
