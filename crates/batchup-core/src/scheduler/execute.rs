//! Transfer executor: hand admitted items to the transport and apply what it reports.

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::queue::{ItemId, UploadStatus};
use crate::transport::{
    TransferEvent, TransferFailure, TransferHandle, TransferOutcome, TransferRequest, Transport,
};

use super::{SchedulerEvent, UploadScheduler};

impl<T: Transport> UploadScheduler<T> {
    /// pending → active, then start the transfer. Only called from `reconcile`.
    pub(super) fn dispatch(&mut self, id: ItemId, now: Instant) -> bool {
        let Some(item) = self.queue.get_mut(id) else {
            return false;
        };
        let Some(attempt) = item.activate(now) else {
            return false;
        };
        let request = TransferRequest {
            item: id,
            source: item.source().clone(),
        };
        let TransferHandle { events, cancel } = self.transport.send(request);
        item.attach_cancel(cancel);
        tracing::debug!(item = %id, name = item.name(), attempt, "upload started");

        tokio::spawn(forward_events(id, attempt, events, self.events_tx.clone()));
        true
    }

    pub(super) fn apply(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::Reconcile => {
                self.deferred_reconciles = self.deferred_reconciles.saturating_sub(1);
                self.reconcile();
            }
            SchedulerEvent::Transfer {
                item,
                attempt,
                event,
            } => self.apply_transfer_event(item, attempt, event),
        }
    }

    fn apply_transfer_event(&mut self, id: ItemId, attempt: u32, event: TransferEvent) {
        let Some(item) = self.queue.get_mut(id) else {
            return;
        };
        // Leftovers from a cancelled earlier attempt, or a duplicate terminal.
        if item.status() != UploadStatus::Active || item.attempts() != attempt {
            tracing::trace!(item = %id, attempt, "ignoring event from stale transfer");
            return;
        }

        match event {
            TransferEvent::Progress {
                loaded,
                total: Some(total),
            } => {
                item.record_progress(loaded, total, Instant::now(), self.sample_interval);
            }
            TransferEvent::Progress { total: None, .. } => return,
            TransferEvent::Finished(outcome) => {
                match outcome {
                    TransferOutcome::Succeeded { status, body } => {
                        item.succeed(&body);
                        tracing::info!(item = %id, name = item.name(), status, "upload succeeded");
                    }
                    TransferOutcome::Failed(failure) => {
                        item.fail(&failure);
                        tracing::info!(item = %id, name = item.name(), "upload failed: {}", failure);
                    }
                    TransferOutcome::Cancelled => {
                        item.cancelled();
                        tracing::info!(item = %id, name = item.name(), "upload cancelled");
                    }
                }
                self.schedule_reconcile();
            }
        }
        self.publish();
    }

    /// Post a reconcile to the event loop after `reconcile_delay` instead of
    /// admitting from inside the terminal handler.
    fn schedule_reconcile(&mut self) {
        self.deferred_reconciles += 1;
        let tx = self.events_tx.clone();
        let delay = self.reconcile_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SchedulerEvent::Reconcile);
        });
    }
}

/// Relay one transfer's events into the scheduler channel, tagged with the
/// attempt. A stream that ends without a terminal outcome is reported as a
/// network failure so the item's slot is always released.
async fn forward_events(
    item: ItemId,
    attempt: u32,
    mut events: mpsc::UnboundedReceiver<TransferEvent>,
    tx: mpsc::UnboundedSender<SchedulerEvent>,
) {
    while let Some(event) = events.recv().await {
        let finished = matches!(event, TransferEvent::Finished(_));
        if tx
            .send(SchedulerEvent::Transfer {
                item,
                attempt,
                event,
            })
            .is_err()
            || finished
        {
            return;
        }
    }
    let _ = tx.send(SchedulerEvent::Transfer {
        item,
        attempt,
        event: TransferEvent::Finished(TransferOutcome::Failed(TransferFailure::Network(
            "transfer ended without an outcome".to_string(),
        ))),
    });
}
