//! Upload scheduler: admission control, transfer lifecycle, retry and cancel.
//!
//! The scheduler owns the queue and is driven through `&mut self` from a single
//! task. Transports report back over one event channel; every state change
//! happens while applying one of those events or inside a caller operation, so
//! no lock guards the queue. Only this module changes item status.
//!
//! Flow: `add_files` → `reconcile` admits up to `concurrency` pending items →
//! transports emit progress and one terminal outcome → a deferred reconcile is
//! posted after `reconcile_delay` → repeat until nothing is pending.

mod admit;
mod control;
mod execute;
mod run;


use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::UploaderConfig;
use crate::queue::{FileSource, ItemId, Queue, QueueSnapshot, QueueStats};
use crate::transport::{TransferEvent, Transport};

/// Message applied by the scheduler's event loop.
#[derive(Debug)]
pub(crate) enum SchedulerEvent {
    /// Event from one transfer attempt of an item.
    Transfer {
        item: ItemId,
        attempt: u32,
        event: TransferEvent,
    },
    /// Deferred admission pass posted after a terminal outcome.
    Reconcile,
}

/// Bounded-concurrency upload scheduler over a pluggable transport.
pub struct UploadScheduler<T: Transport> {
    transport: T,
    queue: Queue,
    concurrency: usize,
    sample_interval: Duration,
    reconcile_delay: Duration,
    events_tx: mpsc::UnboundedSender<SchedulerEvent>,
    events_rx: mpsc::UnboundedReceiver<SchedulerEvent>,
    /// Deferred reconciles spawned but not yet applied.
    deferred_reconciles: usize,
    /// Set by `shutdown`; admission stops for good.
    shutting_down: bool,
    observer: Option<mpsc::Sender<QueueSnapshot>>,
}

impl<T: Transport> UploadScheduler<T> {
    pub fn new(cfg: &UploaderConfig, transport: T) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            queue: Queue::new(),
            concurrency: cfg.concurrency_limit(),
            sample_interval: cfg.speed_sample_interval(),
            reconcile_delay: cfg.reconcile_delay(),
            events_tx,
            events_rx,
            deferred_reconciles: 0,
            shutting_down: false,
            observer: None,
        }
    }

    /// Publish a snapshot to `tx` after every state change. Snapshots are sent
    /// with `try_send`; a slow observer misses intermediate states, not the engine.
    pub fn with_observer(mut self, tx: mpsc::Sender<QueueSnapshot>) -> Self {
        self.observer = Some(tx);
        self
    }

    /// Append files as pending items. Admission happens on the next `reconcile`.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = FileSource>) -> Vec<ItemId> {
        let ids = self.queue.push_files(files, Instant::now());
        tracing::debug!(added = ids.len(), queued = self.queue.len(), "files added");
        self.publish();
        ids
    }

    /// Read access to the current queue.
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }

    fn publish(&self) {
        if let Some(tx) = &self.observer {
            let _ = tx.try_send(self.queue.snapshot());
        }
    }
}
