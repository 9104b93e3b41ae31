//! One file's upload record and its status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::speed::{self, SpeedSample};
use crate::transport::{CancelHandle, TransferFailure};

use super::payload::ResponsePayload;
use super::source::FileSource;

/// Identifier of an item within one scheduler; assigned in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub(crate) u64);

impl ItemId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Active,
    Success,
    Error,
}

impl UploadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Active => "active",
            UploadStatus::Success => "success",
            UploadStatus::Error => "error",
        }
    }

    /// Edges of the item state machine:
    /// pending → active → {success, error}; active → pending (cancel); error → pending (retry).
    pub fn can_transition_to(self, to: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, to),
            (Pending, Active) | (Active, Success) | (Active, Error) | (Active, Pending) | (Error, Pending)
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload record. Readable by anyone; mutated only by the scheduler.
#[derive(Debug, Clone)]
pub struct UploadItem {
    id: ItemId,
    source: FileSource,
    status: UploadStatus,
    progress: f64,
    loaded: u64,
    total: u64,
    speed_label: String,
    attempts: u32,
    response: Option<ResponsePayload>,
    error_body: Option<String>,
    error_message: Option<String>,
    sample: SpeedSample,
    cancel: Option<CancelHandle>,
}

impl UploadItem {
    pub(crate) fn new(id: ItemId, source: FileSource, now: Instant) -> Self {
        let total = source.size();
        Self {
            id,
            source,
            status: UploadStatus::Pending,
            progress: 0.0,
            loaded: 0,
            total,
            speed_label: String::new(),
            attempts: 0,
            response: None,
            error_body: None,
            error_message: None,
            sample: SpeedSample::start(now),
            cancel: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Display name (not unique).
    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Percent complete in [0, 100].
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// File bytes sent in the current attempt.
    pub fn loaded(&self) -> u64 {
        self.loaded
    }

    /// File size in bytes.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Last computed throughput; empty when not transferring.
    pub fn speed_label(&self) -> &str {
        &self.speed_label
    }

    /// How many times the item has been admitted.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn response(&self) -> Option<&ResponsePayload> {
        self.response.as_ref()
    }

    /// Raw body of a rejected upload.
    pub fn error_body(&self) -> Option<&str> {
        self.error_body.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn sample(&self) -> SpeedSample {
        self.sample
    }

    pub(crate) fn cancel_handle(&self) -> Option<&CancelHandle> {
        self.cancel.as_ref()
    }

    fn transition(&mut self, to: UploadStatus) -> bool {
        if !self.status.can_transition_to(to) {
            tracing::warn!(
                item = %self.id,
                from = %self.status,
                to = %to,
                "rejected illegal status transition"
            );
            return false;
        }
        tracing::debug!(item = %self.id, from = %self.status, to = %to, "status");
        self.status = to;
        true
    }

    fn reset_transfer_state(&mut self) {
        self.progress = 0.0;
        self.loaded = 0;
        self.speed_label.clear();
    }

    /// pending → active: starts a fresh attempt and resets sampling state.
    /// Returns the attempt number, or None if the item was not pending.
    pub(crate) fn activate(&mut self, now: Instant) -> Option<u32> {
        if !self.transition(UploadStatus::Active) {
            return None;
        }
        self.attempts += 1;
        self.reset_transfer_state();
        self.response = None;
        self.error_body = None;
        self.error_message = None;
        self.sample = SpeedSample::start(now);
        Some(self.attempts)
    }

    pub(crate) fn attach_cancel(&mut self, cancel: CancelHandle) {
        self.cancel = Some(cancel);
    }

    /// Apply one progress sample measured on the wire. `wire_total` includes the
    /// multipart framing, so bytes are scaled onto the file size. Refreshes the
    /// speed label when more than `interval` has passed since the last sample.
    pub(crate) fn record_progress(
        &mut self,
        wire_loaded: u64,
        wire_total: u64,
        now: Instant,
        interval: Duration,
    ) {
        if wire_total == 0 {
            return;
        }
        let wire_loaded = wire_loaded.min(wire_total);
        self.loaded = (wire_loaded as u128 * self.total as u128 / wire_total as u128) as u64;
        self.progress = if self.total > 0 {
            (self.loaded as f64 / self.total as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        if self.sample.is_due(now, interval) {
            let current = SpeedSample {
                loaded: self.loaded,
                at: now,
            };
            self.speed_label = speed::format_speed(speed::bytes_per_sec(self.sample, current));
            self.sample = current;
        }
    }

    /// active → success.
    pub(crate) fn succeed(&mut self, body: &[u8]) -> bool {
        if !self.transition(UploadStatus::Success) {
            return false;
        }
        self.cancel = None;
        self.progress = 100.0;
        self.loaded = self.total;
        self.speed_label.clear();
        self.response = Some(ResponsePayload::parse(body));
        true
    }

    /// active → error, keeping whatever diagnostics the transport surfaced.
    pub(crate) fn fail(&mut self, failure: &TransferFailure) -> bool {
        if !self.transition(UploadStatus::Error) {
            return false;
        }
        self.cancel = None;
        self.speed_label.clear();
        self.error_message = Some(failure.to_string());
        if let TransferFailure::Rejected { body, .. } = failure {
            self.error_body = Some(String::from_utf8_lossy(body).into_owned());
        }
        true
    }

    /// active → pending after a cancelled transfer; eligible for re-admission.
    pub(crate) fn cancelled(&mut self) -> bool {
        if !self.transition(UploadStatus::Pending) {
            return false;
        }
        self.cancel = None;
        self.reset_transfer_state();
        true
    }

    /// error → pending on caller retry. Pending items just get their progress reset.
    pub(crate) fn requeue(&mut self) -> bool {
        match self.status {
            UploadStatus::Pending => {
                self.reset_transfer_state();
                true
            }
            UploadStatus::Error => {
                self.transition(UploadStatus::Pending);
                self.reset_transfer_state();
                true
            }
            UploadStatus::Active | UploadStatus::Success => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(size: usize) -> UploadItem {
        UploadItem::new(
            ItemId(1),
            FileSource::from_bytes("a.bin", vec![0u8; size]),
            Instant::now(),
        )
    }

    #[test]
    fn state_machine_edges() {
        use UploadStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Success));
        assert!(Active.can_transition_to(Error));
        assert!(Active.can_transition_to(Pending));
        assert!(Error.can_transition_to(Pending));
        assert!(!Success.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Success));
        assert!(!Error.can_transition_to(Active));
    }

    #[test]
    fn new_item_is_pending_with_file_size() {
        let it = item(1000);
        assert_eq!(it.status(), UploadStatus::Pending);
        assert_eq!(it.total(), 1000);
        assert_eq!(it.loaded(), 0);
        assert_eq!(it.progress(), 0.0);
        assert_eq!(it.speed_label(), "");
    }

    #[test]
    fn success_requires_active() {
        let mut it = item(10);
        assert!(!it.succeed(b"{}"));
        assert_eq!(it.status(), UploadStatus::Pending);
        assert_eq!(it.activate(Instant::now()), Some(1));
        assert!(it.succeed(b"{}"));
        assert_eq!(it.progress(), 100.0);
        assert_eq!(it.loaded(), 10);
        assert!(!it.requeue(), "success is terminal");
    }

    #[test]
    fn progress_is_scaled_onto_file_size() {
        let mut it = item(1000);
        let t0 = Instant::now();
        it.activate(t0);
        // 1200 wire bytes for a 1000-byte file (multipart framing).
        it.record_progress(600, 1200, t0, Duration::from_millis(500));
        assert_eq!(it.loaded(), 500);
        assert!((it.progress() - 50.0).abs() < 1e-9);
        it.record_progress(5000, 1200, t0, Duration::from_millis(500));
        assert_eq!(it.loaded(), 1000);
        assert_eq!(it.progress(), 100.0);
    }

    #[test]
    fn unknown_total_freezes_progress() {
        let mut it = item(1000);
        let t0 = Instant::now();
        it.activate(t0);
        it.record_progress(600, 1200, t0, Duration::from_millis(500));
        it.record_progress(900, 0, t0, Duration::from_millis(500));
        assert_eq!(it.loaded(), 500);
    }

    #[test]
    fn speed_label_updates_only_after_interval() {
        let mut it = item(1_000_000);
        let t0 = Instant::now();
        it.activate(t0);
        let interval = Duration::from_millis(500);
        it.record_progress(1024, 1_000_000, t0 + Duration::from_millis(200), interval);
        assert_eq!(it.speed_label(), "");
        it.record_progress(2048, 1_000_000, t0 + Duration::from_millis(1000), interval);
        assert_eq!(it.speed_label(), "2 KB/s");
        assert_eq!(it.sample().loaded, 2048);
    }

    #[test]
    fn failure_keeps_rejected_body() {
        let mut it = item(10);
        it.activate(Instant::now());
        assert!(it.fail(&TransferFailure::Rejected {
            status: 500,
            body: b"boom".to_vec()
        }));
        assert_eq!(it.status(), UploadStatus::Error);
        assert_eq!(it.error_body(), Some("boom"));
        assert_eq!(it.error_message(), Some("HTTP 500"));
        assert!(it.requeue());
        assert_eq!(it.status(), UploadStatus::Pending);
        assert_eq!(it.activate(Instant::now()), Some(2));
        assert_eq!(it.error_body(), None);
    }

    #[test]
    fn cancellation_returns_to_pending() {
        let mut it = item(1000);
        let t0 = Instant::now();
        it.activate(t0);
        it.attach_cancel(CancelHandle::new());
        it.record_progress(600, 1200, t0, Duration::from_millis(500));
        assert!(it.cancelled());
        assert_eq!(it.status(), UploadStatus::Pending);
        assert_eq!(it.progress(), 0.0);
        assert_eq!(it.speed_label(), "");
        assert!(it.cancel_handle().is_none());
    }
}
