//! Transfer capability consumed by the scheduler.
//!
//! A transport performs one network transfer per `send` and reports it as a
//! stream of `TransferEvent`s: any number of progress samples followed by
//! exactly one `Finished`. Transports never see the queue; the scheduler
//! applies their events.

mod cancel;
mod error;
mod http;

pub use self::cancel::CancelHandle;
pub use self::error::TransportError;
pub use self::http::CurlTransport;

use tokio::sync::mpsc;

use crate::queue::{FileSource, ItemId};

/// Everything a transport needs to upload one item.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub item: ItemId,
    pub source: FileSource,
}

/// Why an upload did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFailure {
    /// Server answered outside 200..=299; body kept for diagnostics.
    Rejected { status: u32, body: Vec<u8> },
    /// Connection-level failure (reset, DNS, timeout, stalled transfer).
    Network(String),
}

impl std::fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferFailure::Rejected { status, .. } => write!(f, "HTTP {}", status),
            TransferFailure::Network(msg) => write!(f, "network: {}", msg),
        }
    }
}

/// Terminal result of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Succeeded { status: u32, body: Vec<u8> },
    Failed(TransferFailure),
    /// Stopped through the `CancelHandle`.
    Cancelled,
}

impl TransferOutcome {
    /// Classify a completed HTTP exchange by status code.
    pub fn from_response(status: u32, body: Vec<u8>) -> Self {
        if (200..300).contains(&status) {
            TransferOutcome::Succeeded { status, body }
        } else {
            TransferOutcome::Failed(TransferFailure::Rejected { status, body })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Bytes sent so far; `total` is None while the length is not measurable.
    Progress { loaded: u64, total: Option<u64> },
    Finished(TransferOutcome),
}

/// Subscription to one in-flight transfer.
#[derive(Debug)]
pub struct TransferHandle {
    pub events: mpsc::UnboundedReceiver<TransferEvent>,
    pub cancel: CancelHandle,
}

/// Sending half handed to transport implementations.
pub type EventSender = mpsc::UnboundedSender<TransferEvent>;

impl TransferHandle {
    /// Fresh channel + cancel handle; the transport keeps the sender and a clone
    /// of the cancel handle, the caller gets the handle.
    pub fn channel() -> (EventSender, CancelHandle, TransferHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelHandle::new();
        let handle = TransferHandle {
            events: rx,
            cancel: cancel.clone(),
        };
        (tx, cancel, handle)
    }
}

/// Pluggable capability performing the actual uploads.
pub trait Transport {
    /// Start uploading `request`. Must not block; the work happens elsewhere
    /// and is observed through the returned handle.
    fn send(&self, request: TransferRequest) -> TransferHandle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_range_classification() {
        assert!(matches!(
            TransferOutcome::from_response(200, vec![]),
            TransferOutcome::Succeeded { status: 200, .. }
        ));
        assert!(matches!(
            TransferOutcome::from_response(299, vec![]),
            TransferOutcome::Succeeded { .. }
        ));
        assert_eq!(
            TransferOutcome::from_response(300, b"moved".to_vec()),
            TransferOutcome::Failed(TransferFailure::Rejected {
                status: 300,
                body: b"moved".to_vec()
            })
        );
        assert!(matches!(
            TransferOutcome::from_response(500, vec![]),
            TransferOutcome::Failed(TransferFailure::Rejected { status: 500, .. })
        ));
    }

    #[test]
    fn failure_display() {
        let rejected = TransferFailure::Rejected {
            status: 413,
            body: vec![],
        };
        assert_eq!(rejected.to_string(), "HTTP 413");
        assert_eq!(
            TransferFailure::Network("connection reset".into()).to_string(),
            "network: connection reset"
        );
    }
}
