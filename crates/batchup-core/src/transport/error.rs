//! Errors raised while setting up or running a curl upload.

use thiserror::Error;

/// Failure inside the curl transport. Never leaves the transport: it is turned
/// into `TransferFailure::Network` so the item records it as state.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("multipart form: {0}")]
    Form(#[from] curl::FormError),
}

impl TransportError {
    /// True when our progress callback stopped the transfer (cancel requested).
    pub fn is_aborted_by_callback(&self) -> bool {
        matches!(self, TransportError::Curl(e) if e.is_aborted_by_callback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_callback_aborts_count_as_cancellation() {
        let aborted = TransportError::Curl(curl::Error::new(42));
        assert!(aborted.is_aborted_by_callback());
        let timeout = TransportError::Curl(curl::Error::new(28));
        assert!(!timeout.is_aborted_by_callback());
    }
}
