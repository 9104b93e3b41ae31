//! Aggregate progress over the whole queue (counts, bytes, fraction).
//!
//! Used by observers to render a batch summary; consumers can compute an
//! overall percentage and tell when the batch has settled.

use serde::Serialize;

use super::item::{UploadItem, UploadStatus};

/// Snapshot of queue-wide progress (CLI-friendly).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub active: usize,
    pub success: usize,
    pub error: usize,
    /// File bytes sent so far (finished uploads count in full).
    pub bytes_done: u64,
    /// Sum of all file sizes.
    pub total_bytes: u64,
}

impl QueueStats {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a UploadItem>) -> Self {
        let mut stats = QueueStats::default();
        for item in items {
            match item.status() {
                UploadStatus::Pending => stats.pending += 1,
                UploadStatus::Active => stats.active += 1,
                UploadStatus::Success => stats.success += 1,
                UploadStatus::Error => stats.error += 1,
            }
            stats.bytes_done += item.loaded();
            stats.total_bytes += item.total();
        }
        stats
    }

    pub fn item_count(&self) -> usize {
        self.pending + self.active + self.success + self.error
    }

    /// Nothing waiting or in flight.
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.active == 0
    }

    /// Fraction of bytes sent in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return if self.is_settled() { 1.0 } else { 0.0 };
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}
