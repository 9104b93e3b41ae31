//! Throughput estimation from progress samples.
//!
//! Pure functions over `(previous sample, current sample)`; the scheduler keeps
//! the previous sample on each item and decides when a new one is due.

use std::time::Duration;
use tokio::time::Instant;

const UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];
const STEP: f64 = 1024.0;

/// Bytes transferred as of an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedSample {
    pub loaded: u64,
    pub at: Instant,
}

impl SpeedSample {
    /// Sample taken when a transfer (re)starts.
    pub fn start(at: Instant) -> Self {
        Self { loaded: 0, at }
    }

    /// True when more than `interval` has elapsed since this sample.
    pub fn is_due(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.at) > interval
    }
}

/// Average rate between two samples in bytes per second (0 when no time elapsed).
pub fn bytes_per_sec(prev: SpeedSample, now: SpeedSample) -> f64 {
    let delta_ms = now.at.saturating_duration_since(prev.at).as_secs_f64() * 1000.0;
    if delta_ms <= 0.0 {
        return 0.0;
    }
    let delta_bytes = now.loaded.saturating_sub(prev.loaded) as f64;
    delta_bytes / delta_ms * 1000.0
}

/// Human-readable rate, e.g. `"1.5 KB/s"`. Zero (or a non-finite rate) is `"0 KB/s"`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec <= 0.0 || !bytes_per_sec.is_finite() {
        return "0 KB/s".to_string();
    }
    let exp = (bytes_per_sec.ln() / STEP.ln()).floor();
    let unit = exp.clamp(0.0, (UNITS.len() - 1) as f64) as usize;
    let value = bytes_per_sec / STEP.powi(unit as i32);
    format!("{} {}", trim_decimals(value), UNITS[unit])
}

/// Two decimals, with trailing zeros (and a dangling point) removed.
fn trim_decimals(value: f64) -> String {
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
