//! Fixed-interval cadence driven by host tick deltas.
//!
//! The accumulator is reset to zero whenever the cadence fires, so a host
//! stall that delivers one huge delta produces exactly one firing.

use std::time::Duration;

/// Default data-refresh interval.
pub const DEFAULT_DATA_INTERVAL: Duration = Duration::from_secs(1);

/// Default resolution-refresh interval (slower, for volatile addresses).
pub const DEFAULT_RESOLVE_INTERVAL: Duration = Duration::from_secs(2);

/// Accumulates elapsed host time and fires once per interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Cadence {
    interval_secs: f64,
    accumulated_secs: f64,
}

impl Cadence {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_secs: interval.as_secs_f64(),
            accumulated_secs: 0.0,
        }
    }

    /// Add `delta_secs` of host time. Returns `true` when the interval has
    /// been reached; the accumulator is then cleared, not decremented.
    pub fn advance(&mut self, delta_secs: f64) -> bool {
        self.accumulated_secs += sanitize_delta(delta_secs);
        if self.accumulated_secs >= self.interval_secs {
            self.accumulated_secs = 0.0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.accumulated_secs = 0.0;
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    pub fn accumulated_secs(&self) -> f64 {
        self.accumulated_secs
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_INTERVAL)
    }
}

/// Host deltas are untrusted: negative, NaN and infinite values count as zero.
pub fn sanitize_delta(delta_secs: f64) -> f64 {
    if delta_secs.is_finite() && delta_secs > 0.0 {
        delta_secs
    } else {
        0.0
    }
}
