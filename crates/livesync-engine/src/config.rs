//! Engine tuning knobs. Deserializable so the runtime can read them from
//! the `[engine]` table of its TOML config.

use std::num::NonZeroUsize;
use std::time::Duration;

use livesync_core::FailurePolicy;
use livesync_core::policy::DEFAULT_FATAL_RESET_THRESHOLD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data-refresh cadence.
    pub data_interval_ms: u64,
    /// Resolution-refresh cadence; `None` for sources without one.
    pub resolve_interval_ms: Option<u64>,
    /// Upper bound on one fetch (and one resolution refresh).
    pub fetch_timeout_ms: u64,
    /// Upper bound on one derived computation.
    pub compute_timeout_ms: u64,
    /// Consecutive fatal failures before the model is cleared.
    pub fatal_reset_threshold: u32,
    /// Minimum identity dwell before derived lookups; 0 disables.
    pub min_dwell_secs: f64,
    /// Maximum stored derived artifacts; `None` is unbounded.
    pub cache_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_interval_ms: 1000,
            resolve_interval_ms: None,
            fetch_timeout_ms: 1000,
            compute_timeout_ms: 5000,
            fatal_reset_threshold: DEFAULT_FATAL_RESET_THRESHOLD,
            min_dwell_secs: 0.0,
            cache_capacity: None,
        }
    }
}

impl EngineConfig {
    pub fn data_interval(&self) -> Duration {
        Duration::from_millis(self.data_interval_ms)
    }

    pub fn resolve_interval(&self) -> Option<Duration> {
        self.resolve_interval_ms.map(Duration::from_millis)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn compute_timeout(&self) -> Duration {
        Duration::from_millis(self.compute_timeout_ms)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy {
            fatal_reset_threshold: self.fatal_reset_threshold,
        }
    }

    pub fn cache_capacity(&self) -> Option<NonZeroUsize> {
        self.cache_capacity.and_then(NonZeroUsize::new)
    }
}
