//! Error policy: turns a classified failure into a model/liveness action.
//!
//! - Transient: keep the model exactly as it is.
//! - Fatal: keep the model, until `fatal_reset_threshold` consecutive fatal
//!   failures, then present the empty sentinel.
//! - SourceGone: detach and reset.

use serde::{Deserialize, Serialize};

use crate::error::FailureClass;

/// Default number of consecutive fatal failures before the model is cleared.
pub const DEFAULT_FATAL_RESET_THRESHOLD: u32 = 3;

/// What the engine does after a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    /// Leave the projected model untouched; liveness becomes Degraded.
    RetainModel,
    /// Replace the model with its empty sentinel but keep the handle.
    ResetModel,
    /// Release the handle, go Detached and reset the model.
    Detach,
}

/// Configurable thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePolicy {
    pub fatal_reset_threshold: u32,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            fatal_reset_threshold: DEFAULT_FATAL_RESET_THRESHOLD,
        }
    }
}

/// Tracks consecutive failures against a [`FailurePolicy`].
#[derive(Debug, Clone, Default)]
pub struct FailureTracker {
    policy: FailurePolicy,
    consecutive_fatal: u32,
    consecutive_transient: u32,
}

impl FailureTracker {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            consecutive_fatal: 0,
            consecutive_transient: 0,
        }
    }

    /// Record one failed poll and decide what to do about it.
    pub fn record(&mut self, class: FailureClass) -> PolicyAction {
        match class {
            FailureClass::Transient => {
                self.consecutive_transient = self.consecutive_transient.saturating_add(1);
                PolicyAction::RetainModel
            }
            FailureClass::Fatal => {
                self.consecutive_fatal = self.consecutive_fatal.saturating_add(1);
                // Threshold of at least 1 so a zero config means "reset on first".
                if self.consecutive_fatal >= self.policy.fatal_reset_threshold.max(1) {
                    PolicyAction::ResetModel
                } else {
                    PolicyAction::RetainModel
                }
            }
            FailureClass::SourceGone => {
                self.clear();
                PolicyAction::Detach
            }
        }
    }

    /// A poll succeeded: streaks end.
    pub fn record_success(&mut self) {
        self.clear();
    }

    pub fn clear(&mut self) {
        self.consecutive_fatal = 0;
        self.consecutive_transient = 0;
    }

    pub fn consecutive_fatal(&self) -> u32 {
        self.consecutive_fatal
    }

    pub fn consecutive_transient(&self) -> u32 {
        self.consecutive_transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_retains_model() {
        let mut t = FailureTracker::default();
        for _ in 0..10 {
            assert_eq!(t.record(FailureClass::Transient), PolicyAction::RetainModel);
        }
        assert_eq!(t.consecutive_transient(), 10);
    }

    #[test]
    fn fatal_resets_after_threshold() {
        let mut t = FailureTracker::new(FailurePolicy {
            fatal_reset_threshold: 3,
        });
        assert_eq!(t.record(FailureClass::Fatal), PolicyAction::RetainModel);
        assert_eq!(t.record(FailureClass::Fatal), PolicyAction::RetainModel);
        assert_eq!(t.record(FailureClass::Fatal), PolicyAction::ResetModel);
        assert_eq!(t.record(FailureClass::Fatal), PolicyAction::ResetModel);
    }

    #[test]
    fn zero_threshold_resets_on_first_fatal() {
        let mut t = FailureTracker::new(FailurePolicy {
            fatal_reset_threshold: 0,
        });
        assert_eq!(t.record(FailureClass::Fatal), PolicyAction::ResetModel);
    }

    #[test]
    fn success_clears_fatal_streak() {
        let mut t = FailureTracker::default();
        t.record(FailureClass::Fatal);
        t.record(FailureClass::Fatal);
        t.record_success();
        assert_eq!(t.consecutive_fatal(), 0);
        assert_eq!(t.record(FailureClass::Fatal), PolicyAction::RetainModel);
    }

    #[test]
    fn gone_detaches_and_clears() {
        let mut t = FailureTracker::default();
        t.record(FailureClass::Fatal);
        assert_eq!(t.record(FailureClass::SourceGone), PolicyAction::Detach);
        assert_eq!(t.consecutive_fatal(), 0);
    }

    #[test]
    fn transient_does_not_break_fatal_streak() {
        let mut t = FailureTracker::default();
        t.record(FailureClass::Fatal);
        t.record(FailureClass::Transient);
        t.record(FailureClass::Fatal);
        assert_eq!(t.record(FailureClass::Fatal), PolicyAction::ResetModel);
    }
}
