//! Liveness finite state machine.
//!
//! A pure, side-effect-free transition function in the same shape as a
//! source-health FSM: [`transition_liveness`] is the single entry point for
//! all state changes, and [`AttachBackoff`] throttles repeated attach work.

use crate::types::LivenessState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Backoff exponent cap: at most `2^6 = 64` poll cycles between attach attempts.
pub const MAX_BACKOFF_EXPONENT: u32 = 6;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input to the liveness FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessSignal {
    /// Discovery found the source and attach work succeeded.
    Attached,
    /// A poll through the current handle succeeded.
    PollSucceeded,
    /// A poll failed but the source is still there (transient or fatal).
    PollFailed,
    /// Discovery no longer finds the source, or a poll reported it gone.
    Gone,
    /// Attach work failed; nothing is cached.
    AttachFailed,
}

// ---------------------------------------------------------------------------
// Transition function
// ---------------------------------------------------------------------------

/// Pure state machine: next liveness given the previous state and a signal.
#[must_use]
pub fn transition_liveness(previous: LivenessState, signal: LivenessSignal) -> LivenessState {
    match (previous, signal) {
        (_, LivenessSignal::Gone | LivenessSignal::AttachFailed) => LivenessState::Detached,
        (_, LivenessSignal::Attached) => LivenessState::Attached,
        // Polls only happen through a held handle; a stray signal while
        // detached does not resurrect the source.
        (LivenessState::Detached, LivenessSignal::PollSucceeded | LivenessSignal::PollFailed) => {
            LivenessState::Detached
        }
        (_, LivenessSignal::PollSucceeded) => LivenessState::Attached,
        (_, LivenessSignal::PollFailed) => LivenessState::Degraded,
    }
}

// ---------------------------------------------------------------------------
// Attach backoff
// ---------------------------------------------------------------------------

/// Exponential backoff for attach attempts, counted in poll cycles.
///
/// After `n` consecutive failures the next attempt happens `2^min(n, 6)`
/// cycles later. Discovery itself is never throttled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachBackoff {
    consecutive_failures: u32,
    cycles_until_retry: u32,
}

impl AttachBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per poll cycle in which the source was discovered.
    /// Returns `true` when attach work may run this cycle.
    pub fn should_attempt(&mut self) -> bool {
        if self.cycles_until_retry == 0 {
            return true;
        }
        self.cycles_until_retry -= 1;
        self.cycles_until_retry == 0
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.cycles_until_retry = 2u32.pow(self.consecutive_failures.min(MAX_BACKOFF_EXPONENT));
    }

    pub fn record_success(&mut self) {
        *self = Self::default();
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
