//! Identity-based change detection.
//!
//! Snapshots are compared by their declared identity key only, never by
//! payload equality, so detection is O(1) whatever the payload size. The
//! detector also remembers which derived key has been resolved, so a failed
//! derived computation is retried on the next poll of the same key.

use serde::{Deserialize, Serialize};

use crate::cadence::sanitize_delta;
use crate::types::PolledSnapshot;

/// Outcome of comparing a snapshot against the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Same identity as the previous snapshot.
    Unchanged,
    /// New identity with a new (or newly absent) derived key.
    Changed,
    /// New identity, but the derived key is the one already seen.
    ChangedIdentityOnly,
}

impl ChangeKind {
    pub fn is_changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// What the engine should do with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub change: ChangeKind,
    /// `Some(key)` when the derived artifact for `key` should be looked up
    /// (or computed) during this poll.
    pub needs_derived: Option<String>,
}

/// Remembers the previous identity and derived-key state.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    initialized: bool,
    last_identity: Option<String>,
    last_derived_key: Option<String>,
    resolved_key: Option<String>,
    identity_dwell_secs: f64,
    min_dwell_secs: f64,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defer derived lookups until an identity has been stable for
    /// `min_dwell_secs` of host time. Zero disables the gate.
    #[must_use]
    pub fn with_min_dwell(mut self, min_dwell_secs: f64) -> Self {
        self.min_dwell_secs = sanitize_delta(min_dwell_secs);
        self
    }

    /// Account for host time spent on the current identity.
    pub fn advance(&mut self, delta_secs: f64) {
        self.identity_dwell_secs += sanitize_delta(delta_secs);
    }

    /// Compare `snapshot` with the previously observed one and record it.
    pub fn observe<P>(&mut self, snapshot: &PolledSnapshot<P>) -> Observation {
        let identity = snapshot.identity();
        let derived_key = snapshot.derived_key();

        let change = if self.initialized && self.last_identity.as_deref() == identity {
            ChangeKind::Unchanged
        } else if self.initialized
            && derived_key.is_some()
            && self.last_derived_key.as_deref() == derived_key
        {
            ChangeKind::ChangedIdentityOnly
        } else {
            ChangeKind::Changed
        };

        if change.is_changed() {
            self.identity_dwell_secs = 0.0;
        }
        self.initialized = true;
        self.last_identity = identity.map(str::to_owned);
        self.last_derived_key = derived_key.map(str::to_owned);

        let dwell_ok = self.identity_dwell_secs >= self.min_dwell_secs;
        let needs_derived = match derived_key {
            Some(key) if dwell_ok && self.resolved_key.as_deref() != Some(key) => {
                Some(key.to_owned())
            }
            _ => None,
        };

        Observation {
            change,
            needs_derived,
        }
    }

    /// Record that the artifact for `key` is now available.
    pub fn mark_resolved(&mut self, key: &str) {
        self.resolved_key = Some(key.to_owned());
    }

    pub fn resolved_key(&self) -> Option<&str> {
        self.resolved_key.as_deref()
    }

    pub fn last_identity(&self) -> Option<&str> {
        self.last_identity.as_deref()
    }

    /// Forget everything (used when the source detaches). The dwell
    /// configuration is kept.
    pub fn reset(&mut self) {
        *self = Self {
            min_dwell_secs: self.min_dwell_secs,
            ..Self::default()
        };
    }
}
