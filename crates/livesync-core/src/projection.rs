//! Projection contract between polled snapshots and the host-facing model,
//! plus the playback clock used for local interpolation between polls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cadence::sanitize_delta;
use crate::change::ChangeKind;
use crate::types::PolledSnapshot;

/// How a refresh should treat the derived-artifact field of the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactUpdate<A> {
    /// Leave the current artifact in place.
    Keep,
    /// Replace it; `None` clears it to the empty sentinel.
    Replace(Option<Arc<A>>),
}

impl<A> ArtifactUpdate<A> {
    /// Apply to a model field.
    pub fn apply_to(self, field: &mut Option<Arc<A>>) {
        if let Self::Replace(value) = self {
            *field = value;
        }
    }
}

/// A host-facing model fed by polled snapshots.
///
/// `Default` is the empty sentinel. All writes happen through `&mut self`
/// from the single engine owner, so [`Projection::reset`] is observed by
/// consumers as one atomic replacement.
pub trait Projection: Default + PartialEq {
    type Payload;
    type Artifact;

    /// Full refresh from a successful poll. Fields that vary every poll
    /// (positions, volumes) are written whatever `change` says; fields tied
    /// to the snapshot identity are written only when `change` is a change.
    fn refresh(
        &mut self,
        snapshot: &PolledSnapshot<Self::Payload>,
        change: ChangeKind,
        artifact: ArtifactUpdate<Self::Artifact>,
    );

    /// Advance time-derived fields by `delta_secs` between polls.
    fn interpolate(&mut self, _delta_secs: f64) {}

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Locally advancing playback position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackClock {
    position_secs: f64,
    duration_secs: f64,
    paused: bool,
}

impl PlaybackClock {
    /// Re-base the clock on freshly polled values.
    pub fn sync(&mut self, position_secs: f64, duration_secs: f64, paused: bool) {
        self.duration_secs = sanitize_delta(duration_secs);
        self.position_secs = sanitize_delta(position_secs);
        if self.duration_secs > 0.0 {
            self.position_secs = self.position_secs.min(self.duration_secs);
        }
        self.paused = paused;
    }

    /// Advance by `delta_secs` unless paused or duration is zero.
    /// Returns whether the position moved forward.
    pub fn advance(&mut self, delta_secs: f64) -> bool {
        if self.paused || self.duration_secs <= 0.0 {
            return false;
        }
        let next = (self.position_secs + sanitize_delta(delta_secs)).min(self.duration_secs);
        let moved = next > self.position_secs;
        self.position_secs = next;
        moved
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// position / duration, 0 when the duration is unknown.
    pub fn ratio(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.position_secs / self.duration_secs
        } else {
            0.0
        }
    }
}
