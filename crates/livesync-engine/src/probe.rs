//! External source probe: discovery, one-time attach, restart detection and
//! idempotent release. Never fails; every outcome is a liveness value.

use chrono::Utc;
use livesync_core::{
    AttachBackoff, HandleAllocator, LivenessSignal, LivenessState, SourceHandle,
    transition_liveness,
};

use crate::source::ExternalSource;

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub state: LivenessState,
    /// A new handle was attached during this probe.
    pub attached: bool,
    /// A previously held handle was released during this probe.
    pub detached: bool,
}

/// Owns the source handle and the liveness FSM.
#[derive(Debug, Default)]
pub struct SourceProbe {
    state: LivenessState,
    handle: Option<SourceHandle>,
    allocator: HandleAllocator,
    backoff: AttachBackoff,
    /// A poll has succeeded through the held handle.
    confirmed: bool,
}

impl SourceProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LivenessState {
        self.state
    }

    pub fn handle(&self) -> Option<&SourceHandle> {
        self.handle.as_ref()
    }

    /// Discover the source and reconcile the held handle with what was found.
    pub fn probe<S: ExternalSource>(&mut self, source: &mut S) -> ProbeReport {
        let mut detached = false;

        let Some(target) = source.discover() else {
            detached = self.detach(source);
            return self.report(false, detached);
        };

        if let Some(current) = &self.handle {
            if current.target() == &target {
                return self.report(false, false);
            }
            tracing::info!(
                source = source.name(),
                previous = %current,
                "source instance changed, re-attaching"
            );
            detached = self.detach(source);
        }

        if !self.backoff.should_attempt() {
            tracing::debug!(
                source = source.name(),
                failures = self.backoff.consecutive_failures(),
                "attach deferred by backoff"
            );
            return self.report(false, detached);
        }

        let handle = self.allocator.allocate(target, Utc::now());
        match source.attach(&handle) {
            Ok(()) => {
                tracing::info!(source = source.name(), handle = %handle, "attached");
                self.handle = Some(handle);
                self.confirmed = false;
                self.state = transition_liveness(self.state, LivenessSignal::Attached);
                self.report(true, detached)
            }
            Err(e) => {
                tracing::warn!(source = source.name(), handle = %handle, "attach failed: {e}");
                source.release(&handle);
                self.backoff.record_failure();
                self.state = transition_liveness(self.state, LivenessSignal::AttachFailed);
                self.report(false, detached)
            }
        }
    }

    /// Feed a poll outcome through the FSM (Attached ⇄ Degraded). The first
    /// success through a handle clears the attach backoff.
    pub fn record_poll(&mut self, succeeded: bool) {
        let signal = if succeeded {
            LivenessSignal::PollSucceeded
        } else {
            LivenessSignal::PollFailed
        };
        self.state = transition_liveness(self.state, signal);
        if succeeded && self.handle.is_some() && !self.confirmed {
            self.confirmed = true;
            self.backoff.record_success();
        }
    }

    /// The source reported itself gone through the held handle. A handle
    /// that never completed a poll counts as a failed attach, so a service
    /// that is discoverable but refuses every request is retried with backoff.
    pub fn report_gone<S: ExternalSource>(&mut self, source: &mut S) -> bool {
        if self.handle.is_some() && !self.confirmed {
            self.backoff.record_failure();
            tracing::debug!(
                source = source.name(),
                failures = self.backoff.consecutive_failures(),
                "source gone before its first poll, backing off"
            );
        }
        self.detach(source)
    }

    /// Release the held handle, if any. Returns whether one was released;
    /// calling it again is a no-op.
    pub fn detach<S: ExternalSource>(&mut self, source: &mut S) -> bool {
        self.state = transition_liveness(self.state, LivenessSignal::Gone);
        self.confirmed = false;
        match self.handle.take() {
            Some(handle) => {
                tracing::info!(source = source.name(), handle = %handle, "detached");
                source.release(&handle);
                true
            }
            None => false,
        }
    }

    /// Back to a fresh Detached probe, releasing any held handle. The
    /// allocator is kept so generations keep growing across activations.
    pub fn reinitialize<S: ExternalSource>(&mut self, source: &mut S) {
        self.detach(source);
        self.backoff.record_success();
    }

    fn report(&self, attached: bool, detached: bool) -> ProbeReport {
        ProbeReport {
            state: self.state,
            attached,
            detached,
        }
    }
}
