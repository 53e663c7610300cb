//! The sync engine: a single owner that turns host ticks into polls,
//! change detection, derived lookups and projection writes.
//!
//! Per host tick:
//! 1. advance the data cadence (and the resolution cadence while attached);
//! 2. if the data cadence fired: probe, fetch under a timeout, classify
//!    failures, detect changes, consult the derived cache, refresh the model;
//! 3. otherwise, while attached, interpolate time-derived model fields.
//!
//! Nothing escapes `on_host_tick`: every failure becomes a liveness
//! transition, a retained model or a reset to the empty sentinel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use livesync_core::cadence::sanitize_delta;
use livesync_core::{
    ArtifactUpdate, Cadence, ChangeDetector, ChangeKind, ComputeError, FailureClass,
    FailureTracker, FetchError, LivenessState, Observation, PolicyAction, PolledSnapshot,
    Projection, SourceHandle,
};
use serde::Serialize;

use crate::cache::DerivedCache;
use crate::config::EngineConfig;
use crate::probe::SourceProbe;
use crate::sink::{DiagnosticSink, TracingSink};
use crate::source::{Deriver, ExternalSource};

/// Lifecycle hooks a host drives a plugin through.
pub trait HostPlugin {
    /// (Re)start from a Detached probe with zeroed cadences.
    fn on_activate(&mut self);
    /// Release every resource. Safe to call without a prior activation.
    fn on_deactivate(&mut self);
    /// One host update frame, `delta_secs` after the previous one.
    fn on_host_tick(&mut self, delta_secs: f64) -> impl Future<Output = ()> + Send;
}

/// Read-only engine summary for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub source: String,
    pub active: bool,
    pub liveness: LivenessState,
    pub generation: Option<u64>,
    /// Fetches whose result was applied or classified. Snapshots dropped
    /// for a stale generation are not counted.
    pub polls: u64,
    pub failed_polls: u64,
    pub derived_cached: usize,
}

pub struct SyncEngine<S, D, P>
where
    S: ExternalSource,
    D: Deriver,
{
    source: S,
    deriver: D,
    config: EngineConfig,
    probe: SourceProbe,
    data_cadence: Cadence,
    resolve_cadence: Option<Cadence>,
    detector: ChangeDetector,
    failures: FailureTracker,
    cache: DerivedCache<D::Artifact>,
    model: P,
    sink: Arc<dyn DiagnosticSink>,
    active: bool,
    polls: u64,
    failed_polls: u64,
}

impl<S, D, P> SyncEngine<S, D, P>
where
    S: ExternalSource,
    D: Deriver,
    P: Projection<Payload = S::Payload, Artifact = D::Artifact> + Send,
{
    pub fn new(source: S, deriver: D, config: EngineConfig) -> Self {
        Self {
            data_cadence: Cadence::new(config.data_interval()),
            resolve_cadence: config.resolve_interval().map(Cadence::new),
            detector: ChangeDetector::new().with_min_dwell(config.min_dwell_secs),
            failures: FailureTracker::new(config.failure_policy()),
            cache: DerivedCache::with_capacity(config.cache_capacity()),
            probe: SourceProbe::new(),
            model: P::default(),
            sink: Arc::new(TracingSink),
            active: false,
            polls: 0,
            failed_polls: 0,
            source,
            deriver,
            config,
        }
    }

    /// Route error diagnostics to a host-provided sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn model(&self) -> &P {
        &self.model
    }

    pub fn liveness(&self) -> LivenessState {
        self.probe.state()
    }

    pub fn handle(&self) -> Option<&SourceHandle> {
        self.probe.handle()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &DerivedCache<D::Artifact> {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            source: self.source.name().to_string(),
            active: self.active,
            liveness: self.probe.state(),
            generation: self.probe.handle().map(SourceHandle::generation),
            polls: self.polls,
            failed_polls: self.failed_polls,
            derived_cached: self.cache.len(),
        }
    }

    pub fn activate(&mut self) {
        self.probe.reinitialize(&mut self.source);
        self.data_cadence.reset();
        if let Some(cadence) = self.resolve_cadence.as_mut() {
            cadence.reset();
        }
        self.detector.reset();
        self.failures.clear();
        self.model.reset();
        self.active = true;
        tracing::info!(source = self.source.name(), "activated");
    }

    pub fn deactivate(&mut self) {
        self.probe.detach(&mut self.source);
        self.detector.reset();
        self.failures.clear();
        self.model.reset();
        if self.active {
            tracing::info!(source = self.source.name(), "deactivated");
        }
        self.active = false;
    }

    /// One host tick.
    pub async fn tick(&mut self, delta_secs: f64) {
        if !self.active {
            return;
        }
        let delta = sanitize_delta(delta_secs);
        let live = self.probe.state().is_live();

        let poll_due = self.data_cadence.advance(delta);
        let resolve_due = match self.resolve_cadence.as_mut() {
            Some(cadence) if live => cadence.advance(delta),
            _ => false,
        };
        if live {
            self.detector.advance(delta);
        }

        if poll_due {
            self.poll_cycle(resolve_due).await;
            return;
        }
        if resolve_due {
            self.resolve_only().await;
        }
        if self.probe.state() == LivenessState::Attached {
            self.model.interpolate(delta);
        }
    }

    async fn poll_cycle(&mut self, resolve_due: bool) {
        let report = self.probe.probe(&mut self.source);
        if report.detached {
            self.clear_model();
        }

        let Some(handle) = self.probe.handle().cloned() else {
            if !self.model.is_empty() {
                self.clear_model();
            }
            return;
        };

        if report.attached {
            // Attach did the initial resolution.
            if let Some(cadence) = self.resolve_cadence.as_mut() {
                cadence.reset();
            }
        } else if resolve_due {
            if let Err(e) = self.resolve(&handle).await {
                self.handle_failure(e, "resolve");
                if !self.probe.state().is_live() {
                    return;
                }
            }
        }

        let limit = self.config.fetch_timeout();
        let fetched = tokio::time::timeout(limit, self.source.fetch_snapshot(&handle))
            .await
            .unwrap_or_else(|_| Err(FetchError::Timeout(limit)));

        match fetched {
            Ok(snapshot) => self.apply_snapshot(snapshot, &handle).await,
            Err(e) => {
                self.polls += 1;
                self.handle_failure(e, "fetch");
            }
        }
    }

    async fn resolve_only(&mut self) {
        let Some(handle) = self.probe.handle().cloned() else {
            return;
        };
        if let Err(e) = self.resolve(&handle).await {
            self.handle_failure(e, "resolve");
        }
    }

    async fn resolve(&mut self, handle: &SourceHandle) -> Result<(), FetchError> {
        let limit = self.config.fetch_timeout();
        tokio::time::timeout(limit, self.source.refresh_resolution(handle))
            .await
            .unwrap_or_else(|_| Err(FetchError::Timeout(limit)))
    }

    async fn apply_snapshot(&mut self, snapshot: PolledSnapshot<S::Payload>, handle: &SourceHandle) {
        if snapshot.generation() != handle.generation() {
            tracing::debug!(
                source = self.source.name(),
                snapshot_generation = snapshot.generation(),
                handle_generation = handle.generation(),
                "dropping snapshot from a stale handle"
            );
            return;
        }

        self.polls += 1;
        self.probe.record_poll(true);
        self.failures.record_success();

        let observation = self.detector.observe(&snapshot);
        if observation.change.is_changed() {
            tracing::debug!(
                source = self.source.name(),
                identity = snapshot.identity().unwrap_or("-"),
                change = ?observation.change,
                "snapshot changed"
            );
        }
        let artifact = self.artifact_update(&snapshot, &observation).await;
        self.model.refresh(&snapshot, observation.change, artifact);
    }

    /// Decide what the derived field of the model becomes for this snapshot.
    async fn artifact_update(
        &mut self,
        snapshot: &PolledSnapshot<S::Payload>,
        observation: &Observation,
    ) -> ArtifactUpdate<D::Artifact> {
        let computed = match observation.needs_derived.as_deref() {
            Some(key) => match derive_cached(
                &self.cache,
                &self.deriver,
                self.config.compute_timeout(),
                key,
            )
            .await
            {
                Ok(artifact) => {
                    self.detector.mark_resolved(key);
                    Some(artifact)
                }
                Err(e) => {
                    tracing::warn!(source = self.source.name(), key, "derived computation failed: {e}");
                    self.sink
                        .log_error(&format!("{}: derived computation for {key} failed: {e}", self.source.name()));
                    None
                }
            },
            None => None,
        };

        match (observation.change, computed) {
            (_, Some(artifact)) => ArtifactUpdate::Replace(Some(artifact)),
            (ChangeKind::Unchanged, None) => ArtifactUpdate::Keep,
            (ChangeKind::Changed | ChangeKind::ChangedIdentityOnly, None) => ArtifactUpdate::Replace(
                snapshot
                    .derived_key()
                    .and_then(|key| self.cache.peek(key).ready()),
            ),
        }
    }

    fn handle_failure(&mut self, error: FetchError, stage: &str) {
        self.failed_polls += 1;
        let class = error.class();
        let name = self.source.name().to_string();
        match class {
            FailureClass::Transient => {
                tracing::warn!(source = %name, stage, "transient failure: {error}");
            }
            FailureClass::Fatal => {
                tracing::error!(source = %name, stage, "fatal failure: {error}");
                self.sink.log_error(&format!("{name}: {stage} failed: {error}"));
            }
            FailureClass::SourceGone => {
                tracing::info!(source = %name, stage, "source gone: {error}");
            }
        }

        match self.failures.record(class) {
            PolicyAction::RetainModel => self.probe.record_poll(false),
            PolicyAction::ResetModel => {
                self.probe.record_poll(false);
                if !self.model.is_empty() {
                    tracing::warn!(
                        source = %name,
                        consecutive = self.failures.consecutive_fatal(),
                        "repeated fatal failures, clearing model"
                    );
                }
                self.clear_model();
            }
            PolicyAction::Detach => {
                self.probe.report_gone(&mut self.source);
                self.clear_model();
            }
        }
    }

    /// Empty sentinel plus a fresh change detector, so the next snapshot is
    /// projected in full.
    fn clear_model(&mut self) {
        self.model.reset();
        self.detector.reset();
    }
}

/// Cached derivation bounded by `limit`. Borrows only the cache and the
/// deriver so the tick future stays `Send` without requiring `S: Sync`.
async fn derive_cached<D: Deriver>(
    cache: &DerivedCache<D::Artifact>,
    deriver: &D,
    limit: Duration,
    key: &str,
) -> Result<Arc<D::Artifact>, ComputeError> {
    cache
        .get_or_compute(key, || async move {
            tokio::time::timeout(limit, deriver.derive(key))
                .await
                .unwrap_or_else(|_| Err(ComputeError::Timeout(limit)))
        })
        .await
}

impl<S, D, P> HostPlugin for SyncEngine<S, D, P>
where
    S: ExternalSource,
    D: Deriver,
    P: Projection<Payload = S::Payload, Artifact = D::Artifact> + Send,
{
    fn on_activate(&mut self) {
        self.activate();
    }

    fn on_deactivate(&mut self) {
        self.deactivate();
    }

    fn on_host_tick(&mut self, delta_secs: f64) -> impl Future<Output = ()> + Send {
        self.tick(delta_secs)
    }
}
