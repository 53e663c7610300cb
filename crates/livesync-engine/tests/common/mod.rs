// Shared fixtures for engine integration tests: a scripted source, a counting
// deriver and a small track model.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use livesync_engine::core::{
    ArtifactUpdate, ChangeKind, ComputeError, FetchError, PlaybackClock, PolledSnapshot,
    Projection, SourceHandle, SourceTarget,
};
use livesync_engine::{Deriver, DiagnosticSink, ExternalSource};

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: &'static str,
    pub art: &'static str,
    pub position: f64,
    pub duration: f64,
    pub paused: bool,
}

pub fn track(id: &'static str, art: &'static str, position: f64, duration: f64) -> Track {
    Track {
        id,
        art,
        position,
        duration,
        paused: false,
    }
}

/// What the scripted source does on each fetch.
#[derive(Debug, Default)]
pub struct Script {
    pub present: Option<SourceTarget>,
    pub queued: VecDeque<Result<Track, FetchError>>,
    /// Served once `queued` is exhausted.
    pub steady: Option<Track>,
    pub fetches: usize,
    pub resolutions: usize,
    pub released: Vec<u64>,
    /// Every handle a fetch went through, oldest first.
    pub seen: Vec<SourceHandle>,
    /// Build the next snapshot from the oldest handle seen instead of the
    /// one passed in, as a fetch completing after a restart would.
    pub stale_next: bool,
}

/// Source driven by a [`Script`] the test keeps a handle to.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    pub script: Arc<Mutex<Script>>,
}

impl ScriptedSource {
    pub fn present() -> Self {
        let source = Self::default();
        source.set_present(Some(player(100, 1)));
        source
    }

    pub fn set_present(&self, target: Option<SourceTarget>) {
        self.script.lock().unwrap().present = target;
    }

    pub fn push(&self, response: Result<Track, FetchError>) {
        self.script.lock().unwrap().queued.push_back(response);
    }

    pub fn set_steady(&self, track: Track) {
        self.script.lock().unwrap().steady = Some(track);
    }

    pub fn fetches(&self) -> usize {
        self.script.lock().unwrap().fetches
    }

    pub fn serve_stale_next(&self) {
        self.script.lock().unwrap().stale_next = true;
    }

    pub fn resolutions(&self) -> usize {
        self.script.lock().unwrap().resolutions
    }

    pub fn released(&self) -> Vec<u64> {
        self.script.lock().unwrap().released.clone()
    }
}

pub fn player(pid: u32, started_at: u64) -> SourceTarget {
    SourceTarget::Process {
        pid,
        image_name: Some("player".into()),
        started_at,
    }
}

impl ExternalSource for ScriptedSource {
    type Payload = Track;

    fn name(&self) -> &str {
        "scripted"
    }

    fn discover(&mut self) -> Option<SourceTarget> {
        self.script.lock().unwrap().present.clone()
    }

    async fn refresh_resolution(&mut self, _handle: &SourceHandle) -> Result<(), FetchError> {
        self.script.lock().unwrap().resolutions += 1;
        Ok(())
    }

    async fn fetch_snapshot(
        &mut self,
        handle: &SourceHandle,
    ) -> Result<PolledSnapshot<Track>, FetchError> {
        let (next, via) = {
            let mut script = self.script.lock().unwrap();
            script.fetches += 1;
            if script.seen.iter().all(|h| h.generation() != handle.generation()) {
                script.seen.push(handle.clone());
            }
            let via = if std::mem::take(&mut script.stale_next) {
                script.seen.first().cloned()
            } else {
                None
            };
            let next = match script.queued.pop_front() {
                Some(response) => response,
                None => script
                    .steady
                    .clone()
                    .ok_or_else(|| FetchError::Protocol("nothing scripted".into())),
            };
            (next, via)
        };
        let track = next?;
        let (id, art) = (track.id, track.art);
        Ok(PolledSnapshot::new(via.as_ref().unwrap_or(handle), track)
            .with_identity(id)
            .with_derived_key(art))
    }

    fn release(&mut self, handle: &SourceHandle) {
        self.script.lock().unwrap().released.push(handle.generation());
    }
}

/// Deriver that counts invocations and can be told to fail.
#[derive(Clone, Default)]
pub struct CountingDeriver {
    pub calls: Arc<AtomicUsize>,
    pub failures: Arc<Mutex<VecDeque<ComputeError>>>,
    pub delay: Option<Duration>,
}

impl CountingDeriver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, error: ComputeError) {
        self.failures.lock().unwrap().push_back(error);
    }
}

impl Deriver for CountingDeriver {
    type Artifact = String;

    async fn derive(&self, key: &str) -> Result<String, ComputeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(format!("palette:{key}"))
    }
}

/// Sink that keeps every diagnostic for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn log_error(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackModel {
    pub id: String,
    pub position: f64,
    pub ratio: f64,
    pub paused: bool,
    pub artwork: Option<Arc<String>>,
    pub refreshes: u32,
    pub last_change: Option<ChangeKind>,
    clock: PlaybackClock,
}

impl Projection for TrackModel {
    type Payload = Track;
    type Artifact = String;

    fn refresh(
        &mut self,
        snapshot: &PolledSnapshot<Track>,
        change: ChangeKind,
        artwork: ArtifactUpdate<String>,
    ) {
        let t = snapshot.payload();
        self.clock.sync(t.position, t.duration, t.paused);
        self.position = self.clock.position_secs();
        self.ratio = self.clock.ratio();
        self.paused = t.paused;
        if change.is_changed() {
            self.id = t.id.to_string();
        }
        artwork.apply_to(&mut self.artwork);
        self.refreshes += 1;
        self.last_change = Some(change);
    }

    fn interpolate(&mut self, delta_secs: f64) {
        if self.clock.advance(delta_secs) {
            self.position = self.clock.position_secs();
            self.ratio = self.clock.ratio();
        }
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
