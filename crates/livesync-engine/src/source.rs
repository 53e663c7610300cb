//! Collaborator traits: the external source being polled and the expensive
//! derivation fed by its snapshots.

use std::future::Future;

use livesync_core::{ComputeError, FetchError, PolledSnapshot, SourceHandle, SourceTarget};

/// A volatile external source (process or local service).
///
/// All methods are called from the engine's single owner. `discover` must be
/// cheap: it runs on every poll cycle, including while the source is absent.
pub trait ExternalSource: Send {
    type Payload: Send + Sync;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Find the running instance, if any.
    fn discover(&mut self) -> Option<SourceTarget>;

    /// One-time attachment work for a freshly allocated handle (open a
    /// process, resolve initial addresses). A failure leaves nothing cached.
    fn attach(&mut self, _handle: &SourceHandle) -> Result<(), FetchError> {
        Ok(())
    }

    /// Slow-cadence re-resolution of volatile state (pointer chains).
    fn refresh_resolution(
        &mut self,
        _handle: &SourceHandle,
    ) -> impl Future<Output = Result<(), FetchError>> + Send {
        async { Ok(()) }
    }

    /// Read one snapshot through `handle`.
    fn fetch_snapshot(
        &mut self,
        handle: &SourceHandle,
    ) -> impl Future<Output = Result<PolledSnapshot<Self::Payload>, FetchError>> + Send;

    /// Release everything tied to `handle`. Must tolerate repeated calls.
    fn release(&mut self, _handle: &SourceHandle) {}
}

/// Computes a derived artifact from a content key (e.g. a palette from an
/// artwork URL).
pub trait Deriver: Send + Sync {
    type Artifact: Send + Sync;

    fn derive(&self, key: &str) -> impl Future<Output = Result<Self::Artifact, ComputeError>> + Send;
}

/// Deriver for sources without derived artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDerived;

impl Deriver for NoDerived {
    type Artifact = ();

    async fn derive(&self, key: &str) -> Result<(), ComputeError> {
        Err(ComputeError::Worker(format!("no deriver configured for {key}")))
    }
}
