//! livesync-core: pure building blocks of the live external-source sync engine.
//! Liveness state machine, handle generations, poll cadence, change detection,
//! failure taxonomy and the projection contract. No IO and no async runtime.

pub mod cadence;
pub mod change;
pub mod error;
pub mod handle;
pub mod liveness;
pub mod policy;
pub mod projection;
pub mod types;

pub use cadence::Cadence;
pub use change::{ChangeDetector, ChangeKind, Observation};
pub use error::{ComputeError, FailureClass, FetchError};
pub use handle::HandleAllocator;
pub use liveness::{AttachBackoff, LivenessSignal, transition_liveness};
pub use policy::{FailurePolicy, FailureTracker, PolicyAction};
pub use projection::{ArtifactUpdate, PlaybackClock, Projection};
pub use types::{LivenessState, PolledSnapshot, SourceHandle, SourceTarget};
