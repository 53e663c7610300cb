use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Liveness ─────────────────────────────────────────────────────

/// Reachability of an external source as seen by the probe.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessState {
    #[default]
    Detached,
    Attached,
    Degraded,
}

impl LivenessState {
    /// A handle is held in both `Attached` and `Degraded`.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Attached | Self::Degraded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detached => "detached",
            Self::Attached => "attached",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for LivenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Source target & handle ───────────────────────────────────────

/// What a discovery step found. Two targets compare equal only when they
/// denote the same running instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceTarget {
    /// A local process. `started_at` (seconds since epoch) disambiguates
    /// pid reuse across restarts.
    Process {
        pid: u32,
        image_name: Option<String>,
        started_at: u64,
    },
    /// A local service endpoint, optionally owned by a process whose pid
    /// identifies the service instance.
    Endpoint { url: String, owner_pid: Option<u32> },
    /// An OS facility that is always present (e.g. display configuration).
    System { facility: String },
}

impl fmt::Display for SourceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process {
                pid, image_name, ..
            } => match image_name {
                Some(name) => write!(f, "{name}[{pid}]"),
                None => write!(f, "pid {pid}"),
            },
            Self::Endpoint { url, owner_pid } => match owner_pid {
                Some(pid) => write!(f, "{url} (pid {pid})"),
                None => f.write_str(url),
            },
            Self::System { facility } => write!(f, "system:{facility}"),
        }
    }
}

/// Opaque reference to one attached source instance.
///
/// Only [`crate::HandleAllocator`] creates handles, and every allocation
/// carries a fresh generation, so a handle is never reused across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceHandle {
    target: SourceTarget,
    generation: u64,
    attached_at: DateTime<Utc>,
}

impl SourceHandle {
    pub(crate) fn new(target: SourceTarget, generation: u64, attached_at: DateTime<Utc>) -> Self {
        Self {
            target,
            generation,
            attached_at,
        }
    }

    pub fn target(&self) -> &SourceTarget {
        &self.target
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn attached_at(&self) -> DateTime<Utc> {
        self.attached_at
    }

    /// Process id behind this handle, when the target has one.
    pub fn pid(&self) -> Option<u32> {
        match &self.target {
            SourceTarget::Process { pid, .. } => Some(*pid),
            SourceTarget::Endpoint { owner_pid, .. } => *owner_pid,
            SourceTarget::System { .. } => None,
        }
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.target, self.generation)
    }
}

// ─── Snapshot ─────────────────────────────────────────────────────

/// One poll's worth of external state. Built by the fetch step and never
/// mutated once handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PolledSnapshot<P> {
    identity: Option<String>,
    derived_key: Option<String>,
    generation: u64,
    observed_at: DateTime<Utc>,
    payload: P,
}

impl<P> PolledSnapshot<P> {
    /// Start a snapshot read through `handle`.
    pub fn new(handle: &SourceHandle, payload: P) -> Self {
        Self {
            identity: None,
            derived_key: None,
            generation: handle.generation(),
            observed_at: Utc::now(),
            payload,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Content key of the derived artifact this snapshot refers to.
    /// Empty keys are treated as absent.
    #[must_use]
    pub fn with_derived_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.derived_key = (!key.is_empty()).then_some(key);
        self
    }

    #[must_use]
    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn derived_key(&self) -> Option<&str> {
        self.derived_key.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn observed(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}
