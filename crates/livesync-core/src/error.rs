//! Failure taxonomy for external calls.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a failed external call affects liveness and the projected model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Momentary glitch: keep the model, retry next cycle.
    Transient,
    /// Will not fix itself (e.g. permission denied): log loudly, keep going.
    Fatal,
    /// The source instance is no longer there.
    SourceGone,
}

/// Failure of a discovery, attach, resolution or fetch call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("partial read: {0}")]
    PartialRead(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("source gone: {0}")]
    SourceGone(String),

    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// `ESRCH`: the target process no longer exists.
const ESRCH: i32 = 3;

impl FetchError {
    /// Classify this failure for the error policy.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Timeout(_) | Self::PartialRead(_) | Self::Protocol(_) => FailureClass::Transient,
            Self::PermissionDenied(_) | Self::Unsupported(_) => FailureClass::Fatal,
            Self::SourceGone(_) => FailureClass::SourceGone,
            Self::Io(e) => classify_io(e),
        }
    }
}

fn classify_io(e: &io::Error) -> FailureClass {
    if e.raw_os_error() == Some(ESRCH) && cfg!(unix) {
        return FailureClass::SourceGone;
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => FailureClass::Fatal,
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe => FailureClass::SourceGone,
        _ => FailureClass::Transient,
    }
}

/// Failure of a derived computation. Cloneable so every waiter on the same
/// in-flight key observes the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("computation abandoned before completion")]
    Abandoned,
}

impl From<FetchError> for ComputeError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Timeout(after) => Self::Timeout(after),
            other => Self::Fetch(other.to_string()),
        }
    }
}
