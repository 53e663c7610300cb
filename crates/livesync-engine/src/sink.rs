//! Host diagnostic sink: fire-and-forget error reporting.

/// Where the engine reports errors the host should know about.
/// Implementations must not panic; the engine never waits on them.
pub trait DiagnosticSink: Send + Sync {
    fn log_error(&self, message: &str);
}

/// Default sink: forwards to `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log_error(&self, message: &str) {
        tracing::error!(target: "livesync::diagnostic", "{message}");
    }
}
