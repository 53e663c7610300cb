//! livesync-engine: drives an external source from host ticks.
//! Probe → cadence → fetch → change detection → derived cache → projection,
//! with every external call bounded by a timeout and classified on failure.

pub mod cache;
pub mod config;
pub mod engine;
pub mod probe;
pub mod sink;
pub mod source;

pub use cache::{DerivedCache, Lookup};
pub use config::EngineConfig;
pub use engine::{EngineStatus, HostPlugin, SyncEngine};
pub use probe::{ProbeReport, SourceProbe};
pub use sink::{DiagnosticSink, TracingSink};
pub use source::{Deriver, ExternalSource, NoDerived};

pub use livesync_core as core;
