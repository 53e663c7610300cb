//! Process discovery by image name.

use livesync_core::SourceTarget;
use sysinfo::{PidExt, ProcessExt, ProcessRefreshKind, System, SystemExt};

/// One running process as seen by a [`ProcessLister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Seconds since the epoch.
    pub started_at: u64,
}

impl ProcessInfo {
    pub fn to_target(&self) -> SourceTarget {
        SourceTarget::Process {
            pid: self.pid,
            image_name: Some(self.name.clone()),
            started_at: self.started_at,
        }
    }
}

/// Snapshot of the local process table.
pub trait ProcessLister: Send {
    fn list(&mut self) -> Vec<ProcessInfo>;
}

impl<T: ProcessLister + ?Sized> ProcessLister for Box<T> {
    fn list(&mut self) -> Vec<ProcessInfo> {
        (**self).list()
    }
}

/// [`ProcessLister`] backed by `sysinfo`.
pub struct SysinfoProcessLister {
    system: System,
}

impl SysinfoProcessLister {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProcessLister {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLister for SysinfoProcessLister {
    fn list(&mut self) -> Vec<ProcessInfo> {
        // Only the table itself: no cpu, memory or disk accounting.
        self.system
            .refresh_processes_specifics(ProcessRefreshKind::new());
        self.system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                started_at: process.start_time(),
            })
            .collect()
    }
}

/// Case-insensitive image-name matcher. A trailing `.exe` is ignored on both
/// sides so one configuration works across platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMatcher {
    names: Vec<String>,
}

impl ProcessMatcher {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| normalize(n.as_ref()))
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, image_name: &str) -> bool {
        let candidate = normalize(image_name);
        self.names.iter().any(|n| *n == candidate)
    }

    /// The matching process that started first. Multi-process applications
    /// spawn helpers under the same image name; the oldest is the main one.
    pub fn find<L: ProcessLister + ?Sized>(&self, lister: &mut L) -> Option<ProcessInfo> {
        let found = lister
            .list()
            .into_iter()
            .filter(|p| self.matches(&p.name))
            .min_by_key(|p| (p.started_at, p.pid));
        if found.is_none() {
            tracing::trace!(names = ?self.names, "no matching process");
        }
        found
    }
}

fn normalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}
