//! Handle allocator: hands out source handles with strictly increasing
//! generations so a restarted source never inherits a stale handle.

use chrono::{DateTime, Utc};

use crate::types::{SourceHandle, SourceTarget};

/// Allocates [`SourceHandle`]s.
///
/// Generations start at 1 and only ever grow, even when the same target
/// (same pid, same endpoint) is attached again after a detach.
#[derive(Debug, Clone, Default)]
pub struct HandleAllocator {
    last_generation: u64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle for a freshly attached target.
    pub fn allocate(&mut self, target: SourceTarget, now: DateTime<Utc>) -> SourceHandle {
        self.last_generation = self.last_generation.saturating_add(1);
        SourceHandle::new(target, self.last_generation, now)
    }

    /// Generation of the most recent allocation (0 before the first one).
    pub fn last_generation(&self) -> u64 {
        self.last_generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid")
            .with_timezone(&Utc)
    }

    fn endpoint() -> SourceTarget {
        SourceTarget::Endpoint {
            url: "http://localhost:9863".into(),
            owner_pid: Some(10),
        }
    }

    #[test]
    fn first_handle_gets_generation_one() {
        let mut alloc = HandleAllocator::new();
        let now = ts("2026-02-25T12:00:00Z");
        let h = alloc.allocate(endpoint(), now);
        assert_eq!(h.generation(), 1);
        assert_eq!(h.attached_at(), now);
        assert_eq!(alloc.last_generation(), 1);
    }

    #[test]
    fn same_target_reattached_gets_new_generation() {
        let mut alloc = HandleAllocator::new();
        let t1 = ts("2026-02-25T12:00:00Z");
        let t2 = ts("2026-02-25T12:01:00Z");

        let first = alloc.allocate(endpoint(), t1);
        let second = alloc.allocate(endpoint(), t2);

        assert_eq!(first.target(), second.target());
        assert!(second.generation() > first.generation());
        assert_ne!(first, second);
    }

    #[test]
    fn fresh_allocator_reports_zero() {
        assert_eq!(HandleAllocator::new().last_generation(), 0);
    }
}
