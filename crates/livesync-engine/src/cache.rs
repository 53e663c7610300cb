//! Content-keyed cache for derived artifacts.
//!
//! - At most one computation in flight per key; concurrent callers for the
//!   same key wait on a `watch` channel and observe the same result.
//! - Successes are kept (optionally bounded with LRU eviction).
//! - Failures are not kept: the slot is removed and the next request for the
//!   key computes again.
//! - If the computing future is dropped mid-way, the slot is removed and
//!   waiters observe [`ComputeError::Abandoned`].
//!
//! The std mutex only guards slot bookkeeping and is never held across an
//! await point.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use livesync_core::ComputeError;
use tokio::sync::watch;

type Shared<A> = Result<Arc<A>, ComputeError>;

/// Non-blocking view of a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<A> {
    Ready(Arc<A>),
    /// A computation is in flight; the artifact is not available yet.
    Pending,
    Missing,
}

impl<A> Lookup<A> {
    pub fn ready(self) -> Option<Arc<A>> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending | Self::Missing => None,
        }
    }
}

enum Slot<A> {
    Ready { value: Arc<A>, last_used: u64 },
    InFlight(watch::Receiver<Option<Shared<A>>>),
}

enum Claim<A> {
    Hit(Arc<A>),
    Wait(watch::Receiver<Option<Shared<A>>>),
    Compute(watch::Sender<Option<Shared<A>>>),
}

struct CacheState<A> {
    slots: HashMap<String, Slot<A>>,
    clock: u64,
}

impl<A> CacheState<A> {
    fn tick(&mut self) -> u64 {
        self.clock = self.clock.wrapping_add(1);
        self.clock
    }

    fn claim(&mut self, key: &str) -> Claim<A> {
        let now = self.tick();
        match self.slots.get_mut(key) {
            Some(Slot::Ready { value, last_used }) => {
                *last_used = now;
                Claim::Hit(Arc::clone(value))
            }
            Some(Slot::InFlight(rx)) => Claim::Wait(rx.clone()),
            None => {
                let (tx, rx) = watch::channel(None);
                self.slots.insert(key.to_owned(), Slot::InFlight(rx));
                Claim::Compute(tx)
            }
        }
    }

    fn complete(&mut self, key: &str, result: &Shared<A>, capacity: Option<NonZeroUsize>) {
        match result {
            Ok(value) => {
                let now = self.tick();
                self.slots.insert(
                    key.to_owned(),
                    Slot::Ready {
                        value: Arc::clone(value),
                        last_used: now,
                    },
                );
                if let Some(capacity) = capacity {
                    self.evict_to(capacity.get());
                }
            }
            Err(_) => {
                self.slots.remove(key);
            }
        }
    }

    fn abandon(&mut self, key: &str) {
        if matches!(self.slots.get(key), Some(Slot::InFlight(_))) {
            self.slots.remove(key);
        }
    }

    fn ready_len(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready { .. }))
            .count()
    }

    /// Drop least-recently-used ready entries until at most `capacity`
    /// remain. In-flight entries are never evicted.
    fn evict_to(&mut self, capacity: usize) {
        while self.ready_len() > capacity {
            let oldest = self
                .slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready { last_used, .. } => Some((*last_used, key)),
                    Slot::InFlight(_) => None,
                })
                .min_by_key(|(last_used, _)| *last_used)
                .map(|(_, key)| key.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(key = %key, "evicting derived artifact");
                    self.slots.remove(&key);
                }
                None => break,
            }
        }
    }
}

/// Cache of derived artifacts keyed by content identity.
pub struct DerivedCache<A> {
    state: Mutex<CacheState<A>>,
    capacity: Option<NonZeroUsize>,
}

impl<A> DerivedCache<A> {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Cache bounded to `capacity` ready artifacts (LRU). `None` is unbounded.
    pub fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                slots: HashMap::new(),
                clock: 0,
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<A>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the artifact for `key`, running `compute` only if no artifact
    /// is stored and no computation for `key` is already in flight.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Shared<A>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<A, ComputeError>>,
    {
        let claim = self.lock().claim(key);
        match claim {
            Claim::Hit(value) => Ok(value),
            Claim::Wait(rx) => wait_for_result(rx).await,
            Claim::Compute(tx) => {
                let mut guard = InFlightGuard {
                    cache: self,
                    key,
                    armed: true,
                };
                let result = compute().await.map(Arc::new);
                guard.armed = false;
                self.lock().complete(key, &result, self.capacity);
                tx.send_replace(Some(result.clone()));
                result
            }
        }
    }

    /// Look at `key` without waiting or computing.
    pub fn peek(&self, key: &str) -> Lookup<A> {
        let mut state = self.lock();
        let now = state.tick();
        match state.slots.get_mut(key) {
            Some(Slot::Ready { value, last_used }) => {
                *last_used = now;
                Lookup::Ready(Arc::clone(value))
            }
            Some(Slot::InFlight(_)) => Lookup::Pending,
            None => Lookup::Missing,
        }
    }

    /// Number of stored artifacts (in-flight computations excluded).
    pub fn len(&self) -> usize {
        self.lock().ready_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }
}

impl<A> Default for DerivedCache<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for DerivedCache<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedCache")
            .field("ready", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

async fn wait_for_result<A>(mut rx: watch::Receiver<Option<Shared<A>>>) -> Shared<A> {
    match rx.wait_for(Option::is_some).await {
        Ok(value) => {
            let result: Option<Shared<A>> = (*value).clone();
            result.unwrap_or(Err(ComputeError::Abandoned))
        }
        Err(_) => Err(ComputeError::Abandoned),
    }
}

/// Removes the in-flight slot if the computing future is dropped before
/// completion, so the key is not stuck pending forever.
struct InFlightGuard<'a, A> {
    cache: &'a DerivedCache<A>,
    key: &'a str,
    armed: bool,
}

impl<A> Drop for InFlightGuard<'_, A> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(key = self.key, "derived computation abandoned");
            self.cache.lock().abandon(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn palette(n: u32) -> Result<u32, ComputeError> {
        Ok(n)
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = DerivedCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_compute("art1", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    palette(7)
                })
                .await
                .expect("computed");
            assert_eq!(*v, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let cache: DerivedCache<u32> = DerivedCache::new();

        let first = cache
            .get_or_compute("art1", || async {
                Err(ComputeError::Timeout(Duration::from_secs(1)))
            })
            .await;
        assert_eq!(first, Err(ComputeError::Timeout(Duration::from_secs(1))));
        assert_eq!(cache.peek("art1"), Lookup::Missing);

        let second = cache
            .get_or_compute("art1", || palette(3))
            .await
            .expect("retried");
        assert_eq!(*second, 3);
        assert_eq!(cache.peek("art1"), Lookup::Ready(Arc::new(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_share_one_computation() {
        let cache = Arc::new(DerivedCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute("art1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, ComputeError>(42u32)
                    })
                    .await
            }));
        }

        for task in tasks {
            let v = task.await.expect("join").expect("computed");
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waiters_share_failure_then_retry() {
        let cache: Arc<DerivedCache<u32>> = Arc::new(DerivedCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute("art1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(ComputeError::Fetch("connection reset".into()))
                    })
                    .await
            }));
        }
        for task in tasks {
            let err = task.await.expect("join").expect_err("shared failure");
            assert_eq!(err, ComputeError::Fetch("connection reset".into()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.get_or_compute("art1", || palette(1)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn peek_reports_pending_while_in_flight() {
        let cache: Arc<DerivedCache<u32>> = Arc::new(DerivedCache::new());
        let worker = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_compute("art1", || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(5)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.peek("art1"), Lookup::Pending);

        worker.await.expect("join").expect("computed");
        assert_eq!(cache.peek("art1").ready().as_deref(), Some(&5));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_computation_releases_waiters() {
        let cache: Arc<DerivedCache<u32>> = Arc::new(DerivedCache::new());
        let owner = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_compute("art1", || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_or_compute("art1", || palette(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        owner.abort();
        let _ = owner.await;

        assert_eq!(
            waiter.await.expect("join"),
            Err(ComputeError::Abandoned)
        );
        assert_eq!(cache.peek("art1"), Lookup::Missing);
    }

    #[tokio::test]
    async fn lru_bound_evicts_least_recently_used() {
        let cache = DerivedCache::with_capacity(NonZeroUsize::new(2));
        cache.get_or_compute("a", || palette(1)).await.expect("a");
        cache.get_or_compute("b", || palette(2)).await.expect("b");
        // Touch "a" so "b" becomes the eviction candidate.
        assert!(cache.peek("a").ready().is_some());
        cache.get_or_compute("c", || palette(3)).await.expect("c");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek("b"), Lookup::Missing);
        assert!(cache.peek("a").ready().is_some());
        assert!(cache.peek("c").ready().is_some());
    }
}
