//! Asynchronous commit detail cache.
//!
//! `DetailCache` resolves per-commit metadata (signature verification state)
//! on background threads so that callers rendering a commit list never wait
//! on git. The flow:
//! - `query(id, true)` returns whatever is cached, or the default `Detail`
//!   after queuing a request (at most one per id)
//! - a worker runs the git lookup, stores the result and broadcasts `DetailReady`
//! - subscribers re-query; the notification is only a hint
//!
//! Ledger, store and the stop flag share one mutex so "cached" and "pending"
//! are checked atomically. `query` only ever takes that lock; git runs with it
//! released.
//!
//! Used by: the `commit-details` binary (commit table with signature status)

pub mod config;
pub mod ledger;
pub mod store;
mod worker;

pub use config::CacheConfig;
pub use ledger::{Request, RequestLedger};
pub use store::DetailStore;

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tokio::sync::broadcast;

use crate::error::{AppError, Result};
use crate::git::runner::{GitRunner, Interrupt};
use crate::models::{CommitId, Detail};

use worker::{Shared, State};

/// Broadcast after a detail was published. Re-query rather than trusting
/// `id` to be the only change; a lagged receiver should re-query everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailReady {
    pub id: CommitId,
}

#[derive(Default)]
struct Lifecycle {
    workers: Vec<JoinHandle<()>>,
    interrupt: Option<Interrupt>,
}

pub struct DetailCache {
    config: CacheConfig,
    shared: Arc<Shared>,
    /// Serializes `start` and `stop`; never taken by workers or `query`
    lifecycle: Mutex<Lifecycle>,
}

impl DetailCache {
    pub fn new(config: CacheConfig) -> Self {
        let (ready, _) = broadcast::channel(config.ready_channel_capacity.max(1));
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                ledger: RequestLedger::new(),
                store: DetailStore::new(config.capacity),
                running: false,
                interrupted: false,
            }),
            wake: Condvar::new(),
            ready,
        });

        Self {
            config,
            shared,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Spawn the worker pool using `runner` for every lookup.
    ///
    /// Returns `AppError::AlreadyStarted` if workers are already running; the
    /// running pool is left untouched. Cached details survive a stop/start cycle.
    pub fn start(&self, runner: Arc<dyn GitRunner>) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if !lifecycle.workers.is_empty() {
            return Err(AppError::AlreadyStarted);
        }

        let interrupt = Interrupt::new();
        {
            let mut state = self.shared.state.lock();
            state.interrupted = false;
            state.running = true;
        }
        lifecycle.interrupt = Some(interrupt.clone());

        let count = self.config.worker_count();
        for index in 0..count {
            match worker::spawn_worker(index, self.shared.clone(), runner.clone(), interrupt.clone()) {
                Ok(handle) => lifecycle.workers.push(handle),
                Err(e) => {
                    tracing::warn!("Failed to start detail worker {}: {}", index, e);
                    self.shutdown(&mut lifecycle);
                    return Err(e);
                }
            }
        }

        tracing::info!("Detail cache started: {} worker(s), {} runner", count, runner.name());
        Ok(())
    }

    /// Stop all workers and wait for them to exit.
    ///
    /// Unclaimed requests are dropped. A lookup already running is interrupted
    /// through the runner's token; if the runner completes anyway its result is
    /// still cached. Does nothing when the cache is not running.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.workers.is_empty() {
            return;
        }
        self.shutdown(&mut lifecycle);
        tracing::info!("Detail cache stopped");
    }

    fn shutdown(&self, lifecycle: &mut Lifecycle) {
        {
            let mut state = self.shared.state.lock();
            state.running = false;
            state.interrupted = true;
            let dropped = state.ledger.clear_unclaimed();
            if dropped > 0 {
                tracing::debug!("Dropped {} pending detail request(s)", dropped);
            }
        }
        if let Some(interrupt) = lifecycle.interrupt.take() {
            interrupt.trigger();
        }
        self.shared.wake.notify_all();

        for handle in lifecycle.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Detail worker panicked during shutdown");
            }
        }

        // Anything a dead worker left claimed can never complete
        let mut state = self.shared.state.lock();
        if !state.ledger.is_empty() {
            tracing::debug!("Clearing {} orphaned detail request(s)", state.ledger.len());
            state.ledger = RequestLedger::new();
        }
    }

    /// Look up the detail for `id` without waiting on git.
    ///
    /// Cached details are returned as-is. Otherwise the default (unresolved)
    /// `Detail` comes back, and when `request_if_not_found` is set and the
    /// cache is running a lookup is queued unless one is already pending.
    pub fn query(&self, id: &CommitId, request_if_not_found: bool) -> Detail {
        let mut state = self.shared.state.lock();
        if let Some(detail) = state.store.get(id) {
            return detail;
        }
        if !request_if_not_found || !state.running || state.interrupted {
            return Detail::default();
        }

        if state.ledger.enqueue(id.clone()) {
            tracing::trace!("Queued detail request for {}", id.short(12));
            self.shared.wake.notify_one();
        }
        Detail::default()
    }

    /// Receive a `DetailReady` for every published result from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DetailReady> {
        self.shared.ready.subscribe()
    }

    /// Forget the cached detail for `id` so the next requesting query recomputes it.
    pub fn invalidate(&self, id: &CommitId) -> bool {
        self.shared.state.lock().store.remove(id).is_some()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Requests queued or being computed
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().ledger.len()
    }

    pub fn cached_count(&self) -> usize {
        self.shared.state.lock().store.len()
    }
}

impl Default for DetailCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl Drop for DetailCache {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::dry_run::DryRunRunner;
    use crate::git::runner::GitOutput;
    use crate::models::SignatureStatus;
    use std::time::{Duration, Instant};

    fn id(hex: &str) -> CommitId {
        CommitId::new(hex).unwrap()
    }

    fn wait_for(cache: &DetailCache, id: &CommitId) -> Detail {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let detail = cache.query(id, false);
            if detail.is_resolved() || Instant::now() > deadline {
                return detail;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_query_without_request_creates_nothing() {
        let cache = DetailCache::default();
        let runner = Arc::new(DryRunRunner::new());
        cache.start(runner.clone()).unwrap();

        let detail = cache.query(&id("deadbeef"), false);
        assert_eq!(detail, Detail::default());
        assert_eq!(cache.pending_count(), 0);

        cache.stop();
        assert_eq!(runner.total_invocations(), 0);
    }

    #[test]
    fn test_query_before_start_does_not_queue() {
        let cache = DetailCache::default();
        assert_eq!(cache.query(&id("deadbeef"), true), Detail::default());
        assert_eq!(cache.pending_count(), 0);
        assert!(!cache.is_running());
    }

    #[test]
    fn test_double_start_is_rejected() {
        let cache = DetailCache::default();
        cache.start(Arc::new(DryRunRunner::new())).unwrap();
        assert!(matches!(
            cache.start(Arc::new(DryRunRunner::new())),
            Err(AppError::AlreadyStarted)
        ));
        assert!(cache.is_running());
        cache.stop();
        assert!(!cache.is_running());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let cache = DetailCache::default();
        cache.stop();
        cache.stop();
        assert!(!cache.is_running());
    }

    #[test]
    fn test_result_is_cached_and_published() {
        let commit = id("deadbeef");
        let runner = Arc::new(DryRunRunner::new().with_output(&commit, GitOutput::ok("G\0Alice\0K1\n")));
        let cache = DetailCache::default();
        let mut ready = cache.subscribe();
        cache.start(runner.clone()).unwrap();

        assert!(!cache.query(&commit, true).is_resolved());
        let detail = wait_for(&cache, &commit);
        assert_eq!(detail.sign_verify, SignatureStatus::Good);
        assert_eq!(ready.try_recv().unwrap(), DetailReady { id: commit.clone() });

        // Cached reads never go back to git
        assert_eq!(cache.query(&commit, true), detail);
        assert_eq!(cache.query(&commit, false), detail);
        assert_eq!(runner.invocations(&commit), 1);
        assert_eq!(cache.pending_count(), 0);
        assert_eq!(cache.cached_count(), 1);
        cache.stop();
    }

    #[test]
    fn test_invalidate_allows_recompute() {
        let commit = id("deadbeef");
        let runner = Arc::new(DryRunRunner::new().with_output(&commit, GitOutput::ok("N\0\0")));
        let cache = DetailCache::default();
        cache.start(runner.clone()).unwrap();

        cache.query(&commit, true);
        assert!(wait_for(&cache, &commit).is_resolved());
        assert!(cache.invalidate(&commit));
        assert!(!cache.invalidate(&commit));

        cache.query(&commit, true);
        assert!(wait_for(&cache, &commit).is_resolved());
        assert_eq!(runner.invocations(&commit), 2);
        cache.stop();
    }

    #[test]
    fn test_cache_survives_restart() {
        let commit = id("deadbeef");
        let runner = Arc::new(DryRunRunner::new().with_output(&commit, GitOutput::ok("G\0\0")));
        let cache = DetailCache::default();

        cache.start(runner.clone()).unwrap();
        cache.query(&commit, true);
        assert!(wait_for(&cache, &commit).is_resolved());
        cache.stop();

        assert_eq!(cache.query(&commit, false).sign_verify, SignatureStatus::Good);
        cache.start(runner.clone()).unwrap();
        assert_eq!(cache.query(&commit, true).sign_verify, SignatureStatus::Good);
        cache.stop();
        assert_eq!(runner.invocations(&commit), 1);
    }
}
