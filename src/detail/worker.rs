//! Background workers that drain the request ledger.
//!
//! Each worker cycles Idle → Dispatched → Computing → Publishing:
//! - Idle: wait on the condvar until a request is claimable or a stop is requested
//! - Dispatched: claim the oldest unclaimed request under the lock
//! - Computing: run the git lookup with the lock released
//! - Publishing: merge the result into the store, notify subscribers and peers
//!
//! The stop flag is only checked between items. A computation already running
//! finishes, or returns early if the runner honours the interrupt token, in
//! which case the item is dropped without caching anything.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};
use tokio::sync::broadcast;

use crate::error::{AppError, Result};
use crate::git::runner::{GitRunner, Interrupt};
use crate::git::signature::{compute_detail, Computed};
use crate::models::CommitId;

use super::ledger::RequestLedger;
use super::store::DetailStore;
use super::DetailReady;

/// Everything guarded by the cache's single lock.
pub(super) struct State {
    pub(super) ledger: RequestLedger,
    pub(super) store: DetailStore,
    /// Workers are up and `query` may enqueue
    pub(super) running: bool,
    /// Stop requested; workers exit at the next Idle → Dispatched boundary
    pub(super) interrupted: bool,
}

pub(super) struct Shared {
    pub(super) state: Mutex<State>,
    pub(super) wake: Condvar,
    pub(super) ready: broadcast::Sender<DetailReady>,
}

pub(super) fn spawn_worker(
    index: usize,
    shared: Arc<Shared>,
    runner: Arc<dyn GitRunner>,
    interrupt: Interrupt,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("commit-detail-{}", index))
        .spawn(move || run_worker(index, &shared, runner.as_ref(), &interrupt))
        .map_err(AppError::WorkerSpawn)
}

fn run_worker(index: usize, shared: &Shared, runner: &dyn GitRunner, interrupt: &Interrupt) {
    tracing::debug!("Detail worker {} started ({} runner)", index, runner.name());

    while let Some(id) = next_request(shared) {
        tracing::trace!("Worker {} computing {}", index, id.short(12));
        let computed = compute_detail(&id, runner, interrupt);
        publish(shared, id, computed);
    }

    tracing::debug!("Detail worker {} stopped", index);
}

/// Block until a request can be claimed. `None` once a stop was requested.
fn next_request(shared: &Shared) -> Option<CommitId> {
    let mut state = shared.state.lock();
    loop {
        if state.interrupted {
            return None;
        }
        if let Some(id) = state.ledger.claim_next() {
            return Some(id);
        }
        shared.wake.wait(&mut state);
    }
}

fn publish(shared: &Shared, id: CommitId, computed: Computed) {
    let mut state = shared.state.lock();

    let detail = match computed {
        Computed::Ready(detail) => detail,
        Computed::Interrupted => {
            state.ledger.abandon(&id);
            tracing::debug!("Abandoned detail lookup for {}", id.short(12));
            return;
        }
    };

    if state.ledger.complete(&id, detail.clone()).is_none() {
        tracing::warn!("No claimed request for {}; dropping result", id.short(12));
        return;
    }
    state.store.insert(id.clone(), detail);

    if shared.ready.send(DetailReady { id }).is_err() {
        tracing::trace!("No subscribers for detail ready notification");
    }
    // Let idle peers re-check the ledger
    shared.wake.notify_all();
}
