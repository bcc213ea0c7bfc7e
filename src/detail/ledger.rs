//! Request ledger: outstanding detail lookups.
//!
//! Holds at most one `Request` per commit id. New requests queue in arrival
//! order; workers claim them from the front. A request leaves the ledger as
//! soon as its result is merged into the store, or when it is abandoned.
//!
//! The ledger does no locking of its own. `DetailCache` keeps it behind the
//! same mutex as the detail store so "already cached" and "already pending"
//! are checked together.

use std::collections::{HashMap, VecDeque};

use crate::models::{CommitId, Detail};

/// One outstanding or just-finished lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: CommitId,
    /// A worker owns this request
    pub busy: bool,
    /// The result has been written back
    pub done: bool,
    pub detail: Detail,
}

impl Request {
    fn new(id: CommitId) -> Self {
        Self {
            id,
            busy: false,
            done: false,
            detail: Detail::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RequestLedger {
    requests: HashMap<CommitId, Request>,
    /// Ids not yet claimed, oldest first
    queue: VecDeque<CommitId>,
}

impl RequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &CommitId) -> bool {
        self.requests.contains_key(id)
    }

    /// Add a request for `id`. Returns false when one already exists.
    pub fn enqueue(&mut self, id: CommitId) -> bool {
        if self.requests.contains_key(&id) {
            return false;
        }
        self.queue.push_back(id.clone());
        self.requests.insert(id.clone(), Request::new(id));
        true
    }

    /// Mark the oldest unclaimed request busy and return its id.
    pub fn claim_next(&mut self) -> Option<CommitId> {
        while let Some(id) = self.queue.pop_front() {
            if let Some(request) = self.requests.get_mut(&id) {
                if !request.busy && !request.done {
                    request.busy = true;
                    return Some(id);
                }
            }
        }
        None
    }

    /// Finalize a claimed request and take it out of the ledger.
    ///
    /// Returns `None` unless a worker has claimed `id`.
    pub fn complete(&mut self, id: &CommitId, detail: Detail) -> Option<Request> {
        let request = self.requests.get_mut(id)?;
        if !request.busy {
            return None;
        }
        request.done = true;
        request.detail = detail;
        self.requests.remove(id)
    }

    /// Drop a claimed request without a result.
    pub fn abandon(&mut self, id: &CommitId) -> bool {
        self.queue.retain(|queued| queued != id);
        self.requests.remove(id).is_some()
    }

    /// Remove every request no worker has claimed yet. Returns how many went.
    pub fn clear_unclaimed(&mut self) -> usize {
        let dropped = self.queue.len();
        for id in self.queue.drain(..) {
            self.requests.remove(&id);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignatureStatus;

    fn id(hex: &str) -> CommitId {
        CommitId::new(hex).unwrap()
    }

    #[test]
    fn test_enqueue_deduplicates() {
        let mut ledger = RequestLedger::new();
        assert!(ledger.enqueue(id("deadbeef")));
        assert!(!ledger.enqueue(id("deadbeef")));
        assert!(!ledger.enqueue(id("DEADBEEF")));
        assert_eq!(ledger.len(), 1);

        // Still de-duplicated once claimed
        ledger.claim_next();
        assert!(!ledger.enqueue(id("deadbeef")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_claim_is_fifo_and_exclusive() {
        let mut ledger = RequestLedger::new();
        ledger.enqueue(id("aaaa"));
        ledger.enqueue(id("bbbb"));

        assert_eq!(ledger.claim_next(), Some(id("aaaa")));
        assert_eq!(ledger.claim_next(), Some(id("bbbb")));
        assert_eq!(ledger.claim_next(), None);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_complete_marks_done_and_removes() {
        let mut ledger = RequestLedger::new();
        ledger.enqueue(id("aaaa"));

        // Not claimed yet
        assert_eq!(ledger.complete(&id("aaaa"), Detail::error()), None);

        ledger.claim_next();
        let request = ledger
            .complete(&id("aaaa"), Detail::with_status(SignatureStatus::Good))
            .unwrap();
        assert!(request.busy);
        assert!(request.done);
        assert_eq!(request.detail.sign_verify, SignatureStatus::Good);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_clear_unclaimed_keeps_busy() {
        let mut ledger = RequestLedger::new();
        ledger.enqueue(id("aaaa"));
        ledger.enqueue(id("bbbb"));
        ledger.enqueue(id("cccc"));
        ledger.claim_next();

        assert_eq!(ledger.clear_unclaimed(), 2);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains(&id("aaaa")));
        assert!(!ledger.contains(&id("bbbb")));

        assert!(ledger.abandon(&id("aaaa")));
        assert!(!ledger.abandon(&id("aaaa")));
        assert!(ledger.is_empty());
    }
}
