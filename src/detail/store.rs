//! Completed details keyed by commit id, bounded by an LRU policy.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::models::{CommitId, Detail};

pub struct DetailStore {
    entries: LruCache<CommitId, Detail>,
}

impl DetailStore {
    /// `None` keeps every entry.
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let entries = match capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self { entries }
    }

    /// Cached detail for `id`, marking it recently used.
    pub fn get(&mut self, id: &CommitId) -> Option<Detail> {
        self.entries.get(id).cloned()
    }

    /// Store a detail, replacing any previous entry for `id` as a whole.
    pub fn insert(&mut self, id: CommitId, detail: Detail) {
        if let Some((evicted, _)) = self.entries.push(id.clone(), detail) {
            if evicted != id {
                tracing::trace!("Evicted cached detail for {}", evicted.short(12));
            }
        }
    }

    pub fn remove(&mut self, id: &CommitId) -> Option<Detail> {
        self.entries.pop(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
