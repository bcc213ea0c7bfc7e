use std::num::NonZeroUsize;

/// Default bound on cached details before least-recently-used entries are dropped.
pub const DEFAULT_CAPACITY: usize = 16_384;

/// Buffered ready notifications per subscriber before it starts lagging.
pub const DEFAULT_READY_CHANNEL_CAPACITY: usize = 256;

/// Tuning knobs for `DetailCache`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Worker threads spawned by `start`. Zero is treated as one.
    pub workers: usize,
    /// Maximum cached details; `None` keeps every entry for the process lifetime.
    pub capacity: Option<NonZeroUsize>,
    pub ready_channel_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY),
            ready_channel_capacity: DEFAULT_READY_CHANNEL_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// `0` means unbounded.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = NonZeroUsize::new(capacity);
        self
    }

    pub fn with_ready_channel_capacity(mut self, capacity: usize) -> Self {
        self.ready_channel_capacity = capacity;
        self
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.capacity.map(NonZeroUsize::get), Some(DEFAULT_CAPACITY));
    }

    #[test]
    fn test_zero_values() {
        let config = CacheConfig::default().with_workers(0).with_capacity(0);
        assert_eq!(config.worker_count(), 1);
        assert_eq!(config.capacity, None);
    }
}
