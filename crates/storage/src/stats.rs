//! Per-database counters consulted by `INFO`-style reporting and the
//! Engine's aggregated stats.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DbStats {
    commands_processed: AtomicU64,
    keyspace_hits: AtomicU64,
    keyspace_misses: AtomicU64,
    expired_key_evictions: AtomicU64,
}

impl DbStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_command(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.keyspace_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.keyspace_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_eviction(&self) {
        self.expired_key_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DbStatsSnapshot {
        DbStatsSnapshot {
            commands_processed: self.commands_processed.load(Ordering::Relaxed),
            keyspace_hits: self.keyspace_hits.load(Ordering::Relaxed),
            keyspace_misses: self.keyspace_misses.load(Ordering::Relaxed),
            expired_key_evictions: self.expired_key_evictions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time read of [`DbStats`]'s counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbStatsSnapshot {
    pub commands_processed: u64,
    pub keyspace_hits: u64,
    pub keyspace_misses: u64,
    pub expired_key_evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let stats = DbStats::new();
        stats.record_command();
        stats.record_command();
        stats.record_hit();
        stats.record_miss();
        stats.record_expired_eviction();

        let snap = stats.snapshot();
        assert_eq!(snap.commands_processed, 2);
        assert_eq!(snap.keyspace_hits, 1);
        assert_eq!(snap.keyspace_misses, 1);
        assert_eq!(snap.expired_key_evictions, 1);
    }
}
