//! Per-key expiration: an absolute-deadline map with active (sampled) and
//! lazy eviction, mirroring a Redis-style TTL sweep rather than an
//! earliest-first priority queue — the sweep samples arbitrary keys, not
//! the ones closest to expiring.

use in_mem_core::Timestamp;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};

fn secs_to_duration(secs: i64) -> Duration {
    Duration::from_secs(secs.max(0) as u64)
}

const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_SAMPLE_SIZE: usize = 20;
const DEFAULT_MAX_CLEANUP: usize = 200;

/// Absolute-deadline map for one database, plus the sweep bookkeeping
/// described in the expiration policy.
pub struct ExpirationPolicy {
    deadlines: RwLock<FxHashMap<Vec<u8>, Timestamp>>,
    last_sweep: Mutex<Instant>,
    cleanup_interval: Duration,
    sample_size: usize,
    max_cleanup: usize,
}

impl ExpirationPolicy {
    pub fn new() -> Self {
        ExpirationPolicy {
            deadlines: RwLock::new(FxHashMap::default()),
            last_sweep: Mutex::new(Instant::now() - DEFAULT_CLEANUP_INTERVAL),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_cleanup: DEFAULT_MAX_CLEANUP,
        }
    }

    /// Install or replace `key`'s deadline, `ttl_secs` seconds from now.
    /// Callers are responsible for calling [`Self::remove`] instead when a
    /// persistent (no-TTL) key is wanted.
    pub fn set(&self, key: Vec<u8>, ttl_secs: i64) {
        let deadline = if ttl_secs <= 0 {
            Timestamp::EPOCH
        } else {
            Timestamp::now().saturating_add(secs_to_duration(ttl_secs))
        };
        self.deadlines.write().insert(key, deadline);
    }

    pub fn get(&self, key: &[u8]) -> Option<Timestamp> {
        self.deadlines.read().get(key).copied()
    }

    pub fn remove(&self, key: &[u8]) {
        self.deadlines.write().remove(key);
    }

    /// A key with no recorded deadline is never expired — persistence is
    /// the absence of an entry, not a sentinel value.
    pub fn is_expired(&self, key: &[u8]) -> bool {
        let now = Timestamp::now();
        self.deadlines
            .read()
            .get(key)
            .is_some_and(|deadline| deadline.is_past(now))
    }

    /// Seconds remaining until `key`'s deadline, mirroring `TTL`'s
    /// contract: `None` means no deadline is recorded at all (caller
    /// distinguishes "persistent" from "missing" by checking key presence
    /// separately); `Some(0)` or negative-rounding-up never occurs since a
    /// past deadline is reported as already expired by [`Self::is_expired`].
    pub fn remaining_secs(&self, key: &[u8]) -> Option<i64> {
        let now = Timestamp::now();
        self.deadlines.read().get(key)?.remaining_secs(now)
    }

    pub fn len(&self) -> usize {
        self.deadlines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.read().is_empty()
    }

    /// One sweep tick. `delete_cb` is invoked (with the db's write lock
    /// already expected to be held by the caller's own sweep driver, or
    /// acquired internally by the callback) for every key found expired.
    /// No-ops if less than `cleanup_interval` has elapsed since the last
    /// sweep.
    pub fn sweep(&self, mut delete_cb: impl FnMut(&[u8])) {
        {
            let mut last = self.last_sweep.lock();
            if last.elapsed() < self.cleanup_interval {
                return;
            }
            *last = Instant::now();
        }

        let expired_in_sample = self.sweep_sample(self.sample_size, &mut delete_cb);

        // More than half the sample was stale: the key table is likely
        // carrying a larger expired backlog, so spend one extended pass.
        if expired_in_sample * 2 > self.sample_size {
            self.sweep_sample(self.max_cleanup, &mut delete_cb);
        }
    }

    /// Sample up to `limit` keys, re-check each under the write lock, and
    /// delete those still expired. Returns the number deleted.
    fn sweep_sample(&self, limit: usize, delete_cb: &mut impl FnMut(&[u8])) -> usize {
        let candidates: Vec<Vec<u8>> = {
            let now = Timestamp::now();
            self.deadlines
                .read()
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .take(limit)
                .map(|(k, _)| k.clone())
                .collect()
        };

        let mut deleted = 0;
        let now = Timestamp::now();
        let mut guard = self.deadlines.write();
        for key in candidates {
            if guard.get(&key).is_some_and(|d| *d <= now) {
                guard.remove(&key);
                drop(guard);
                delete_cb(&key);
                guard = self.deadlines.write();
                deleted += 1;
            }
        }
        deleted
    }

    /// Snapshot the full deadline map, e.g. for SNAP serialization.
    pub fn export(&self) -> FxHashMap<Vec<u8>, Timestamp> {
        self.deadlines.read().clone()
    }

    /// Replace the deadline map wholesale, e.g. after a SNAP load.
    pub fn import(&self, map: FxHashMap<Vec<u8>, Timestamp>) {
        *self.deadlines.write() = map;
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips_a_deadline() {
        let policy = ExpirationPolicy::new();
        policy.set(b"k".to_vec(), 60);
        assert!(policy.get(b"k").is_some());
        assert!(!policy.is_expired(b"k"));
    }

    #[test]
    fn key_with_no_deadline_is_never_expired() {
        let policy = ExpirationPolicy::new();
        assert!(!policy.is_expired(b"missing"));
    }

    #[test]
    fn negative_ttl_expires_immediately() {
        let policy = ExpirationPolicy::new();
        policy.set(b"k".to_vec(), -5);
        assert!(policy.is_expired(b"k"));
    }

    #[test]
    fn remove_clears_the_deadline() {
        let policy = ExpirationPolicy::new();
        policy.set(b"k".to_vec(), 60);
        policy.remove(b"k");
        assert!(policy.get(b"k").is_none());
    }

    #[test]
    fn export_then_import_round_trips() {
        let policy = ExpirationPolicy::new();
        policy.set(b"a".to_vec(), 60);
        policy.set(b"b".to_vec(), 60);
        let dump = policy.export();

        let restored = ExpirationPolicy::new();
        restored.import(dump);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn sweep_deletes_expired_keys_via_callback() {
        let policy = ExpirationPolicy::new();
        policy.set(b"stale".to_vec(), -1);
        policy.set(b"fresh".to_vec(), 60);

        std::thread::sleep(Duration::from_millis(110));

        let mut deleted = Vec::new();
        policy.sweep(|k| deleted.push(k.to_vec()));

        assert_eq!(deleted, vec![b"stale".to_vec()]);
        assert!(policy.get(b"stale").is_none());
        assert!(policy.get(b"fresh").is_some());
    }

    #[test]
    fn sweep_is_a_no_op_before_the_cleanup_interval_elapses() {
        let policy = ExpirationPolicy::new();
        policy.set(b"stale".to_vec(), -1);
        // last_sweep starts already elapsed in the constructor, so the very
        // first sweep runs; the second call within the interval should not.
        let mut calls = 0;
        policy.sweep(|_| calls += 1);
        policy.set(b"stale2".to_vec(), -1);
        policy.sweep(|_| calls += 1);
        assert_eq!(calls, 1);
    }
}
