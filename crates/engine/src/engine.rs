//! The sparse collection of [`Database`]s a single process serves,
//! lazily constructed as clients select indices.

use in_mem_core::{Error, Result};
use in_mem_storage::Database;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::info;

/// Aggregated figures for `INFO`-style reporting.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub uptime_secs: u64,
    pub total_commands: u64,
    pub estimated_memory: usize,
    pub db_count: usize,
    pub keys_per_db: Vec<(usize, usize)>,
}

/// Owns every database this process serves, indexed `0..db_count`. Databases
/// are constructed on first `select`, not eagerly — most deployments only
/// ever touch index 0.
pub struct Engine {
    db_count: usize,
    databases: RwLock<FxHashMap<usize, Arc<Database>>>,
    started_at: Instant,
    background_tasks: RwLock<Vec<JoinHandle<()>>>,
    shutdown_count: AtomicU64,
}

impl Engine {
    pub fn new(db_count: usize) -> Self {
        Engine {
            db_count,
            databases: RwLock::new(FxHashMap::default()),
            started_at: Instant::now(),
            background_tasks: RwLock::new(Vec::new()),
            shutdown_count: AtomicU64::new(0),
        }
    }

    /// Fetch (constructing if necessary) the database at `index`. Out-of-range
    /// indices are rejected rather than silently clamped.
    pub fn select(&self, index: usize) -> Result<Arc<Database>> {
        if index >= self.db_count {
            return Err(Error::InvalidConfig);
        }
        if let Some(db) = self.databases.read().get(&index) {
            return Ok(Arc::clone(db));
        }
        let mut guard = self.databases.write();
        let db = guard
            .entry(index)
            .or_insert_with(|| Arc::new(Database::new(index)));
        Ok(Arc::clone(db))
    }

    /// Every database that has been selected at least once. Indices never
    /// touched are simply absent — there is nothing to flush or sweep.
    pub fn present_databases(&self) -> Vec<Arc<Database>> {
        self.databases.read().values().cloned().collect()
    }

    pub fn flush_all(&self) {
        for db in self.present_databases() {
            db.flush();
        }
    }

    pub fn stats(&self) -> EngineStats {
        let dbs = self.present_databases();
        let total_commands = dbs.iter().map(|d| d.stats().commands_processed).sum();
        let estimated_memory = dbs.iter().map(|d| d.estimated_memory()).sum();
        let keys_per_db = dbs.iter().map(|d| (d.index(), d.size())).collect();
        EngineStats {
            uptime_secs: self.started_at.elapsed().as_secs(),
            total_commands,
            estimated_memory,
            db_count: dbs.len(),
            keys_per_db,
        }
    }

    /// Hand over ownership of a background task's join handle so `close` can
    /// wait for it. Used by the persistence coordinator's periodic tasks and
    /// by the expiry sweeper.
    pub fn track_background_task(&self, handle: JoinHandle<()>) {
        self.background_tasks.write().push(handle);
    }

    /// Detach every database's sink and join all tracked background tasks.
    /// Callers are expected to have already signalled shutdown to whatever
    /// owns those threads (the persistence coordinator) before calling this.
    pub fn close(&self) {
        for db in self.present_databases() {
            db.close();
        }
        let handles: Vec<JoinHandle<()>> = self.background_tasks.write().drain(..).collect();
        let total = handles.len();
        for handle in handles {
            let _ = handle.join();
            self.shutdown_count.fetch_add(1, Ordering::Relaxed);
        }
        info!(joined = total, "engine background tasks joined");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_lazily_constructs_a_database() {
        let engine = Engine::new(16);
        assert!(engine.present_databases().is_empty());
        engine.select(3).unwrap();
        assert_eq!(engine.present_databases().len(), 1);
    }

    #[test]
    fn select_out_of_range_is_invalid_config() {
        let engine = Engine::new(4);
        assert!(matches!(engine.select(4), Err(Error::InvalidConfig)));
    }

    #[test]
    fn select_is_idempotent_per_index() {
        let engine = Engine::new(4);
        let a = engine.select(0).unwrap();
        let b = engine.select(0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn flush_all_clears_every_present_database() {
        use in_mem_core::Command;
        let engine = Engine::new(4);
        let db0 = engine.select(0).unwrap();
        db0.process(&Command::new("SET", vec![b"k".to_vec(), b"v".to_vec()], 1, 0));
        engine.flush_all();
        assert_eq!(db0.size(), 0);
    }

    #[test]
    fn stats_reports_per_db_key_counts() {
        use in_mem_core::Command;
        let engine = Engine::new(4);
        let db0 = engine.select(0).unwrap();
        db0.process(&Command::new("SET", vec![b"k".to_vec(), b"v".to_vec()], 1, 0));
        let stats = engine.stats();
        assert_eq!(stats.db_count, 1);
        assert_eq!(stats.keys_per_db, vec![(0, 1)]);
    }
}
