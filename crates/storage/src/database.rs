//! One logical key-space: key table, expiration policy, per-db stats, and
//! the command dispatcher.

use crate::expiry::ExpirationPolicy;
use crate::pattern;
use crate::stats::{DbStats, DbStatsSnapshot};
use in_mem_core::{
    command::is_write_command, Command, Error, Reply, Result, StringVal, TypeTag, ValueData,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::warn;

/// Invoked after a write command produces a non-error reply. Implemented by
/// the persistence coordinator; kept as a trait here so storage does not
/// depend on the durability crate.
pub trait CommandSink: Send + Sync {
    fn write_log(&self, name: &str, args: &[Vec<u8>]);
}

type Cell = Arc<RwLock<ValueData>>;

/// A single logical database: `index ∈ [0, N)` within an [`crate::engine`]-ish
/// owner (the Engine lives in the `in-mem-engine` crate; this type only
/// needs its own index for reporting).
pub struct Database {
    index: usize,
    data: RwLock<FxHashMap<Vec<u8>, Cell>>,
    expiry: ExpirationPolicy,
    stats: DbStats,
    sink: RwLock<Option<Arc<dyn CommandSink>>>,
}

impl Database {
    pub fn new(index: usize) -> Self {
        Database {
            index,
            data: RwLock::new(FxHashMap::default()),
            expiry: ExpirationPolicy::new(),
            stats: DbStats::new(),
            sink: RwLock::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn attach_sink(&self, sink: Arc<dyn CommandSink>) {
        *self.sink.write() = Some(sink);
    }

    pub fn detach_sink(&self) {
        *self.sink.write() = None;
    }

    pub fn stats(&self) -> DbStatsSnapshot {
        self.stats.snapshot()
    }

    /// Sum of `ValueData::size()` across every live key. Lazily-expired
    /// keys are not swept here; callers wanting an exact figure should run
    /// a sweep first.
    pub fn estimated_memory(&self) -> usize {
        self.data.read().values().map(|c| c.read().size()).sum()
    }

    /// Run one expiration sweep tick (see [`ExpirationPolicy::sweep`]).
    pub fn sweep_expired(&self) {
        let stats = &self.stats;
        let data = &self.data;
        self.expiry.sweep(|key| {
            data.write().remove(key);
            stats.record_expired_eviction();
        });
    }

    /// Look up a live, unexpired value. Performs the lazy-eviction path:
    /// if the key is expired, it is deleted (double-checked under the
    /// write lock) and treated as absent.
    fn lookup(&self, key: &[u8]) -> Option<Cell> {
        if self.expiry.is_expired(key) {
            let mut guard = self.data.write();
            if self.expiry.is_expired(key) {
                guard.remove(key);
                self.expiry.remove(key);
                self.stats.record_expired_eviction();
            }
            return None;
        }
        self.data.read().get(key).cloned()
    }

    fn record_lookup(&self, found: bool) {
        if found {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
    }

    /// Remove a key that a mutator drained to empty (list/set/hash/zset).
    fn delete_if_drained(&self, key: &[u8], cell: &Cell) {
        if cell.read().is_drained() {
            self.data.write().remove(key);
            self.expiry.remove(key);
        }
    }

    fn insert_new(&self, key: Vec<u8>, value: ValueData) -> Cell {
        let cell = Arc::new(RwLock::new(value));
        self.data.write().insert(key, cell.clone());
        cell
    }

    // ---- public, non-command API (§4.3, §4.4, §4.5 load/dump) ----

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.lookup(key) {
            Some(cell) => {
                self.record_lookup(true);
                Ok(Some(cell.read().as_str()?.get().to_vec()))
            }
            None => {
                self.record_lookup(false);
                Ok(None)
            }
        }
    }

    /// `ttl_secs == 0` clears any existing expiry; `> 0` installs one.
    pub fn set(&self, key: Vec<u8>, value: Vec<u8>, ttl_secs: i64) {
        match self.data.read().get(&key).cloned() {
            Some(cell) => *cell.write() = ValueData::Str(StringVal::new(value)),
            None => {
                self.insert_new(key.clone(), ValueData::Str(StringVal::new(value)));
            }
        }
        if ttl_secs > 0 {
            self.expiry.set(key, ttl_secs);
        } else {
            self.expiry.remove(&key);
        }
    }

    /// Clone of the full typed value at `key`, for `RENAME` and similar
    /// whole-value moves. Does not affect hit/miss stats — this is an
    /// internal helper, not a command-level read.
    pub(crate) fn get_raw(&self, key: &[u8]) -> Option<ValueData> {
        self.lookup(key).map(|cell| cell.read().clone())
    }

    /// Remaining TTL in the shape [`Self::set`]/[`Self::install_raw`] accept:
    /// `0` if persistent or missing, seconds remaining otherwise.
    pub(crate) fn remaining_ttl_secs(&self, key: &[u8]) -> i64 {
        self.expiry.remaining_secs(key).unwrap_or(0)
    }

    /// Install `value` at `key` wholesale (used by `RENAME`), carrying over
    /// `ttl_secs` from the source key.
    pub(crate) fn install_raw(&self, key: Vec<u8>, value: ValueData, ttl_secs: i64) {
        match self.data.read().get(&key).cloned() {
            Some(cell) => *cell.write() = value,
            None => {
                self.insert_new(key.clone(), value);
            }
        }
        if ttl_secs > 0 {
            self.expiry.set(key, ttl_secs);
        } else {
            self.expiry.remove(&key);
        }
    }

    pub fn delete(&self, keys: &[Vec<u8>]) -> usize {
        let mut guard = self.data.write();
        let mut removed = 0;
        for key in keys {
            if guard.remove(key).is_some() {
                self.expiry.remove(key);
                removed += 1;
            }
        }
        removed
    }

    pub fn exists(&self, keys: &[Vec<u8>]) -> usize {
        keys.iter().filter(|k| self.lookup(k).is_some()).count()
    }

    /// Returns whether the key existed to have its expiry set.
    pub fn expire(&self, key: &[u8], ttl_secs: i64) -> bool {
        if self.lookup(key).is_none() {
            return false;
        }
        if ttl_secs <= 0 {
            self.delete(&[key.to_vec()]);
        } else {
            self.expiry.set(key.to_vec(), ttl_secs);
        }
        true
    }

    /// `-2` missing, `-1` persistent, `n` seconds remaining.
    pub fn ttl(&self, key: &[u8]) -> i64 {
        if self.lookup(key).is_none() {
            return -2;
        }
        match self.expiry.remaining_secs(key) {
            Some(secs) => secs,
            None => -1,
        }
    }

    pub fn key_type(&self, key: &[u8]) -> Option<TypeTag> {
        self.lookup(key).map(|c| c.read().type_tag())
    }

    pub fn keys(&self, pattern: &[u8]) -> Vec<Vec<u8>> {
        // Expired keys are filtered by re-checking is_expired rather than
        // evicting inline, so `KEYS` stays read-only.
        let guard = self.data.read();
        pattern::filter_keys(
            pattern,
            guard.keys().filter(|k| !self.expiry.is_expired(k)),
        )
        .into_iter()
        .cloned()
        .collect()
    }

    pub fn flush(&self) {
        self.data.write().clear();
        self.expiry.import(Default::default());
    }

    pub fn size(&self) -> usize {
        self.data.read().len()
    }

    pub fn close(&self) {
        self.detach_sink();
    }

    /// Replace all contents wholesale — used by SNAP load and replication
    /// bootstrap. Never merges with existing data.
    pub fn load_data(&self, entries: Vec<(Vec<u8>, ValueData, Option<in_mem_core::Timestamp>)>) {
        let mut data = FxHashMap::default();
        let mut expires = FxHashMap::default();
        for (key, value, deadline) in entries {
            if let Some(d) = deadline {
                expires.insert(key.clone(), d);
            }
            data.insert(key, Arc::new(RwLock::new(value)));
        }
        *self.data.write() = data;
        self.expiry.import(expires);
    }

    /// Inverse of [`Self::load_data`], for SNAP save.
    pub fn dump_data(&self) -> Vec<(Vec<u8>, ValueData, Option<in_mem_core::Timestamp>)> {
        let data = self.data.read();
        data.iter()
            .filter(|(k, _)| !self.expiry.is_expired(k))
            .map(|(k, v)| (k.clone(), v.read().clone(), self.expiry.get(k)))
            .collect()
    }

    // ---- dispatcher ----

    pub fn is_write_command(cmd: &Command) -> bool {
        is_write_command(&cmd.name)
    }

    /// Execute `cmd` against this database, returning its reply. On a
    /// non-error reply to a classified write command, propagates the
    /// command to the attached [`CommandSink`] (best-effort: a sink error
    /// is logged, never turned into an error reply).
    pub fn process(&self, cmd: &Command) -> Reply {
        if cmd.name.is_empty() {
            return Error::NilCommand.into();
        }
        self.stats.record_command();

        let reply = self.dispatch(cmd);

        if !reply.is_error() && is_write_command(&cmd.name) {
            if let Some(sink) = self.sink.read().clone() {
                sink.write_log(&cmd.name, &cmd.args);
            } else {
                warn!(command = %cmd.name, "no persistence sink attached; write not logged");
            }
        }
        reply
    }

    fn dispatch(&self, cmd: &Command) -> Reply {
        let args = &cmd.args;
        let result = match cmd.name.as_str() {
            "PING" => Ok(Reply::Status("PONG".into())),
            "DEL" => Ok(Reply::Integer(self.delete(args) as i64)),
            "EXISTS" => Ok(Reply::Integer(self.exists(args) as i64)),
            "EXPIRE" => crate::commands::generic::expire(self, args),
            "TTL" => crate::commands::generic::ttl(self, args),
            "TYPE" => crate::commands::generic::key_type(self, args),
            "KEYS" => crate::commands::generic::keys(self, args),
            "FLUSHDB" => {
                self.flush();
                Ok(Reply::ok())
            }
            "FLUSHALL" => {
                self.flush();
                Ok(Reply::ok())
            }
            "DBSIZE" => Ok(Reply::Integer(self.size() as i64)),
            "RENAME" => crate::commands::generic::rename(self, args),

            "GET" => crate::commands::strings::get(self, args),
            "SET" => crate::commands::strings::set(self, args),
            "SETNX" => crate::commands::strings::setnx(self, args),
            "MSET" => crate::commands::strings::mset(self, args),
            "INCR" => crate::commands::strings::incr(self, args),
            "INCRBY" => crate::commands::strings::incrby(self, args),
            "DECR" => crate::commands::strings::decr(self, args),
            "DECRBY" => crate::commands::strings::decrby(self, args),
            "INCRBYFLOAT" => crate::commands::strings::incrbyfloat(self, args),
            "APPEND" => crate::commands::strings::append(self, args),
            "STRLEN" => crate::commands::strings::strlen(self, args),

            "LPUSH" => crate::commands::lists::lpush(self, args),
            "RPUSH" => crate::commands::lists::rpush(self, args),
            "LPOP" => crate::commands::lists::lpop(self, args),
            "RPOP" => crate::commands::lists::rpop(self, args),
            "LLEN" => crate::commands::lists::llen(self, args),
            "LRANGE" => crate::commands::lists::lrange(self, args),
            "LINDEX" => crate::commands::lists::lindex(self, args),
            "LSET" => crate::commands::lists::lset(self, args),
            "LREM" => crate::commands::lists::lrem(self, args),

            "HSET" => crate::commands::hashes::hset(self, args),
            "HSETNX" => crate::commands::hashes::hsetnx(self, args),
            "HGET" => crate::commands::hashes::hget(self, args),
            "HDEL" => crate::commands::hashes::hdel(self, args),
            "HEXISTS" => crate::commands::hashes::hexists(self, args),
            "HLEN" => crate::commands::hashes::hlen(self, args),
            "HGETALL" => crate::commands::hashes::hgetall(self, args),
            "HKEYS" => crate::commands::hashes::hkeys(self, args),
            "HVALS" => crate::commands::hashes::hvals(self, args),
            "HINCRBY" => crate::commands::hashes::hincrby(self, args),
            "HINCRBYFLOAT" => crate::commands::hashes::hincrbyfloat(self, args),

            "SADD" => crate::commands::sets::sadd(self, args),
            "SREM" => crate::commands::sets::srem(self, args),
            "SISMEMBER" => crate::commands::sets::sismember(self, args),
            "SMEMBERS" => crate::commands::sets::smembers(self, args),
            "SCARD" => crate::commands::sets::scard(self, args),
            "SPOP" => crate::commands::sets::spop(self, args),
            "SINTER" => crate::commands::sets::sinter(self, args),
            "SUNION" => crate::commands::sets::sunion(self, args),
            "SDIFF" => crate::commands::sets::sdiff(self, args),

            "ZADD" => crate::commands::sorted_sets::zadd(self, args),
            "ZSCORE" => crate::commands::sorted_sets::zscore(self, args),
            "ZINCRBY" => crate::commands::sorted_sets::zincrby(self, args),
            "ZCARD" => crate::commands::sorted_sets::zcard(self, args),
            "ZRANGE" => crate::commands::sorted_sets::zrange(self, args),
            "ZREVRANGE" => crate::commands::sorted_sets::zrevrange(self, args),
            "ZRANGEBYSCORE" => crate::commands::sorted_sets::zrangebyscore(self, args),
            "ZRANK" => crate::commands::sorted_sets::zrank(self, args),
            "ZREVRANK" => crate::commands::sorted_sets::zrevrank(self, args),
            "ZREM" => crate::commands::sorted_sets::zrem(self, args),

            other => Err(Error::UnknownCommand(other.to_string())),
        };

        match result {
            Ok(reply) => reply,
            Err(e) => e.into(),
        }
    }

    // ---- internal helpers shared by commands::* ----

    pub(crate) fn get_cell(&self, key: &[u8]) -> Option<Cell> {
        self.lookup(key)
    }

    pub(crate) fn get_or_create(&self, key: &[u8], default: impl FnOnce() -> ValueData) -> Cell {
        if let Some(cell) = self.lookup(key) {
            return cell;
        }
        self.insert_new(key.to_vec(), default())
    }

    pub(crate) fn finish_mutation(&self, key: &[u8], cell: &Cell) {
        self.delete_if_drained(key, cell);
    }
}
