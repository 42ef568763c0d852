//! One logical key-space over the typed values in `in-mem-core`: the key
//! table, the expiration policy, per-database statistics, and the command
//! dispatcher. The Engine (in `in-mem-engine`) owns a collection of these
//! indexed `0..N`; this crate knows nothing about that collection, about
//! SNAP/AOL, or about background tasks — it only executes commands
//! synchronously against its own key table and, on a write, hands the
//! command to whatever [`database::CommandSink`] is attached.

mod commands;
pub mod database;
pub mod expiry;
pub mod pattern;
pub mod stats;

pub use database::{CommandSink, Database};
pub use expiry::ExpirationPolicy;
pub use stats::{DbStats, DbStatsSnapshot};
