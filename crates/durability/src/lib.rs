//! Persistence: the SNAP point-in-time snapshot file and the AOL
//! append-only command log, together with AOL rewrite (compaction).
//!
//! This crate knows nothing about [`in_mem_storage::Database`] — it only
//! deals in the plain tuples a database dumps (`(key, value, expiry)`) and
//! the RESP-framed commands a dispatcher would replay. Wiring these to a
//! live database, choosing recovery order, and spawning the background
//! tasks that drive periodic save/fsync/rewrite is the Persistence
//! Coordinator's job, one layer up in `in-mem-engine`.

pub mod aol;
pub mod resp;
pub mod snap;

pub use aol::{AolReader, AolRewriter, AolWriter, SyncPolicy};
pub use snap::{SnapEntry, SnapFile};
