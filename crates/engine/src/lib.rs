//! Process-level wiring: database selection ([`Engine`]), configuration
//! ([`config::EngineConfig`]) and persistence ([`persistence::PersistenceCoordinator`]).
//!
//! `in-mem-storage` executes commands against one key-space and knows
//! nothing about other databases, files, or background threads; this crate
//! is where those concerns live, following the coordinator/engine split a
//! RESP front-end (not part of this crate) would be built against.

pub mod config;
pub mod engine;
pub mod persistence;

pub use config::EngineConfig;
pub use engine::{Engine, EngineStats};
pub use persistence::PersistenceCoordinator;
