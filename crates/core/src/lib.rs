//! Core types shared across the in-mem store: typed values, the error
//! model, timestamps, and the command/reply model consulted by both the
//! database dispatcher and the persistence subsystem.

pub mod command;
pub mod error;
pub mod timestamp;
pub mod value;

pub use command::{is_known_command, is_write_command, Command, Reply};
pub use error::{Error, Result};
pub use timestamp::Timestamp;
pub use value::{HashVal, ListVal, SetVal, StringVal, TypeTag, ValueData, ZSetVal};
