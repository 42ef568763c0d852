//! Error model for the in-mem store.
//!
//! `Error` is the internal, typed error carried by fallible operations on
//! values, databases and the persistence layer. Command handlers convert it
//! to a [`crate::Reply::Error`] textual form matching the Redis error
//! conventions described in the command surface.

use thiserror::Error;

/// Result alias used throughout the store.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed error kinds produced by the data engine and persistence subsystem.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation against a key holding a value of a different variant.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// Increment/float-parse failure, or an increment that would produce NaN.
    #[error("value is not an integer or out of range")]
    NotANumber,

    /// LSET (or equivalent) given an index outside the list's bounds.
    #[error("index out of range")]
    IndexOutOfRange,

    /// Bad command syntax: unknown option, wrong argument count, non-numeric
    /// argument where a number was required.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// LSET (or equivalent) against a key that does not exist.
    #[error("no such key")]
    NoSuchKey,

    /// SNAP file failed to parse.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// AOL record failed to parse.
    #[error("corrupt log entry: {0}")]
    CorruptLog(String),

    /// Underlying file I/O failure during load/save/append.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown or out-of-range database index.
    #[error("invalid database index")]
    InvalidConfig,

    /// Dispatcher received an unrecognized command name.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Dispatcher received a nil or empty command.
    #[error("nil command")]
    NilCommand,
}

impl Error {
    /// Render the way a RESP client would see it: `-<CODE> <message>` minus
    /// the leading dash, matching the taxonomy in the Reply model.
    pub fn to_reply_text(&self) -> String {
        match self {
            Error::WrongType => self.to_string(),
            Error::NotANumber => format!("ERR {self}"),
            Error::IndexOutOfRange => format!("ERR {self}"),
            Error::Syntax(_) => format!("ERR {self}"),
            Error::NoSuchKey => format!("ERR {self}"),
            Error::CorruptSnapshot(_) => format!("ERR {self}"),
            Error::CorruptLog(_) => format!("ERR {self}"),
            Error::Io(_) => format!("ERR {self}"),
            Error::InvalidConfig => format!("ERR {self}"),
            Error::UnknownCommand(_) => format!("ERR {self}"),
            Error::NilCommand => format!("ERR {self}"),
        }
    }
}
