//! Command handlers, one module per value family plus a `generic` module
//! for key-space-wide operations. Each handler takes the raw argument
//! vector already stripped of the command name and returns a `Reply` or a
//! typed error, which [`crate::database::Database::dispatch`] converts to
//! `Reply::Error` on the way out.

pub mod generic;
pub mod hashes;
pub mod lists;
pub mod sets;
pub mod sorted_sets;
pub mod strings;

use in_mem_core::{Error, Result};

pub(crate) fn arg(args: &[Vec<u8>], i: usize) -> Result<&[u8]> {
    args.get(i)
        .map(|v| v.as_slice())
        .ok_or_else(|| Error::Syntax("wrong number of arguments".into()))
}

pub(crate) fn parse_i64_arg(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| Error::Syntax("value is not an integer".into()))
}

pub(crate) fn parse_f64_arg(bytes: &[u8]) -> Result<f64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| !f.is_nan())
        .ok_or_else(|| Error::Syntax("value is not a valid float".into()))
}

pub(crate) fn require_at_least(args: &[Vec<u8>], n: usize) -> Result<()> {
    if args.len() < n {
        Err(Error::Syntax("wrong number of arguments".into()))
    } else {
        Ok(())
    }
}
