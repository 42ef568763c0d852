//! Key-space-wide commands that don't belong to one value family:
//! `EXPIRE`, `TTL`, `TYPE`, `KEYS`, `RENAME`.

use super::{arg, parse_i64_arg, require_at_least};
use crate::database::Database;
use in_mem_core::{Error, Reply, Result};

pub fn expire(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let ttl = parse_i64_arg(arg(args, 1)?)?;
    let existed = db.expire(arg(args, 0)?, ttl);
    Ok(Reply::Integer(existed as i64))
}

pub fn ttl(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    Ok(Reply::Integer(db.ttl(arg(args, 0)?)))
}

pub fn key_type(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    Ok(match db.key_type(arg(args, 0)?) {
        Some(tag) => Reply::Status(tag.name().to_string()),
        None => Reply::Status("none".to_string()),
    })
}

pub fn keys(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    let matched = db.keys(arg(args, 0)?);
    Ok(Reply::multi_bulk(matched))
}

/// `RENAME src dst`: moves the value (and any TTL) from `src` to `dst`,
/// overwriting `dst` if present. A missing source is `NoSuchKey`.
pub fn rename(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let src = arg(args, 0)?;
    let dst = arg(args, 1)?.to_vec();
    let value = db.get_raw(src).ok_or(Error::NoSuchKey)?;
    let ttl_secs = db.remaining_ttl_secs(src);
    db.delete(&[src.to_vec()]);
    db.install_raw(dst, value, ttl_secs);
    Ok(Reply::ok())
}
