//! `GET`, `SET` and the numeric/append string commands.

use super::{arg, parse_i64_arg, require_at_least};
use crate::database::Database;
use in_mem_core::{Error, Reply, Result, StringVal, ValueData};

pub fn get(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get(arg(args, 0)?)? {
        Some(v) => Ok(Reply::bulk(v)),
        None => Ok(Reply::nil()),
    }
}

/// `SET k v [EX seconds | PX milliseconds]`. Options parse left to right;
/// an unrecognized option or a non-positive duration is a syntax error.
pub fn set(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?.to_vec();
    let value = arg(args, 1)?.to_vec();

    let mut ttl_secs: i64 = 0;
    let mut i = 2;
    while i < args.len() {
        let opt = std::str::from_utf8(&args[i])
            .map(|s| s.to_ascii_uppercase())
            .map_err(|_| Error::Syntax("syntax error".into()))?;
        match opt.as_str() {
            "EX" => {
                i += 1;
                let secs = parse_i64_arg(arg(args, i)?)?;
                if secs <= 0 {
                    return Err(Error::Syntax("invalid expire time in 'set' command".into()));
                }
                ttl_secs = secs;
            }
            "PX" => {
                i += 1;
                let millis = parse_i64_arg(arg(args, i)?)?;
                if millis <= 0 {
                    return Err(Error::Syntax("invalid expire time in 'set' command".into()));
                }
                ttl_secs = (millis + 999) / 1000;
            }
            _ => return Err(Error::Syntax(format!("unknown option '{opt}'"))),
        }
        i += 1;
    }

    db.set(key, value, ttl_secs);
    Ok(Reply::ok())
}

/// `SETNX`: set only if absent. Returns `1` if set, `0` if the key already
/// existed.
pub fn setnx(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?.to_vec();
    if db.get(&key)?.is_some() {
        return Ok(Reply::Integer(0));
    }
    db.set(key, arg(args, 1)?.to_vec(), 0);
    Ok(Reply::Integer(1))
}

/// `MSET k1 v1 k2 v2 ...`. An odd argument count is a syntax error.
pub fn mset(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(Error::Syntax("wrong number of arguments for 'mset'".into()));
    }
    for pair in args.chunks_exact(2) {
        db.set(pair[0].clone(), pair[1].clone(), 0);
    }
    Ok(Reply::ok())
}

fn incr_by(db: &Database, key: &[u8], delta: i64) -> Result<Reply> {
    let cell = db.get_or_create(key, || ValueData::Str(StringVal::new(Vec::new())));
    let mut guard = cell.write();
    let next = guard.as_str_mut()?.incr_by(delta)?;
    Ok(Reply::Integer(next))
}

pub fn incr(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    incr_by(db, arg(args, 0)?, 1)
}

pub fn incrby(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let delta = parse_i64_arg(arg(args, 1)?)?;
    incr_by(db, arg(args, 0)?, delta)
}

pub fn decr(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    incr_by(db, arg(args, 0)?, -1)
}

pub fn decrby(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let delta = parse_i64_arg(arg(args, 1)?)?;
    incr_by(db, arg(args, 0)?, delta.checked_neg().unwrap_or(i64::MAX))
}

pub fn incrbyfloat(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let delta = super::parse_f64_arg(arg(args, 1)?)?;
    let key = arg(args, 0)?;
    let cell = db.get_or_create(key, || ValueData::Str(StringVal::new(Vec::new())));
    let mut guard = cell.write();
    let next = guard.as_str_mut()?.incr_by_float(delta)?;
    Ok(Reply::bulk(format!("{next}").into_bytes()))
}

pub fn append(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?;
    let suffix = arg(args, 1)?;
    let cell = db.get_or_create(key, || ValueData::Str(StringVal::new(Vec::new())));
    let mut guard = cell.write();
    let len = guard.as_str_mut()?.append(suffix);
    Ok(Reply::Integer(len as i64))
}

pub fn strlen(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::Integer(cell.read().as_str()?.len() as i64)),
        None => Ok(Reply::Integer(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn call(db: &Database, args: &[&[u8]]) -> Reply {
        let f = args[0];
        let rest: Vec<Vec<u8>> = args[1..].iter().map(|a| a.to_vec()).collect();
        match f {
            b"GET" => get(db, &rest).unwrap_or_else(|e| e.into()),
            b"SET" => set(db, &rest).unwrap_or_else(|e| e.into()),
            b"INCR" => incr(db, &rest).unwrap_or_else(|e| e.into()),
            b"APPEND" => append(db, &rest).unwrap_or_else(|e| e.into()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn set_with_ex_option_installs_ttl() {
        let db = Database::new(0);
        call(&db, &[b"SET", b"k", b"v", b"EX", b"100"]);
        assert!(db.ttl(b"k") > 0);
    }

    #[test]
    fn set_rejects_non_positive_ex() {
        let db = Database::new(0);
        let reply = set(
            &db,
            &[b"k".to_vec(), b"v".to_vec(), b"EX".to_vec(), b"0".to_vec()],
        );
        assert!(reply.is_err());
    }

    #[test]
    fn set_rejects_unknown_option() {
        let db = Database::new(0);
        let reply = set(
            &db,
            &[b"k".to_vec(), b"v".to_vec(), b"ZZ".to_vec(), b"1".to_vec()],
        );
        assert!(reply.is_err());
    }

    #[test]
    fn incr_creates_missing_key_at_one() {
        let db = Database::new(0);
        let reply = call(&db, &[b"INCR", b"counter"]);
        assert_eq!(reply, Reply::Integer(1));
    }

    #[test]
    fn append_then_strlen() {
        let db = Database::new(0);
        call(&db, &[b"APPEND", b"k", b"hello"]);
        call(&db, &[b"APPEND", b"k", b" world"]);
        let reply = strlen(&db, &[b"k".to_vec()]).unwrap();
        assert_eq!(reply, Reply::Integer(11));
    }

    #[test]
    fn get_missing_key_is_nil() {
        let db = Database::new(0);
        assert_eq!(call(&db, &[b"GET", b"missing"]), Reply::nil());
    }
}
