//! `HSET`/`HSETNX`/`HGET`/`HDEL`/`HEXISTS`/`HLEN`/`HGETALL`/`HKEYS`/`HVALS`/
//! `HINCRBY`/`HINCRBYFLOAT`.

use super::{arg, parse_f64_arg, parse_i64_arg, require_at_least};
use crate::database::Database;
use in_mem_core::{Error, HashVal, Reply, Result, ValueData};

fn mutate(db: &Database, key: &[u8], f: impl FnOnce(&mut HashVal) -> Result<Reply>) -> Result<Reply> {
    let cell = db.get_or_create(key, || ValueData::Hash(HashVal::new()));
    let reply = {
        let mut guard = cell.write();
        f(guard.as_hash_mut()?)?
    };
    db.finish_mutation(key, &cell);
    Ok(reply)
}

/// `HSET key field value [field value ...]`. Returns the number of fields
/// that were newly created across all pairs (fields that already existed
/// and were merely overwritten are not counted).
pub fn hset(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let key = arg(args, 0)?.to_vec();
    if args[1..].len() % 2 != 0 {
        return Err(Error::Syntax("wrong number of arguments for HSET".into()));
    }
    mutate(db, &key, |hash| {
        let mut created = 0;
        for pair in args[1..].chunks_exact(2) {
            created += hash.set(pair[0].clone(), pair[1].clone()) as i64;
        }
        Ok(Reply::Integer(created))
    })
}

pub fn hsetnx(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let key = arg(args, 0)?.to_vec();
    let field = arg(args, 1)?.to_vec();
    let value = arg(args, 2)?.to_vec();
    mutate(db, &key, |hash| Ok(Reply::Integer(hash.set_nx(field, value) as i64)))
}

pub fn hget(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(match cell.read().as_hash()?.get(arg(args, 1)?) {
            Some(v) => Reply::bulk(v.clone()),
            None => Reply::nil(),
        }),
        None => Ok(Reply::nil()),
    }
}

pub fn hdel(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?;
    let fields = args[1..].to_vec();
    match db.get_cell(key) {
        None => Ok(Reply::Integer(0)),
        Some(cell) => {
            let removed = cell.write().as_hash_mut()?.del(&fields);
            db.finish_mutation(key, &cell);
            Ok(Reply::Integer(removed as i64))
        }
    }
}

pub fn hexists(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::Integer(cell.read().as_hash()?.exists(arg(args, 1)?) as i64)),
        None => Ok(Reply::Integer(0)),
    }
}

pub fn hlen(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::Integer(cell.read().as_hash()?.len() as i64)),
        None => Ok(Reply::Integer(0)),
    }
}

pub fn hgetall(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => {
            let hash = cell.read();
            let hash = hash.as_hash()?;
            let mut items = Vec::with_capacity(hash.len() * 2);
            for (field, value) in hash.iter() {
                items.push(field.clone());
                items.push(value.clone());
            }
            Ok(Reply::multi_bulk(items))
        }
        None => Ok(Reply::MultiBulk(Vec::new())),
    }
}

pub fn hkeys(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => {
            let hash = cell.read();
            let keys: Vec<Vec<u8>> = hash.as_hash()?.iter().map(|(f, _)| f.clone()).collect();
            Ok(Reply::multi_bulk(keys))
        }
        None => Ok(Reply::MultiBulk(Vec::new())),
    }
}

pub fn hvals(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => {
            let hash = cell.read();
            let vals: Vec<Vec<u8>> = hash.as_hash()?.iter().map(|(_, v)| v.clone()).collect();
            Ok(Reply::multi_bulk(vals))
        }
        None => Ok(Reply::MultiBulk(Vec::new())),
    }
}

pub fn hincrby(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let key = arg(args, 0)?.to_vec();
    let field = arg(args, 1)?.to_vec();
    let delta = parse_i64_arg(arg(args, 2)?)?;
    mutate(db, &key, |hash| Ok(Reply::Integer(hash.incr_by(field, delta)?)))
}

pub fn hincrbyfloat(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let key = arg(args, 0)?.to_vec();
    let field = arg(args, 1)?.to_vec();
    let delta = parse_f64_arg(arg(args, 2)?)?;
    mutate(db, &key, |hash| {
        let next = hash.incr_by_float(field, delta)?;
        Ok(Reply::bulk(format!("{next}").into_bytes()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn vecs(items: &[&[u8]]) -> Vec<Vec<u8>> {
        items.iter().map(|i| i.to_vec()).collect()
    }

    #[test]
    fn hset_reports_whether_field_is_new() {
        let db = Database::new(0);
        assert_eq!(hset(&db, &vecs(&[b"h", b"f1", b"v1"])).unwrap(), Reply::Integer(1));
        assert_eq!(hset(&db, &vecs(&[b"h", b"f2", b"v2"])).unwrap(), Reply::Integer(1));
        assert_eq!(hget(&db, &vecs(&[b"h", b"f1"])).unwrap(), Reply::bulk(b"v1".to_vec()));
    }

    #[test]
    fn hset_with_multiple_pairs_sets_all_and_counts_only_new_fields() {
        let db = Database::new(0);
        assert_eq!(
            hset(&db, &vecs(&[b"h", b"f1", b"v1", b"f2", b"v2"])).unwrap(),
            Reply::Integer(2)
        );
        assert_eq!(hget(&db, &vecs(&[b"h", b"f2"])).unwrap(), Reply::bulk(b"v2".to_vec()));
        assert_eq!(
            hset(&db, &vecs(&[b"h", b"f2", b"v2b", b"f3", b"v3"])).unwrap(),
            Reply::Integer(1)
        );
        assert_eq!(hget(&db, &vecs(&[b"h", b"f2"])).unwrap(), Reply::bulk(b"v2b".to_vec()));
        assert_eq!(hlen(&db, &vecs(&[b"h"])).unwrap(), Reply::Integer(3));
    }

    #[test]
    fn hdel_counts_only_existing_fields() {
        let db = Database::new(0);
        hset(&db, &vecs(&[b"h", b"f1", b"v1"])).unwrap();
        hset(&db, &vecs(&[b"h", b"f2", b"v2"])).unwrap();
        let removed = hdel(&db, &vecs(&[b"h", b"f1", b"f3"])).unwrap();
        assert_eq!(removed, Reply::Integer(1));
        assert_eq!(hlen(&db, &vecs(&[b"h"])).unwrap(), Reply::Integer(1));
    }

    #[test]
    fn hdel_draining_the_hash_deletes_the_key() {
        let db = Database::new(0);
        hset(&db, &vecs(&[b"h", b"f1", b"v1"])).unwrap();
        hdel(&db, &vecs(&[b"h", b"f1"])).unwrap();
        assert_eq!(db.exists(&[b"h".to_vec()]), 0);
    }

    #[test]
    fn hgetall_interleaves_fields_and_values() {
        let db = Database::new(0);
        hset(&db, &vecs(&[b"h", b"f1", b"v1"])).unwrap();
        let reply = hgetall(&db, &vecs(&[b"h"])).unwrap();
        match reply {
            Reply::MultiBulk(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}
