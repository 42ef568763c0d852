//! `LPUSH`/`RPUSH`/`LPOP`/`RPOP`/`LLEN`/`LRANGE`/`LINDEX`/`LSET`/`LREM`.

use super::{arg, parse_i64_arg, require_at_least};
use crate::database::Database;
use in_mem_core::{Error, ListVal, Reply, Result, ValueData};

fn mutate(db: &Database, key: &[u8], f: impl FnOnce(&mut ListVal) -> Result<Reply>) -> Result<Reply> {
    let cell = db.get_or_create(key, || ValueData::List(ListVal::new()));
    let reply = {
        let mut guard = cell.write();
        f(guard.as_list_mut()?)?
    };
    db.finish_mutation(key, &cell);
    Ok(reply)
}

pub fn lpush(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?.to_vec();
    let values = args[1..].to_vec();
    mutate(db, &key, |list| {
        list.push_front_multi(&values);
        Ok(Reply::Integer(list.len() as i64))
    })
}

pub fn rpush(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?.to_vec();
    let values = args[1..].to_vec();
    mutate(db, &key, |list| {
        list.push_back_multi(&values);
        Ok(Reply::Integer(list.len() as i64))
    })
}

pub fn lpop(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    let key = arg(args, 0)?;
    match db.get_cell(key) {
        None => Ok(Reply::nil()),
        Some(cell) => {
            let popped = cell.write().as_list_mut()?.pop_front();
            db.finish_mutation(key, &cell);
            Ok(match popped {
                Some(v) => Reply::bulk(v),
                None => Reply::nil(),
            })
        }
    }
}

pub fn rpop(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    let key = arg(args, 0)?;
    match db.get_cell(key) {
        None => Ok(Reply::nil()),
        Some(cell) => {
            let popped = cell.write().as_list_mut()?.pop_back();
            db.finish_mutation(key, &cell);
            Ok(match popped {
                Some(v) => Reply::bulk(v),
                None => Reply::nil(),
            })
        }
    }
}

pub fn llen(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::Integer(cell.read().as_list()?.len() as i64)),
        None => Ok(Reply::Integer(0)),
    }
}

pub fn lrange(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let start = parse_i64_arg(arg(args, 1)?)?;
    let stop = parse_i64_arg(arg(args, 2)?)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::multi_bulk(cell.read().as_list()?.range(start, stop))),
        None => Ok(Reply::MultiBulk(Vec::new())),
    }
}

pub fn lindex(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let idx = parse_i64_arg(arg(args, 1)?)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(match cell.read().as_list()?.index(idx) {
            Some(v) => Reply::bulk(v.clone()),
            None => Reply::nil(),
        }),
        None => Ok(Reply::nil()),
    }
}

pub fn lset(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let idx = parse_i64_arg(arg(args, 1)?)?;
    let value = arg(args, 2)?.to_vec();
    let key = arg(args, 0)?;
    match db.get_cell(key) {
        None => Err(Error::NoSuchKey),
        Some(cell) => {
            cell.write().as_list_mut()?.set(idx, value)?;
            Ok(Reply::ok())
        }
    }
}

pub fn lrem(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let count = parse_i64_arg(arg(args, 1)?)?;
    let value = arg(args, 2)?.to_vec();
    let key = arg(args, 0)?;
    match db.get_cell(key) {
        None => Ok(Reply::Integer(0)),
        Some(cell) => {
            let removed = cell.write().as_list_mut()?.remove(count, &value);
            db.finish_mutation(key, &cell);
            Ok(Reply::Integer(removed as i64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn vecs(items: &[&[u8]]) -> Vec<Vec<u8>> {
        items.iter().map(|i| i.to_vec()).collect()
    }

    #[test]
    fn rpush_then_lrange_preserves_order() {
        let db = Database::new(0);
        rpush(&db, &vecs(&[b"l", b"a", b"b", b"c"])).unwrap();
        let reply = lrange(&db, &vecs(&[b"l", b"0", b"-1"])).unwrap();
        assert_eq!(
            reply,
            Reply::multi_bulk(vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()])
        );
    }

    #[test]
    fn lpush_then_lrange_reverses_args_at_head() {
        let db = Database::new(0);
        rpush(&db, &vecs(&[b"l", b"a", b"b", b"c"])).unwrap();
        lpush(&db, &vecs(&[b"l", b"x", b"y"])).unwrap();
        let reply = lrange(&db, &vecs(&[b"l", b"0", b"-1"])).unwrap();
        assert_eq!(
            reply,
            Reply::multi_bulk(vec![
                b"y".to_vec(),
                b"x".to_vec(),
                b"a".to_vec(),
                b"b".to_vec(),
                b"c".to_vec()
            ])
        );
    }

    #[test]
    fn lpop_on_missing_key_is_nil() {
        let db = Database::new(0);
        assert_eq!(lpop(&db, &vecs(&[b"missing"])).unwrap(), Reply::nil());
    }

    #[test]
    fn lset_on_missing_key_is_no_such_key() {
        let db = Database::new(0);
        let reply = lset(&db, &vecs(&[b"missing", b"0", b"v"]));
        assert!(matches!(reply, Err(Error::NoSuchKey)));
    }

    #[test]
    fn popping_the_last_element_drains_the_key() {
        let db = Database::new(0);
        rpush(&db, &vecs(&[b"l", b"only"])).unwrap();
        lpop(&db, &vecs(&[b"l"])).unwrap();
        assert_eq!(llen(&db, &vecs(&[b"l"])).unwrap(), Reply::Integer(0));
        assert_eq!(db.exists(&[b"l".to_vec()]), 0);
    }
}
