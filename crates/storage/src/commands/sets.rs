//! `SADD`/`SREM`/`SISMEMBER`/`SMEMBERS`/`SCARD`/`SPOP`/`SINTER`/`SUNION`/
//! `SDIFF`.

use super::{arg, require_at_least};
use crate::database::Database;
use in_mem_core::{Reply, Result, SetVal, ValueData};

fn mutate(db: &Database, key: &[u8], f: impl FnOnce(&mut SetVal) -> Result<Reply>) -> Result<Reply> {
    let cell = db.get_or_create(key, || ValueData::Set(SetVal::new()));
    let reply = {
        let mut guard = cell.write();
        f(guard.as_set_mut()?)?
    };
    db.finish_mutation(key, &cell);
    Ok(reply)
}

pub fn sadd(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?.to_vec();
    let members = args[1..].to_vec();
    mutate(db, &key, |set| Ok(Reply::Integer(set.add_multi(&members) as i64)))
}

pub fn srem(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?;
    let members = args[1..].to_vec();
    match db.get_cell(key) {
        None => Ok(Reply::Integer(0)),
        Some(cell) => {
            let removed = cell.write().as_set_mut()?.remove_multi(&members);
            db.finish_mutation(key, &cell);
            Ok(Reply::Integer(removed as i64))
        }
    }
}

pub fn sismember(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::Integer(cell.read().as_set()?.is_member(arg(args, 1)?) as i64)),
        None => Ok(Reply::Integer(0)),
    }
}

pub fn smembers(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::multi_bulk(cell.read().as_set()?.members())),
        None => Ok(Reply::MultiBulk(Vec::new())),
    }
}

pub fn scard(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::Integer(cell.read().as_set()?.len() as i64)),
        None => Ok(Reply::Integer(0)),
    }
}

/// `SPOP key`: remove and return an arbitrary member. Draining the set
/// deletes the key (handled by the shared `finish_mutation` drain check).
pub fn spop(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    let key = arg(args, 0)?;
    match db.get_cell(key) {
        None => Ok(Reply::nil()),
        Some(cell) => {
            let popped = cell.write().as_set_mut()?.random_pop();
            db.finish_mutation(key, &cell);
            Ok(match popped {
                Some(v) => Reply::bulk(v),
                None => Reply::nil(),
            })
        }
    }
}

/// Resolve `key` plus zero or more additional set keys to owned `SetVal`
/// clones, so the set-algebra helpers (which borrow `&SetVal`) can run
/// without holding multiple cell locks at once (avoids lock-order issues
/// across distinct keys of the same database).
fn resolve_sets(db: &Database, args: &[Vec<u8>]) -> Result<Vec<SetVal>> {
    let mut sets = Vec::with_capacity(args.len());
    for key in args {
        match db.get_cell(key) {
            Some(cell) => sets.push(cell.read().as_set()?.clone()),
            None => sets.push(SetVal::new()),
        }
    }
    Ok(sets)
}

pub fn sinter(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    let sets = resolve_sets(db, args)?;
    let (first, rest) = sets.split_first().expect("require_at_least(1) checked above");
    let refs: Vec<&SetVal> = rest.iter().collect();
    Ok(Reply::multi_bulk(first.inter(&refs)))
}

pub fn sunion(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    let sets = resolve_sets(db, args)?;
    let (first, rest) = sets.split_first().expect("require_at_least(1) checked above");
    let refs: Vec<&SetVal> = rest.iter().collect();
    Ok(Reply::multi_bulk(first.union(&refs)))
}

pub fn sdiff(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    let sets = resolve_sets(db, args)?;
    let (first, rest) = sets.split_first().expect("require_at_least(1) checked above");
    let refs: Vec<&SetVal> = rest.iter().collect();
    Ok(Reply::multi_bulk(first.diff(&refs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn vecs(items: &[&[u8]]) -> Vec<Vec<u8>> {
        items.iter().map(|i| i.to_vec()).collect()
    }

    fn sorted(reply: Reply) -> Vec<Vec<u8>> {
        match reply {
            Reply::MultiBulk(items) => {
                let mut out: Vec<Vec<u8>> = items
                    .into_iter()
                    .map(|r| match r {
                        Reply::Bulk(Some(b)) => b,
                        other => panic!("unexpected element reply: {other:?}"),
                    })
                    .collect();
                out.sort();
                out
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn sadd_counts_only_new_members() {
        let db = Database::new(0);
        sadd(&db, &vecs(&[b"s", b"a"])).unwrap();
        let added = sadd(&db, &vecs(&[b"s", b"a", b"b"])).unwrap();
        assert_eq!(added, Reply::Integer(1));
    }

    #[test]
    fn srem_draining_the_set_deletes_the_key() {
        let db = Database::new(0);
        sadd(&db, &vecs(&[b"s", b"only"])).unwrap();
        srem(&db, &vecs(&[b"s", b"only"])).unwrap();
        assert_eq!(db.exists(&[b"s".to_vec()]), 0);
    }

    #[test]
    fn sinter_on_missing_keys_is_empty() {
        let db = Database::new(0);
        sadd(&db, &vecs(&[b"s", b"a"])).unwrap();
        let reply = sinter(&db, &vecs(&[b"s", b"missing"])).unwrap();
        assert_eq!(reply, Reply::MultiBulk(Vec::new()));
    }

    #[test]
    fn sunion_merges_across_keys() {
        let db = Database::new(0);
        sadd(&db, &vecs(&[b"s1", b"a", b"b"])).unwrap();
        sadd(&db, &vecs(&[b"s2", b"b", b"c"])).unwrap();
        let reply = sunion(&db, &vecs(&[b"s1", b"s2"])).unwrap();
        assert_eq!(sorted(reply), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn sdiff_excludes_members_in_other_sets() {
        let db = Database::new(0);
        sadd(&db, &vecs(&[b"s1", b"a", b"b", b"c"])).unwrap();
        sadd(&db, &vecs(&[b"s2", b"b"])).unwrap();
        let reply = sdiff(&db, &vecs(&[b"s1", b"s2"])).unwrap();
        assert_eq!(sorted(reply), vec![b"a".to_vec(), b"c".to_vec()]);
    }
}
