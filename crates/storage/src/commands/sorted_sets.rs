//! `ZADD`/`ZSCORE`/`ZINCRBY`/`ZCARD`/`ZRANGE`/`ZREVRANGE`/`ZRANGEBYSCORE`/
//! `ZRANK`/`ZREVRANK`/`ZREM`.

use super::{arg, parse_f64_arg, parse_i64_arg, require_at_least};
use crate::database::Database;
use in_mem_core::{Reply, Result, ValueData, ZSetVal};

fn mutate(db: &Database, key: &[u8], f: impl FnOnce(&mut ZSetVal) -> Result<Reply>) -> Result<Reply> {
    let cell = db.get_or_create(key, || ValueData::ZSet(ZSetVal::new()));
    let reply = {
        let mut guard = cell.write();
        f(guard.as_zset_mut()?)?
    };
    db.finish_mutation(key, &cell);
    Ok(reply)
}

fn with_scores(pairs: Vec<(Vec<u8>, f64)>, with_scores: bool) -> Reply {
    if !with_scores {
        return Reply::multi_bulk(pairs.into_iter().map(|(m, _)| m).collect());
    }
    let mut items = Vec::with_capacity(pairs.len() * 2);
    for (member, score) in pairs {
        items.push(member);
        items.push(format!("{score}").into_bytes());
    }
    Reply::multi_bulk(items)
}

/// `ZADD key score member [score member ...]`. Returns the number of
/// members newly added (existing members have their score replaced but do
/// not count).
pub fn zadd(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    if (args.len() - 1) % 2 != 0 {
        return Err(in_mem_core::Error::Syntax("wrong number of arguments for 'zadd'".into()));
    }
    let key = arg(args, 0)?.to_vec();
    let mut pairs = Vec::with_capacity((args.len() - 1) / 2);
    for chunk in args[1..].chunks_exact(2) {
        let score = parse_f64_arg(&chunk[0])?;
        pairs.push((score, chunk[1].clone()));
    }
    mutate(db, &key, |zset| {
        let mut added = 0;
        for (score, member) in pairs {
            if zset.insert(member, score)? {
                added += 1;
            }
        }
        Ok(Reply::Integer(added))
    })
}

pub fn zscore(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(match cell.read().as_zset()?.score(arg(args, 1)?) {
            Some(score) => Reply::bulk(format!("{score}").into_bytes()),
            None => Reply::nil(),
        }),
        None => Ok(Reply::nil()),
    }
}

pub fn zincrby(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let key = arg(args, 0)?.to_vec();
    let delta = parse_f64_arg(arg(args, 1)?)?;
    let member = arg(args, 2)?.to_vec();
    mutate(db, &key, |zset| {
        let next = zset.incr_by(member, delta)?;
        Ok(Reply::bulk(format!("{next}").into_bytes()))
    })
}

pub fn zcard(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 1)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(Reply::Integer(cell.read().as_zset()?.len() as i64)),
        None => Ok(Reply::Integer(0)),
    }
}

/// `ZRANGE key start stop [WITHSCORES]`.
pub fn zrange(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let start = parse_i64_arg(arg(args, 1)?)?;
    let stop = parse_i64_arg(arg(args, 2)?)?;
    let scores = has_withscores(args, 3)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(with_scores(cell.read().as_zset()?.range_by_rank(start, stop), scores)),
        None => Ok(Reply::MultiBulk(Vec::new())),
    }
}

/// `ZREVRANGE key start stop [WITHSCORES]`: the ascending order from
/// [`zrange`], reversed.
pub fn zrevrange(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let start = parse_i64_arg(arg(args, 1)?)?;
    let stop = parse_i64_arg(arg(args, 2)?)?;
    let scores = has_withscores(args, 3)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(with_scores(cell.read().as_zset()?.rev_range_by_rank(start, stop), scores)),
        None => Ok(Reply::MultiBulk(Vec::new())),
    }
}

pub fn zrangebyscore(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 3)?;
    let min = parse_f64_arg(arg(args, 1)?)?;
    let max = parse_f64_arg(arg(args, 2)?)?;
    let scores = has_withscores(args, 3)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(with_scores(cell.read().as_zset()?.range_by_score(min, max), scores)),
        None => Ok(Reply::MultiBulk(Vec::new())),
    }
}

pub fn zrank(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(match cell.read().as_zset()?.rank(arg(args, 1)?) {
            Some(rank) => Reply::Integer(rank as i64),
            None => Reply::nil(),
        }),
        None => Ok(Reply::nil()),
    }
}

pub fn zrevrank(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    match db.get_cell(arg(args, 0)?) {
        Some(cell) => Ok(match cell.read().as_zset()?.rev_rank(arg(args, 1)?) {
            Some(rank) => Reply::Integer(rank as i64),
            None => Reply::nil(),
        }),
        None => Ok(Reply::nil()),
    }
}

pub fn zrem(db: &Database, args: &[Vec<u8>]) -> Result<Reply> {
    require_at_least(args, 2)?;
    let key = arg(args, 0)?;
    let members = args[1..].to_vec();
    match db.get_cell(key) {
        None => Ok(Reply::Integer(0)),
        Some(cell) => {
            let removed = cell.write().as_zset_mut()?.remove(&members);
            db.finish_mutation(key, &cell);
            Ok(Reply::Integer(removed as i64))
        }
    }
}

fn has_withscores(args: &[Vec<u8>], idx: usize) -> Result<bool> {
    match args.get(idx) {
        None => Ok(false),
        Some(opt) => {
            let opt = std::str::from_utf8(opt)
                .map(|s| s.to_ascii_uppercase())
                .map_err(|_| in_mem_core::Error::Syntax("syntax error".into()))?;
            if opt == "WITHSCORES" {
                Ok(true)
            } else {
                Err(in_mem_core::Error::Syntax(format!("unknown option '{opt}'")))
            }
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
    fn zadd_reports_only_newly_added_members() {
        let db = Database::new(0);
        zadd(&db, &vecs(&[b"z", b"1", b"one", b"2", b"two"])).unwrap();
        let reply = zadd(&db, &vecs(&[b"z", b"5", b"one"])).unwrap();
        assert_eq!(reply, Reply::Integer(0));
        assert_eq!(zscore(&db, &vecs(&[b"z", b"one"])).unwrap(), Reply::bulk(b"5".to_vec()));
    }

    #[test]
    fn zrange_with_scores_interleaves_member_and_score() {
        let db = Database::new(0);
        zadd(&db, &vecs(&[b"z", b"1", b"one", b"2", b"two"])).unwrap();
        let reply = zrange(&db, &vecs(&[b"z", b"0", b"-1", b"WITHSCORES"])).unwrap();
        assert_eq!(
            reply,
            Reply::multi_bulk(vec![
                b"one".to_vec(),
                b"1".to_vec(),
                b"two".to_vec(),
                b"2".to_vec()
            ])
        );
    }

    #[test]
    fn zrevrange_reverses_ascending_order() {
        let db = Database::new(0);
        zadd(&db, &vecs(&[b"z", b"1", b"one", b"2", b"two", b"3", b"three"])).unwrap();
        let reply = zrevrange(&db, &vecs(&[b"z", b"0", b"-1"])).unwrap();
        assert_eq!(
            reply,
            Reply::multi_bulk(vec![b"three".to_vec(), b"two".to_vec(), b"one".to_vec()])
        );
    }

    #[test]
    fn zincrby_creates_missing_member() {
        let db = Database::new(0);
        let reply = zincrby(&db, &vecs(&[b"z", b"10", b"one"])).unwrap();
        assert_eq!(reply, Reply::bulk(b"10".to_vec()));
    }

    #[test]
    fn zrem_draining_the_zset_deletes_the_key() {
        let db = Database::new(0);
        zadd(&db, &vecs(&[b"z", b"1", b"only"])).unwrap();
        zrem(&db, &vecs(&[b"z", b"only"])).unwrap();
        assert_eq!(db.exists(&[b"z".to_vec()]), 0);
    }

    #[test]
    fn zrank_and_zrevrank_on_missing_member_is_nil() {
        let db = Database::new(0);
        zadd(&db, &vecs(&[b"z", b"1", b"one"])).unwrap();
        assert_eq!(zrank(&db, &vecs(&[b"z", b"missing"])).unwrap(), Reply::nil());
        assert_eq!(zrevrank(&db, &vecs(&[b"z", b"missing"])).unwrap(), Reply::nil());
    }
}
