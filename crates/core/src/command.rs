//! Command model: the record handed to a database dispatcher, the reply
//! taxonomy it produces, and the static read/write classification table
//! consulted by the AOL write gate.

/// A parsed command: upper-case ASCII name, raw byte-string arguments, the
/// id of the client that issued it, and the target database index.
///
/// Parsing the wire protocol and resolving which client issued a command are
/// both the RESP server's job; by the time a `Command` reaches a database it
/// carries only what the dispatcher needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<Vec<u8>>,
    pub client_id: u64,
    pub db_index: usize,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<Vec<u8>>, client_id: u64, db_index: usize) -> Self {
        Command {
            name: name.into().to_ascii_uppercase(),
            args,
            client_id,
            db_index,
        }
    }

    pub fn arg(&self, i: usize) -> Option<&[u8]> {
        self.args.get(i).map(|v| v.as_slice())
    }

    pub fn arg_str(&self, i: usize) -> Option<&str> {
        self.arg(i).and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// A reply produced by the dispatcher. Mirrors the Redis reply taxonomy
/// closely enough that a RESP server can serialize it without further
/// interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    /// `None` is RESP's nil bulk string.
    Bulk(Option<Vec<u8>>),
    MultiBulk(Vec<Reply>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status("OK".into())
    }

    pub fn nil() -> Self {
        Reply::Bulk(None)
    }

    pub fn bulk(bytes: impl Into<Vec<u8>>) -> Self {
        Reply::Bulk(Some(bytes.into()))
    }

    pub fn multi_bulk(items: Vec<Vec<u8>>) -> Self {
        Reply::MultiBulk(items.into_iter().map(|i| Reply::bulk(i)).collect())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl From<crate::error::Error> for Reply {
    fn from(err: crate::error::Error) -> Self {
        Reply::Error(err.to_reply_text())
    }
}

/// Names classified as write commands: a non-error reply from one of these
/// triggers AOL propagation. Anything not in this list, but present in
/// [`is_known_command`], is a read.
const WRITE_COMMANDS: &[&str] = &[
    "SET", "SETNX", "MSET", "APPEND", "DEL", "EXPIRE", "FLUSHDB", "FLUSHALL", "RENAME",
    "INCR", "INCRBY", "DECR", "DECRBY", "INCRBYFLOAT",
    "LPUSH", "RPUSH", "LPOP", "RPOP", "LSET", "LREM",
    "HSET", "HSETNX", "HDEL", "HINCRBY", "HINCRBYFLOAT",
    "SADD", "SREM", "SPOP",
    "ZADD", "ZINCRBY", "ZREM",
];

const READ_COMMANDS: &[&str] = &[
    "PING", "EXISTS", "TTL", "TYPE", "KEYS", "DBSIZE", "GET", "STRLEN",
    "LLEN", "LRANGE", "LINDEX",
    "HGET", "HEXISTS", "HLEN", "HGETALL", "HKEYS", "HVALS",
    "SISMEMBER", "SMEMBERS", "SCARD", "SINTER", "SUNION", "SDIFF",
    "ZSCORE", "ZCARD", "ZRANGE", "ZREVRANGE", "ZRANGEBYSCORE", "ZRANK", "ZREVRANK",
];

pub fn is_write_command(name: &str) -> bool {
    WRITE_COMMANDS.contains(&name)
}

pub fn is_known_command(name: &str) -> bool {
    WRITE_COMMANDS.contains(&name) || READ_COMMANDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_name_is_upper_cased_on_construction() {
        let cmd = Command::new("get", vec![b"k".to_vec()], 1, 0);
        assert_eq!(cmd.name, "GET");
    }

    #[test]
    fn set_is_classified_write_and_get_is_read() {
        assert!(is_write_command("SET"));
        assert!(!is_write_command("GET"));
        assert!(is_known_command("GET"));
    }

    #[test]
    fn unknown_command_is_neither_read_nor_write() {
        assert!(!is_known_command("NOTACOMMAND"));
        assert!(!is_write_command("NOTACOMMAND"));
    }

    #[test]
    fn reply_ok_and_nil_helpers() {
        assert_eq!(Reply::ok(), Reply::Status("OK".into()));
        assert_eq!(Reply::nil(), Reply::Bulk(None));
        assert!(!Reply::ok().is_error());
        assert!(Reply::Error("boom".into()).is_error());
    }
}
