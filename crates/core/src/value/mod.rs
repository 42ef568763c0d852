//! Typed values: the five variants the store understands, and the
//! capability set every variant implements (type tag, byte encoding, size
//! estimate, deep copy).
//!
//! Values are opaque to callers other than through the operations exposed
//! here and in the per-variant submodules. A key's [`ValueData`] is the
//! only thing stored in a database's key table; command handlers reach
//! into it through `as_str`, `as_list`, etc. and return [`crate::Error::WrongType`]
//! when the variant doesn't match what the command expects.

mod hash;
mod list;
mod set;
mod string;
mod zset;

pub use hash::HashVal;
pub use list::ListVal;
pub use set::SetVal;
pub use string::StringVal;
pub use zset::ZSetVal;

use crate::error::{Error, Result};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::{Cursor, Read};

/// Discriminant for the five value variants, also used as the on-disk type
/// tag in both the encoded value payload and the SNAP record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String = 0,
    List = 1,
    Hash = 2,
    Set = 3,
    SortedSet = 4,
}

impl TypeTag {
    pub fn from_u8(b: u8) -> Result<Self> {
        match b {
            0 => Ok(TypeTag::String),
            1 => Ok(TypeTag::List),
            2 => Ok(TypeTag::Hash),
            3 => Ok(TypeTag::Set),
            4 => Ok(TypeTag::SortedSet),
            other => Err(Error::CorruptSnapshot(format!("unknown type tag {other}"))),
        }
    }

    /// Name as reported by the `TYPE` command.
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::List => "list",
            TypeTag::Hash => "hash",
            TypeTag::Set => "set",
            TypeTag::SortedSet => "zset",
        }
    }
}

/// A value held at a key. One variant per supported Redis-like data type.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    Str(StringVal),
    List(ListVal),
    Hash(HashVal),
    Set(SetVal),
    ZSet(ZSetVal),
}

impl ValueData {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            ValueData::Str(_) => TypeTag::String,
            ValueData::List(_) => TypeTag::List,
            ValueData::Hash(_) => TypeTag::Hash,
            ValueData::Set(_) => TypeTag::Set,
            ValueData::ZSet(_) => TypeTag::SortedSet,
        }
    }

    /// Engine-visible memory estimate. Cheap and approximate: fixed
    /// per-variant overhead plus the size of the element data. Consulted by
    /// memory-management policy; it need not be byte-exact.
    pub fn size(&self) -> usize {
        match self {
            ValueData::Str(v) => v.size(),
            ValueData::List(v) => v.size(),
            ValueData::Hash(v) => v.size(),
            ValueData::Set(v) => v.size(),
            ValueData::ZSet(v) => v.size(),
        }
    }

    /// True if the collection (list/hash/set/sorted-set) holds no elements.
    /// Strings are never considered "drained" by this check — an empty
    /// string is still a present value.
    pub fn is_drained(&self) -> bool {
        match self {
            ValueData::Str(_) => false,
            ValueData::List(v) => v.is_empty(),
            ValueData::Hash(v) => v.is_empty(),
            ValueData::Set(v) => v.is_empty(),
            ValueData::ZSet(v) => v.is_empty(),
        }
    }

    pub fn as_str(&self) -> Result<&StringVal> {
        match self {
            ValueData::Str(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_str_mut(&mut self) -> Result<&mut StringVal> {
        match self {
            ValueData::Str(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_list(&self) -> Result<&ListVal> {
        match self {
            ValueData::List(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut ListVal> {
        match self {
            ValueData::List(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_hash(&self) -> Result<&HashVal> {
        match self {
            ValueData::Hash(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_hash_mut(&mut self) -> Result<&mut HashVal> {
        match self {
            ValueData::Hash(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_set(&self) -> Result<&SetVal> {
        match self {
            ValueData::Set(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_set_mut(&mut self) -> Result<&mut SetVal> {
        match self {
            ValueData::Set(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_zset(&self) -> Result<&ZSetVal> {
        match self {
            ValueData::ZSet(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    pub fn as_zset_mut(&mut self) -> Result<&mut ZSetVal> {
        match self {
            ValueData::ZSet(v) => Ok(v),
            _ => Err(Error::WrongType),
        }
    }

    /// Self-describing byte encoding:
    /// `[type:u8][count:u32 BE]{ per-element records }`, except `String`
    /// which has no count field (`[type:u8][len:u32 BE][bytes]`).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size() + 8);
        match self {
            ValueData::Str(v) => {
                out.write_u8(TypeTag::String as u8).unwrap();
                out.write_u32::<BE>(v.0.len() as u32).unwrap();
                out.extend_from_slice(&v.0);
            }
            ValueData::List(v) => {
                out.write_u8(TypeTag::List as u8).unwrap();
                out.write_u32::<BE>(v.len() as u32).unwrap();
                for item in v.iter() {
                    write_bytes(&mut out, item);
                }
            }
            ValueData::Set(v) => {
                out.write_u8(TypeTag::Set as u8).unwrap();
                out.write_u32::<BE>(v.len() as u32).unwrap();
                for item in v.iter() {
                    write_bytes(&mut out, item);
                }
            }
            ValueData::Hash(v) => {
                out.write_u8(TypeTag::Hash as u8).unwrap();
                out.write_u32::<BE>(v.len() as u32).unwrap();
                for (field, value) in v.iter() {
                    write_bytes(&mut out, field);
                    write_bytes(&mut out, value);
                }
            }
            ValueData::ZSet(v) => {
                out.write_u8(TypeTag::SortedSet as u8).unwrap();
                out.write_u32::<BE>(v.len() as u32).unwrap();
                for (member, score) in v.iter_by_rank() {
                    out.write_f64::<BE>(score).unwrap();
                    write_bytes(&mut out, member);
                }
            }
        }
        out
    }

    /// Inverse of [`ValueData::encode`]. Detects truncation, type mismatch
    /// and element-count mismatch, yielding `CorruptSnapshot` otherwise.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);
        let tag = TypeTag::from_u8(read_u8(&mut cur)?)?;
        match tag {
            TypeTag::String => {
                let len = read_u32(&mut cur)? as usize;
                let data = read_exact(&mut cur, len)?;
                Ok(ValueData::Str(StringVal(data)))
            }
            TypeTag::List => {
                let count = read_u32(&mut cur)?;
                let mut list = ListVal::new();
                for _ in 0..count {
                    list.push_back(read_bytes(&mut cur)?);
                }
                Ok(ValueData::List(list))
            }
            TypeTag::Set => {
                let count = read_u32(&mut cur)?;
                let mut set = SetVal::new();
                for _ in 0..count {
                    set.insert(read_bytes(&mut cur)?);
                }
                Ok(ValueData::Set(set))
            }
            TypeTag::Hash => {
                let count = read_u32(&mut cur)?;
                let mut hash = HashVal::new();
                for _ in 0..count {
                    let field = read_bytes(&mut cur)?;
                    let value = read_bytes(&mut cur)?;
                    hash.set(field, value);
                }
                Ok(ValueData::Hash(hash))
            }
            TypeTag::SortedSet => {
                let count = read_u32(&mut cur)?;
                let mut zset = ZSetVal::new();
                for _ in 0..count {
                    let score = cur
                        .read_f64::<BE>()
                        .map_err(|e| Error::CorruptSnapshot(e.to_string()))?;
                    let member = read_bytes(&mut cur)?;
                    zset.insert(member, score)
                        .map_err(|_| Error::CorruptSnapshot("NaN score in payload".into()))?;
                }
                Ok(ValueData::ZSet(zset))
            }
        }
    }
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.write_u32::<BE>(bytes.len() as u32).unwrap();
    out.extend_from_slice(bytes);
}

fn read_u8(cur: &mut Cursor<&[u8]>) -> Result<u8> {
    cur.read_u8()
        .map_err(|e| Error::CorruptSnapshot(e.to_string()))
}

fn read_u32(cur: &mut Cursor<&[u8]>) -> Result<u32> {
    cur.read_u32::<BE>()
        .map_err(|e| Error::CorruptSnapshot(e.to_string()))
}

fn read_exact(cur: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    cur.read_exact(&mut buf)
        .map_err(|_| Error::CorruptSnapshot("truncated payload".into()))?;
    Ok(buf)
}

fn read_bytes(cur: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let len = read_u32(cur)? as usize;
    read_exact(cur, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trips() {
        let v = ValueData::Str(StringVal(b"hello world".to_vec()));
        let encoded = v.encode();
        let decoded = ValueData::decode(&encoded).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn list_round_trips() {
        let mut l = ListVal::new();
        l.push_back(b"a".to_vec());
        l.push_back(b"b".to_vec());
        let v = ValueData::List(l);
        let decoded = ValueData::decode(&v.encode()).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn hash_round_trips() {
        let mut h = HashVal::new();
        h.set(b"f1".to_vec(), b"v1".to_vec());
        h.set(b"f2".to_vec(), b"v2".to_vec());
        let v = ValueData::Hash(h);
        let decoded = ValueData::decode(&v.encode()).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn set_round_trips() {
        let mut s = SetVal::new();
        s.insert(b"m1".to_vec());
        s.insert(b"m2".to_vec());
        let v = ValueData::Set(s);
        let decoded = ValueData::decode(&v.encode()).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn zset_round_trips() {
        let mut z = ZSetVal::new();
        z.insert(b"one".to_vec(), 1.0).unwrap();
        z.insert(b"two".to_vec(), 2.0).unwrap();
        let v = ValueData::ZSet(z);
        let decoded = ValueData::decode(&v.encode()).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn decode_truncated_payload_is_corrupt() {
        let v = ValueData::Str(StringVal(b"hello".to_vec()));
        let mut encoded = v.encode();
        encoded.truncate(encoded.len() - 2);
        assert!(ValueData::decode(&encoded).is_err());
    }

    #[test]
    fn decode_unknown_type_tag_is_corrupt() {
        let bytes = [9u8, 0, 0, 0, 0];
        assert!(ValueData::decode(&bytes).is_err());
    }

    #[test]
    fn type_tag_name_matches_type_command_output() {
        assert_eq!(TypeTag::String.name(), "string");
        assert_eq!(TypeTag::SortedSet.name(), "zset");
    }
}
