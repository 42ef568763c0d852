//! SNAP: the atomic point-in-time snapshot file.
//!
//! ```text
//! [8-byte magic "REDIS001"]
//! [u32 db-index]
//! [u32 n-keys]
//! repeated n-keys times:
//!   [u32 klen][key bytes]
//!   [u8 type tag]
//!   [u32 vlen][value bytes (encoded per in_mem_core::ValueData::encode)]
//!   [u8 has-expiry in {0,1}]
//!   if has-expiry: [i64 BE absolute-deadline in nanoseconds]
//! [3-byte footer "EOF"]
//! ```

use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use in_mem_core::{Error, Result, Timestamp, ValueData};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

const MAGIC_CURRENT: &[u8; 8] = b"REDIS001";
const MAGIC_LEGACY: &[u8; 8] = b"REDIS000";
const FOOTER: &[u8; 3] = b"EOF";

/// One key's worth of decoded SNAP contents.
pub type SnapEntry = (Vec<u8>, ValueData, Option<Timestamp>);

pub struct SnapFile;

impl SnapFile {
    /// Write `entries` for `db_index` to `path` atomically: stream to
    /// `path` with a `.temp` suffix, fsync, close, then rename over `path`.
    /// If any step fails the temp file is abandoned and `path` is left
    /// untouched.
    pub fn save(path: &Path, db_index: u32, entries: &[SnapEntry]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let temp_path = path.with_extension("temp");
        debug!(path = %path.display(), keys = entries.len(), "writing SNAP");

        let result = Self::write_to(&temp_path, db_index, entries);
        match result {
            Ok(()) => match std::fs::rename(&temp_path, path) {
                Ok(()) => {
                    debug!(path = %path.display(), "SNAP rename complete");
                    Ok(())
                }
                Err(e) => {
                    let _ = std::fs::remove_file(&temp_path);
                    warn!(error = %e, "SNAP rename failed, temp file abandoned");
                    Err(Error::Io(e))
                }
            },
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                warn!(error = %e, "SNAP write failed, temp file abandoned");
                Err(e)
            }
        }
    }

    fn write_to(path: &Path, db_index: u32, entries: &[SnapEntry]) -> Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        w.write_all(MAGIC_CURRENT)?;
        w.write_u32::<BE>(db_index)?;
        w.write_u32::<BE>(entries.len() as u32)?;
        for (key, value, expiry) in entries {
            w.write_u32::<BE>(key.len() as u32)?;
            w.write_all(key)?;
            w.write_u8(value.type_tag() as u8)?;
            let encoded = value.encode();
            w.write_u32::<BE>(encoded.len() as u32)?;
            w.write_all(&encoded)?;
            match expiry {
                Some(ts) => {
                    w.write_u8(1)?;
                    w.write_i64::<BE>(ts.as_nanos())?;
                }
                None => w.write_u8(0)?,
            }
        }
        w.write_all(FOOTER)?;
        w.flush()?;
        w.get_ref().sync_all()?;
        Ok(())
    }

    /// Load `path`. `Ok(None)` if the file does not exist (first run).
    /// Corruption (bad magic, truncation, type/length mismatch) is
    /// reported as `Error::CorruptSnapshot` with a position hint — fatal
    /// for the caller, per the recovery-order rationale in the coordinator.
    pub fn load(path: &Path) -> Result<Option<(u32, Vec<SnapEntry>)>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };
        let mut r = BufReader::new(file);

        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)
            .map_err(|_| Error::CorruptSnapshot("truncated header".into()))?;
        if &magic != MAGIC_CURRENT && &magic != MAGIC_LEGACY {
            return Err(Error::CorruptSnapshot(format!("bad magic {magic:?}")));
        }

        let db_index = read_u32(&mut r, "db-index")?;
        let n_keys = read_u32(&mut r, "n-keys")?;

        let mut entries = Vec::with_capacity(n_keys as usize);
        for i in 0..n_keys {
            let klen = read_u32(&mut r, "key length") as usize;
            let key = read_exact_n(&mut r, klen, &format!("key bytes at record {i}"))?;

            let type_tag = r
                .read_u8()
                .map_err(|_| Error::CorruptSnapshot(format!("truncated type tag at record {i}")))?;

            let vlen = read_u32(&mut r, "value length") as usize;
            let value_bytes = read_exact_n(&mut r, vlen, &format!("value bytes at record {i}"))?;
            let value = ValueData::decode(&value_bytes)?;
            if value.type_tag() as u8 != type_tag {
                return Err(Error::CorruptSnapshot(format!(
                    "type tag mismatch at record {i}: header said {type_tag}, payload decoded as {}",
                    value.type_tag() as u8
                )));
            }

            let has_expiry = r
                .read_u8()
                .map_err(|_| Error::CorruptSnapshot(format!("truncated expiry flag at record {i}")))?;
            let expiry = match has_expiry {
                0 => None,
                1 => {
                    let nanos = r
                        .read_i64::<BE>()
                        .map_err(|_| Error::CorruptSnapshot(format!("truncated expiry at record {i}")))?;
                    Some(Timestamp::from_nanos(nanos))
                }
                other => {
                    return Err(Error::CorruptSnapshot(format!(
                        "invalid has-expiry byte {other} at record {i}"
                    )))
                }
            };

            entries.push((key, value, expiry));
        }

        let mut footer = [0u8; 3];
        r.read_exact(&mut footer)
            .map_err(|_| Error::CorruptSnapshot("missing EOF footer".into()))?;
        if &footer != FOOTER {
            return Err(Error::CorruptSnapshot(format!("bad footer {footer:?}")));
        }

        Ok(Some((db_index, entries)))
    }
}

fn read_u32(r: &mut impl Read, what: &str) -> Result<u32> {
    r.read_u32::<BE>()
        .map_err(|_| Error::CorruptSnapshot(format!("truncated {what}")))
}

fn read_exact_n(r: &mut impl Read, len: usize, what: &str) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .map_err(|_| Error::CorruptSnapshot(format!("truncated {what}")))?;
    Ok(buf)
}

/// Decode a single value payload in isolation — used by tests and by
/// callers that already hold the bytes in memory (e.g. replication
/// bootstrap) rather than a file handle.
pub fn decode_value(bytes: &[u8]) -> Result<ValueData> {
    let mut cur = Cursor::new(bytes);
    let mut probe = Vec::new();
    cur.read_to_end(&mut probe).map_err(Error::Io)?;
    ValueData::decode(&probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use in_mem_core::{ListVal, StringVal};
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.rdb");

        let mut list = ListVal::new();
        list.push_back(b"x".to_vec());
        list.push_back(b"y".to_vec());

        let entries: Vec<SnapEntry> = vec![
            (b"s1".to_vec(), ValueData::Str(StringVal::new(b"a".to_vec())), None),
            (b"l1".to_vec(), ValueData::List(list), Some(Timestamp::from_secs(9_999_999_999))),
        ];

        SnapFile::save(&path, 0, &entries).unwrap();
        let (db_index, loaded) = SnapFile::load(&path).unwrap().unwrap();
        assert_eq!(db_index, 0);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, b"s1");
        assert_eq!(loaded[1].2, Some(Timestamp::from_secs(9_999_999_999)));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.rdb");
        assert!(SnapFile::load(&path).unwrap().is_none());
    }

    #[test]
    fn load_rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.rdb");
        std::fs::write(&path, b"NOTREDIS").unwrap();
        assert!(matches!(SnapFile::load(&path), Err(Error::CorruptSnapshot(_))));
    }

    #[test]
    fn load_rejects_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.rdb");
        let entries: Vec<SnapEntry> =
            vec![(b"k".to_vec(), ValueData::Str(StringVal::new(b"v".to_vec())), None)];
        SnapFile::save(&path, 0, &entries).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 5);
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(SnapFile::load(&path), Err(Error::CorruptSnapshot(_))));
    }

    #[test]
    fn save_leaves_original_intact_on_temp_write_failure() {
        // Writing into a directory that doesn't exist and can't be created
        // (a file standing in the parent's place) causes `write_to` to
        // fail; `path` itself must be untouched afterward.
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("dump.rdb");

        let entries: Vec<SnapEntry> = Vec::new();
        assert!(SnapFile::save(&path, 0, &entries).is_err());
        assert!(!path.exists());
    }
}
