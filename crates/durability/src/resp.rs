//! RESP-like command framing shared by the AOL writer, the AOL reader and
//! the rewrite compactor:
//!
//! ```text
//! *<N>\r\n
//! $<len(name)>\r\nname\r\n
//! $<len(arg_i)>\r\narg_i\r\n      (repeated)
//! ```

use std::io::{BufRead, Write};

/// Encode `name` plus `args` as one RESP command frame.
pub fn encode_command(out: &mut Vec<u8>, name: &str, args: &[Vec<u8>]) {
    let total = args.len() + 1;
    write!(out, "*{total}\r\n").unwrap();
    write_bulk(out, name.as_bytes());
    for arg in args {
        write_bulk(out, arg);
    }
}

fn write_bulk(out: &mut Vec<u8>, bytes: &[u8]) {
    write!(out, "${}\r\n", bytes.len()).unwrap();
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\r\n");
}

/// Read one command frame from `reader`. Returns:
///
/// - `Ok(Some((name, args)))` on a well-formed frame.
/// - `Ok(None)` at a clean EOF (no bytes left before the `*`).
/// - `Err(reason)` on a malformed frame; the caller should log and resync
///   by skipping to the next line, per the AOL loader's best-effort
///   recovery contract.
pub fn read_command(reader: &mut impl BufRead) -> Result<Option<(String, Vec<Vec<u8>>)>, String> {
    let header = match read_line(reader)? {
        Some(line) => line,
        None => return Ok(None),
    };
    if header.is_empty() {
        return Ok(None);
    }
    let count: usize = header
        .strip_prefix('*')
        .ok_or_else(|| format!("expected '*', got {header:?}"))?
        .parse()
        .map_err(|_| format!("bad argument count in {header:?}"))?;
    if count == 0 {
        return Err("zero-argument command frame".to_string());
    }

    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let len_line = read_line(reader)?.ok_or("truncated frame: missing bulk header")?;
        let len: usize = len_line
            .strip_prefix('$')
            .ok_or_else(|| format!("expected '$', got {len_line:?}"))?
            .parse()
            .map_err(|_| format!("bad bulk length in {len_line:?}"))?;
        let mut buf = vec![0u8; len + 2]; // payload + trailing \r\n
        reader
            .read_exact(&mut buf)
            .map_err(|e| format!("truncated bulk payload: {e}"))?;
        buf.truncate(len);
        parts.push(buf);
    }

    let name = String::from_utf8(parts.remove(0)).map_err(|e| format!("non-utf8 command name: {e}"))?;
    Ok(Some((name, parts)))
}

/// Read a line, stripping the trailing `\r\n` (or `\n`). `Ok(None)` only on
/// an EOF with no bytes read at all.
fn read_line(reader: &mut impl BufRead) -> Result<Option<String>, String> {
    let mut line = Vec::new();
    let n = reader.read_until(b'\n', &mut line).map_err(|e| e.to_string())?;
    if n == 0 {
        return Ok(None);
    }
    while line.last() == Some(&b'\n') || line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map(Some).map_err(|e| format!("non-utf8 line: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn encode_then_read_round_trips() {
        let mut buf = Vec::new();
        encode_command(&mut buf, "SET", &[b"k".to_vec(), b"v".to_vec()]);
        let mut cur = Cursor::new(buf);
        let (name, args) = read_command(&mut cur).unwrap().unwrap();
        assert_eq!(name, "SET");
        assert_eq!(args, vec![b"k".to_vec(), b"v".to_vec()]);
    }

    #[test]
    fn read_command_on_empty_input_is_clean_eof() {
        let mut cur = Cursor::new(Vec::new());
        assert_eq!(read_command(&mut cur).unwrap(), None);
    }

    #[test]
    fn read_command_rejects_malformed_header() {
        let mut cur = Cursor::new(b"not-a-frame\r\n".to_vec());
        assert!(read_command(&mut cur).is_err());
    }

    #[test]
    fn bulk_payload_may_contain_binary_bytes() {
        let mut buf = Vec::new();
        encode_command(&mut buf, "SET", &[b"k".to_vec(), vec![0, 1, 2, 255]]);
        let mut cur = Cursor::new(buf);
        let (_, args) = read_command(&mut cur).unwrap().unwrap();
        assert_eq!(args[1], vec![0, 1, 2, 255]);
    }
}
