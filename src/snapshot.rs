//! Snapshot I/O: the `.keon` flat-file format.
//!
//! The table's only persistence mechanism is a single flat file: a short
//! ASCII header followed by the raw slot array as little-endian `u64`s,
//! with an XOR-fold checksum over the payload.
//!
//! A [`crate::Table`] lives entirely in memory; `write`/`save`/`load` take
//! an explicit, point-in-time snapshot rather than keeping the slot array
//! resident on disk. Plain buffered `std::fs`/`std::io` is enough for
//! that: explicit `to_le_bytes`/`from_le_bytes` conversions keep the
//! layout independent of host endianness.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::table::{Table, WIDTH};

const EXTENSION: &str = "keon";

/// Header-only read of a `.keon` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub checksum: u64,
    pub count: u64,
    pub max: u64,
    pub depth: u64,
    /// True when the file opened cleanly, the header parsed, `checksum >
    /// 0`, and `max > 0`.
    pub ok: bool,
}

fn normalize_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == EXTENSION => path.to_path_buf(),
        _ => {
            let mut s = path.as_os_str().to_os_string();
            s.push(".");
            s.push(EXTENSION);
            PathBuf::from(s)
        }
    }
}

fn checksum(slots: &[u64]) -> u64 {
    slots.iter().fold(0u64, |acc, &v| acc ^ v)
}

fn header_line(checksum: u64, count: u64, max: u64, depth: u64) -> String {
    format!("{checksum} {count} {max} {depth}\n")
}

fn parse_header(line: &str) -> Option<(u64, u64, u64, u64)> {
    let mut parts = line.trim_end_matches('\n').split(' ');
    let checksum = parts.next()?.parse().ok()?;
    let count = parts.next()?.parse().ok()?;
    let max = parts.next()?.parse().ok()?;
    let depth = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((checksum, count, max, depth))
}

fn read_header_line(reader: &mut impl Read) -> io::Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            break;
        }
        if byte[0] == b'\n' {
            line.push(byte[0]);
            break;
        }
        line.push(byte[0]);
    }
    String::from_utf8(line).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write `table` to `path` (the `.keon` extension is appended if absent).
/// Flushes and syncs to durable storage before returning.
pub fn write(table: &mut Table, path: impl AsRef<Path>) -> io::Result<()> {
    let path = normalize_path(path.as_ref());
    let file = File::create(&path)?;
    let mut w = BufWriter::new(file);

    let slots = table.slots();
    let sum = checksum(slots);
    w.write_all(header_line(sum, table.len(), table.cap(), table.depth()).as_bytes())?;
    for &v in slots {
        w.write_all(&v.to_le_bytes())?;
    }
    w.flush()?;
    w.get_ref().sync_all()?;

    table.set_path(path);
    Ok(())
}

/// Re-write `table` to the path it was last `write`n to or `load`ed from.
pub fn save(table: &mut Table) -> io::Result<()> {
    match table.path().map(|p| p.to_path_buf()) {
        Some(path) => write(table, path),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "save() called on a table with no known path; use write(path) first",
        )),
    }
}

/// Load a table from `path`. Always returns a table — `ok` is `false` when
/// the stored checksum doesn't match the recomputed one, or the payload
/// didn't contain exactly `depth * width` slots; the returned table is
/// then only safe for inspection, not trusted use.
pub fn load(path: impl AsRef<Path>) -> io::Result<(Table, bool)> {
    let path = normalize_path(path.as_ref());
    let file = OpenOptions::new().read(true).open(&path)?;
    let mut r = BufReader::new(file);

    let header = read_header_line(&mut r)?;
    let Some((stored_checksum, stored_count, max, header_depth)) = parse_header(&header) else {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "malformed .keon header"));
    };

    // Re-run sizing so an implementation can cross-check depth.
    let expected_depth = Table::depth_for(max);
    let depth_matches = expected_depth == header_depth;
    let depth = header_depth;

    let mut slots = vec![0u64; (depth * WIDTH) as usize];
    let mut n_read = 0usize;
    loop {
        let mut buf = [0u8; 8];
        let mut filled = 0usize;
        while filled < 8 {
            match r.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        if filled == 0 {
            break;
        }
        if n_read < slots.len() {
            slots[n_read] = u64::from_le_bytes(buf);
        }
        n_read += 1;
        if filled < 8 {
            // Trailing partial word: treat as truncation, not an error.
            break;
        }
    }

    let exact_length = n_read == slots.len();
    let recomputed = checksum(&slots);
    let ok = depth_matches && exact_length && recomputed == stored_checksum;

    let count = if exact_length { slots.iter().filter(|&&v| v != 0).count() as u64 } else { stored_count };
    let mut table = Table::from_parts(max, depth, count, slots);
    table.set_path(path);
    Ok((table, ok))
}

/// Header-only read: open, parse the four header decimals, close.
pub fn info(path: impl AsRef<Path>) -> io::Result<SnapshotInfo> {
    let path = normalize_path(path.as_ref());
    let file = OpenOptions::new().read(true).open(&path)?;
    let mut r = BufReader::new(file);
    let header = read_header_line(&mut r)?;
    match parse_header(&header) {
        Some((checksum, count, max, depth)) => {
            let ok = checksum > 0 && max > 0;
            Ok(SnapshotInfo { checksum, count, max, depth, ok })
        }
        None => Ok(SnapshotInfo { checksum: 0, count: 0, max: 0, depth: 0, ok: false }),
    }
}
