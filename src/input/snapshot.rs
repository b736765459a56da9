use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::input::InputError;
use crate::model::{Cohort, Store};

const SNAPSHOT_MAGIC: &[u8; 8] = b"PPMISTO\0";
const SNAPSHOT_VERSION: u32 = 1;
const HEADER_BYTES: usize = 12;
const TRAILER_BYTES: usize = 8;

const CELL_MISSING: u8 = 0;
const CELL_PRESENT: u8 = 1;

// Layout after the header (all little endian):
//   subjects, cohort map, events, tests, code map, cells
// followed by an FNV-1a hash of that payload.
pub fn write_snapshot(path: &Path, store: &Store) -> Result<(), InputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| InputError::data_source(parent, e))?;
        }
    }

    let mut payload = Vec::new();
    encode_store(&mut payload, store)?;
    let checksum = hash_bytes(&payload);

    let file = File::create(path).map_err(|e| InputError::data_source(path, e))?;
    let mut out = BufWriter::new(file);
    out.write_all(SNAPSHOT_MAGIC)?;
    write_u32(&mut out, SNAPSHOT_VERSION)?;
    out.write_all(&payload)?;
    write_u64(&mut out, checksum)?;
    out.flush()?;

    tracing::info!(path = %path.display(), bytes = payload.len() + HEADER_BYTES + TRAILER_BYTES, "wrote store snapshot");
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Store, InputError> {
    let file = File::open(path).map_err(|e| InputError::data_source(path, e))?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| InputError::data_source(path, e))?;
    let bytes = &mmap[..];

    let fail = |msg: &str| InputError::Snapshot {
        path: path.to_path_buf(),
        msg: msg.to_string(),
    };

    if bytes.len() < HEADER_BYTES + TRAILER_BYTES {
        return Err(fail("file too small"));
    }
    if &bytes[0..8] != SNAPSHOT_MAGIC {
        return Err(fail("invalid magic"));
    }
    let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if version != SNAPSHOT_VERSION {
        return Err(fail(&format!("unsupported version {version}")));
    }

    let payload_end = bytes.len() - TRAILER_BYTES;
    let payload = &bytes[HEADER_BYTES..payload_end];
    let mut trailer = [0u8; 8];
    trailer.copy_from_slice(&bytes[payload_end..]);
    if hash_bytes(payload) != u64::from_le_bytes(trailer) {
        return Err(fail("checksum mismatch"));
    }

    let mut cursor = payload;
    let store = decode_store(&mut cursor).map_err(|e| fail(&e.to_string()))?;
    if !cursor.is_empty() {
        return Err(fail("trailing bytes after cell data"));
    }
    Ok(store)
}

fn encode_store<W: Write>(w: &mut W, store: &Store) -> std::io::Result<()> {
    write_len(w, store.subjects.len())?;
    for &subject in &store.subjects {
        write_u32(w, subject)?;
    }

    write_len(w, store.subject_cohort.len())?;
    for (&subject, cohort) in &store.subject_cohort {
        write_u32(w, subject)?;
        write_u8(w, cohort.index() as u8)?;
    }

    write_strings(w, &store.events)?;
    write_strings(w, &store.tests)?;

    write_len(w, store.code_map.len())?;
    for (code, descriptor) in &store.code_map {
        write_str(w, code)?;
        write_str(w, descriptor)?;
    }

    write_u64(w, store.values().len() as u64)?;
    for value in store.values() {
        match value {
            Some(v) => {
                write_u8(w, CELL_PRESENT)?;
                write_u64(w, v.to_bits())?;
            }
            None => write_u8(w, CELL_MISSING)?,
        }
    }
    Ok(())
}

fn decode_store<R: Read>(r: &mut R) -> std::io::Result<Store> {
    let n_subjects = read_u32(r)? as usize;
    let mut subjects = Vec::with_capacity(n_subjects);
    for _ in 0..n_subjects {
        subjects.push(read_u32(r)?);
    }

    let n_cohorts = read_u32(r)? as usize;
    let mut subject_cohort = BTreeMap::new();
    for _ in 0..n_cohorts {
        let subject = read_u32(r)?;
        let tag = read_u8(r)?;
        let cohort = Cohort::from_index(tag as usize)
            .ok_or_else(|| invalid_data(format!("unknown cohort tag {tag}")))?;
        subject_cohort.insert(subject, cohort);
    }

    let events = read_strings(r)?;
    let tests = read_strings(r)?;

    let n_codes = read_u32(r)? as usize;
    let mut code_map = BTreeMap::new();
    for _ in 0..n_codes {
        let code = read_str(r)?;
        let descriptor = read_str(r)?;
        code_map.insert(code, descriptor);
    }

    let n_cells = read_u64(r)? as usize;
    let mut values = Vec::with_capacity(n_cells);
    for _ in 0..n_cells {
        match read_u8(r)? {
            CELL_MISSING => values.push(None),
            CELL_PRESENT => values.push(Some(f64::from_bits(read_u64(r)?))),
            tag => return Err(invalid_data(format!("unknown cell tag {tag}"))),
        }
    }

    Store::from_parts(subjects, subject_cohort, events, tests, code_map, values)
        .ok_or_else(|| invalid_data("cell count does not match axis lengths".to_string()))
}

fn invalid_data(msg: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg)
}

fn write_len<W: Write>(w: &mut W, len: usize) -> std::io::Result<()> {
    let len = u32::try_from(len).map_err(|_| invalid_data(format!("length {len} exceeds u32")))?;
    write_u32(w, len)
}

fn write_strings<W: Write>(w: &mut W, values: &[String]) -> std::io::Result<()> {
    write_len(w, values.len())?;
    for v in values {
        write_str(w, v)?;
    }
    Ok(())
}

fn write_str<W: Write>(w: &mut W, v: &str) -> std::io::Result<()> {
    write_len(w, v.len())?;
    w.write_all(v.as_bytes())
}

fn write_u8<W: Write>(w: &mut W, v: u8) -> std::io::Result<()> {
    w.write_all(&[v])
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn write_u64<W: Write>(w: &mut W, v: u64) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_strings<R: Read>(r: &mut R) -> std::io::Result<Vec<String>> {
    let n = read_u32(r)? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(read_str(r)?);
    }
    Ok(out)
}

fn read_str<R: Read>(r: &mut R) -> std::io::Result<String> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| invalid_data(e.to_string()))
}

fn read_u8<R: Read>(r: &mut R) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = Fnv64::new();
    hasher.update(data);
    hasher.finish()
}

struct Fnv64 {
    hash: u64,
}

impl Fnv64 {
    fn new() -> Self {
        Self {
            hash: 0xcbf29ce484222325,
        }
    }

    fn update(&mut self, data: &[u8]) {
        let mut h = self.hash;
        for &b in data {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        self.hash = h;
    }

    fn finish(&self) -> u64 {
        self.hash
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/snapshot.rs"]
mod tests;
