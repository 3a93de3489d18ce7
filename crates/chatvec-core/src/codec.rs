//! Byte formats for a persisted [`ChatIndex`].
//!
//! ## Vector file
//!
//! ```text
//! offset  size         field
//! 0       4            magic "CVIX"
//! 4       4            format version (u32 LE, currently 1)
//! 8       4            dims (u32 LE, 0 for an empty index)
//! 12      8            count (u64 LE)
//! 20      count×dims×4 vectors, f32 LE, in id order
//! ```
//!
//! Floats are copied bit-for-bit, so a decoded index compares equal to
//! the one that was encoded.
//!
//! ## Metadata file
//!
//! A pretty-printed JSON array of `{id, text, source}` records in id
//! order.
//!
//! [`ChatIndex`]: crate::store::ChatIndex

use std::io::{Read, Write};

use crate::error::IndexError;
use crate::index::FlatIndex;
use crate::metadata::MetadataStore;
use crate::models::MetadataRecord;
use crate::vector::{bytes_to_vec, vec_to_bytes};

pub const MAGIC: &[u8; 4] = b"CVIX";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 20;

/// Write `index` in the vector file format.
pub fn write_vectors<W: Write>(index: &FlatIndex, mut w: W) -> Result<(), IndexError> {
    let dims = index.dims().unwrap_or(0);
    let dims = u32::try_from(dims)
        .map_err(|_| IndexError::Corrupt(format!("dimension {dims} exceeds u32")))?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    header.extend_from_slice(&dims.to_le_bytes());
    header.extend_from_slice(&(index.len() as u64).to_le_bytes());
    w.write_all(&header)?;
    w.write_all(&vec_to_bytes(index.raw_data()))?;
    w.flush()?;
    Ok(())
}

/// Read a vector file written by [`write_vectors`].
pub fn read_vectors<R: Read>(mut r: R) -> Result<FlatIndex, IndexError> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;

    if bytes.len() < HEADER_LEN {
        return Err(IndexError::Corrupt(format!(
            "vector file is {} bytes, shorter than its header",
            bytes.len()
        )));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    if &header[0..4] != MAGIC {
        return Err(IndexError::Corrupt("bad magic".to_string()));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(IndexError::Corrupt(format!(
            "unsupported format version {version}"
        )));
    }
    let dims = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header[12..20]);
    let count = u64::from_le_bytes(count_bytes);

    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(dims))
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| IndexError::Corrupt(format!("count {count} overflows")))?;
    if payload.len() != expected {
        return Err(IndexError::Corrupt(format!(
            "expected {} payload bytes for {} × {}-d vectors, found {}",
            expected,
            count,
            dims,
            payload.len()
        )));
    }
    if dims == 0 && count != 0 {
        return Err(IndexError::Corrupt(format!(
            "{count} vectors recorded with dimension 0"
        )));
    }

    FlatIndex::from_raw(dims, bytes_to_vec(payload))
}

/// Write `metadata` as a JSON array.
pub fn write_metadata<W: Write>(metadata: &MetadataStore, mut w: W) -> Result<(), IndexError> {
    serde_json::to_writer_pretty(&mut w, metadata.records())?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

/// Read a JSON metadata array, checking that ids are sequential.
pub fn read_metadata<R: Read>(r: R) -> Result<MetadataStore, IndexError> {
    let records: Vec<MetadataRecord> = serde_json::from_reader(r)?;
    MetadataStore::from_records(records)
}
