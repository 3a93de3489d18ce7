//! On-disk index directory.
//!
//! ```text
//! <index.dir>/
//!   vectors.idx     binary vectors (see chatvec_core::codec)
//!   metadata.json   [{id, text, source}, ...]
//!   manifest.json   model, dims, count, created_at, sha256 of both files
//! ```
//!
//! Each file is written to a temporary file in the same directory and
//! renamed into place. The manifest is written last, so a directory
//! whose manifest digests match its data files is complete.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

use chatvec_core::codec::{self, FORMAT_VERSION};
use chatvec_core::store::ChatIndex;

pub const VECTORS_FILE: &str = "vectors.idx";
pub const METADATA_FILE: &str = "metadata.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub format_version: u32,
    pub model: String,
    pub dims: usize,
    pub count: usize,
    pub created_at: DateTime<Utc>,
    pub vectors_sha256: String,
    pub metadata_sha256: String,
}

/// True if `dir` holds a manifest.
pub fn index_exists(dir: &Path) -> bool {
    dir.join(MANIFEST_FILE).is_file()
}

/// Write `index` to `dir`, replacing any index already there.
pub fn save_index(dir: &Path, index: &ChatIndex, model: &str, dims: usize) -> Result<Manifest> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create index directory {}", dir.display()))?;

    let mut vectors = Vec::new();
    codec::write_vectors(index.vectors(), &mut vectors)?;
    let mut metadata = Vec::new();
    codec::write_metadata(index.metadata(), &mut metadata)?;

    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        model: model.to_string(),
        dims: index.dims().unwrap_or(dims),
        count: index.len(),
        created_at: Utc::now(),
        vectors_sha256: sha256_hex(&vectors),
        metadata_sha256: sha256_hex(&metadata),
    };
    let mut manifest_bytes = serde_json::to_vec_pretty(&manifest)?;
    manifest_bytes.push(b'\n');

    write_atomic(dir, VECTORS_FILE, &vectors)?;
    write_atomic(dir, METADATA_FILE, &metadata)?;
    write_atomic(dir, MANIFEST_FILE, &manifest_bytes)?;

    tracing::info!(
        dir = %dir.display(),
        count = manifest.count,
        dims = manifest.dims,
        "index saved"
    );
    Ok(manifest)
}

/// Read just the manifest.
pub fn load_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        bail!(
            "No index found at {}. Run `chatvec build` first.",
            dir.display()
        );
    }
    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let manifest: Manifest = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    if manifest.format_version != FORMAT_VERSION {
        bail!(
            "Index format version {} is not supported (expected {})",
            manifest.format_version,
            FORMAT_VERSION
        );
    }
    Ok(manifest)
}

/// Load and verify the index in `dir`.
pub fn load_index(dir: &Path) -> Result<(ChatIndex, Manifest)> {
    let manifest = load_manifest(dir)?;

    let vectors = read_verified(dir, VECTORS_FILE, &manifest.vectors_sha256)?;
    let metadata = read_verified(dir, METADATA_FILE, &manifest.metadata_sha256)?;

    let index = ChatIndex::from_parts(
        codec::read_vectors(vectors.as_slice())
            .with_context(|| format!("Failed to decode {}", VECTORS_FILE))?,
        codec::read_metadata(metadata.as_slice())
            .with_context(|| format!("Failed to decode {}", METADATA_FILE))?,
    )?;

    if index.len() != manifest.count {
        bail!(
            "Manifest records {} entries but the index holds {}",
            manifest.count,
            index.len()
        );
    }
    if let Some(dims) = index.dims() {
        if dims != manifest.dims {
            bail!(
                "Manifest records dimension {} but vectors have dimension {}",
                manifest.dims,
                dims
            );
        }
    }

    tracing::debug!(dir = %dir.display(), count = index.len(), "index loaded");
    Ok((index, manifest))
}

fn read_verified(dir: &Path, name: &str, expected: &str) -> Result<Vec<u8>> {
    let path = dir.join(name);
    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let actual = sha256_hex(&bytes);
    if actual != expected {
        bail!(
            "{} does not match its manifest digest (expected {}, found {})",
            path.display(),
            expected,
            actual
        );
    }
    Ok(bytes)
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let target = dir.join(name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
