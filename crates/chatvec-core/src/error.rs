use thiserror::Error;

/// Errors surfaced by the vector index, the metadata store, and their
/// on-disk codecs.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("cannot index an empty vector")]
    EmptyVector,
    #[error("no entry with id {0}")]
    NotFound(u64),
    /// The vector index and the metadata store disagree on length.
    #[error("index misaligned: {vectors} vectors vs {records} metadata records")]
    Misaligned { vectors: usize, records: usize },
    #[error("corrupt index data: {0}")]
    Corrupt(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata json error: {0}")]
    Json(#[from] serde_json::Error),
}
