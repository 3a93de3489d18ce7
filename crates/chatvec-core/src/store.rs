//! The lock-step pairing of vectors and metadata.
//!
//! [`ChatIndex`] owns a [`FlatIndex`] and a [`MetadataStore`] and only
//! lets them grow together, through [`add_entry`](ChatIndex::add_entry).
//! Because the vector insert is validated before anything is written,
//! a failed add leaves both halves untouched, and after every call
//! `vectors.len() == metadata.len()`.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`add_entry`](ChatIndex::add_entry) | Append a vector and its record under one id |
//! | [`search`](ChatIndex::search) | Exact k-NN, resolved to text and source |
//! | [`get`](ChatIndex::get) | Look up one record by id |
//! | [`from_parts`](ChatIndex::from_parts) | Reassemble halves loaded from disk |

use crate::error::IndexError;
use crate::index::FlatIndex;
use crate::metadata::MetadataStore;
use crate::models::{MetadataRecord, SearchHit};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatIndex {
    vectors: FlatIndex,
    metadata: MetadataStore,
}

impl ChatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty index that only accepts `dims`-dimensional vectors.
    pub fn with_dims(dims: usize) -> Result<Self, IndexError> {
        Ok(Self {
            vectors: FlatIndex::with_dims(dims)?,
            metadata: MetadataStore::new(),
        })
    }

    /// Join an index and a metadata store that were persisted together.
    ///
    /// Fails with [`IndexError::Misaligned`] if their lengths differ.
    pub fn from_parts(vectors: FlatIndex, metadata: MetadataStore) -> Result<Self, IndexError> {
        if vectors.len() != metadata.len() {
            return Err(IndexError::Misaligned {
                vectors: vectors.len(),
                records: metadata.len(),
            });
        }
        Ok(Self { vectors, metadata })
    }

    /// Append one message: its vector and its metadata share the returned id.
    pub fn add_entry(
        &mut self,
        vector: &[f32],
        text: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<u64, IndexError> {
        let id = self.vectors.add(vector)?;
        let record_id = self.metadata.append(text, source);
        debug_assert_eq!(id, record_id);
        Ok(id)
    }

    /// Nearest `k` entries to `query`, with their text and source.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.vectors
            .search(query, k)?
            .into_iter()
            .map(|n| {
                let record = self.metadata.get(n.id)?;
                Ok(SearchHit {
                    id: n.id,
                    text: record.text.clone(),
                    source: record.source.clone(),
                    distance: n.distance,
                })
            })
            .collect()
    }

    pub fn get(&self, id: u64) -> Result<&MetadataRecord, IndexError> {
        self.metadata.get(id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dims(&self) -> Option<usize> {
        self.vectors.dims()
    }

    pub fn vectors(&self) -> &FlatIndex {
        &self.vectors
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }
}
