//! Append-only metadata records, positionally aligned with [`FlatIndex`].
//!
//! [`FlatIndex`]: crate::index::FlatIndex

use std::collections::BTreeMap;

use crate::error::IndexError;
use crate::models::MetadataRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    records: Vec<MetadataRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; its id is the prior length.
    pub fn append(&mut self, text: impl Into<String>, source: impl Into<String>) -> u64 {
        let id = self.records.len() as u64;
        self.records.push(MetadataRecord {
            id,
            text: text.into(),
            source: source.into(),
        });
        id
    }

    pub fn get(&self, id: u64) -> Result<&MetadataRecord, IndexError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.records.get(i))
            .ok_or(IndexError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    /// Number of records per source, ordered by source name.
    pub fn source_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry(r.source.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Adopt records read from disk. Every record's id must equal its
    /// position.
    pub fn from_records(records: Vec<MetadataRecord>) -> Result<Self, IndexError> {
        if let Some((pos, r)) = records
            .iter()
            .enumerate()
            .find(|(pos, r)| r.id != *pos as u64)
        {
            return Err(IndexError::Corrupt(format!(
                "metadata record at position {} has id {}",
                pos, r.id
            )));
        }
        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_assigns_positions() {
        let mut store = MetadataStore::new();
        assert_eq!(store.append("hi", "a.txt"), 0);
        assert_eq!(store.append("there", "b.txt"), 1);
        let r = store.get(1).unwrap();
        assert_eq!(r.id, 1);
        assert_eq!(r.text, "there");
        assert_eq!(r.source, "b.txt");
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let store = MetadataStore::new();
        assert!(matches!(store.get(0), Err(IndexError::NotFound(0))));
    }

    #[test]
    fn from_records_rejects_gaps() {
        let records = vec![
            MetadataRecord {
                id: 0,
                text: "a".into(),
                source: "s".into(),
            },
            MetadataRecord {
                id: 2,
                text: "b".into(),
                source: "s".into(),
            },
        ];
        assert!(matches!(
            MetadataStore::from_records(records),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn source_counts_group_by_source() {
        let mut store = MetadataStore::new();
        store.append("1", "b.txt");
        store.append("2", "a.txt");
        store.append("3", "b.txt");
        let counts: Vec<(&str, usize)> = store.source_counts().into_iter().collect();
        assert_eq!(counts, vec![("a.txt", 1), ("b.txt", 2)]);
    }
}
