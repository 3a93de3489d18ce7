//! Entry retrieval by id.

use anyhow::{Context, Result};
use serde::Serialize;

use chatvec_core::store::ChatIndex;
use chatvec_core::vector::l2_norm;

use crate::config::Config;
use crate::persist;

/// One stored entry: its metadata plus a summary of its vector.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntryResponse {
    pub id: u64,
    pub text: String,
    pub source: String,
    pub dims: usize,
    pub norm: f32,
}

pub fn get_entry(index: &ChatIndex, id: u64) -> Result<EntryResponse> {
    let record = index
        .get(id)
        .with_context(|| format!("entry {} not in index of {} entries", id, index.len()))?;
    let vector = index
        .vectors()
        .vector(id)
        .ok_or_else(|| anyhow::anyhow!("entry {} has metadata but no vector", id))?;

    Ok(EntryResponse {
        id: record.id,
        text: record.text.clone(),
        source: record.source.clone(),
        dims: vector.len(),
        norm: l2_norm(vector),
    })
}

pub fn run_get(config: &Config, id: u64, json: bool) -> Result<()> {
    let (index, _) = persist::load_index(&config.index.dir)?;
    let entry = get_entry(&index, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    println!("id:      {}", entry.id);
    println!("source:  {}", entry.source);
    println!("dims:    {}", entry.dims);
    println!("norm:    {:.4}", entry.norm);
    println!();
    println!("{}", entry.text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_record_and_vector_summary() {
        let mut index = ChatIndex::new();
        index.add_entry(&[3.0, 4.0], "Mon 10:01 - hi", "a.txt").unwrap();
        let entry = get_entry(&index, 0).unwrap();
        assert_eq!(entry.text, "Mon 10:01 - hi");
        assert_eq!(entry.dims, 2);
        assert!((entry.norm - 5.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_id_is_an_error() {
        let index = ChatIndex::new();
        let err = get_entry(&index, 7).unwrap_err();
        assert!(err.to_string().contains("entry 7"));
    }
}
