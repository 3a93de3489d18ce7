//! Query path: embed the query, rank by squared L2 distance, resolve text.

use anyhow::{bail, Result};

use chatvec_core::models::SearchHit;
use chatvec_core::store::ChatIndex;

use crate::config::Config;
use crate::embedding::{create_provider, embed_query, EmbeddingProvider};
use crate::persist;

/// Nearest `k` messages to `query`, optionally restricted to one source.
///
/// With a source filter every entry is ranked and the filter applied
/// afterwards, so the result is the exact top `k` within that source.
pub async fn search_index(
    index: &ChatIndex,
    provider: &dyn EmbeddingProvider,
    query: &str,
    k: usize,
    source: Option<&str>,
) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() || k == 0 || index.is_empty() {
        return Ok(Vec::new());
    }

    let vector = embed_query(provider, query).await?;
    let Some(source) = source else {
        return Ok(index.search(&vector, k)?);
    };

    let mut hits = index.search(&vector, index.len())?;
    hits.retain(|h| h.source == source);
    hits.truncate(k);
    Ok(hits)
}

pub async fn run_search(
    config: &Config,
    query: &str,
    k: Option<usize>,
    source: Option<String>,
    json: bool,
) -> Result<()> {
    let (index, manifest) = persist::load_index(&config.index.dir)?;
    let provider = create_provider(&config.embedding)?;
    if provider.model_name() != manifest.model {
        bail!(
            "Index was built with model '{}' but the configured model is '{}'",
            manifest.model,
            provider.model_name()
        );
    }

    let k = k.unwrap_or(config.retrieval.top_k);
    let hits = search_index(&index, provider.as_ref(), query, k, source.as_deref()).await?;
    tracing::debug!(query, k, hits = hits.len(), "search complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.4}] {}", i + 1, hit.distance, hit.source);
        println!("    {}", hit.text);
        println!("    id: {}", hit.id);
        println!();
    }
    Ok(())
}
