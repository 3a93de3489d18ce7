//! Build pipeline: sources → lines → messages → vectors → index.
//!
//! ```text
//! discover_sources ─▶ read_source ─▶ assemble_source ─▶ embed (batched) ─▶ ChatIndex::add_entry
//! ```
//!
//! Failures are contained at the smallest unit that can be skipped:
//!
//! - an unreadable or non-UTF-8 source is logged and contributes no lines;
//! - a failed or timed-out batch is retried one message at a time, and a
//!   message that still fails is logged with its source and line, then
//!   skipped;
//! - a vector of the wrong dimension is rejected by the index and the
//!   build continues.
//!
//! Sources are processed in discovery order and messages in line order,
//! so ids follow the order messages appear in the corpus.

use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;

use chatvec_core::assemble::assemble_source;
use chatvec_core::classify::LineClassifier;
use chatvec_core::models::{NormalizedMessage, RawLine};
use chatvec_core::store::ChatIndex;
use chatvec_core::IndexError;

use crate::config::Config;
use crate::connector_fs::{self, SourceFile};
use crate::embedding::{create_provider, retry_budget, EmbeddingProvider};
use crate::persist;
use crate::progress::{BuildProgressEvent, BuildProgressReporter};

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Continue the existing index instead of starting fresh.
    pub append: bool,
    /// Classify and assemble only; nothing is embedded or written.
    pub dry_run: bool,
    /// Stop after this many entries have been committed.
    pub limit: Option<usize>,
}

/// Counters for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub sources_scanned: usize,
    pub sources_unreadable: usize,
    pub lines_read: usize,
    pub messages_assembled: usize,
    pub entries_committed: usize,
    pub entries_failed: usize,
}

/// Embeds assembled messages and commits them to a [`ChatIndex`].
pub struct CorpusLoader<'a> {
    classifier: LineClassifier,
    provider: &'a dyn EmbeddingProvider,
    reporter: &'a dyn BuildProgressReporter,
    batch_size: usize,
    /// Per-call deadline; covers the provider's own retries.
    deadline: Duration,
    limit: Option<usize>,
}

impl<'a> CorpusLoader<'a> {
    pub fn new(
        config: &Config,
        provider: &'a dyn EmbeddingProvider,
        reporter: &'a dyn BuildProgressReporter,
    ) -> Self {
        Self {
            classifier: config.classifier.build(),
            provider,
            reporter,
            batch_size: config.embedding.batch_size.max(1),
            deadline: retry_budget(&config.embedding),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Load every source into `index`, in order.
    pub async fn load_sources(
        &self,
        index: &mut ChatIndex,
        sources: &[SourceFile],
        report: &mut BuildReport,
    ) -> Result<()> {
        for source in sources {
            if self.limit_reached(report) {
                tracing::info!(limit = ?self.limit, "entry limit reached");
                break;
            }
            self.reporter.report(BuildProgressEvent::Scanning {
                source: source.source_id.clone(),
            });
            report.sources_scanned += 1;
            let Some(body) = read_or_skip(source, report) else {
                continue;
            };
            self.load_text(index, &source.source_id, &body, report)
                .await?;
        }
        Ok(())
    }

    /// Classify, assemble, embed, and commit the text of one source.
    pub async fn load_text(
        &self,
        index: &mut ChatIndex,
        source_id: &str,
        body: &str,
        report: &mut BuildReport,
    ) -> Result<()> {
        let lines = RawLine::from_body(source_id, body);
        report.lines_read += lines.len();
        let mut messages: Vec<NormalizedMessage> =
            assemble_source(&self.classifier, source_id, lines).collect();
        report.messages_assembled += messages.len();

        if let Some(limit) = self.limit {
            messages.truncate(limit.saturating_sub(report.entries_committed));
        }

        let total = messages.len() as u64;
        let mut done = 0u64;
        for batch in messages.chunks(self.batch_size) {
            let vectors = self.embed_batch(batch).await;
            for (message, vector) in batch.iter().zip(vectors) {
                match vector {
                    Some(vector) => self.commit(index, message, &vector, report)?,
                    None => report.entries_failed += 1,
                }
            }
            done += batch.len() as u64;
            self.reporter.report(BuildProgressEvent::Embedding {
                source: source_id.to_string(),
                n: done,
                total,
            });
        }
        Ok(())
    }

    /// One vector (or `None` for a skipped message) per input, in order.
    async fn embed_batch(&self, batch: &[NormalizedMessage]) -> Vec<Option<Vec<f32>>> {
        let texts: Vec<String> = batch.iter().map(|m| m.text.clone()).collect();
        match self.embed_with_timeout(&texts).await {
            Ok(vectors) => return vectors.into_iter().map(Some).collect(),
            Err(e) if batch.len() > 1 => {
                tracing::warn!(
                    source = %batch[0].source,
                    size = batch.len(),
                    error = %e,
                    "batch embedding failed, retrying messages individually"
                );
            }
            Err(_) => {}
        }

        let mut out = Vec::with_capacity(batch.len());
        for message in batch {
            match self
                .embed_with_timeout(std::slice::from_ref(&message.text))
                .await
            {
                Ok(mut vectors) => out.push(vectors.pop()),
                Err(e) => {
                    tracing::warn!(
                        source = %message.source,
                        line = message.line,
                        error = %e,
                        "skipping message that could not be embedded"
                    );
                    out.push(None);
                }
            }
        }
        out
    }

    async fn embed_with_timeout(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = match tokio::time::timeout(self.deadline, self.provider.embed_texts(texts))
            .await
        {
            Ok(result) => result?,
            Err(_) => bail!("embedding timed out after {:?}", self.deadline),
        };
        if vectors.len() != texts.len() {
            bail!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
        }
        Ok(vectors)
    }

    fn commit(
        &self,
        index: &mut ChatIndex,
        message: &NormalizedMessage,
        vector: &[f32],
        report: &mut BuildReport,
    ) -> Result<()> {
        match index.add_entry(vector, message.text.as_str(), message.source.as_str()) {
            Ok(_) => {
                report.entries_committed += 1;
                Ok(())
            }
            Err(e @ (IndexError::DimensionMismatch { .. } | IndexError::EmptyVector)) => {
                tracing::warn!(
                    source = %message.source,
                    line = message.line,
                    error = %e,
                    "rejected vector"
                );
                report.entries_failed += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn limit_reached(&self, report: &BuildReport) -> bool {
        self.limit
            .is_some_and(|limit| report.entries_committed >= limit)
    }
}

fn read_or_skip(source: &SourceFile, report: &mut BuildReport) -> Option<String> {
    match connector_fs::read_source(&source.path) {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::warn!(source = %source.source_id, error = %e, "skipping unreadable source");
            report.sources_unreadable += 1;
            None
        }
    }
}

/// Classify and assemble every source without embedding.
pub fn dry_run(config: &Config, sources: &[SourceFile]) -> BuildReport {
    let classifier = config.classifier.build();
    let mut report = BuildReport::default();
    for source in sources {
        report.sources_scanned += 1;
        let Some(body) = read_or_skip(source, &mut report) else {
            continue;
        };
        let lines = RawLine::from_body(&source.source_id, &body);
        report.lines_read += lines.len();
        report.messages_assembled += assemble_source(&classifier, &source.source_id, lines).count();
    }
    report
}

/// `chatvec build`: discover, embed, and persist.
pub async fn run_build(
    config: &Config,
    options: BuildOptions,
    reporter: &dyn BuildProgressReporter,
) -> Result<()> {
    let sources = connector_fs::discover_sources(config)?;
    tracing::info!(sources = sources.len(), "discovered sources");

    if options.dry_run {
        let report = dry_run(config, &sources);
        println!("build (dry-run)");
        print_report(&report);
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled; set [embedding].provider to build an index");
    }
    let provider = create_provider(&config.embedding)?;
    let dir = &config.index.dir;

    let mut index = if options.append && persist::index_exists(dir) {
        let (index, manifest) = persist::load_index(dir)?;
        if manifest.model != provider.model_name() {
            bail!(
                "Existing index was built with model '{}' but the configured model is '{}'; rebuild without --append",
                manifest.model,
                provider.model_name()
            );
        }
        if manifest.dims != provider.dims() {
            bail!(
                "Existing index has dimension {} but the provider produces {}",
                manifest.dims,
                provider.dims()
            );
        }
        tracing::info!(existing = index.len(), "appending to existing index");
        index
    } else {
        ChatIndex::with_dims(provider.dims())?
    };
    let starting_len = index.len();

    let loader = CorpusLoader::new(config, provider.as_ref(), reporter).with_limit(options.limit);
    let mut report = BuildReport::default();
    loader.load_sources(&mut index, &sources, &mut report).await?;

    let manifest = persist::save_index(dir, &index, provider.model_name(), provider.dims())?;

    println!("build");
    print_report(&report);
    if options.append {
        println!("  previous entries: {}", starting_len);
    }
    println!("  total entries: {}", manifest.count);
    println!("  model: {} ({} dims)", manifest.model, manifest.dims);
    println!("  index: {}", dir.display());
    println!("ok");
    Ok(())
}

fn print_report(report: &BuildReport) {
    println!("  sources scanned: {}", report.sources_scanned);
    if report.sources_unreadable > 0 {
        println!("  sources unreadable: {}", report.sources_unreadable);
    }
    println!("  lines read: {}", report.lines_read);
    println!("  messages assembled: {}", report.messages_assembled);
    println!("  entries committed: {}", report.entries_committed);
    if report.entries_failed > 0 {
        println!("  entries failed: {}", report.entries_failed);
    }
}
