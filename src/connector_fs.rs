//! Chat export discovery.
//!
//! Walks `[input].root` with include/exclude globs and returns the
//! matching files sorted by relative path, so that a rebuild over the
//! same tree assigns the same ids. A `root` that is a file is the only
//! source.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, InputConfig};

/// One discovered chat export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute or root-joined path used for reading.
    pub path: PathBuf,
    /// Identifier stored in metadata: path relative to the input root.
    pub source_id: String,
}

pub fn discover_sources(config: &Config) -> Result<Vec<SourceFile>> {
    let input = config
        .input
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No [input] section configured"))?;
    scan(input)
}

fn scan(input: &InputConfig) -> Result<Vec<SourceFile>> {
    let root = &input.root;
    if !root.exists() {
        bail!("Input root does not exist: {}", root.display());
    }

    if root.is_file() {
        let source_id = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());
        return Ok(vec![SourceFile {
            path: root.clone(),
            source_id,
        }]);
    }

    let include_set = build_globset(&input.include_globs)?;
    let mut excludes = vec!["**/.git/**".to_string()];
    excludes.extend(input.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut sources = Vec::new();
    for entry in WalkDir::new(root).follow_links(input.follow_symlinks) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        sources.push(SourceFile {
            path: path.to_path_buf(),
            source_id: rel_str,
        });
    }

    sources.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    Ok(sources)
}

/// Read a source as UTF-8 text.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
