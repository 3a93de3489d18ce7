//! `chatvec classify <file>`: show how each line of an export is read.
//!
//! Useful when tuning `[classifier]` keywords and timestamp bounds.

use anyhow::Result;
use std::path::Path;

use chatvec_core::assemble::MessageAssembler;
use chatvec_core::models::{LineClass, RawLine};

use crate::config::Config;
use crate::connector_fs::read_source;

pub fn run_classify(config: &Config, path: &Path) -> Result<()> {
    let body = read_source(path)?;
    let classifier = config.classifier.build();
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let mut assembler = MessageAssembler::new(source.as_str());
    let mut messages = Vec::new();

    let bounds = classifier.timestamps().bounds();
    println!("--- Classifier ---");
    println!("system keywords: {}", classifier.keywords().join(", "));
    println!(
        "timestamp lines: {}-{} chars, at most {} digits, years {}-{}",
        bounds.min_len, bounds.max_len, bounds.max_digits, bounds.min_year, bounds.max_year
    );
    println!();

    println!("--- Lines ---");
    for raw in RawLine::from_body(&source, &body) {
        let class = classifier.classify(&raw.text);
        println!("{:>5}  {:<10} {}", raw.line, label(class.as_ref()), raw.text);
        if let Some(class) = class {
            messages.extend(assembler.push(class, raw.line));
        }
    }
    if let Some(dropped) = assembler.finish() {
        println!("(trailing timestamp dropped: {})", dropped);
    }

    println!();
    println!("--- Messages ({}) ---", messages.len());
    for msg in &messages {
        println!("{:>5}  {}", msg.line, msg.text);
    }
    Ok(())
}

fn label(class: Option<&LineClass>) -> &'static str {
    match class {
        Some(LineClass::SystemMessage) => "system",
        Some(LineClass::Timestamp(_)) => "timestamp",
        Some(LineClass::Content(_)) => "content",
        None => "-",
    }
}
