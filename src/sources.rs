use anyhow::Result;

use crate::config::Config;
use crate::connector_fs::{discover_sources, read_source};

/// List discovered sources with their readability and line counts.
pub fn list_sources(config: &Config) -> Result<()> {
    let sources = discover_sources(config)?;

    println!("{:<48} {:<12} {:>8}", "SOURCE", "STATUS", "LINES");
    for source in &sources {
        match read_source(&source.path) {
            Ok(body) => println!(
                "{:<48} {:<12} {:>8}",
                source.source_id,
                "OK",
                body.lines().count()
            ),
            Err(e) => {
                tracing::debug!(source = %source.source_id, error = %e, "unreadable source");
                println!("{:<48} {:<12} {:>8}", source.source_id, "UNREADABLE", "-");
            }
        }
    }
    if sources.is_empty() {
        println!("(no sources matched)");
    }
    Ok(())
}
