//! Index summary for `chatvec stats`.

use anyhow::Result;

use crate::config::Config;
use crate::persist::{self, METADATA_FILE, VECTORS_FILE};

pub fn run_stats(config: &Config) -> Result<()> {
    let dir = &config.index.dir;
    let (index, manifest) = persist::load_index(dir)?;

    let size: u64 = [VECTORS_FILE, METADATA_FILE]
        .iter()
        .filter_map(|name| std::fs::metadata(dir.join(name)).ok())
        .map(|m| m.len())
        .sum();

    println!("chatvec index stats");
    println!("===================");
    println!();
    println!("  Index:     {}", dir.display());
    println!("  Size:      {}", format_bytes(size));
    println!("  Built:     {}", manifest.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!();
    println!("  Entries:   {}", index.len());
    println!("  Model:     {}", manifest.model);
    println!("  Dims:      {}", manifest.dims);

    let by_source = index.metadata().source_counts();
    if !by_source.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<48} {:>8}", "SOURCE", "ENTRIES");
        println!("  {}", "-".repeat(57));
        for (source, count) in &by_source {
            println!("  {:<48} {:>8}", source, count);
        }
    }
    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::format_bytes;

    #[test]
    fn bytes_are_humanised() {
        assert_eq!(format_bytes(12), "12 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
