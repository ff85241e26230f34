//! Data-directory and index health overview.
//!
//! Gives a quick summary of what is on disk: how many source files are
//! waiting in the data directory, whether an index exists, and how big
//! it is. Used by `askdocs status` to confirm that ingestion worked.

use anyhow::Result;

use crate::config::Config;
use crate::index::VectorIndex;
use crate::loader;

pub fn run_status(config: &Config) -> Result<()> {
    println!("askdocs status");
    println!("==============");
    println!();
    println!("  Data directory:  {}", config.paths.data_dir.display());

    if config.paths.data_dir.exists() {
        let files = loader::scan_data_dir(config)?;
        println!("  Source files:    {}", files.len());

        let mut by_ext: Vec<(String, usize)> = Vec::new();
        for file in &files {
            let ext = std::path::Path::new(&file.relative_path)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("?")
                .to_ascii_lowercase();
            match by_ext.iter_mut().find(|(e, _)| *e == ext) {
                Some((_, count)) => *count += 1,
                None => by_ext.push((ext, 1)),
            }
        }
        for (ext, count) in &by_ext {
            println!("    .{:<5} {}", ext, count);
        }
    } else {
        println!("  Source files:    (data directory does not exist)");
    }

    println!();
    println!("  Index directory: {}", config.paths.index_dir.display());

    if VectorIndex::exists(&config.paths.index_dir) {
        match VectorIndex::load(&config.paths.index_dir) {
            Ok(index) => {
                println!("  Index:           ready");
                println!("  Entries:         {}", index.len());
                println!("  Dimensions:      {}", index.dims());
                println!(
                    "  Size on disk:    {}",
                    format_bytes(dir_size(&config.paths.index_dir))
                );
            }
            Err(e) => {
                println!("  Index:           UNREADABLE ({})", e);
            }
        }
    } else {
        println!("  Index:           not built (run `askdocs ingest`)");
    }

    println!();
    Ok(())
}

fn dir_size(dir: &std::path::Path) -> u64 {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

/// Format a byte count as a human-readable string.
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
    use super::*;

    #[test]
    fn format_bytes_scales() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
