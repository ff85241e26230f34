//! Source document enumeration.
//!
//! Scans the configured data directory for supported document types
//! and hands each file to [`extract`](crate::extract). Files are
//! sorted by relative path so a given directory tree always loads in
//! the same order within a run; chunk id stability across runs is only
//! as strong as this ordering.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::Config;
use crate::extract::{self, ExtractError};
use crate::models::DocumentRecord;

/// A discovered source file, ready to be loaded.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the data directory; used as the chunk id prefix.
    pub relative_path: String,
}

const INCLUDE_GLOBS: &[&str] = &["**/*.pdf", "**/*.docx", "**/*.txt", "**/*.md"];

/// Scan the data directory for ingestible files, sorted by relative path.
///
/// Legacy `.doc` files are reported with a warning and skipped; no
/// parser for that format is available.
pub fn scan_data_dir(config: &Config) -> Result<Vec<SourceFile>> {
    let root = &config.paths.data_dir;
    if !root.exists() {
        bail!("Data directory does not exist: {}", root.display());
    }

    let include_set = build_globset(INCLUDE_GLOBS)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("doc"))
        {
            eprintln!(
                "Warning: skipping {} (legacy .doc is not supported; convert to .docx)",
                rel_str
            );
            continue;
        }

        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(SourceFile {
            path: path.to_path_buf(),
            relative_path: rel_str,
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(files)
}

/// Load one file into page records.
pub fn load_file(file: &SourceFile) -> Result<Vec<DocumentRecord>, ExtractError> {
    extract::extract_records(&file.path, &file.relative_path)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
