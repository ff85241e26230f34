//! On-disk vector index.
//!
//! A brute-force cosine-similarity index persisted as a directory
//! containing a single serialized JSON artifact. The presence of that
//! artifact is the sole "database ready" signal. Entries are immutable
//! once inserted; there is no per-entry delete or update, and merge is
//! a plain union: re-inserting an id that already exists produces a
//! duplicate retrievable entry by design.
//!
//! Saving writes to a temporary file and renames it into place, so a
//! single save is effectively all-or-nothing. There is no cross-save
//! versioning: a merge only becomes durable on the next explicit save.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the persisted index artifact inside the index directory.
const INDEX_FILE: &str = "index.json";

/// One embedded chunk stored in the index. Never mutated after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub source_path: String,
    pub page: u32,
}

/// A ranked hit from [`VectorIndex::search`]. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk_id: String,
    pub text: String,
    pub score: f32,
}

/// The persisted similarity-search structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from entries, deriving dimensionality from the
    /// first entry. All entries must share one dimensionality.
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self> {
        let dims = entries.first().map(|e| e.vector.len()).unwrap_or(0);
        for entry in &entries {
            if entry.vector.len() != dims {
                bail!(
                    "inconsistent embedding dimensionality: entry {} has {} dims, expected {}",
                    entry.id,
                    entry.vector.len(),
                    dims
                );
            }
        }
        Ok(Self { dims, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Union-merge another index into this one. No deduplication by id.
    pub fn merge(&mut self, other: VectorIndex) -> Result<()> {
        if self.entries.is_empty() {
            self.dims = other.dims;
        } else if !other.entries.is_empty() && other.dims != self.dims {
            bail!(
                "cannot merge indexes with different dimensionality ({} vs {})",
                self.dims,
                other.dims
            );
        }
        self.entries.extend(other.entries);
        Ok(())
    }

    /// Top-`k` nearest entries by cosine similarity, descending.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                chunk_id: entry.id.clone(),
                text: entry.text.clone(),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        hits
    }

    /// Whether a recognizable index artifact exists at `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read index file: {}", path.display()))?;
        let index: VectorIndex = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse index file: {}", path.display()))?;
        Ok(index)
    }

    /// Persist to `dir`, creating it if needed. Write-then-rename keeps
    /// a crashed save from clobbering the previous artifact.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;

        let path = dir.join(INDEX_FILE);
        let tmp_path = dir.join(format!("{}.tmp", INDEX_FILE));
        let content = serde_json::to_string(self)?;
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write index file: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to finalize index file: {}", path.display()))?;
        Ok(())
    }

    /// Delete the index directory if present.
    pub fn clear(dir: &Path) -> Result<()> {
        if dir.exists() {
            std::fs::remove_dir_all(dir)
                .with_context(|| format!("Failed to remove index directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` for empty vectors or
/// mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
