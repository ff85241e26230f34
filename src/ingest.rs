//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow: scan data directory → load each file →
//! split into chunks → assign chunk ids → embed → insert-or-merge into
//! the vector index → save. Two modes:
//!
//! - **batched** (default): documents are processed one at a time and
//!   pending chunks are flushed whenever the batch size is reached or
//!   resident memory crosses the configured limit, keeping peak memory
//!   bounded on large corpora;
//! - **single-pass**: everything is loaded, embedded, and inserted in
//!   one go.
//!
//! In both modes the index is saved to disk exactly once, after all
//! flushes, at the end of a successful run. If the run is interrupted,
//! the on-disk index still reflects the previous save. A file that
//! fails to load is logged and skipped; it never aborts the run.

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::chunk::{assign_chunk_ids, split_records};
use crate::config::Config;
use crate::embedding::Embedder;
use crate::index::{IndexEntry, VectorIndex};
use crate::loader;
use crate::models::Chunk;
use crate::policy::IndexMode;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Pending chunks that trigger a flush.
    pub batch_size: usize,
    /// Resident memory (MB) that triggers a flush; 0 disables the check.
    pub memory_limit_mb: u64,
    /// Load, embed, and insert everything in one pass.
    pub single_pass: bool,
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.ingest.batch_size,
            memory_limit_mb: config.ingest.memory_limit_mb,
            single_pass: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub chunks_indexed: usize,
    pub flushes: usize,
    pub index_path: PathBuf,
}

/// Run the ingestion pipeline. `mode` must already be resolved; in
/// [`IndexMode::Reset`] the existing index is cleared before any
/// document is read.
pub async fn run_ingest(
    config: &Config,
    embedder: &dyn Embedder,
    mode: IndexMode,
    opts: &IngestOptions,
) -> Result<IngestSummary> {
    if opts.batch_size == 0 {
        bail!("batch size must be >= 1");
    }

    let index_dir = config.paths.index_dir.clone();
    let mut summary = IngestSummary {
        index_path: index_dir.clone(),
        ..IngestSummary::default()
    };

    if mode == IndexMode::Reset {
        println!("Clearing index at {}", index_dir.display());
        VectorIndex::clear(&index_dir)?;
    }

    let files = loader::scan_data_dir(config)?;
    if files.is_empty() {
        println!(
            "No PDF, DOCX, TXT, or MD files found in {}",
            config.paths.data_dir.display()
        );
        return Ok(summary);
    }

    // A load failure downgrades to "create new index".
    let mut index: Option<VectorIndex> = if VectorIndex::exists(&index_dir) {
        match VectorIndex::load(&index_dir) {
            Ok(existing) => {
                println!(
                    "Loaded existing index ({} entries); new chunks will be merged in",
                    existing.len()
                );
                Some(existing)
            }
            Err(e) => {
                eprintln!("Warning: failed to load existing index: {}", e);
                eprintln!("A new index will be created.");
                None
            }
        }
    } else {
        None
    };

    let total_files = files.len();
    let mut pending: Vec<Chunk> = Vec::new();

    for (i, file) in files.iter().enumerate() {
        println!(
            "Processing [{}/{}]: {}",
            i + 1,
            total_files,
            file.relative_path
        );

        let records = match loader::load_file(file) {
            Ok(records) => records,
            Err(e) => {
                eprintln!("Warning: skipping {}: {}", file.relative_path, e);
                summary.files_skipped += 1;
                continue;
            }
        };
        summary.files_loaded += 1;

        let chunks = split_records(
            &records,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        );

        if opts.single_pass {
            // Ids are assigned over the whole run at the end.
            pending.extend(chunks);
            continue;
        }

        pending.extend(assign_chunk_ids(chunks));

        if pending.len() >= opts.batch_size || memory_limit_exceeded(opts.memory_limit_mb) {
            let batch = std::mem::take(&mut pending);
            summary.chunks_indexed += flush(embedder, &mut index, batch).await?;
            summary.flushes += 1;
            println!("  {} chunks indexed so far...", summary.chunks_indexed);
        }
    }

    if opts.single_pass {
        pending = assign_chunk_ids(pending);
    }

    if !pending.is_empty() {
        let batch = std::mem::take(&mut pending);
        summary.chunks_indexed += flush(embedder, &mut index, batch).await?;
        summary.flushes += 1;
    }

    if summary.chunks_indexed == 0 {
        println!("No chunks to add; index left untouched.");
        return Ok(summary);
    }

    // Single explicit save at the end of a successful run.
    match &index {
        Some(built) => built.save(&index_dir)?,
        None => bail!("no index was built despite {} chunks", summary.chunks_indexed),
    }

    println!("ingest");
    println!("  files loaded: {}", summary.files_loaded);
    println!("  files skipped: {}", summary.files_skipped);
    println!("  chunks indexed: {}", summary.chunks_indexed);
    println!("  flushes: {}", summary.flushes);
    println!("  index saved: {}", index_dir.display());
    println!("ok");

    Ok(summary)
}

/// Embed one batch and insert it: a fresh index is built from the
/// batch and merged into the existing one (union, no dedup), or
/// adopted outright when no index exists yet. A flush, once started,
/// runs to completion.
async fn flush(
    embedder: &dyn Embedder,
    index: &mut Option<VectorIndex>,
    chunks: Vec<Chunk>,
) -> Result<usize> {
    if chunks.is_empty() {
        return Ok(0);
    }

    let count = chunks.len();
    println!("  embedding {} chunks...", count);

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != chunks.len() {
        bail!(
            "embedder returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        );
    }

    let entries: Vec<IndexEntry> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| IndexEntry {
            id: chunk.id,
            vector,
            text: chunk.text,
            source_path: chunk.source_path,
            page: chunk.page,
        })
        .collect();

    let batch_index = VectorIndex::from_entries(entries)?;

    match index {
        Some(existing) => existing.merge(batch_index)?,
        None => *index = Some(batch_index),
    }

    Ok(count)
}

/// Whether resident memory exceeds the limit. 0 disables the check;
/// if the platform cannot report memory usage the check is skipped.
fn memory_limit_exceeded(limit_mb: u64) -> bool {
    if limit_mb == 0 {
        return false;
    }

    match memory_stats::memory_stats() {
        Some(usage) => {
            let used_mb = usage.physical_mem as u64 / (1024 * 1024);
            if used_mb > limit_mb {
                eprintln!(
                    "Warning: memory usage ({} MB) exceeds limit ({} MB); flushing early",
                    used_mb, limit_mb
                );
                true
            } else {
                false
            }
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::IndexMode;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Deterministic embedder: vector derived from byte content, no network.
    struct StubEmbedder {
        calls: AtomicUsize,
    }

    impl StubEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let sum: u32 = t.bytes().map(u32::from).sum();
                    vec![(sum % 97) as f32 + 1.0, t.len() as f32, 1.0]
                })
                .collect())
        }
    }

    fn test_config(tmp: &TempDir) -> Config {
        let mut config = Config::default();
        config.paths.data_dir = tmp.path().join("data");
        config.paths.index_dir = tmp.path().join("index");
        config.chunking.chunk_size = 50;
        config.chunking.chunk_overlap = 5;
        std::fs::create_dir_all(&config.paths.data_dir).unwrap();
        config
    }

    fn opts(batch_size: usize) -> IngestOptions {
        IngestOptions {
            batch_size,
            memory_limit_mb: 0,
            single_pass: false,
        }
    }

    #[tokio::test]
    async fn ingest_builds_and_saves_index() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::write(config.paths.data_dir.join("a.txt"), "alpha beta gamma").unwrap();
        std::fs::write(config.paths.data_dir.join("b.txt"), "delta epsilon zeta").unwrap();

        let embedder = StubEmbedder::new();
        let summary = run_ingest(&config, &embedder, IndexMode::Update, &opts(1000))
            .await
            .unwrap();

        assert_eq!(summary.files_loaded, 2);
        assert_eq!(summary.files_skipped, 0);
        assert!(summary.chunks_indexed >= 2);
        assert!(VectorIndex::exists(&config.paths.index_dir));

        let index = VectorIndex::load(&config.paths.index_dir).unwrap();
        assert_eq!(index.len(), summary.chunks_indexed);
    }

    #[tokio::test]
    async fn small_batch_size_causes_multiple_flushes() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(config.paths.data_dir.join(name), "some document text here").unwrap();
        }

        let embedder = StubEmbedder::new();
        let summary = run_ingest(&config, &embedder, IndexMode::Update, &opts(1))
            .await
            .unwrap();

        assert!(summary.flushes >= 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), summary.flushes);
    }

    #[tokio::test]
    async fn update_mode_appends_duplicates_without_dedup() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::write(config.paths.data_dir.join("a.txt"), "alpha beta gamma").unwrap();

        let embedder = StubEmbedder::new();
        let first = run_ingest(&config, &embedder, IndexMode::Update, &opts(1000))
            .await
            .unwrap();
        let second = run_ingest(&config, &embedder, IndexMode::Update, &opts(1000))
            .await
            .unwrap();

        let index = VectorIndex::load(&config.paths.index_dir).unwrap();
        assert_eq!(index.len(), first.chunks_indexed + second.chunks_indexed);

        // Same ids exist twice: merge is a union with no dedup.
        let hits = index.search(&[1.0, 1.0, 1.0], 100);
        let dup_count = hits.iter().filter(|h| h.chunk_id == "a.txt:0:0").count();
        assert_eq!(dup_count, 2);
    }

    #[tokio::test]
    async fn reset_mode_rebuilds_from_scratch() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::write(config.paths.data_dir.join("a.txt"), "alpha beta gamma").unwrap();

        let embedder = StubEmbedder::new();
        let first = run_ingest(&config, &embedder, IndexMode::Update, &opts(1000))
            .await
            .unwrap();
        let second = run_ingest(&config, &embedder, IndexMode::Reset, &opts(1000))
            .await
            .unwrap();

        assert_eq!(first.chunks_indexed, second.chunks_indexed);
        let index = VectorIndex::load(&config.paths.index_dir).unwrap();
        assert_eq!(index.len(), second.chunks_indexed);
    }

    #[tokio::test]
    async fn single_pass_matches_batched_ids() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::write(
            config.paths.data_dir.join("a.txt"),
            "a longer text that will produce several chunks when split small",
        )
        .unwrap();

        let embedder = StubEmbedder::new();
        let single = IngestOptions {
            batch_size: 1000,
            memory_limit_mb: 0,
            single_pass: true,
        };
        run_ingest(&config, &embedder, IndexMode::Update, &single)
            .await
            .unwrap();
        let from_single = VectorIndex::load(&config.paths.index_dir).unwrap();

        VectorIndex::clear(&config.paths.index_dir).unwrap();
        run_ingest(&config, &embedder, IndexMode::Update, &opts(1000))
            .await
            .unwrap();
        let from_batched = VectorIndex::load(&config.paths.index_dir).unwrap();

        let mut ids_single: Vec<String> = from_single
            .search(&[1.0, 1.0, 1.0], 100)
            .into_iter()
            .map(|h| h.chunk_id)
            .collect();
        let mut ids_batched: Vec<String> = from_batched
            .search(&[1.0, 1.0, 1.0], 100)
            .into_iter()
            .map(|h| h.chunk_id)
            .collect();
        ids_single.sort();
        ids_batched.sort();
        assert_eq!(ids_single, ids_batched);
    }

    #[tokio::test]
    async fn corrupt_index_downgrades_to_fresh_build() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::write(config.paths.data_dir.join("a.txt"), "alpha beta gamma").unwrap();

        std::fs::create_dir_all(&config.paths.index_dir).unwrap();
        std::fs::write(config.paths.index_dir.join("index.json"), "not json").unwrap();

        let embedder = StubEmbedder::new();
        let summary = run_ingest(&config, &embedder, IndexMode::Update, &opts(1000))
            .await
            .unwrap();

        assert!(summary.chunks_indexed > 0);
        let index = VectorIndex::load(&config.paths.index_dir).unwrap();
        assert_eq!(index.len(), summary.chunks_indexed);
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::write(config.paths.data_dir.join("good.txt"), "alpha beta gamma").unwrap();
        // A .pdf that is not a PDF fails extraction.
        std::fs::write(config.paths.data_dir.join("broken.pdf"), "not a pdf").unwrap();

        let embedder = StubEmbedder::new();
        let summary = run_ingest(&config, &embedder, IndexMode::Update, &opts(1000))
            .await
            .unwrap();

        assert_eq!(summary.files_loaded, 1);
        assert_eq!(summary.files_skipped, 1);
        assert!(summary.chunks_indexed > 0);
    }

    #[tokio::test]
    async fn empty_data_dir_leaves_no_index() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);

        let embedder = StubEmbedder::new();
        let summary = run_ingest(&config, &embedder, IndexMode::Update, &opts(1000))
            .await
            .unwrap();

        assert_eq!(summary.chunks_indexed, 0);
        assert!(!VectorIndex::exists(&config.paths.index_dir));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }
}
