//! Core data models used throughout askdocs.
//!
//! These types represent the document pages, text chunks, and query
//! responses that flow through the ingestion and retrieval pipelines.

use std::time::Duration;

/// One page (or section) of text produced by a document loader.
///
/// PDF loaders emit one record per page; DOCX and plain-text loaders
/// emit a single record at page 0. Records are immutable once loaded.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub text: String,
    /// Path of the originating file, relative to the data directory.
    pub source_path: String,
    /// Zero-based page number within the file.
    pub page: u32,
}

/// A bounded window of text derived from a [`DocumentRecord`].
///
/// The unit of embedding and retrieval. `chunk_index` and `id` are
/// populated by [`assign_chunk_ids`](crate::chunk::assign_chunk_ids)
/// after splitting; the id format is `source_path:page:chunk_index`.
///
/// Ids are stable only within a single run's processing order: the
/// chunk counter depends on adjacency of same-page chunks, so a loader
/// that enumerates files in a different order can yield different ids
/// for the same content.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub source_path: String,
    pub page: u32,
    pub chunk_index: u32,
    pub id: String,
}

/// A completed answer from the query pipeline.
///
/// Either a fully populated response is returned or the pipeline
/// reports a [`QueryError`](crate::query::QueryError), never a
/// partially filled result.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Generated answer text.
    pub answer: String,
    /// Chunk ids of the context passages, in descending score order.
    pub sources: Vec<String>,
    pub num_sources: usize,
    pub elapsed: Duration,
    /// The original query, verbatim.
    pub query: String,
}
