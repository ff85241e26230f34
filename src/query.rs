//! Retrieval-augmented query pipeline.
//!
//! Embeds the question, searches the persisted index, filters
//! candidates by score threshold, assembles a length-capped context,
//! and asks the generative model for an answer. Every failure mode is
//! a distinct [`QueryError`] variant so callers can tell "no index"
//! from "nothing relevant" from "we found documents but could not
//! generate an answer".

use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::index::{SearchHit, VectorIndex};
use crate::llm::Generator;
use crate::models::QueryResponse;

/// Separator between context passages.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";
/// Appended when the context is cut at `max_context_length`.
const TRUNCATION_MARKER: &str = "...[truncated]";

/// Why a query produced no answer.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Rejected before any index access.
    #[error("query text cannot be empty")]
    EmptyQuery,

    /// No readable index on disk; run ingestion first. Fatal to the
    /// query, not to the process.
    #[error("no index found at {path}; run `askdocs ingest` first")]
    IndexNotFound {
        path: PathBuf,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The search ran but nothing scored at or above the threshold.
    #[error("no documents found at or above similarity threshold {threshold}")]
    NoRelevantResults { threshold: f32 },

    /// Context was retrieved but the generative model failed.
    #[error("answer generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    /// Embedding or other infrastructure failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub k: usize,
    pub threshold: f32,
    pub verbose: bool,
}

impl QueryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            k: config.retrieval.k,
            threshold: config.retrieval.score_threshold,
            verbose: false,
        }
    }
}

/// Run the query pipeline end to end.
///
/// Returns either a complete [`QueryResponse`] or a [`QueryError`],
/// never a partially filled result.
pub async fn run_query(
    config: &Config,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    query_text: &str,
    opts: &QueryOptions,
) -> Result<QueryResponse, QueryError> {
    let start = Instant::now();

    if query_text.trim().is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    if opts.verbose {
        println!("Query: {}", query_text);
        println!(
            "Retrieving top {} documents with threshold {}",
            opts.k, opts.threshold
        );
    }

    let index_dir = &config.paths.index_dir;
    if !VectorIndex::exists(index_dir) {
        return Err(QueryError::IndexNotFound {
            path: index_dir.clone(),
            source: None,
        });
    }

    let index = VectorIndex::load(index_dir).map_err(|e| QueryError::IndexNotFound {
        path: index_dir.clone(),
        source: Some(e),
    })?;

    let query_vector = embedder.embed_one(query_text).await?;
    let hits = index.search(&query_vector, opts.k);
    let filtered = filter_by_threshold(hits, opts.threshold);

    if filtered.is_empty() {
        return Err(QueryError::NoRelevantResults {
            threshold: opts.threshold,
        });
    }

    if opts.verbose {
        println!("Found {} relevant documents", filtered.len());
        for (i, hit) in filtered.iter().enumerate() {
            println!(
                "   {}. Score: {:.3} | Source: {}",
                i + 1,
                hit.score,
                hit.chunk_id
            );
        }
    }

    let context = build_context(&filtered, config.retrieval.max_context_length);
    let prompt = build_prompt(&config.retrieval.prompt_template, &context, query_text);

    if opts.verbose {
        println!("Generating response...");
    }

    let answer = generator
        .generate(&prompt)
        .await
        .map_err(QueryError::Generation)?;

    let sources: Vec<String> = filtered.iter().map(|h| h.chunk_id.clone()).collect();
    let num_sources = sources.len();

    Ok(QueryResponse {
        answer,
        sources,
        num_sources,
        elapsed: start.elapsed(),
        query: query_text.to_string(),
    })
}

/// Keep hits scoring at or above the threshold. The boundary case
/// `score == threshold` is included. Input order (descending score)
/// is preserved.
fn filter_by_threshold(hits: Vec<SearchHit>, threshold: f32) -> Vec<SearchHit> {
    hits.into_iter().filter(|h| h.score >= threshold).collect()
}

/// Join passage texts in descending-score order and cap the total
/// length. Truncation happens after concatenation, never per passage,
/// so higher-scored passages survive preferentially.
fn build_context(hits: &[SearchHit], max_context_length: usize) -> String {
    let context = hits
        .iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    if context.chars().count() <= max_context_length {
        return context;
    }

    let mut truncated: String = context.chars().take(max_context_length).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Substitute context and question into the template verbatim; no
/// escaping of template-special characters is performed.
fn build_prompt(template: &str, context: &str, question: &str) -> String {
    template
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Print a response in the CLI's answer format.
pub fn print_response(response: &QueryResponse, verbose: bool) {
    println!();
    println!("{}", "=".repeat(50));
    println!("Answer:");
    println!("{}", response.answer);
    println!();
    println!("{}", "-".repeat(30));
    println!("Sources ({}):", response.num_sources);
    for (i, source) in response.sources.iter().enumerate() {
        println!("   {}. {}", i + 1, source);
    }

    if verbose {
        println!("Response time: {:.2}s", response.elapsed.as_secs_f64());
        println!("{}", "=".repeat(50));
    }
}
