//! # askdocs CLI
//!
//! Commands for building the local vector index and asking questions
//! against it.
//!
//! ## Usage
//!
//! ```bash
//! askdocs --config ./config/askdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askdocs ingest` | Load documents, chunk, embed, and save the index |
//! | `askdocs query "<text>"` | Answer a question from the indexed documents |
//! | `askdocs clear` | Delete the on-disk index |
//! | `askdocs status` | Show data-directory and index health |
//!
//! ## Exit codes for `query`
//!
//! | Code | Condition |
//! |------|-----------|
//! | 0 | answer produced |
//! | 2 | configuration error / empty query |
//! | 3 | no index on disk |
//! | 4 | no documents above the score threshold |
//! | 5 | answer generation failed |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use askdocs::config;
use askdocs::embedding::OllamaEmbedder;
use askdocs::index::VectorIndex;
use askdocs::ingest::{self, IngestOptions};
use askdocs::llm::OllamaGenerator;
use askdocs::policy::{self, StdinModePrompt};
use askdocs::query::{self, QueryError, QueryOptions};
use askdocs::status;

/// askdocs: ask questions of your own documents, fully offline.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file; built-in defaults are used when the file does
/// not exist.
#[derive(Parser)]
#[command(
    name = "askdocs",
    about = "A local-first retrieval-augmented question answering tool for your own documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askdocs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load documents from the data directory and build or extend the index.
    ///
    /// With neither `--reset` nor `--no-reset`, an interactive prompt
    /// asks whether to rebuild or extend. Documents are processed one
    /// at a time and flushed in batches so memory stays bounded; the
    /// index is saved once at the end of a successful run.
    Ingest {
        /// Clear the existing index before adding documents.
        #[arg(long)]
        reset: bool,

        /// Extend the existing index without clearing it.
        #[arg(long)]
        no_reset: bool,

        /// Pending chunks that trigger a flush (embed + merge).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Memory limit in MB that also triggers a flush; 0 disables the check.
        #[arg(long)]
        memory_limit: Option<u64>,

        /// Load, embed, and insert everything in one pass instead of batching.
        #[arg(long)]
        single_pass: bool,
    },

    /// Ask a question against the indexed documents.
    Query {
        /// The question text.
        query: String,

        /// Number of nearest neighbours to retrieve.
        #[arg(short, long)]
        k: Option<usize>,

        /// Minimum similarity score threshold in [0, 1].
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Show scores, sources, and timing.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Delete the on-disk index.
    Clear,

    /// Show data-directory and index health.
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match config::load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    };

    match cli.command {
        Commands::Ingest {
            reset,
            no_reset,
            batch_size,
            memory_limit,
            single_pass,
        } => {
            // Resolved before any I/O; conflicting flags exit here.
            let mode = match policy::resolve_index_mode(reset, no_reset, &StdinModePrompt) {
                Ok(mode) => mode,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    std::process::exit(2);
                }
            };

            let mut opts = IngestOptions::from_config(&cfg);
            if let Some(batch_size) = batch_size {
                opts.batch_size = batch_size;
            }
            if let Some(memory_limit) = memory_limit {
                opts.memory_limit_mb = memory_limit;
            }
            opts.single_pass = single_pass;

            if opts.batch_size == 0 {
                eprintln!("Error: --batch-size must be >= 1");
                std::process::exit(2);
            }

            let embedder = match OllamaEmbedder::new(&cfg.ollama) {
                Ok(embedder) => embedder,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    std::process::exit(2);
                }
            };

            if let Err(e) = ingest::run_ingest(&cfg, &embedder, mode, &opts).await {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }

        Commands::Query {
            query,
            k,
            threshold,
            verbose,
        } => {
            let mut opts = QueryOptions::from_config(&cfg);
            if let Some(k) = k {
                opts.k = k;
            }
            if let Some(threshold) = threshold {
                opts.threshold = threshold;
            }
            opts.verbose = verbose;

            if opts.k == 0 {
                eprintln!("Error: -k must be >= 1");
                std::process::exit(2);
            }
            if !(0.0..=1.0).contains(&opts.threshold) {
                eprintln!("Error: --threshold must be in [0, 1]");
                std::process::exit(2);
            }

            let (embedder, generator) = match (
                OllamaEmbedder::new(&cfg.ollama),
                OllamaGenerator::new(&cfg.ollama),
            ) {
                (Ok(embedder), Ok(generator)) => (embedder, generator),
                (Err(e), _) | (_, Err(e)) => {
                    eprintln!("Error: {:#}", e);
                    std::process::exit(2);
                }
            };

            match query::run_query(&cfg, &embedder, &generator, &query, &opts).await {
                Ok(response) => query::print_response(&response, verbose),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    let code = match e {
                        QueryError::EmptyQuery => 2,
                        QueryError::IndexNotFound { .. } => 3,
                        QueryError::NoRelevantResults { .. } => {
                            eprintln!("Try lowering the threshold or re-check the query wording.");
                            4
                        }
                        QueryError::Generation(_) => {
                            eprintln!("Check that Ollama is running and the model is pulled.");
                            5
                        }
                        QueryError::Other(_) => 1,
                    };
                    std::process::exit(code);
                }
            }
        }

        Commands::Clear => {
            if VectorIndex::exists(&cfg.paths.index_dir) {
                if let Err(e) = VectorIndex::clear(&cfg.paths.index_dir) {
                    eprintln!("Error: {:#}", e);
                    std::process::exit(1);
                }
                println!("Index cleared: {}", cfg.paths.index_dir.display());
            } else {
                println!("No index at {}", cfg.paths.index_dir.display());
            }
        }

        Commands::Status => {
            if let Err(e) = status::run_status(&cfg) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
