//! # askdocs
//!
//! A local-first retrieval-augmented question answering tool for your
//! own documents.
//!
//! askdocs ingests PDF, DOCX, and plain-text files from a data
//! directory, splits them into overlapping chunks with deterministic
//! ids, embeds them with a local Ollama model, and stores the vectors
//! in an on-disk index. Questions are answered by embedding the query,
//! retrieving the most similar chunks above a score threshold, and
//! prompting a local generative model with that context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────────┐   ┌───────────┐
//! │  Loader  │──▶│    Pipeline      │──▶│  Vector    │
//! │ PDF/DOCX │   │ Chunk+Id+Embed  │   │  Index     │
//! └──────────┘   └─────────────────┘   └────┬──────┘
//!                                           │
//!                        question ──▶ search + filter
//!                                           │
//!                                      ┌────▼──────┐
//!                                      │  Ollama    │──▶ answer + sources
//!                                      │ generate   │
//!                                      └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! askdocs ingest --reset        # build the index from scratch
//! askdocs query "what does chapter 3 say about pricing?"
//! askdocs status                # inspect data dir and index health
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`loader`] | Data-directory scanning |
//! | [`extract`] | PDF/DOCX/plain-text extraction |
//! | [`chunk`] | Overlapping-window chunking and chunk id assignment |
//! | [`index`] | On-disk cosine-similarity vector index |
//! | [`embedding`] | Embedding provider abstraction (Ollama) |
//! | [`llm`] | Generative model abstraction (Ollama) |
//! | [`policy`] | Reset/update decision for ingestion |
//! | [`ingest`] | Memory-bounded batch ingestion pipeline |
//! | [`query`] | Retrieval, context assembly, and answer generation |
//! | [`status`] | Index health overview |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod models;
pub mod policy;
pub mod query;
pub mod status;
