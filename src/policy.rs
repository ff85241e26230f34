//! Reset/update decision for the ingest pipeline.
//!
//! Two independent CLI flags feed a small state machine with two
//! terminal outcomes: rebuild the index from scratch or extend it.
//! When neither flag is given the decision comes from an injected
//! [`ModePrompt`], so the resolver itself stays pure in tests and
//! interactivity lives only at the CLI boundary.

use anyhow::{bail, Result};
use std::io::Write;

/// Terminal outcome of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Clear the existing index and rebuild.
    Reset,
    /// Append new documents to the existing index.
    Update,
}

/// Supplies a decision when no flag was given.
pub trait ModePrompt {
    fn ask(&self) -> Result<IndexMode>;
}

/// Resolve the index mode from the two flags, falling back to `prompt`.
///
/// Conflicting flags are a fatal configuration error; callers must not
/// have performed any I/O before resolving.
pub fn resolve_index_mode(
    reset: bool,
    no_reset: bool,
    prompt: &dyn ModePrompt,
) -> Result<IndexMode> {
    if reset && no_reset {
        bail!("Cannot specify both --reset and --no-reset");
    }

    if reset {
        return Ok(IndexMode::Reset);
    }

    if no_reset {
        return Ok(IndexMode::Update);
    }

    prompt.ask()
}

/// Map one user token to a mode. Trimmed, case-insensitive.
pub fn parse_mode_token(token: &str) -> Option<IndexMode> {
    match token.trim().to_ascii_lowercase().as_str() {
        "1" | "r" | "reset" => Some(IndexMode::Reset),
        "2" | "u" | "update" => Some(IndexMode::Update),
        _ => None,
    }
}

/// Interactive prompt on stdin; loops until a valid token is entered.
pub struct StdinModePrompt;

impl ModePrompt for StdinModePrompt {
    fn ask(&self) -> Result<IndexMode> {
        loop {
            println!();
            println!("Index operation mode:");
            println!("1. Reset index (clear existing data and rebuild)");
            println!("2. Update index (add new documents to existing data)");
            print!("Choose an option (1/2) or (r/u): ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            let read = std::io::stdin().read_line(&mut line)?;
            if read == 0 {
                bail!("stdin closed before an index mode was chosen");
            }

            match parse_mode_token(&line) {
                Some(mode) => return Ok(mode),
                None => println!("Invalid choice. Please enter 1, 2, r, or u."),
            }
        }
    }
}
