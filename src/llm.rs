//! Generative model abstraction and the Ollama implementation.
//!
//! The [`Generator`] trait maps a prompt string to a generated answer.
//! [`OllamaGenerator`] calls `/api/generate` with `stream: false`,
//! reusing the retry/backoff policy of the embedding client.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::embedding::post_with_retry;

/// Maps a prompt to a generated text response.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Answer generation backed by a local Ollama instance.
pub struct OllamaGenerator {
    model: String,
    url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OllamaGenerator {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.query_model.clone(),
            url: config.url.clone(),
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let json = post_with_retry(
            &self.client,
            &format!("{}/api/generate", self.url),
            &body,
            self.max_retries,
            &self.url,
        )
        .await?;

        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing response field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_generate_response_extracts_text() {
        let json = serde_json::json!({ "model": "mistral", "response": "The answer.", "done": true });
        assert_eq!(parse_generate_response(&json).unwrap(), "The answer.");
    }

    #[test]
    fn parse_generate_response_rejects_missing_field() {
        let json = serde_json::json!({ "done": true });
        assert!(parse_generate_response(&json).is_err());
    }
}
