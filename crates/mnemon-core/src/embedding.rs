//! Ollama-compatible embedding client.
//!
//! This is the only async, network-touching surface in the crate;
//! everything else runs synchronously. Gated behind the `embeddings`
//! feature so a caller with no local embedding server can still build
//! and run on the keyword+graph fallback paths.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding server returned status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("embedding server returned no vector")]
    EmptyEmbedding,
}

/// HTTP client for an Ollama-compatible embedding server.
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f64>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Build a client, reading endpoint/model overrides from
    /// `MNEMON_EMBED_ENDPOINT`/`MNEMON_EMBED_MODEL` if set.
    pub fn new() -> Self {
        let endpoint =
            std::env::var("MNEMON_EMBED_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let model = std::env::var("MNEMON_EMBED_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self { http: reqwest::Client::new(), endpoint, model }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the server is reachable and the configured model is
    /// pulled. Never returns an error: any failure just means false.
    pub async fn available(&self) -> bool {
        let Ok(resp) = self
            .http
            .get(format!("{}/api/tags", self.endpoint))
            .timeout(Duration::from_secs(2))
            .send()
            .await
        else {
            return false;
        };
        if !resp.status().is_success() {
            return false;
        }
        let Ok(tags) = resp.json::<TagsResponse>().await else { return false };
        let base = self.model.split(':').next().unwrap_or(&self.model);
        tags.models.iter().any(|m| m.name.split(':').next() == Some(base))
    }

    /// Generate an embedding for `text`.
    pub async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        let resp = self
            .http
            .post(format!("{}/api/embed", self.endpoint))
            .json(&serde_json::json!({ "model": self.model, "input": text }))
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(EmbeddingError::BadStatus(resp.status()));
        }

        let data: EmbedResponse = resp.json().await?;
        let vector = data.embeddings.into_iter().next().filter(|v| !v.is_empty());
        vector.ok_or(EmbeddingError::EmptyEmbedding)
    }

    /// Human-readable hint shown when [`Client::available`] is false.
    pub fn unavailable_message(&self) -> String {
        format!(
            "embedding server not available at {} — install Ollama and run `ollama pull {}`",
            self.endpoint, self.model
        )
    }
}
