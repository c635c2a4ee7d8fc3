use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::error::{IndexerError, Result};
use crate::llm::truncate_for_error;

pub struct OllamaEmbedder {
    name: String,
    model: String,
    dimensions: usize,
    base_url: String,
    http: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(
        model: &str,
        dimensions: usize,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            name: format!("ollama/{}", model),
            model: model.to_string(),
            dimensions,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| IndexerError::Embedding(format!("ollama request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IndexerError::Embedding(format!("ollama response unreadable: {}", e)))?;
        if !status.is_success() {
            return Err(IndexerError::Embedding(format!(
                "ollama HTTP {}: {}",
                status,
                truncate_for_error(&body)
            )));
        }

        let parsed: EmbedResponse = serde_json::from_str(&body)
            .map_err(|e| IndexerError::Embedding(format!("ollama response invalid: {}", e)))?;
        if parsed.embeddings.len() != texts.len() {
            return Err(IndexerError::Embedding(format!(
                "ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.name
    }
}
