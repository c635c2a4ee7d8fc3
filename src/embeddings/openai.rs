use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::error::{IndexerError, Result};
use crate::llm::truncate_for_error;

/// Inputs per `/embeddings` request
const BATCH_SIZE: usize = 100;

/// `/v1/embeddings` client for OpenAI and compatible endpoints.
pub struct OpenAiEmbedder {
    model: String,
    dimensions: usize,
    endpoint: String,
    api_key: String,
    http: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(
        model: &str,
        dimensions: usize,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            model: model.to_string(),
            dimensions,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            http,
        })
    }

    fn embeddings_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.ends_with("/embeddings") {
            endpoint.to_string()
        } else if endpoint.ends_with("/v1") {
            format!("{}/embeddings", endpoint)
        } else {
            format!("{}/v1/embeddings", endpoint)
        }
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .http
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: batch,
            })
            .send()
            .await
            .map_err(|e| IndexerError::Embedding(format!("embedding request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IndexerError::Embedding(format!("embedding response unreadable: {}", e)))?;
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(IndexerError::Embedding(format!(
                "rate limited: {}",
                truncate_for_error(&body)
            )));
        }
        if !status.is_success() {
            return Err(IndexerError::Embedding(format!(
                "HTTP {}: {}",
                status,
                truncate_for_error(&body)
            )));
        }

        let mut parsed: EmbeddingsResponse = serde_json::from_str(&body)
            .map_err(|e| IndexerError::Embedding(format!("embedding response invalid: {}", e)))?;
        if parsed.data.len() != batch.len() {
            return Err(IndexerError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}
