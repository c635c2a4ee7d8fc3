//! Text embedding services.

pub mod ollama;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{known_embedding_dimensions, Config, ProviderKind};
use crate::error::{IndexerError, Result};

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

/// Turns text into fixed-width vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}

/// Builds the embedding adapter named by the configuration.
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let dimensions = config
        .embedding_dimensions
        .or_else(|| known_embedding_dimensions(&config.embedding_model))
        .ok_or_else(|| {
            IndexerError::Config(format!(
                "unknown dimensions for embedding model {:?}; set embedding_dimensions",
                config.embedding_model
            ))
        })?;
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
    let endpoint = config
        .embedding_endpoint
        .clone()
        .unwrap_or_else(|| config.embedding_provider.default_endpoint().to_string());

    let embedder: Arc<dyn Embedder> = match config.embedding_provider {
        ProviderKind::Ollama => Arc::new(OllamaEmbedder::new(
            &config.embedding_model,
            dimensions,
            endpoint,
            timeout,
        )?),
        ProviderKind::OpenAi | ProviderKind::OpenRouter => {
            let var = config
                .embedding_provider
                .api_key_env()
                .unwrap_or("OPENAI_API_KEY");
            let api_key = std::env::var(var)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    IndexerError::Config(format!("{} is not set; it is required for embeddings", var))
                })?;
            Arc::new(OpenAiEmbedder::new(
                &config.embedding_model,
                dimensions,
                endpoint,
                api_key,
                timeout,
            )?)
        }
        ProviderKind::Anthropic => {
            return Err(IndexerError::Config(
                "anthropic does not offer embeddings".into(),
            ))
        }
    };
    Ok(embedder)
}
