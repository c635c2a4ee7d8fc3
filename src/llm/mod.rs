//! Remote completion services.
//!
//! The indexer only ever talks to [`CompletionProvider`]; concrete adapters are
//! picked from configuration by [`create_provider`].

pub mod anthropic;
pub mod openai;
pub mod pricing;
pub mod ratelimit;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ProviderKind};
use crate::error::{AnalysisError, IndexerError, Result};

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiCompatibleProvider;
pub use pricing::{estimate_cost, estimate_embedding_cost, estimate_tokens, ModelPricing};
pub use ratelimit::RateLimitedProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub json_mode: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    /// True when the service stopped because it hit the output token limit
    pub fn is_truncated(&self) -> bool {
        matches!(
            self.finish_reason.as_deref(),
            Some("length") | Some("max_tokens") | Some("MAX_TOKENS")
        )
    }
}

/// A remote text-completion service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, AnalysisError>;

    fn name(&self) -> &str;
}

/// Builds the completion adapter named by the configuration, rate limited when
/// `requests_per_minute` is set.
pub fn create_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>> {
    let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
    let api_key = match config.provider.api_key_env() {
        Some(var) => {
            let key = std::env::var(var).ok().filter(|k| !k.trim().is_empty());
            if key.is_none() {
                return Err(IndexerError::Config(format!(
                    "{} is not set; it is required for provider {}",
                    var, config.provider
                )));
            }
            key
        }
        None => None,
    };
    let endpoint = config
        .endpoint
        .clone()
        .unwrap_or_else(|| config.provider.default_endpoint().to_string());

    let provider: Arc<dyn CompletionProvider> = match config.provider {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            endpoint,
            api_key.unwrap_or_default(),
            timeout,
        )?),
        ProviderKind::OpenAi | ProviderKind::OpenRouter | ProviderKind::Ollama => {
            Arc::new(OpenAiCompatibleProvider::new(
                config.provider.as_str(),
                endpoint,
                api_key,
                timeout,
            )?)
        }
    };
    Ok(limit_requests(provider, config.requests_per_minute))
}

/// Wraps `provider` in a [`RateLimitedProvider`] unless `rpm` is 0.
pub fn limit_requests(
    provider: Arc<dyn CompletionProvider>,
    rpm: u32,
) -> Arc<dyn CompletionProvider> {
    if rpm == 0 {
        return provider;
    }
    tracing::debug!("Limiting {} to {} requests per minute", provider.name(), rpm);
    Arc::new(RateLimitedProvider::new(provider, rpm))
}

pub(crate) fn truncate_for_error(value: &str) -> String {
    const LIMIT: usize = 400;
    if value.len() <= LIMIT {
        value.to_string()
    } else {
        let mut end = LIMIT;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &value[..end])
    }
}
