use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{truncate_for_error, CompletionProvider, CompletionRequest, CompletionResponse};
use crate::error::{AnalysisError, IndexerError, Result};

/// Chat-completions client for OpenAI, OpenRouter, Ollama and any compatible endpoint.
pub struct OpenAiCompatibleProvider {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key,
            timeout,
            http,
        })
    }

    fn chat_completions_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.ends_with("/chat/completions") {
            endpoint.to_string()
        } else if endpoint.ends_with("/v1") {
            format!("{}/chat/completions", endpoint)
        } else {
            format!("{}/v1/chat/completions", endpoint)
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, AnalysisError> {
        if request.messages.is_empty() {
            return Err(AnalysisError::provider(
                &self.name,
                "completion requires at least one message",
            ));
        }

        let payload = ChatCompletionsRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            response_format: request.json_mode.then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
            stream: Some(false),
        };

        let mut http_request = self.http.post(self.chat_completions_url()).json(&payload);
        if let Some(api_key) = self.api_key.as_ref() {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                AnalysisError::provider(
                    &self.name,
                    format!(
                        "request timed out after {:?} (model={})",
                        self.timeout, request.model
                    ),
                )
            } else {
                AnalysisError::provider(
                    &self.name,
                    format!("request failed (model={}): {}", request.model, e),
                )
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AnalysisError::provider(&self.name, format!("failed to read response body: {}", e))
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AnalysisError::rate_limited(
                &self.name,
                format!("HTTP 429: {}", truncate_for_error(&body)),
            ));
        }
        if !status.is_success() {
            return Err(AnalysisError::provider(
                &self.name,
                format!("HTTP {}: {}", status, truncate_for_error(&body)),
            ));
        }

        let parsed: ChatCompletionsResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisError::MalformedResponse(format!(
                "invalid JSON from {}: {} (body={})",
                self.name,
                e,
                truncate_for_error(&body)
            ))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            AnalysisError::MalformedResponse(format!("{} response had no choices", self.name))
        })?;

        let content = choice.message.content.into_text().ok_or_else(|| {
            AnalysisError::MalformedResponse(format!(
                "{} response had empty message content",
                self.name
            ))
        })?;

        let usage = parsed.usage.unwrap_or_default();
        Ok(CompletionResponse {
            content,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            model: parsed.model.unwrap_or(request.model),
            finish_reason: choice.finish_reason,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: ChatContent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

impl ChatContent {
    fn into_text(self) -> Option<String> {
        let text = match self {
            ChatContent::Text(text) => text.trim().to_string(),
            ChatContent::Parts(parts) => parts
                .into_iter()
                .filter_map(|p| p.text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        };
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChatContentPart {
    #[serde(default)]
    text: Option<String>,
}
