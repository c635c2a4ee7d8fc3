use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{
    truncate_for_error, CompletionProvider, CompletionRequest, CompletionResponse, Role,
};
use crate::error::{AnalysisError, IndexerError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client.
pub struct AnthropicProvider {
    endpoint: String,
    api_key: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
            http,
        })
    }

    fn messages_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.ends_with("/messages") {
            endpoint.to_string()
        } else if endpoint.ends_with("/v1") {
            format!("{}/messages", endpoint)
        } else {
            format!("{}/v1/messages", endpoint)
        }
    }

    /// Anthropic takes the system prompt out of band.
    fn build_payload(request: &CompletionRequest) -> MessagesRequest {
        let system = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.max(1),
            temperature: request.temperature,
            system: (!system.is_empty()).then_some(system),
            messages: request
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| WireMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, AnalysisError> {
        let payload = Self::build_payload(&request);
        if payload.messages.is_empty() {
            return Err(AnalysisError::provider(
                "anthropic",
                "completion requires at least one non-system message",
            ));
        }

        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::provider(
                        "anthropic",
                        format!("request timed out after {:?}", self.timeout),
                    )
                } else {
                    AnalysisError::provider("anthropic", format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AnalysisError::provider("anthropic", format!("failed to read response body: {}", e))
        })?;

        // 529 is Anthropic's "overloaded"
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 529 {
            return Err(AnalysisError::rate_limited(
                "anthropic",
                format!("HTTP {}: {}", status, truncate_for_error(&body)),
            ));
        }
        if !status.is_success() {
            return Err(AnalysisError::provider(
                "anthropic",
                format!("HTTP {}: {}", status, truncate_for_error(&body)),
            ));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            AnalysisError::MalformedResponse(format!(
                "invalid JSON from anthropic: {} (body={})",
                e,
                truncate_for_error(&body)
            ))
        })?;

        let content = parsed
            .content
            .iter()
            .filter(|c| c.kind == "text")
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if content.trim().is_empty() {
            return Err(AnalysisError::MalformedResponse(
                "anthropic response had no text content".to_string(),
            ));
        }

        Ok(CompletionResponse {
            content,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
            model: parsed.model.unwrap_or(request.model),
            finish_reason: parsed.stop_reason,
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[derive(Debug, Clone, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: MessagesUsage,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    #[test]
    fn test_system_prompt_moves_out_of_messages() {
        let request = CompletionRequest {
            model: "claude".into(),
            messages: vec![Message::system("be terse"), Message::user("hi")],
            max_tokens: 0,
            temperature: 0.1,
            json_mode: true,
        };
        let payload = AnthropicProvider::build_payload(&request);
        assert_eq!(payload.system.as_deref(), Some("be terse"));
        assert_eq!(payload.messages.len(), 1);
        assert_eq!(payload.messages[0].role, "user");
        assert_eq!(payload.max_tokens, 1);
    }

    #[test]
    fn test_messages_url() {
        let p = AnthropicProvider::new("https://api.anthropic.com", "k", Duration::from_secs(1))
            .unwrap();
        assert_eq!(p.messages_url(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"content":[{"type":"text","text":"{\"summary\":\"x\"}"}],
            "stop_reason":"max_tokens","usage":{"input_tokens":12,"output_tokens":4}}"#;
        let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.usage.input_tokens, 12);
        assert_eq!(parsed.stop_reason.as_deref(), Some("max_tokens"));
        assert_eq!(parsed.content[0].text.as_deref(), Some("{\"summary\":\"x\"}"));
    }
}
