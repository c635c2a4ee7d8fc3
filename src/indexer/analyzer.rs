use std::sync::Arc;

use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use super::prompts::build_messages;
use super::types::{AnalyzeResult, FileAnalysis};
use crate::config::QualityTier;
use crate::error::AnalysisError;
use crate::llm::{CompletionProvider, CompletionRequest};

const MAX_OUTPUT_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.1;

/// Hex xxh3 of a file's bytes. Shared by the scanner and the analyzer.
pub fn compute_hash(content: &[u8]) -> String {
    format!("{:016x}", xxh3_64(content))
}

/// Sends one file to the completion service and parses the structured answer.
pub struct FileAnalyzer {
    provider: Arc<dyn CompletionProvider>,
    tier: QualityTier,
    model: String,
}

impl FileAnalyzer {
    pub fn new(provider: Arc<dyn CompletionProvider>, tier: QualityTier, model: impl Into<String>) -> Self {
        Self {
            provider,
            tier,
            model: model.into(),
        }
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    /// Exactly one remote call. Path, language and hash are filled in locally.
    pub async fn analyze(
        &self,
        file_path: &str,
        content: &[u8],
        language: &str,
    ) -> Result<AnalyzeResult, AnalysisError> {
        let text = String::from_utf8_lossy(content);
        let response = self
            .provider
            .complete(CompletionRequest {
                model: self.model.clone(),
                messages: build_messages(self.tier, file_path, &text, language),
                max_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
                json_mode: true,
            })
            .await?;

        if response.is_truncated() {
            debug!("Response for {} hit the output limit, attempting repair", file_path);
        }

        let mut analysis = parse_analysis(&response.content)?;
        analysis.file_path = file_path.to_string();
        analysis.language = language.to_string();
        analysis.content_hash = compute_hash(content);

        Ok(AnalyzeResult {
            analysis,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        })
    }
}

/// Parses a model answer, repairing truncated JSON once before giving up.
pub fn parse_analysis(raw: &str) -> Result<FileAnalysis, AnalysisError> {
    let body = strip_code_fences(raw);
    match serde_json::from_str::<FileAnalysis>(body) {
        Ok(analysis) => Ok(analysis),
        Err(first) => {
            let repaired = repair_json(body);
            if repaired == body {
                return Err(AnalysisError::MalformedResponse(format!("json parse: {}", first)));
            }
            serde_json::from_str::<FileAnalysis>(&repaired).map_err(|e| {
                AnalysisError::MalformedResponse(format!("json parse after repair: {}", e))
            })
        }
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // drop the opening fence line (```json) and a closing fence if present
    let after_open = match trimmed.find('\n') {
        Some(i) => &trimmed[i + 1..],
        None => return "",
    };
    let body = after_open.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Closes an unterminated string, drops a dangling comma and closes open
/// containers in nesting order. Returns the input unchanged when balanced.
fn repair_json(raw: &str) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in raw.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        if in_string {
            match ch {
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&ch) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    if open.is_empty() && !in_string {
        return raw.to_string();
    }

    let mut out = raw.to_string();
    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    let kept = out.trim_end().len();
    out.truncate(kept);
    if out.ends_with(':') {
        // key without a value: drop the key
        out.pop();
        let kept = out.trim_end().len();
        out.truncate(kept);
        if out.ends_with('"') {
            if let Some(start) = out[..out.len() - 1].rfind('"') {
                out.truncate(start);
            }
        }
        let kept = out.trim_end().len();
        out.truncate(kept);
    }
    if out.ends_with(',') {
        out.pop();
    }
    while let Some(close) = open.pop() {
        out.push(close);
    }
    out
}
