use std::sync::Arc;

use super::types::AnalysisMap;
use crate::error::{AnalysisError, IndexerError, Result};
use crate::llm::{CompletionProvider, CompletionRequest, Message};

const MAX_SUMMARY_LINES: usize = 30;

/// Which high-level documents should be rebuilt after an update
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegenerationAdvice {
    pub project_overview: bool,
    pub architecture: bool,
    pub feature_pages: bool,
    pub component_map: bool,
    pub reasoning: String,
}

impl RegenerationAdvice {
    /// Rebuild everything. Used whenever the advisor cannot be trusted.
    pub fn regenerate_everything(reason: impl AsRef<str>) -> Self {
        Self {
            project_overview: true,
            architecture: true,
            feature_pages: true,
            component_map: true,
            reasoning: format!("Regenerating everything (fallback: {})", reason.as_ref()),
        }
    }

    pub fn anything(&self) -> bool {
        self.project_overview || self.architecture || self.feature_pages || self.component_map
    }
}

/// Asks the completion service whether top-level documents are still accurate.
pub struct RegenerationAdvisor {
    provider: Arc<dyn CompletionProvider>,
    model: String,
}

impl RegenerationAdvisor {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Errors when the call fails or the answer cannot be parsed. Callers fall
    /// back to [`RegenerationAdvice::regenerate_everything`].
    pub async fn decide(
        &self,
        directly_changed: &[String],
        affected_only: &[String],
        analyses: &AnalysisMap,
    ) -> Result<RegenerationAdvice> {
        let prompt = build_prompt(directly_changed, affected_only, analyses);
        let response = self
            .provider
            .complete(CompletionRequest {
                model: self.model.clone(),
                messages: vec![Message::user(prompt)],
                max_tokens: 256,
                temperature: 0.1,
                json_mode: false,
            })
            .await?;

        parse_advice(&response.content).ok_or_else(|| {
            IndexerError::Analysis(AnalysisError::MalformedResponse(
                "could not parse regeneration advice".to_string(),
            ))
        })
    }
}

fn build_prompt(directly_changed: &[String], affected_only: &[String], analyses: &AnalysisMap) -> String {
    let all_changed: Vec<&String> = directly_changed.iter().chain(affected_only).collect();

    let mut lines: Vec<String> = all_changed
        .iter()
        .take(MAX_SUMMARY_LINES)
        .map(|path| match analyses.get(path.as_str()) {
            Some(a) if !a.summary.is_empty() => format!("- {}: {}", path, a.summary),
            _ => format!("- {}: (no summary available)", path),
        })
        .collect();
    if all_changed.len() > MAX_SUMMARY_LINES {
        lines.push(format!(
            "... and {} more files",
            all_changed.len() - MAX_SUMMARY_LINES
        ));
    }

    format!(
        "You maintain generated documentation for a codebase. Decide which high-level \
documents must be regenerated after the changes below.

Total files in project: {}
Files changed in this update: {} ({} directly, {} through dependencies)

Changed files:
{}

Answer YES or NO for each document:
PROJECT_OVERVIEW - the project summary page
ARCHITECTURE - the architecture overview
FEATURE_PAGES - the feature grouping pages
COMPONENT_MAP - the component map

Reply with exactly these lines:
PROJECT_OVERVIEW: YES or NO
ARCHITECTURE: YES or NO
FEATURE_PAGES: YES or NO
COMPONENT_MAP: YES or NO
REASONING: <one sentence>",
        analyses.len(),
        all_changed.len(),
        directly_changed.len(),
        affected_only.len(),
        lines.join("\n")
    )
}

/// `None` when no decision line was found.
pub fn parse_advice(response: &str) -> Option<RegenerationAdvice> {
    let mut advice = RegenerationAdvice::default();
    let mut found = false;

    for line in response.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        let key = key.trim().trim_start_matches(|c: char| !c.is_ascii_alphabetic());
        let value = value.trim();
        let yes = value.to_ascii_uppercase().starts_with("YES");

        match key.to_ascii_uppercase().as_str() {
            "PROJECT_OVERVIEW" => {
                advice.project_overview = yes;
                found = true;
            }
            "ARCHITECTURE" => {
                advice.architecture = yes;
                found = true;
            }
            "FEATURE_PAGES" => {
                advice.feature_pages = yes;
                found = true;
            }
            "COMPONENT_MAP" => {
                advice.component_map = yes;
                found = true;
            }
            "REASONING" => advice.reasoning = value.to_string(),
            _ => {}
        }
    }

    found.then_some(advice)
}
