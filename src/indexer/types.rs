use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, IndexerError, Result};

use super::regen::RegenerationAdvice;

/// Stored analyses keyed by relative file path
pub type AnalysisMap = BTreeMap<String, FileAnalysis>;

/// Called after each file finishes with `(completed, total, current_path)`.
pub type ProgressFn = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

// =====================================================
// Scanner output
// =====================================================

/// One candidate file as seen by the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the project root, `/`-separated
    pub relative_path: String,
    pub language: String,
    pub content_hash: String,
    pub size_bytes: u64,
}

// =====================================================
// Analysis
// =====================================================

/// Structured description of one source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnalysis {
    pub file_path: String,
    pub language: String,
    pub summary: String,
    pub purpose: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<ClassDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_logic: Vec<String>,
    /// Hash of the exact content this analysis describes
    pub content_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionDoc {
    pub name: String,
    pub signature: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParamDoc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub returns: String,
    pub line_start: u32,
    pub line_end: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDoc {
    pub name: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<FunctionDoc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDoc>,
    pub line_start: u32,
    pub line_end: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Anything beyond a plain import: RPC, HTTP, database or event traffic.
    pub fn is_service_level(&self) -> bool {
        self.kind != DependencyKind::Import
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DependencyKind {
    #[default]
    Import,
    ApiCall,
    Grpc,
    Database,
    Event,
    Other,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Import => "import",
            DependencyKind::ApiCall => "api_call",
            DependencyKind::Grpc => "grpc",
            DependencyKind::Database => "database",
            DependencyKind::Event => "event",
            DependencyKind::Other => "other",
        }
    }
}

impl From<String> for DependencyKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "import" => DependencyKind::Import,
            "api_call" | "call" | "api" | "http" => DependencyKind::ApiCall,
            "grpc" => DependencyKind::Grpc,
            "database" | "db" => DependencyKind::Database,
            "event" => DependencyKind::Event,
            _ => DependencyKind::Other,
        }
    }
}

impl From<DependencyKind> for String {
    fn from(kind: DependencyKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis plus the tokens it cost
#[derive(Debug, Clone)]
pub struct AnalyzeResult {
    pub analysis: FileAnalysis,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// =====================================================
// Run outcomes
// =====================================================

/// A file that could not be analyzed
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: String,
    pub error: AnalysisError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            AnalysisError::Read { .. } => write!(f, "{}", self.error),
            other => write!(f, "analyze {}: {}", self.path, other),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub analyses: Vec<FileAnalysis>,
    pub errors: Vec<FileFailure>,
    /// Summed over successful calls only
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    /// Recorded files dropped because a forced run no longer scanned them
    pub files_removed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub estimated_cost: f64,
    pub duration: Duration,
    pub errors: Vec<String>,
    /// Analyses produced by this run
    pub analyses: AnalysisMap,
}

#[derive(Debug, Clone, Default)]
pub struct CostEstimate {
    pub total_files: usize,
    pub total_tokens_estimate: u64,
    pub estimated_cost: f64,
    /// USD per operation: `analysis`, `embeddings`, `architecture`
    pub cost_breakdown: BTreeMap<String, f64>,
}

impl CostEstimate {
    /// True when a positive budget is set and the estimate is above it.
    pub fn exceeds_budget(&self, max_cost_usd: f64) -> bool {
        max_cost_usd > 0.0 && self.estimated_cost > max_cost_usd
    }

    /// Rejects an over-budget run unless it was explicitly approved.
    pub fn ensure_within_budget(&self, max_cost_usd: f64, approved: bool) -> Result<()> {
        if approved || !self.exceeds_budget(max_cost_usd) {
            return Ok(());
        }
        Err(IndexerError::Config(format!(
            "estimated cost ${:.2} exceeds budget ${:.2}; pass --yes to proceed",
            self.estimated_cost, max_cost_usd
        )))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateResult {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    /// Files re-analyzed only because something they depend on changed
    pub dependency_affected: Vec<String>,
    pub files_processed: usize,
    pub files_failed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub estimated_cost: f64,
    pub duration: Duration,
    pub errors: Vec<String>,
    /// `None` when nothing changed
    pub advice: Option<RegenerationAdvice>,
}

impl UpdateResult {
    pub fn has_changes(&self) -> bool {
        !(self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_kind_aliases() {
        assert_eq!(DependencyKind::from("call".to_string()), DependencyKind::ApiCall);
        assert_eq!(DependencyKind::from("GRPC".to_string()), DependencyKind::Grpc);
        assert_eq!(DependencyKind::from("shell".to_string()), DependencyKind::Other);
        assert_eq!(DependencyKind::from(String::new()), DependencyKind::Import);
    }

    #[test]
    fn test_analysis_json_shape() {
        let json = r#"{
            "summary": "Serves HTTP",
            "dependencies": [{"name": "redis", "type": "database"}, {"name": "fmt"}],
            "functions": [{"name": "main", "parameters": [{"name": "a", "type": "int"}]}]
        }"#;
        let analysis: FileAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.dependencies[0].kind, DependencyKind::Database);
        assert_eq!(analysis.dependencies[1].kind, DependencyKind::Import);
        assert_eq!(analysis.functions[0].parameters[0].param_type, "int");

        let out = serde_json::to_value(&analysis).unwrap();
        assert_eq!(out["dependencies"][0]["type"], "database");
        assert!(out.get("classes").is_none());
    }

    #[test]
    fn test_exceeds_budget() {
        let estimate = CostEstimate {
            estimated_cost: 5.0,
            ..CostEstimate::default()
        };
        assert!(estimate.exceeds_budget(4.0));
        assert!(!estimate.exceeds_budget(5.0));
        assert!(!estimate.exceeds_budget(0.0));
    }

    #[test]
    fn test_ensure_within_budget() {
        let estimate = CostEstimate {
            estimated_cost: 5.0,
            ..CostEstimate::default()
        };
        assert!(matches!(
            estimate.ensure_within_budget(4.0, false),
            Err(IndexerError::Config(_))
        ));
        assert!(estimate.ensure_within_budget(4.0, true).is_ok());
        assert!(estimate.ensure_within_budget(6.0, false).is_ok());
    }

    #[test]
    fn test_failure_display() {
        let failure = FileFailure {
            path: "a.go".into(),
            error: AnalysisError::MalformedResponse("bad".into()),
        };
        assert_eq!(failure.to_string(), "analyze a.go: malformed response: bad");

        let failure = FileFailure {
            path: "a.go".into(),
            error: AnalysisError::Read {
                path: "a.go".into(),
                message: "gone".into(),
            },
        };
        assert_eq!(failure.to_string(), "read a.go: gone");
    }
}
