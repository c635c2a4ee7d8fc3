use thiserror::Error;

use crate::vectordb::VectorStoreError;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("State error: {0}")]
    State(String),

    #[error("No existing index found; run a full generate first")]
    NoIndex,
}

/// Per-file failure from the analysis service. Never aborts sibling work.
#[derive(Error, Debug, Clone)]
pub enum AnalysisError {
    #[error("provider {provider} failed: {message}")]
    Provider {
        provider: String,
        message: String,
        rate_limited: bool,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("read {path}: {message}")]
    Read { path: String, message: String },
}

impl AnalysisError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Provider {
            provider: provider.into(),
            message: message.into(),
            rate_limited: false,
        }
    }

    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Provider {
            provider: provider.into(),
            message: message.into(),
            rate_limited: true,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AnalysisError::Provider { rate_limited: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, IndexerError>;
