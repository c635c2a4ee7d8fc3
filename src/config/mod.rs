//! Project configuration loaded from `.doc-indexer.yml`.
//!
//! Format:
//! ```yaml
//! provider: anthropic
//! model: claude-sonnet-4-5-20250929
//! embedding_provider: openai
//! embedding_model: text-embedding-3-small
//! quality: normal
//! output_dir: docs
//! max_concurrency: 4
//! max_cost_usd: 10.0
//! requests_per_minute: 50
//! exclude:
//!   - "vendor/**"
//! ```
//!
//! Environment variables prefixed with `DOC_INDEXER_` override file values.

pub mod presets;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

pub use presets::{known_embedding_dimensions, preset_for, QualityPreset};

/// Name of the configuration file in the project root
pub const CONFIG_FILENAME: &str = ".doc-indexer.yml";

/// Directory (relative to the project root) holding state, analyses and the vector snapshot
pub const STATE_DIR: &str = ".doc-indexer";

/// Concurrency used when the configuration leaves it unset
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Controls prompt verbosity, model choice and chunk granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Lite,
    #[default]
    Normal,
    Max,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Lite => "lite",
            QualityTier::Normal => "normal",
            QualityTier::Max => "max",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lite" => Ok(QualityTier::Lite),
            "normal" => Ok(QualityTier::Normal),
            "max" => Ok(QualityTier::Max),
            other => Err(IndexerError::Config(format!(
                "invalid quality {:?}: must be one of lite, normal, max",
                other
            ))),
        }
    }
}

/// Remote service family. Selects an adapter, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    OpenRouter,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Conventional environment variable holding the API key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::OpenRouter => Some("OPENROUTER_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "ollama" => Ok(ProviderKind::Ollama),
            other => Err(IndexerError::Config(format!(
                "invalid provider {:?}: must be one of anthropic, openai, openrouter, ollama",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: String,
    pub endpoint: Option<String>,
    pub embedding_provider: ProviderKind,
    pub embedding_model: String,
    pub embedding_endpoint: Option<String>,
    /// Only needed for embedding models the presets do not know
    pub embedding_dimensions: Option<usize>,
    pub quality: QualityTier,
    pub output_dir: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// 0 means [`DEFAULT_CONCURRENCY`]
    pub max_concurrency: usize,
    /// 0 means no budget
    pub max_cost_usd: f64,
    pub tenant_id: Option<String>,
    pub request_timeout_secs: u64,
    /// Completion requests allowed per minute; 0 means unlimited
    pub requests_per_minute: u32,
}

pub fn default_excludes() -> Vec<String> {
    [
        "vendor/**",
        "node_modules/**",
        ".git/**",
        "dist/**",
        "build/**",
        "target/**",
        "*.min.js",
        "*.min.css",
        "*.lock",
        "go.sum",
        "package-lock.json",
        "yarn.lock",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        let preset = preset_for(ProviderKind::Anthropic, QualityTier::Normal);
        Self {
            provider: ProviderKind::Anthropic,
            model: preset.model.to_string(),
            endpoint: None,
            embedding_provider: ProviderKind::OpenAi,
            embedding_model: preset.embedding_model.to_string(),
            embedding_endpoint: None,
            embedding_dimensions: None,
            quality: QualityTier::Normal,
            output_dir: PathBuf::from("docs"),
            include: vec!["**".to_string()],
            exclude: default_excludes(),
            max_concurrency: DEFAULT_CONCURRENCY,
            max_cost_usd: 10.0,
            tenant_id: None,
            request_timeout_secs: 120,
            requests_per_minute: 0,
        }
    }
}

impl Config {
    /// Loads `.doc-indexer.yml` from `root` (defaults when absent), then applies env overrides.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILENAME);
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_yaml(&content)?
        } else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(root.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    /// Applies `DOC_INDEXER_*` overrides using `lookup` as the environment source.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DOC_INDEXER_PROVIDER") {
            self.provider = v.parse()?;
        }
        if let Some(v) = lookup("DOC_INDEXER_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("DOC_INDEXER_QUALITY") {
            self.quality = v.parse()?;
        }
        if let Some(v) = lookup("DOC_INDEXER_MAX_CONCURRENCY") {
            self.max_concurrency = v.trim().parse().map_err(|_| {
                IndexerError::Config(format!("DOC_INDEXER_MAX_CONCURRENCY is not a number: {:?}", v))
            })?;
        }
        if let Some(v) = lookup("DOC_INDEXER_REQUESTS_PER_MINUTE") {
            self.requests_per_minute = v.trim().parse().map_err(|_| {
                IndexerError::Config(format!(
                    "DOC_INDEXER_REQUESTS_PER_MINUTE is not a number: {:?}",
                    v
                ))
            })?;
        }
        if let Some(v) = lookup("DOC_INDEXER_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("DOC_INDEXER_EMBEDDING_PROVIDER") {
            self.embedding_provider = v.parse()?;
        }
        if let Some(v) = lookup("DOC_INDEXER_EMBEDDING_MODEL") {
            self.embedding_model = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(IndexerError::Config("model is required".into()));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(IndexerError::Config("embedding_model is required".into()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(IndexerError::Config("output_dir is required".into()));
        }
        if self.max_cost_usd < 0.0 || !self.max_cost_usd.is_finite() {
            return Err(IndexerError::Config(
                "max_cost_usd must be a non-negative number".into(),
            ));
        }
        if self.embedding_provider == ProviderKind::Anthropic {
            return Err(IndexerError::Config(
                "anthropic does not offer embeddings; choose openai, openrouter or ollama".into(),
            ));
        }
        Ok(())
    }

    pub fn concurrency(&self) -> usize {
        if self.max_concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            self.max_concurrency
        }
    }

    /// Budget in USD, `None` when unlimited
    pub fn budget(&self) -> Option<f64> {
        (self.max_cost_usd > 0.0).then_some(self.max_cost_usd)
    }

    /// Switches tier and picks the tier's preset models for the current providers.
    pub fn with_quality(mut self, quality: QualityTier) -> Self {
        let preset = preset_for(self.provider, quality);
        self.quality = quality;
        self.model = preset.model.to_string();
        self
    }

    pub fn state_dir(root: &Path) -> PathBuf {
        root.join(STATE_DIR)
    }
}
