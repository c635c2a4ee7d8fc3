//! Fakes shared by unit tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use xxhash_rust::xxh3::xxh3_64;

use crate::embeddings::Embedder;
use crate::error::{AnalysisError, Result};
use crate::indexer::analyzer::compute_hash;
use crate::indexer::types::FileRecord;
use crate::llm::{CompletionProvider, CompletionRequest, CompletionResponse};

/// Canned completion service that records how it was called.
pub struct MockProvider {
    response: String,
    advice: Option<String>,
    fail_on: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            advice: None,
            fail_on: HashSet::new(),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail any analysis request for `path`.
    pub fn fail_on(mut self, path: &str) -> Self {
        self.fail_on.insert(path.to_string());
        self
    }

    /// Answer for requests that are not in JSON mode.
    pub fn with_advice(mut self, advice: impl Into<String>) -> Self {
        self.advice = Some(advice.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let prompt: String = request.messages.iter().map(|m| m.content.as_str()).collect();
        if self
            .fail_on
            .iter()
            .any(|path| prompt.contains(&format!("File path: {}\n", path)))
        {
            return Err(AnalysisError::provider("mock", "forced failure"));
        }

        let content = match (&self.advice, request.json_mode) {
            (Some(advice), false) => advice.clone(),
            _ => self.response.clone(),
        };
        Ok(CompletionResponse {
            content,
            input_tokens: 100,
            output_tokens: 50,
            model: request.model,
            finish_reason: Some("stop".to_string()),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Deterministic bag-of-words embedder. Identical text gives identical vectors.
pub struct HashEmbedder {
    actual: usize,
    reported: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self::with_reported_dimensions(dimensions, dimensions)
    }

    /// Produces `actual`-wide vectors while claiming `reported`.
    pub fn with_reported_dimensions(actual: usize, reported: usize) -> Self {
        Self {
            actual,
            reported,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.actual];
        if self.actual == 0 {
            return v;
        }
        let lower = text.to_lowercase();
        let mut add = |feature: &str, weight: f32| {
            let h = xxh3_64(feature.as_bytes());
            let bucket = (h % self.actual as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign * weight;
        };
        for word in lower.split_whitespace() {
            add(word, 1.0);
            let chars: Vec<char> = word.chars().collect();
            for gram in chars.windows(3) {
                add(&gram.iter().collect::<String>(), 0.5);
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.reported
    }

    fn name(&self) -> &str {
        "hash"
    }
}

pub fn create_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Scanner-style record for `name` holding `content`.
pub fn record(name: &str, content: &str) -> FileRecord {
    let language = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(crate::indexer::walker::language_for_extension)
        .unwrap_or("text");
    FileRecord {
        relative_path: name.to_string(),
        language: language.to_string(),
        content_hash: compute_hash(content.as_bytes()),
        size_bytes: content.len() as u64,
    }
}
