use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::analyzer::FileAnalyzer;
use super::progress::IndexingProgress;
use super::types::{AnalyzeResult, BatchOutcome, FileFailure, FileRecord, ProgressFn};
use crate::config::DEFAULT_CONCURRENCY;
use crate::error::AnalysisError;

/// Runs the analyzer over many files with at most `concurrency` calls in flight.
///
/// Completions are consumed by a single loop, which is the only place that
/// touches the outcome and invokes the progress callback.
pub struct Batcher {
    analyzer: Arc<FileAnalyzer>,
    root: PathBuf,
    concurrency: usize,
    on_progress: Option<ProgressFn>,
    progress: IndexingProgress,
}

impl Batcher {
    /// `concurrency == 0` falls back to [`DEFAULT_CONCURRENCY`].
    pub fn new(analyzer: Arc<FileAnalyzer>, root: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            analyzer,
            root: root.into(),
            concurrency: if concurrency == 0 {
                DEFAULT_CONCURRENCY
            } else {
                concurrency
            },
            on_progress: None,
            progress: IndexingProgress::new(),
        }
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressFn>) -> Self {
        self.on_progress = on_progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Attempts every file. Failures are recorded, never raised.
    pub async fn process_files(&self, files: &[FileRecord]) -> BatchOutcome {
        let total = files.len();
        let mut outcome = BatchOutcome::default();
        if total == 0 {
            return outcome;
        }

        self.progress.start(total);
        debug!("Analyzing {} files with concurrency {}", total, self.concurrency);

        let mut completions = stream::iter(files.iter())
            .map(|file| async move {
                let result = analyze_one(&self.analyzer, &self.root, file).await;
                (file.relative_path.as_str(), result)
            })
            .buffer_unordered(self.concurrency);

        let mut completed = 0;
        while let Some((path, result)) = completions.next().await {
            completed += 1;
            match result {
                Ok(r) => {
                    self.progress.inc(r.input_tokens, r.output_tokens);
                    outcome.input_tokens += r.input_tokens;
                    outcome.output_tokens += r.output_tokens;
                    outcome.analyses.push(r.analysis);
                }
                Err(error) => {
                    self.progress.inc_error();
                    let failure = FileFailure {
                        path: path.to_string(),
                        error,
                    };
                    warn!("{}", failure);
                    outcome.errors.push(failure);
                }
            }
            if let Some(on_progress) = &self.on_progress {
                on_progress(completed, total, path);
            }
        }

        self.progress.finish();
        let snap = self.progress.snapshot();
        debug!(
            "Batch finished: {}/{} files, {} errors, {} ms",
            snap.files_processed, snap.files_total, snap.errors, snap.elapsed_ms
        );
        outcome.analyses.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        outcome
    }
}

async fn analyze_one(
    analyzer: &FileAnalyzer,
    root: &Path,
    file: &FileRecord,
) -> Result<AnalyzeResult, AnalysisError> {
    let content = tokio::fs::read(root.join(&file.relative_path))
        .await
        .map_err(|e| AnalysisError::Read {
            path: file.relative_path.clone(),
            message: e.to_string(),
        })?;
    analyzer
        .analyze(&file.relative_path, &content, &file.language)
        .await
}
