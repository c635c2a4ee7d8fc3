//! Orchestration of full and incremental indexing runs.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::analyzer::FileAnalyzer;
use super::batcher::Batcher;
use super::chunker::{chunk_analysis, reverse_dependency_documents, unix_now};
use super::deps::expand_changed_files;
use super::regen::{RegenerationAdvice, RegenerationAdvisor};
use super::state::{load_analyses, save_analyses, vectordb_dir, IndexState};
use super::types::{
    AnalysisMap, BatchOutcome, CostEstimate, FileAnalysis, FileRecord, PipelineResult, ProgressFn,
    UpdateResult,
};
use crate::config::{Config, QualityTier};
use crate::error::{IndexerError, Result};
use crate::git::{ChangeDetector, ChangeSet};
use crate::llm::{estimate_cost, estimate_embedding_cost, estimate_tokens, CompletionProvider};
use crate::vectordb::{Document, DocumentType, StoreResult, VectorStore, SNAPSHOT_FILE};

/// Estimated output tokens per analyzed file
fn output_tokens_per_file(tier: QualityTier) -> u64 {
    match tier {
        QualityTier::Lite => 500,
        QualityTier::Normal => 1500,
        QualityTier::Max => 3000,
    }
}

const ARCHITECTURE_INPUT_PER_FILE: u64 = 200;
const ARCHITECTURE_OUTPUT: u64 = 2000;

pub struct Pipeline {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<dyn VectorStore>,
    detector: Arc<dyn ChangeDetector>,
    config: Config,
    root: PathBuf,
    on_progress: Option<ProgressFn>,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<dyn VectorStore>,
        detector: Arc<dyn ChangeDetector>,
        config: Config,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            store,
            detector,
            config,
            root: root.into(),
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressFn>) -> Self {
        self.on_progress = on_progress;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads the persisted vector snapshot if there is one. Returns whether
    /// a snapshot was loaded; a missing snapshot is `NoIndex` when `required`.
    pub async fn open_store(&self, required: bool) -> Result<bool> {
        let dir = self.snapshot_dir();
        if !dir.join(SNAPSHOT_FILE).exists() {
            if required {
                return Err(IndexerError::NoIndex);
            }
            debug!("No vector snapshot under {}, starting empty", dir.display());
            return Ok(false);
        }
        self.store.load(&dir).await?;
        info!("Loaded {} documents from {}", self.store.count(), dir.display());
        Ok(true)
    }

    /// Estimates the cost of a run. Never calls a remote service.
    pub fn dry_run(&self, files: &[FileRecord]) -> Result<CostEstimate> {
        estimate_run(&self.config, &self.root, files, false)
    }

    /// Analyzes and indexes every file whose hash changed, or every file
    /// when `force` is set. A forced run also drops recorded files that are
    /// missing from `files`.
    pub async fn run(&self, files: &[FileRecord], force: bool) -> Result<PipelineResult> {
        let start = Instant::now();
        let mut state = IndexState::load(&self.root)?;
        let mut stored = self.load_stored_analyses();
        let mut result = PipelineResult::default();

        if force {
            let removed = self
                .purge_missing(files, &mut state, &mut stored, &mut result.errors)
                .await;
            result.files_removed = removed.len();
        }

        let mut changed = Vec::new();
        for file in files {
            if force || state.is_file_changed(&file.relative_path, &file.content_hash) {
                changed.push(file.clone());
            } else {
                result.files_skipped += 1;
            }
        }
        if changed.is_empty() && result.files_removed == 0 {
            info!("All {} files are up to date", files.len());
            result.duration = start.elapsed();
            return Ok(result);
        }

        let outcome = self.batcher().process_files(&changed).await;
        result.total_input_tokens = outcome.input_tokens;
        result.total_output_tokens = outcome.output_tokens;
        result.files_failed = outcome.errors.len();
        result.errors = outcome.errors.iter().map(|e| e.to_string()).collect();

        let indexed = self
            .index_outcome(outcome, &changed, &mut state, &mut stored, &mut result.errors)
            .await;
        result.files_failed += indexed.failed;
        result.files_processed = indexed.analyses.len();
        result.analyses = indexed.analyses;
        self.refresh_reverse_dependencies(&stored, &mut result.errors)
            .await;

        save_analyses(&self.root, &stored)?;
        self.store.persist(&self.snapshot_dir()).await?;
        state.last_commit_sha = self.detector.head_commit(&self.root);
        state.save(&self.root)?;

        result.estimated_cost = estimate_cost(
            &self.config.model,
            result.total_input_tokens,
            result.total_output_tokens,
        );
        result.duration = start.elapsed();
        info!(
            "Indexed {} files ({} skipped, {} failed, {} removed) in {:?}",
            result.files_processed,
            result.files_skipped,
            result.files_failed,
            result.files_removed,
            result.duration
        );
        Ok(result)
    }

    /// Incremental update from the last indexed commit. `files` is the current
    /// scan; only files in it are analyzed.
    pub async fn update(&self, files: &[FileRecord], force: bool) -> Result<UpdateResult> {
        let start = Instant::now();
        let mut state = IndexState::load(&self.root)?;
        if state.is_empty() {
            return Err(IndexerError::NoIndex);
        }
        let mut stored = self.load_stored_analyses();
        let mut result = UpdateResult::default();

        let to_process: Vec<FileRecord>;
        let mut directly_changed = Vec::new();
        if force {
            info!("Force mode: re-processing all {} files", files.len());
            result.deleted = self
                .purge_missing(files, &mut state, &mut stored, &mut result.errors)
                .await;
            to_process = files.to_vec();
        } else {
            let changes = if state.last_commit_sha.is_empty() {
                changes_from_hashes(&state, files)
            } else {
                self.detector.diff(&self.root, &state.last_commit_sha)?
            };
            if changes.is_empty() {
                info!("No changes since last index");
                result.duration = start.elapsed();
                return Ok(result);
            }
            info!(
                "Changes detected: {} modified, {} added, {} deleted",
                changes.modified.len(),
                changes.added.len(),
                changes.deleted.len()
            );

            for path in &changes.deleted {
                self.remove_file(path, &mut state, &mut stored, &mut result.errors)
                    .await;
            }

            directly_changed = changes.directly_changed();
            let expansion = expand_changed_files(&directly_changed, &stored);
            if !expansion.affected_only.is_empty() {
                info!(
                    "Dependency analysis: {} directly changed files affect {} more",
                    directly_changed.len(),
                    expansion.affected_only.len()
                );
            }
            let wanted: HashSet<&str> = expansion.expanded.iter().map(|s| s.as_str()).collect();
            to_process = files
                .iter()
                .filter(|f| wanted.contains(f.relative_path.as_str()))
                .cloned()
                .collect();

            result.modified = changes.modified;
            result.added = changes.added;
            result.deleted = changes.deleted;
            result.dependency_affected = expansion.affected_only;
        }

        let outcome = self.batcher().process_files(&to_process).await;
        result.total_input_tokens = outcome.input_tokens;
        result.total_output_tokens = outcome.output_tokens;
        result.files_failed = outcome.errors.len();
        result.errors.extend(outcome.errors.iter().map(|e| e.to_string()));

        let indexed = self
            .index_outcome(outcome, &to_process, &mut state, &mut stored, &mut result.errors)
            .await;
        result.files_failed += indexed.failed;
        result.files_processed = indexed.analyses.len();
        self.refresh_reverse_dependencies(&stored, &mut result.errors)
            .await;

        save_analyses(&self.root, &stored)?;
        self.store.persist(&self.snapshot_dir()).await?;

        if force {
            result.advice = Some(RegenerationAdvice::regenerate_everything("forced update"));
        } else if result.files_processed > 0 || !result.deleted.is_empty() {
            let advisor = RegenerationAdvisor::new(self.provider.clone(), &self.config.model);
            let advice = advisor
                .decide(&directly_changed, &result.dependency_affected, &stored)
                .await
                .unwrap_or_else(|e| {
                    warn!("Regeneration decision failed, regenerating all: {}", e);
                    RegenerationAdvice::regenerate_everything(e.to_string())
                });
            result.advice = Some(advice);
        }

        state.last_commit_sha = self.detector.head_commit(&self.root);
        state.save(&self.root)?;

        result.estimated_cost = estimate_cost(
            &self.config.model,
            result.total_input_tokens,
            result.total_output_tokens,
        );
        result.duration = start.elapsed();
        Ok(result)
    }

    fn tenant(&self) -> Option<&str> {
        self.config.tenant_id.as_deref()
    }

    fn snapshot_dir(&self) -> PathBuf {
        vectordb_dir(&self.root, &self.config)
    }

    /// Removes one file from the store, the state and the analyses.
    async fn remove_file(
        &self,
        path: &str,
        state: &mut IndexState,
        stored: &mut AnalysisMap,
        errors: &mut Vec<String>,
    ) {
        if let Err(e) = self.store.delete_by_file_path(path, self.tenant()).await {
            warn!("Failed to delete documents for {}: {}", path, e);
            errors.push(format!("delete docs for {}: {}", path, e));
        }
        state.file_hashes.remove(path);
        stored.remove(path);
    }

    /// Removes recorded files that are absent from `files`. Returns their paths, sorted.
    async fn purge_missing(
        &self,
        files: &[FileRecord],
        state: &mut IndexState,
        stored: &mut AnalysisMap,
        errors: &mut Vec<String>,
    ) -> Vec<String> {
        let scanned: HashSet<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        let missing: BTreeSet<String> = state
            .file_hashes
            .keys()
            .chain(stored.keys())
            .filter(|path| !scanned.contains(path.as_str()))
            .cloned()
            .collect();

        for path in &missing {
            self.remove_file(path, state, stored, errors).await;
        }
        if !missing.is_empty() {
            info!("Removed {} files that are no longer scanned", missing.len());
        }
        missing.into_iter().collect()
    }

    /// Replaces the reverse-dependency documents with the set derived from
    /// `analyses`. Failures are recorded, never raised.
    async fn refresh_reverse_dependencies(&self, analyses: &AnalysisMap, errors: &mut Vec<String>) {
        let docs = reverse_dependency_documents(analyses, self.tenant(), unix_now());
        let count = docs.len();
        match self.replace_reverse_dependencies(docs).await {
            Ok(()) => debug!("Indexed {} reverse-dependency documents", count),
            Err(e) => {
                warn!("Failed to store reverse-dependency documents: {}", e);
                errors.push(format!("store reverse-dependency docs: {}", e));
            }
        }
    }

    async fn replace_reverse_dependencies(&self, docs: Vec<Document>) -> StoreResult<()> {
        self.store
            .delete_by_type(DocumentType::Dependency, self.tenant())
            .await?;
        if docs.is_empty() {
            return Ok(());
        }
        self.store.add_documents(docs).await
    }

    fn batcher(&self) -> Batcher {
        let analyzer = Arc::new(FileAnalyzer::new(
            self.provider.clone(),
            self.config.quality,
            &self.config.model,
        ));
        Batcher::new(analyzer, &self.root, self.config.concurrency())
            .with_progress(self.on_progress.clone())
    }

    fn load_stored_analyses(&self) -> AnalysisMap {
        load_analyses(&self.root).unwrap_or_else(|e| {
            warn!("Could not load analyses cache: {}", e);
            AnalysisMap::new()
        })
    }

    /// Replaces each analyzed file's chunks, then records its hash and analysis.
    /// Files whose store update fails keep their previous state entry.
    async fn index_outcome(
        &self,
        outcome: BatchOutcome,
        scanned: &[FileRecord],
        state: &mut IndexState,
        stored: &mut AnalysisMap,
        errors: &mut Vec<String>,
    ) -> Indexed {
        let scan_hashes: HashMap<&str, &str> = scanned
            .iter()
            .map(|f| (f.relative_path.as_str(), f.content_hash.as_str()))
            .collect();
        let mut indexed = Indexed::default();

        for analysis in outcome.analyses {
            let path = analysis.file_path.clone();
            if let Err(e) = self.replace_chunks(&analysis).await {
                warn!("Failed to store documents for {}: {}", path, e);
                errors.push(format!("store docs for {}: {}", path, e));
                indexed.failed += 1;
                continue;
            }
            let hash = scan_hashes
                .get(path.as_str())
                .map(|h| h.to_string())
                .unwrap_or_else(|| analysis.content_hash.clone());
            state.file_hashes.insert(path.clone(), hash);
            stored.insert(path.clone(), analysis.clone());
            indexed.analyses.insert(path, analysis);
        }
        indexed
    }

    async fn replace_chunks(&self, analysis: &FileAnalysis) -> StoreResult<()> {
        let documents = chunk_analysis(analysis, self.config.quality, self.tenant());
        self.store
            .delete_by_file_path(&analysis.file_path, self.tenant())
            .await?;
        self.store.add_documents(documents).await
    }
}

/// Cost of analyzing the files whose hash differs from the recorded state, or
/// of every file when `force` is set. Needs no provider, so it works without
/// credentials.
pub fn estimate_run(
    config: &Config,
    root: &Path,
    files: &[FileRecord],
    force: bool,
) -> Result<CostEstimate> {
    let state = IndexState::load(root)?;
    let changed: Vec<&FileRecord> = files
        .iter()
        .filter(|f| force || state.is_file_changed(&f.relative_path, &f.content_hash))
        .collect();

    let tier = config.quality;
    let input_tokens: u64 = changed.iter().map(|f| estimate_tokens(f.size_bytes)).sum();
    let output_tokens = changed.len() as u64 * output_tokens_per_file(tier);

    let mut estimate = CostEstimate {
        total_files: changed.len(),
        total_tokens_estimate: input_tokens + output_tokens,
        ..CostEstimate::default()
    };
    estimate
        .cost_breakdown
        .insert(
            "analysis".to_string(),
            estimate_cost(&config.model, input_tokens, output_tokens),
        );
    // embeddings cover summaries, roughly half the source size
    estimate.cost_breakdown.insert(
        "embeddings".to_string(),
        estimate_embedding_cost(&config.embedding_model, input_tokens / 2),
    );
    if tier != QualityTier::Lite && !changed.is_empty() {
        estimate.cost_breakdown.insert(
            "architecture".to_string(),
            estimate_cost(
                &config.model,
                changed.len() as u64 * ARCHITECTURE_INPUT_PER_FILE,
                ARCHITECTURE_OUTPUT,
            ),
        );
    }
    estimate.estimated_cost = estimate.cost_breakdown.values().sum();
    Ok(estimate)
}

#[derive(Default)]
struct Indexed {
    analyses: AnalysisMap,
    failed: usize,
}

/// Change set for projects without commit history: compares the scan with
/// the recorded hashes.
fn changes_from_hashes(state: &IndexState, files: &[FileRecord]) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let mut seen = HashSet::new();
    for file in files {
        seen.insert(file.relative_path.as_str());
        match state.file_hashes.get(&file.relative_path) {
            None => changes.added.push(file.relative_path.clone()),
            Some(hash) if *hash != file.content_hash => {
                changes.modified.push(file.relative_path.clone())
            }
            Some(_) => {}
        }
    }
    changes.deleted = state
        .file_hashes
        .keys()
        .filter(|path| !seen.contains(path.as_str()))
        .cloned()
        .collect();
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::types::{Dependency, DependencyKind};
    use crate::test_support::{create_file, record, HashEmbedder, MockProvider};
    use crate::vectordb::MemoryVectorStore;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedDetector {
        changes: Mutex<ChangeSet>,
        head: String,
    }

    impl FixedDetector {
        fn new(changes: ChangeSet, head: &str) -> Arc<Self> {
            Arc::new(Self {
                changes: Mutex::new(changes),
                head: head.to_string(),
            })
        }
    }

    impl ChangeDetector for FixedDetector {
        fn diff(&self, _root: &Path, _last_commit: &str) -> Result<ChangeSet> {
            Ok(self.changes.lock().unwrap().clone())
        }

        fn head_commit(&self, _root: &Path) -> String {
            self.head.clone()
        }
    }

    fn pipeline(
        root: &Path,
        provider: Arc<MockProvider>,
        detector: Arc<FixedDetector>,
        quality: QualityTier,
    ) -> (Pipeline, Arc<MemoryVectorStore>) {
        let store = Arc::new(MemoryVectorStore::new(Arc::new(HashEmbedder::new(16))));
        let config = Config {
            quality,
            model: "claude-sonnet-4-20250514".into(),
            ..Config::default()
        };
        let pipeline = Pipeline::new(provider, store.clone(), detector, config, root);
        (pipeline, store)
    }

    #[test]
    fn test_dry_run_breakdown_sums_to_total() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(MockProvider::new("{}"));
        let (p, _) = pipeline(
            dir.path(),
            provider.clone(),
            FixedDetector::new(ChangeSet::default(), ""),
            QualityTier::Normal,
        );
        let files = vec![record("a.go", &"x".repeat(4000)), record("b.go", "package b")];

        let estimate = p.dry_run(&files).unwrap();
        assert_eq!(estimate.total_files, 2);
        assert_eq!(estimate.total_tokens_estimate, 1002 + 3000);
        assert!(estimate.cost_breakdown.contains_key("architecture"));
        let sum: f64 = estimate.cost_breakdown.values().sum();
        assert!((estimate.estimated_cost - sum).abs() < 1e-12);
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_dry_run_lite_has_no_architecture_pass() {
        let dir = TempDir::new().unwrap();
        let (p, _) = pipeline(
            dir.path(),
            Arc::new(MockProvider::new("{}")),
            FixedDetector::new(ChangeSet::default(), ""),
            QualityTier::Lite,
        );
        let estimate = p.dry_run(&[record("a.go", "x")]).unwrap();
        assert!(!estimate.cost_breakdown.contains_key("architecture"));
    }

    #[tokio::test]
    async fn test_run_then_rerun_skips_unchanged() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a.go", "package a");
        create_file(dir.path(), "b.go", "package b");
        let files = vec![record("a.go", "package a"), record("b.go", "package b")];

        let provider = Arc::new(MockProvider::new(r#"{"summary":"ok"}"#));
        let (p, store) = pipeline(
            dir.path(),
            provider.clone(),
            FixedDetector::new(ChangeSet::default(), "c1"),
            QualityTier::Lite,
        );

        let first = p.run(&files, false).await.unwrap();
        assert_eq!(first.files_processed, 2);
        assert_eq!(first.total_input_tokens, 200);
        assert!(first.estimated_cost > 0.0);
        assert!(store.count() >= 2);

        let state = IndexState::load(dir.path()).unwrap();
        assert_eq!(state.last_commit_sha, "c1");
        assert_eq!(state.file_hashes["a.go"], files[0].content_hash);
        assert!(vectordb_dir(dir.path(), p.config()).join(SNAPSHOT_FILE).exists());

        let second = p.run(&files, false).await.unwrap();
        assert_eq!(second.files_processed, 0);
        assert_eq!(second.files_skipped, 2);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_run_records_failures_and_keeps_going() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a.go", "package a");
        create_file(dir.path(), "b.go", "package b");
        let files = vec![record("a.go", "package a"), record("b.go", "package b")];

        let provider = Arc::new(MockProvider::new(r#"{"summary":"ok"}"#).fail_on("b.go"));
        let (p, _) = pipeline(
            dir.path(),
            provider,
            FixedDetector::new(ChangeSet::default(), ""),
            QualityTier::Lite,
        );
        let result = p.run(&files, false).await.unwrap();
        assert_eq!(result.files_processed, 1);
        assert_eq!(result.files_failed, 1);
        assert_eq!(result.errors.len(), 1);

        let state = IndexState::load(dir.path()).unwrap();
        assert!(state.file_hashes.contains_key("a.go"));
        assert!(!state.file_hashes.contains_key("b.go"));
    }

    #[tokio::test]
    async fn test_update_without_index_is_no_index() {
        let dir = TempDir::new().unwrap();
        let (p, _) = pipeline(
            dir.path(),
            Arc::new(MockProvider::new("{}")),
            FixedDetector::new(ChangeSet::default(), ""),
            QualityTier::Lite,
        );
        assert!(matches!(p.update(&[], false).await, Err(IndexerError::NoIndex)));
        assert!(matches!(p.open_store(true).await, Err(IndexerError::NoIndex)));
        assert!(!p.open_store(false).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_falls_back_to_everything_on_bad_advice() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a.go", "package a");
        let mut state = IndexState {
            last_commit_sha: "c1".into(),
            ..IndexState::default()
        };
        state.file_hashes.insert("a.go".into(), "old".into());
        state.save(dir.path()).unwrap();

        let provider = Arc::new(MockProvider::new(r#"{"summary":"ok"}"#));
        let changes = ChangeSet {
            modified: vec!["a.go".into()],
            ..ChangeSet::default()
        };
        let (p, _) = pipeline(
            dir.path(),
            provider,
            FixedDetector::new(changes, "c2"),
            QualityTier::Lite,
        );

        let result = p.update(&[record("a.go", "package a")], false).await.unwrap();
        assert_eq!(result.files_processed, 1);
        let advice = result.advice.unwrap();
        assert!(advice.project_overview && advice.architecture);
        assert!(advice.reasoning.starts_with("Regenerating everything"));
        assert_eq!(IndexState::load(dir.path()).unwrap().last_commit_sha, "c2");
    }

    #[tokio::test]
    async fn test_update_uses_advisor_answer() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a.go", "package a");
        let mut state = IndexState {
            last_commit_sha: "c1".into(),
            ..IndexState::default()
        };
        state.file_hashes.insert("a.go".into(), "old".into());
        state.save(dir.path()).unwrap();

        let provider = Arc::new(
            MockProvider::new(r#"{"summary":"ok"}"#).with_advice(
                "PROJECT_OVERVIEW: NO\nARCHITECTURE: NO\nFEATURE_PAGES: NO\nCOMPONENT_MAP: NO\nREASONING: small fix",
            ),
        );
        let changes = ChangeSet {
            modified: vec!["a.go".into()],
            ..ChangeSet::default()
        };
        let (p, _) = pipeline(dir.path(), provider.clone(), FixedDetector::new(changes, "c2"), QualityTier::Lite);

        let result = p.update(&[record("a.go", "package a")], false).await.unwrap();
        let advice = result.advice.unwrap();
        assert!(!advice.anything());
        assert_eq!(advice.reasoning, "small fix");
        // one analysis plus one advice call
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn test_changes_from_hashes() {
        let mut state = IndexState::default();
        state.file_hashes.insert("a.go".into(), record("a.go", "v1").content_hash);
        state.file_hashes.insert("b.go".into(), record("b.go", "same").content_hash);
        state.file_hashes.insert("gone.go".into(), "h".into());

        let files = vec![record("a.go", "v2"), record("b.go", "same"), record("new.go", "n")];
        let changes = changes_from_hashes(&state, &files);
        assert_eq!(changes.modified, vec!["a.go"]);
        assert_eq!(changes.added, vec!["new.go"]);
        assert_eq!(changes.deleted, vec!["gone.go"]);
    }

    #[tokio::test]
    async fn test_run_stores_dependency_map() {
        let dir = TempDir::new().unwrap();
        create_file(dir.path(), "a.go", "package a");
        let provider = Arc::new(MockProvider::new(
            r#"{"summary":"ok","dependencies":[{"name":"b","type":"import"}]}"#,
        ));
        let (p, _) = pipeline(
            dir.path(),
            provider,
            FixedDetector::new(ChangeSet::default(), ""),
            QualityTier::Lite,
        );
        let result = p.run(&[record("a.go", "package a")], false).await.unwrap();
        assert_eq!(
            result.analyses["a.go"].dependencies,
            vec![Dependency::new("b", DependencyKind::Import)]
        );
        let stored = load_analyses(dir.path()).unwrap();
        assert_eq!(stored["a.go"].dependencies.len(), 1);
    }
}
