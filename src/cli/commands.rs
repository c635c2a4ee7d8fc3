use std::path::Path;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use doc_indexer::config::Config;
use doc_indexer::error::{IndexerError, Result};
use doc_indexer::indexer::state::{vectordb_dir, IndexState};
use doc_indexer::indexer::{
    estimate_run, CostEstimate, FileRecord, FileWalker, Pipeline, ProgressFn, UpdateResult,
};
use doc_indexer::vectordb::{
    format_results, DocumentType, MemoryVectorStore, SearchFilter, VectorStore, SNAPSHOT_FILE,
};
use doc_indexer::{create_embedder, create_provider, GitChangeDetector, RegenerationAdvice};

fn load_config(root: &Path, concurrency: Option<usize>) -> Result<Config> {
    let mut config = Config::load(root)?;
    if let Some(n) = concurrency {
        config.max_concurrency = n;
    }
    config.validate()?;
    Ok(config)
}

fn scan(root: &Path, config: &Config) -> Result<Vec<FileRecord>> {
    let files = FileWalker::from_config(config)?.walk(root)?;
    println!("Found {} files", files.len());
    Ok(files)
}

fn new_store(config: &Config) -> Result<Arc<MemoryVectorStore>> {
    Ok(Arc::new(MemoryVectorStore::new(create_embedder(config)?)))
}

fn build_pipeline(root: &Path, config: &Config, store: Arc<MemoryVectorStore>) -> Result<Pipeline> {
    Ok(Pipeline::new(
        create_provider(config)?,
        store,
        Arc::new(GitChangeDetector),
        config.clone(),
        root,
    ))
}

fn progress_bar(total: usize) -> (ProgressBar, ProgressFn) {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    let handle = pb.clone();
    let on_progress: ProgressFn = Arc::new(move |done: usize, total: usize, path: &str| {
        handle.set_length(total as u64);
        handle.set_position(done as u64);
        handle.set_message(path.to_string());
    });
    (pb, on_progress)
}

fn print_estimate(estimate: &CostEstimate, config: &Config) {
    println!("Cost estimate ({} quality, model {})", config.quality.as_str(), config.model);
    println!("  Files to analyze: {}", estimate.total_files);
    println!("  Estimated tokens: {}", estimate.total_tokens_estimate);
    for (operation, cost) in &estimate.cost_breakdown {
        println!("  {:<14} ${:.4}", operation, cost);
    }
    println!("  Total:         ${:.4}", estimate.estimated_cost);
    if let Some(budget) = config.budget() {
        println!("  Budget:        ${:.2}", budget);
    }
}

fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!("\nErrors ({}):", errors.len());
    for error in errors {
        println!("  {}", error);
    }
}

fn print_advice(advice: &RegenerationAdvice) {
    let mark = |yes: bool| if yes { "regenerate" } else { "keep" };
    println!("\nHigh-level documents:");
    println!("  Project overview: {}", mark(advice.project_overview));
    println!("  Architecture:     {}", mark(advice.architecture));
    println!("  Feature pages:    {}", mark(advice.feature_pages));
    println!("  Component map:    {}", mark(advice.component_map));
    if !advice.reasoning.is_empty() {
        println!("  Reason: {}", advice.reasoning);
    }
}

pub fn cost(root: &Path) -> Result<()> {
    let config = load_config(root, None)?;
    let files = scan(root, &config)?;
    let estimate = estimate_run(&config, root, &files, false)?;
    print_estimate(&estimate, &config);
    Ok(())
}

pub async fn generate(root: &Path, force: bool, concurrency: Option<usize>, yes: bool) -> Result<()> {
    let config = load_config(root, concurrency)?;
    let files = scan(root, &config)?;
    if files.is_empty() {
        println!("No files found to document.");
        return Ok(());
    }

    let estimate = estimate_run(&config, root, &files, force)?;
    print_estimate(&estimate, &config);
    estimate.ensure_within_budget(config.max_cost_usd, yes)?;

    let store = new_store(&config)?;
    let (pb, on_progress) = progress_bar(estimate.total_files);
    let pipeline = build_pipeline(root, &config, store)?.with_progress(Some(on_progress));
    pipeline.open_store(false).await?;

    let result = pipeline.run(&files, force).await;
    pb.finish_and_clear();
    let result = result?;

    println!(
        "\nProcessed {} files ({} skipped, {} failed, {} removed) in {:.1}s",
        result.files_processed,
        result.files_skipped,
        result.files_failed,
        result.files_removed,
        result.duration.as_secs_f64()
    );
    println!(
        "Tokens: {} in / {} out, about ${:.4}",
        result.total_input_tokens, result.total_output_tokens, result.estimated_cost
    );
    print_errors(&result.errors);
    Ok(())
}

pub async fn update(root: &Path, force: bool, concurrency: Option<usize>) -> Result<()> {
    let config = load_config(root, concurrency)?;
    let files = scan(root, &config)?;

    let store = new_store(&config)?;
    let (pb, on_progress) = progress_bar(0);
    let pipeline = build_pipeline(root, &config, store)?.with_progress(Some(on_progress));

    let result = update_index(&pipeline, &files, force).await;
    pb.finish_and_clear();
    let result = match result {
        Err(IndexerError::NoIndex) => {
            println!("No existing index found. Run `doc-indexer generate` first.");
            return Ok(());
        }
        other => other?,
    };

    if !force && !result.has_changes() {
        println!("No changes since last index.");
        return Ok(());
    }

    println!(
        "Changes: {} modified, {} added, {} deleted, {} affected through dependencies",
        result.modified.len(),
        result.added.len(),
        result.deleted.len(),
        result.dependency_affected.len()
    );
    println!(
        "Processed {} files ({} failed) in {:.1}s, about ${:.4}",
        result.files_processed,
        result.files_failed,
        result.duration.as_secs_f64(),
        result.estimated_cost
    );
    if let Some(advice) = &result.advice {
        print_advice(advice);
    }
    print_errors(&result.errors);
    Ok(())
}

async fn update_index(pipeline: &Pipeline, files: &[FileRecord], force: bool) -> Result<UpdateResult> {
    pipeline.open_store(true).await?;
    pipeline.update(files, force).await
}

pub async fn query(
    root: &Path,
    text: &str,
    limit: usize,
    doc_type: Option<String>,
    language: Option<String>,
    file: Option<String>,
) -> Result<()> {
    let config = load_config(root, None)?;
    let store = new_store(&config)?;
    load_snapshot(root, &config, store.as_ref()).await?;

    let doc_type = doc_type
        .map(|t| t.parse::<DocumentType>().map_err(IndexerError::Config))
        .transpose()?;
    let filter = SearchFilter {
        doc_type,
        file_path: file,
        language,
        tenant_id: config.tenant_id.clone(),
    };
    let filter = (!filter.is_empty()).then_some(filter);

    let results = store.search(text, limit, filter.as_ref()).await?;
    println!("{}", format_results(&results));
    Ok(())
}

pub async fn stats(root: &Path) -> Result<()> {
    let config = load_config(root, None)?;
    let state = IndexState::load(root)?;
    if state.is_empty() {
        println!("No index found. Run `doc-indexer generate` first.");
        return Ok(());
    }

    let store = new_store(&config)?;
    load_snapshot(root, &config, store.as_ref()).await?;

    println!("Index statistics:");
    println!(
        "  Last commit:  {}",
        if state.last_commit_sha.is_empty() {
            "(none)"
        } else {
            state.last_commit_sha.as_str()
        }
    );
    println!("  Tracked files: {}", state.file_hashes.len());
    println!("  Indexed files: {}", store.file_count()?);
    println!("  Documents:     {}", store.count());
    for (doc_type, count) in store.type_counts()? {
        println!("    {:<13} {}", doc_type.as_str(), count);
    }
    Ok(())
}

async fn load_snapshot(root: &Path, config: &Config, store: &MemoryVectorStore) -> Result<()> {
    let dir = vectordb_dir(root, config);
    if !dir.join(SNAPSHOT_FILE).exists() {
        return Err(IndexerError::NoIndex);
    }
    store.load(&dir).await?;
    Ok(())
}
