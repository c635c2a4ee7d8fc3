pub mod analyzer;
pub mod batcher;
pub mod chunker;
pub mod deps;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod regen;
pub mod state;
pub mod types;
pub mod walker;

pub use analyzer::{compute_hash, parse_analysis, FileAnalyzer};
pub use batcher::Batcher;
pub use chunker::{chunk_analysis, chunk_analysis_at, reverse_dependency_documents};
pub use deps::{dep_matches_path, expand_changed_files, Expansion};
pub use pipeline::{estimate_run, Pipeline};
pub use progress::{IndexingProgress, ProgressSnapshot};
pub use regen::{parse_advice, RegenerationAdvice, RegenerationAdvisor};
pub use state::{load_analyses, save_analyses, IndexState};
pub use types::*;
pub use walker::FileWalker;
