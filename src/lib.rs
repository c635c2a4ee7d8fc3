pub mod config;
pub mod embeddings;
pub mod error;
pub mod git;
pub mod indexer;
pub mod llm;
pub mod vectordb;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{Config, ProviderKind, QualityTier};
pub use embeddings::{create_embedder, Embedder};
pub use error::{AnalysisError, IndexerError, Result};
pub use git::{ChangeDetector, ChangeSet, GitChangeDetector};
pub use indexer::{
    CostEstimate, FileAnalysis, FileRecord, FileWalker, Pipeline, PipelineResult,
    RegenerationAdvice, UpdateResult,
};
pub use llm::{create_provider, CompletionProvider};
pub use vectordb::{
    format_results, Document, DocumentMetadata, DocumentType, MemoryVectorStore, SearchFilter,
    SearchResult, VectorStore,
};
