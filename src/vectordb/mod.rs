//! Embedding-indexed document store.
//!
//! Callers replacing a file's chunks must call [`VectorStore::delete_by_file_path`]
//! before [`VectorStore::add_documents`] so no older chunk survives next to newer ones.
//! Deletes are scoped to one tenant; other tenants' documents for the same path stay.

pub mod format;
pub mod memory;
pub mod models;
pub mod snapshot;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use format::format_results;
pub use memory::MemoryVectorStore;
pub use models::*;
pub use snapshot::SNAPSHOT_FILE;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("unsupported snapshot format version {0}")]
    SnapshotVersion(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, VectorStoreError>;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upserts by id. On error nothing is applied.
    async fn add_documents(&self, docs: Vec<Document>) -> StoreResult<()>;

    /// Most similar documents first. An empty store yields no results.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> StoreResult<Vec<SearchResult>>;

    async fn get_by_file_path(&self, file_path: &str) -> StoreResult<Vec<Document>>;

    /// Removes the file's documents belonging to `tenant_id`. `None` addresses
    /// documents stored without a tenant. Removing nothing is not an error.
    async fn delete_by_file_path(&self, file_path: &str, tenant_id: Option<&str>)
        -> StoreResult<()>;

    /// Removes every document of `doc_type` belonging to `tenant_id`.
    async fn delete_by_type(&self, doc_type: DocumentType, tenant_id: Option<&str>)
        -> StoreResult<()>;

    async fn delete_by_tenant(&self, tenant_id: &str) -> StoreResult<()>;

    /// Writes a full snapshot into `dir`.
    async fn persist(&self, dir: &Path) -> StoreResult<()>;

    /// Replaces the whole collection from the snapshot in `dir`.
    async fn load(&self, dir: &Path) -> StoreResult<()>;

    fn count(&self) -> usize;
}
