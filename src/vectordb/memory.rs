use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::snapshot::{self, Snapshot, SnapshotDocument, FORMAT_VERSION};
use super::{
    Document, DocumentType, SearchFilter, SearchResult, StoreResult, VectorStore,
    VectorStoreError,
};
use crate::embeddings::Embedder;

struct Entry {
    document: Document,
    embedding: Vec<f32>,
}

/// In-memory store with brute-force cosine search.
///
/// Readers share the lock, writers take it exclusively. Embedding happens before
/// the lock is taken so a failed batch leaves the collection untouched.
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Entry>>> {
        self.entries.read().map_err(|_| VectorStoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Entry>>> {
        self.entries.write().map_err(|_| VectorStoreError::Poisoned)
    }

    async fn embed_checked(&self, texts: &[String]) -> StoreResult<Vec<Vec<f32>>> {
        let vectors = self
            .embedder
            .embed(texts)
            .await
            .map_err(|e| VectorStoreError::Embedding(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(VectorStoreError::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        let expected = self.embedder.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(VectorStoreError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }

    /// Document counts per type, for reporting.
    pub fn type_counts(&self) -> StoreResult<BTreeMap<DocumentType, usize>> {
        let entries = self.read()?;
        let mut counts = BTreeMap::new();
        for entry in entries.values() {
            *counts.entry(entry.document.metadata.doc_type).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Distinct source files with at least one document
    pub fn file_count(&self) -> StoreResult<usize> {
        let entries = self.read()?;
        let files: HashSet<&str> = entries
            .values()
            .filter(|e| e.document.metadata.doc_type != DocumentType::Dependency)
            .map(|e| e.document.metadata.file_path.as_str())
            .collect();
        Ok(files.len())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_documents(&self, docs: Vec<Document>) -> StoreResult<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embed_checked(&texts).await?;

        let mut entries = self.write()?;
        for (document, embedding) in docs.into_iter().zip(vectors) {
            entries.insert(
                document.id.clone(),
                Entry {
                    document,
                    embedding,
                },
            );
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> StoreResult<Vec<SearchResult>> {
        let size = self.count();
        if size == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.clamp(1, size);

        let query_vector = self
            .embed_checked(&[query.to_string()])
            .await?
            .pop()
            .unwrap_or_default();

        let entries = self.read()?;
        let mut scored: Vec<(f32, &Entry)> = entries
            .values()
            .filter(|e| filter.map_or(true, |f| f.matches(&e.document.metadata)))
            .map(|e| (cosine_similarity(&query_vector, &e.embedding), e))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.document.id.cmp(&b.1.document.id))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(similarity, e)| SearchResult {
                document: e.document.clone(),
                similarity,
            })
            .collect())
    }

    async fn get_by_file_path(&self, file_path: &str) -> StoreResult<Vec<Document>> {
        let entries = self.read()?;
        Ok(entries
            .values()
            .filter(|e| e.document.metadata.file_path == file_path)
            .map(|e| e.document.clone())
            .collect())
    }

    async fn delete_by_file_path(
        &self,
        file_path: &str,
        tenant_id: Option<&str>,
    ) -> StoreResult<()> {
        let tenant = tenant_id.unwrap_or_default();
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, e| {
            let meta = &e.document.metadata;
            meta.file_path != file_path || meta.tenant_id != tenant
        });
        debug!("Deleted {} documents for {}", before - entries.len(), file_path);
        Ok(())
    }

    async fn delete_by_type(
        &self,
        doc_type: DocumentType,
        tenant_id: Option<&str>,
    ) -> StoreResult<()> {
        let tenant = tenant_id.unwrap_or_default();
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, e| {
            let meta = &e.document.metadata;
            meta.doc_type != doc_type || meta.tenant_id != tenant
        });
        debug!("Deleted {} {} documents", before - entries.len(), doc_type);
        Ok(())
    }

    async fn delete_by_tenant(&self, tenant_id: &str) -> StoreResult<()> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, e| e.document.metadata.tenant_id != tenant_id);
        debug!("Deleted {} documents for tenant {}", before - entries.len(), tenant_id);
        Ok(())
    }

    async fn persist(&self, dir: &Path) -> StoreResult<()> {
        let snapshot = {
            let entries = self.read()?;
            Snapshot {
                format_version: FORMAT_VERSION,
                embedder: self.embedder.name().to_string(),
                dimensions: self.embedder.dimensions(),
                documents: entries
                    .values()
                    .map(|e| SnapshotDocument::encode(&e.document, &e.embedding))
                    .collect(),
            }
        };
        snapshot::write_snapshot(dir, &snapshot)?;
        debug!(
            "Persisted {} documents to {}",
            snapshot.documents.len(),
            dir.display()
        );
        Ok(())
    }

    async fn load(&self, dir: &Path) -> StoreResult<()> {
        let snapshot = snapshot::read_snapshot(dir)?;
        let expected = self.embedder.dimensions();
        if snapshot.dimensions != expected {
            return Err(VectorStoreError::DimensionMismatch {
                expected,
                actual: snapshot.dimensions,
            });
        }
        if snapshot.embedder != self.embedder.name() {
            warn!(
                "Snapshot was built with embedder {} but {} is configured",
                snapshot.embedder,
                self.embedder.name()
            );
        }

        let mut loaded = BTreeMap::new();
        for stored in snapshot.documents {
            let (document, embedding) = stored.decode()?;
            if embedding.len() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            loaded.insert(
                document.id.clone(),
                Entry {
                    document,
                    embedding,
                },
            );
        }

        *self.write()? = loaded;
        Ok(())
    }

    fn count(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::HashEmbedder;
    use crate::vectordb::DocumentMetadata;
    use tempfile::TempDir;

    fn doc(id: &str, path: &str, doc_type: DocumentType, content: &str) -> Document {
        let mut metadata = DocumentMetadata::new(path, doc_type);
        metadata.language = "go".into();
        Document {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }

    fn store() -> MemoryVectorStore {
        MemoryVectorStore::new(Arc::new(HashEmbedder::new(16)))
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = store();
        let results = store.search("anything", 10, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_by_id() {
        let store = store();
        store
            .add_documents(vec![doc("file:a.go", "a.go", DocumentType::File, "v1")])
            .await
            .unwrap();
        store
            .add_documents(vec![doc("file:a.go", "a.go", DocumentType::File, "v2")])
            .await
            .unwrap();
        assert_eq!(store.count(), 1);
        let docs = store.get_by_file_path("a.go").await.unwrap();
        assert_eq!(docs[0].content, "v2");
    }

    #[tokio::test]
    async fn test_search_ranks_exact_match_first_and_clamps_limit() {
        let store = store();
        store
            .add_documents(vec![
                doc("file:a.go", "a.go", DocumentType::File, "http router"),
                doc("file:b.go", "b.go", DocumentType::File, "database pool"),
            ])
            .await
            .unwrap();

        let results = store.search("database pool", 50, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "file:b.go");
        assert!(results[0].similarity >= results[1].similarity);

        let results = store.search("database pool", 0, None).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_search_with_filter() {
        let store = store();
        store
            .add_documents(vec![
                doc("file:a.go", "a.go", DocumentType::File, "alpha"),
                doc("func:a.go:Run", "a.go", DocumentType::Function, "alpha run"),
            ])
            .await
            .unwrap();

        let filter = SearchFilter::by_type(DocumentType::Function);
        let results = store.search("alpha", 10, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "func:a.go:Run");
    }

    #[tokio::test]
    async fn test_delete_by_file_path_is_idempotent() {
        let store = store();
        store
            .add_documents(vec![
                doc("file:a.go", "a.go", DocumentType::File, "a"),
                doc("func:a.go:X", "a.go", DocumentType::Function, "x"),
                doc("file:b.go", "b.go", DocumentType::File, "b"),
            ])
            .await
            .unwrap();

        store.delete_by_file_path("a.go", None).await.unwrap();
        assert_eq!(store.count(), 1);
        store.delete_by_file_path("a.go", None).await.unwrap();
        store.delete_by_file_path("missing.go", None).await.unwrap();
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_file_path_keeps_other_tenants() {
        let store = store();
        let mut a = doc("repo-a/file:main.go", "main.go", DocumentType::File, "a");
        a.metadata.tenant_id = "repo-a".into();
        let mut b = doc("repo-b/file:main.go", "main.go", DocumentType::File, "b");
        b.metadata.tenant_id = "repo-b".into();
        let plain = doc("file:main.go", "main.go", DocumentType::File, "plain");
        store.add_documents(vec![a, b.clone(), plain.clone()]).await.unwrap();

        store.delete_by_file_path("main.go", Some("repo-a")).await.unwrap();
        let mut left = store.get_by_file_path("main.go").await.unwrap();
        left.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(left, vec![plain, b.clone()]);

        store.delete_by_file_path("main.go", None).await.unwrap();
        assert_eq!(store.get_by_file_path("main.go").await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn test_delete_by_type_is_tenant_scoped() {
        let store = store();
        let mut shared = doc("reverse-dep:fmt", "fmt", DocumentType::Dependency, "fmt users");
        shared.metadata.tenant_id = "repo-a".into();
        let mut other = doc("repo-b/reverse-dep:fmt", "fmt", DocumentType::Dependency, "fmt");
        other.metadata.tenant_id = "repo-b".into();
        let mut file = doc("repo-a/file:a.go", "a.go", DocumentType::File, "a");
        file.metadata.tenant_id = "repo-a".into();
        store.add_documents(vec![shared, other, file]).await.unwrap();
        assert_eq!(store.file_count().unwrap(), 1);

        store
            .delete_by_type(DocumentType::Dependency, Some("repo-a"))
            .await
            .unwrap();
        assert_eq!(store.count(), 2);
        let counts = store.type_counts().unwrap();
        assert_eq!(counts[&DocumentType::Dependency], 1);
        assert_eq!(counts[&DocumentType::File], 1);
    }

    #[tokio::test]
    async fn test_delete_by_tenant() {
        let store = store();
        let mut a = doc("file:a.go", "a.go", DocumentType::File, "a");
        a.metadata.tenant_id = "repo-a".into();
        let mut b = doc("file:b.go", "b.go", DocumentType::File, "b");
        b.metadata.tenant_id = "repo-b".into();
        store.add_documents(vec![a, b]).await.unwrap();

        store.delete_by_tenant("repo-a").await.unwrap();
        assert_eq!(store.count(), 1);
        assert!(store.get_by_file_path("a.go").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_aborts_batch() {
        let store = MemoryVectorStore::new(Arc::new(HashEmbedder::with_reported_dimensions(8, 16)));
        let result = store
            .add_documents(vec![doc("file:a.go", "a.go", DocumentType::File, "a")])
            .await;
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch {
                expected: 16,
                actual: 8
            })
        ));
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_persist_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let original = store();
        let mut d = doc("func:a.go:Run", "a.go", DocumentType::Function, "run it");
        d.metadata.line_start = 4;
        d.metadata.line_end = 20;
        d.metadata.symbol = "Run".into();
        d.metadata.last_updated = 1_700_000_000;
        original
            .add_documents(vec![d.clone(), doc("file:a.go", "a.go", DocumentType::File, "a")])
            .await
            .unwrap();
        original.persist(dir.path()).await.unwrap();

        let restored = store();
        restored.load(dir.path()).await.unwrap();
        assert_eq!(restored.count(), original.count());
        let docs = restored.get_by_file_path("a.go").await.unwrap();
        assert!(docs.contains(&d));
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(store().load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_rejects_other_dimensions() {
        let dir = TempDir::new().unwrap();
        let original = store();
        original
            .add_documents(vec![doc("file:a.go", "a.go", DocumentType::File, "a")])
            .await
            .unwrap();
        original.persist(dir.path()).await.unwrap();

        let other = MemoryVectorStore::new(Arc::new(HashEmbedder::new(32)));
        assert!(matches!(
            other.load(dir.path()).await,
            Err(VectorStoreError::DimensionMismatch { .. })
        ));
        assert_eq!(other.count(), 0);
    }
}
