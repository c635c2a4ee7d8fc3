//! On-disk snapshot of the vector store.
//!
//! Metadata is flattened to string maps here and nowhere else.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Document, DocumentMetadata, StoreResult, VectorStoreError};

pub const SNAPSHOT_FILE: &str = "index.snapshot.json";

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    /// Name of the embedder that produced the vectors
    pub embedder: String,
    pub dimensions: usize,
    pub documents: Vec<SnapshotDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub id: String,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    pub embedding: Vec<f32>,
}

impl SnapshotDocument {
    pub fn encode(document: &Document, embedding: &[f32]) -> Self {
        Self {
            id: document.id.clone(),
            content: document.content.clone(),
            metadata: metadata_to_map(&document.metadata),
            embedding: embedding.to_vec(),
        }
    }

    pub fn decode(self) -> StoreResult<(Document, Vec<f32>)> {
        let metadata = map_to_metadata(&self.metadata)
            .map_err(|e| VectorStoreError::Snapshot(format!("document {}: {}", self.id, e)))?;
        Ok((
            Document {
                id: self.id,
                content: self.content,
                metadata,
            },
            self.embedding,
        ))
    }
}

pub fn metadata_to_map(m: &DocumentMetadata) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("file_path".to_string(), m.file_path.clone());
    map.insert("line_start".to_string(), m.line_start.to_string());
    map.insert("line_end".to_string(), m.line_end.to_string());
    map.insert("content_hash".to_string(), m.content_hash.clone());
    map.insert("type".to_string(), m.doc_type.as_str().to_string());
    map.insert("language".to_string(), m.language.clone());
    map.insert("symbol".to_string(), m.symbol.clone());
    map.insert("tenant_id".to_string(), m.tenant_id.clone());
    map.insert("last_updated".to_string(), m.last_updated.to_string());
    map
}

pub fn map_to_metadata(map: &BTreeMap<String, String>) -> Result<DocumentMetadata, String> {
    let text = |key: &str| map.get(key).cloned().unwrap_or_default();
    let number = |key: &str| -> Result<u64, String> {
        match map.get(key).map(|v| v.trim()) {
            None | Some("") => Ok(0),
            Some(v) => v
                .parse::<u64>()
                .map_err(|_| format!("{} is not a number: {:?}", key, v)),
        }
    };
    let line = |key: &str| -> Result<u32, String> {
        let value = number(key)?;
        u32::try_from(value).map_err(|_| format!("{} is out of range: {}", key, value))
    };

    let doc_type = map
        .get("type")
        .ok_or_else(|| "missing type".to_string())?
        .parse()?;

    Ok(DocumentMetadata {
        file_path: text("file_path"),
        line_start: line("line_start")?,
        line_end: line("line_end")?,
        content_hash: text("content_hash"),
        doc_type,
        language: text("language"),
        symbol: text("symbol"),
        tenant_id: text("tenant_id"),
        last_updated: number("last_updated")?,
    })
}

/// Writes `bytes` to `path` through a `.tmp` sibling and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

pub fn write_snapshot(dir: &Path, snapshot: &Snapshot) -> StoreResult<()> {
    let bytes = serde_json::to_vec(snapshot)
        .map_err(|e| VectorStoreError::Snapshot(format!("encode: {}", e)))?;
    write_atomic(&dir.join(SNAPSHOT_FILE), &bytes)?;
    Ok(())
}

pub fn read_snapshot(dir: &Path) -> StoreResult<Snapshot> {
    let path = dir.join(SNAPSHOT_FILE);
    let bytes = std::fs::read(&path)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)
        .map_err(|e| VectorStoreError::Snapshot(format!("{}: {}", path.display(), e)))?;
    if snapshot.format_version != FORMAT_VERSION {
        return Err(VectorStoreError::SnapshotVersion(snapshot.format_version));
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectordb::DocumentType;
    use tempfile::TempDir;

    fn sample_metadata() -> DocumentMetadata {
        DocumentMetadata {
            file_path: "pkg/server.go".into(),
            line_start: 10,
            line_end: 42,
            content_hash: "abc123".into(),
            doc_type: DocumentType::Function,
            language: "go".into(),
            symbol: "Serve".into(),
            tenant_id: "svc-a".into(),
            last_updated: 1_700_000_000,
        }
    }

    #[test]
    fn test_metadata_flattening_is_lossless() {
        let meta = sample_metadata();
        let map = metadata_to_map(&meta);
        assert_eq!(map["type"], "function");
        assert_eq!(map_to_metadata(&map).unwrap(), meta);
    }

    #[test]
    fn test_oversized_line_numbers_are_rejected() {
        let mut map = metadata_to_map(&sample_metadata());
        map.insert("line_end".into(), "4294967296".into());
        let err = map_to_metadata(&map).unwrap_err();
        assert!(err.contains("line_end"));

        map.insert("line_end".into(), u32::MAX.to_string());
        assert_eq!(map_to_metadata(&map).unwrap().line_end, u32::MAX);
    }

    #[test]
    fn test_missing_numbers_default_to_zero() {
        let mut map = metadata_to_map(&sample_metadata());
        map.remove("line_start");
        map.insert("line_end".into(), String::new());
        let meta = map_to_metadata(&map).unwrap();
        assert_eq!(meta.line_start, 0);
        assert_eq!(meta.line_end, 0);
    }

    #[test]
    fn test_bad_type_is_rejected() {
        let mut map = metadata_to_map(&sample_metadata());
        map.insert("type".into(), "widget".into());
        assert!(map_to_metadata(&map).is_err());
    }

    #[test]
    fn test_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let snapshot = Snapshot {
            format_version: 99,
            embedder: "e".into(),
            dimensions: 3,
            documents: vec![],
        };
        write_snapshot(dir.path(), &snapshot).unwrap();
        assert!(matches!(
            read_snapshot(dir.path()),
            Err(VectorStoreError::SnapshotVersion(99))
        ));
    }

    #[test]
    fn test_write_atomic_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        write_atomic(&path, b"{}").unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }
}
