//! Persisted index state and the last known analyses.
//!
//! Both live under `<root>/.doc-indexer/` and are written through a temporary
//! file and a rename, so a crash keeps the previous version intact. The vector
//! snapshot lives under the configured output directory instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::chunker::unix_now;
use super::types::AnalysisMap;
use crate::config::Config;
use crate::error::{IndexerError, Result};
use crate::vectordb::snapshot::write_atomic;

pub const STATE_FILE: &str = "state.json";
pub const ANALYSES_FILE: &str = "analyses.json";
pub const VECTORDB_DIR: &str = "vectordb";

pub fn state_dir(root: &Path) -> PathBuf {
    Config::state_dir(root)
}

/// Directory holding the vector store snapshot: `<root>/<output_dir>/vectordb`
pub fn vectordb_dir(root: &Path, config: &Config) -> PathBuf {
    root.join(&config.output_dir).join(VECTORDB_DIR)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexState {
    /// Empty when the project is not under version control
    pub last_commit_sha: String,
    pub file_hashes: BTreeMap<String, String>,
    /// Unix seconds of the last save
    pub last_updated: u64,
}

impl IndexState {
    /// Missing file gives the zero state.
    pub fn load(root: &Path) -> Result<Self> {
        let path = state_dir(root).join(STATE_FILE);
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                IndexerError::State(format!("{} is corrupt: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&mut self, root: &Path) -> Result<()> {
        self.last_updated = unix_now();
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(&state_dir(root).join(STATE_FILE), &bytes)
            .map_err(|e| IndexerError::State(format!("save state: {}", e)))
    }

    /// True for paths never seen or whose hash differs.
    pub fn is_file_changed(&self, path: &str, content_hash: &str) -> bool {
        self.file_hashes
            .get(path)
            .map_or(true, |stored| stored != content_hash)
    }

    /// No commit and no hashes: nothing was ever indexed here.
    pub fn is_empty(&self) -> bool {
        self.last_commit_sha.is_empty() && self.file_hashes.is_empty()
    }
}

/// Missing file gives an empty map.
pub fn load_analyses(root: &Path) -> Result<AnalysisMap> {
    let path = state_dir(root).join(ANALYSES_FILE);
    match std::fs::read(&path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            IndexerError::State(format!("{} is corrupt: {}", path.display(), e))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AnalysisMap::new()),
        Err(e) => Err(e.into()),
    }
}

pub fn save_analyses(root: &Path, analyses: &AnalysisMap) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(analyses)?;
    write_atomic(&state_dir(root).join(ANALYSES_FILE), &bytes)
        .map_err(|e| IndexerError::State(format!("save analyses: {}", e)))
}
