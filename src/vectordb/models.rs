use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =====================================================
// Documents
// =====================================================

/// Kind of searchable chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    File,
    Function,
    Class,
    Module,
    Architecture,
    /// Reverse-dependency summary for a dependency shared by several files
    Dependency,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::File => "file",
            DocumentType::Function => "function",
            DocumentType::Class => "class",
            DocumentType::Module => "module",
            DocumentType::Architecture => "architecture",
            DocumentType::Dependency => "dependency",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(DocumentType::File),
            "function" => Ok(DocumentType::Function),
            "class" => Ok(DocumentType::Class),
            "module" => Ok(DocumentType::Module),
            "architecture" => Ok(DocumentType::Architecture),
            "dependency" => Ok(DocumentType::Dependency),
            other => Err(format!(
                "unknown document type {:?} (expected file, function, class, module, architecture or dependency)",
                other
            )),
        }
    }
}

/// Typed metadata attached to every document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source file relative to the project root, or the dependency name for
    /// [`DocumentType::Dependency`] documents
    pub file_path: String,
    /// 0 when unknown
    pub line_start: u32,
    pub line_end: u32,
    pub content_hash: String,
    pub doc_type: DocumentType,
    pub language: String,
    /// Symbol name for function/class chunks, empty otherwise
    pub symbol: String,
    /// Repository scope, empty when the store holds one repository
    pub tenant_id: String,
    /// Unix seconds
    pub last_updated: u64,
}

impl DocumentMetadata {
    pub fn new(file_path: impl Into<String>, doc_type: DocumentType) -> Self {
        Self {
            file_path: file_path.into(),
            line_start: 0,
            line_end: 0,
            content_hash: String::new(),
            doc_type,
            language: String::new(),
            symbol: String::new(),
            tenant_id: String::new(),
            last_updated: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
}

// =====================================================
// Search
// =====================================================

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

/// Exact-match narrowing on metadata. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub doc_type: Option<DocumentType>,
    pub file_path: Option<String>,
    pub language: Option<String>,
    pub tenant_id: Option<String>,
}

impl SearchFilter {
    pub fn by_type(doc_type: DocumentType) -> Self {
        Self {
            doc_type: Some(doc_type),
            ..Self::default()
        }
    }

    pub fn by_file(file_path: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.doc_type.is_none()
            && self.file_path.is_none()
            && self.language.is_none()
            && self.tenant_id.is_none()
    }

    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        self.doc_type.map_or(true, |t| t == metadata.doc_type)
            && self
                .file_path
                .as_deref()
                .map_or(true, |p| p == metadata.file_path)
            && self
                .language
                .as_deref()
                .map_or(true, |l| l == metadata.language)
            && self
                .tenant_id
                .as_deref()
                .map_or(true, |t| t == metadata.tenant_id)
    }
}
