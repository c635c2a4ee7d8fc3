//! Turns one [`FileAnalysis`] into searchable documents.
//!
//! IDs are derived from the file path and symbol name only, so re-chunking the
//! same analysis replaces documents instead of duplicating them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use super::types::{AnalysisMap, ClassDoc, FileAnalysis, FunctionDoc};
use crate::config::QualityTier;
use crate::vectordb::{Document, DocumentMetadata, DocumentType};

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Chunks an analysis, stamping documents with the current time.
pub fn chunk_analysis(
    analysis: &FileAnalysis,
    tier: QualityTier,
    tenant_id: Option<&str>,
) -> Vec<Document> {
    chunk_analysis_at(analysis, tier, tenant_id, unix_now())
}

/// Same as [`chunk_analysis`] with an explicit `last_updated` stamp.
pub fn chunk_analysis_at(
    analysis: &FileAnalysis,
    tier: QualityTier,
    tenant_id: Option<&str>,
    last_updated: u64,
) -> Vec<Document> {
    let chunker = Chunker {
        analysis,
        tenant_id: tenant_id.unwrap_or_default(),
        last_updated,
    };
    let mut docs = vec![chunker.file_document()];

    if let Some(deps) = chunker.dependency_document() {
        docs.push(deps);
    }

    if tier != QualityTier::Lite {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for function in &analysis.functions {
            let id = unique_id(&mut seen, chunker.id("func", &function.name));
            docs.push(chunker.function_document(id, function));
        }
        for class in &analysis.classes {
            let id = unique_id(&mut seen, chunker.id("class", &class.name));
            docs.push(chunker.class_document(id, class));
        }
    }

    if tier == QualityTier::Max {
        if let Some(module) = chunker.module_document() {
            docs.push(module);
        }
    }

    docs
}

/// One [`DocumentType::Dependency`] document per dependency name declared by
/// two or more files, listing every file a change to it could affect.
///
/// The set is derived from all analyses at once, so callers replace the whole
/// set rather than patching it per file.
pub fn reverse_dependency_documents(
    analyses: &AnalysisMap,
    tenant_id: Option<&str>,
    last_updated: u64,
) -> Vec<Document> {
    let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (path, analysis) in analyses {
        for dep in &analysis.dependencies {
            let name = dep.name.trim();
            if !name.is_empty() {
                dependents.entry(name).or_default().insert(path.as_str());
            }
        }
    }

    let tenant = tenant_id.unwrap_or_default();
    dependents
        .into_iter()
        .filter(|(_, files)| files.len() >= 2)
        .map(|(name, files)| {
            let mut lines = vec![
                format!("Dependency: {}", name),
                format!("Used by {} files (blast radius):", files.len()),
            ];
            lines.extend(files.iter().map(|f| format!("- {} depends on {}", f, name)));
            lines.push(format!(
                "Changes to {} could affect all {} files listed above.",
                name,
                files.len()
            ));

            let mut metadata = DocumentMetadata::new(name, DocumentType::Dependency);
            metadata.symbol = "reverse-dependency".to_string();
            metadata.tenant_id = tenant.to_string();
            metadata.last_updated = last_updated;
            Document {
                id: scoped_id(
                    tenant,
                    format!("reverse-dep:{}", name.to_lowercase().replace('/', "-")),
                ),
                content: lines.join("\n"),
                metadata,
            }
        })
        .collect()
}

/// Prefixes `id` with the tenant so repositories sharing a store never collide.
fn scoped_id(tenant_id: &str, id: String) -> String {
    if tenant_id.is_empty() {
        id
    } else {
        format!("{}/{}", tenant_id, id)
    }
}

/// Appends `#n` to the second and later occurrences of an id.
fn unique_id(seen: &mut HashMap<String, usize>, id: String) -> String {
    let count = seen.entry(id.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        id
    } else {
        format!("{}#{}", id, count)
    }
}

struct Chunker<'a> {
    analysis: &'a FileAnalysis,
    tenant_id: &'a str,
    last_updated: u64,
}

impl<'a> Chunker<'a> {
    fn id(&self, kind: &str, symbol: &str) -> String {
        let base = if symbol.is_empty() {
            format!("{}:{}", kind, self.analysis.file_path)
        } else {
            format!("{}:{}:{}", kind, self.analysis.file_path, symbol)
        };
        scoped_id(self.tenant_id, base)
    }

    fn metadata(&self, doc_type: DocumentType, symbol: &str) -> DocumentMetadata {
        DocumentMetadata {
            file_path: self.analysis.file_path.clone(),
            line_start: 0,
            line_end: 0,
            content_hash: self.analysis.content_hash.clone(),
            doc_type,
            language: self.analysis.language.clone(),
            symbol: symbol.to_string(),
            tenant_id: self.tenant_id.to_string(),
            last_updated: self.last_updated,
        }
    }

    fn file_document(&self) -> Document {
        let a = self.analysis;
        let mut lines = vec![
            format!("File: {}", a.file_path),
            format!("Language: {}", a.language),
            format!("Summary: {}", a.summary),
        ];
        if !a.purpose.is_empty() {
            lines.push(format!("Purpose: {}", a.purpose));
        }
        if !a.dependencies.is_empty() {
            let deps: Vec<String> = a
                .dependencies
                .iter()
                .map(|d| format!("{} ({})", d.name, d.kind))
                .collect();
            lines.push(format!("Dependencies: {}", deps.join(", ")));
        }
        if !a.key_logic.is_empty() {
            lines.push(format!("Key Logic: {}", a.key_logic.join("; ")));
        }

        Document {
            id: self.id("file", ""),
            content: lines.join("\n"),
            metadata: self.metadata(DocumentType::File, ""),
        }
    }

    /// Blast-radius document listing non-import dependencies
    fn dependency_document(&self) -> Option<Document> {
        let a = self.analysis;
        let service_deps: Vec<_> = a.dependencies.iter().filter(|d| d.is_service_level()).collect();
        if service_deps.is_empty() {
            return None;
        }

        let mut lines = vec![
            format!("File: {}", a.file_path),
            format!("Language: {}", a.language),
            "Service dependencies and blast radius:".to_string(),
        ];
        for dep in service_deps {
            lines.push(format!(
                "- Depends on {} ({}). Changes to {} may affect {}.",
                dep.name, dep.kind, dep.name, a.file_path
            ));
        }

        Some(Document {
            id: self.id("deps", ""),
            content: lines.join("\n"),
            metadata: self.metadata(DocumentType::File, "dependencies"),
        })
    }

    fn function_document(&self, id: String, function: &FunctionDoc) -> Document {
        let mut metadata = self.metadata(DocumentType::Function, &function.name);
        metadata.line_start = function.line_start;
        metadata.line_end = function.line_end;
        Document {
            id,
            content: function_content(&self.analysis.file_path, function),
            metadata,
        }
    }

    fn class_document(&self, id: String, class: &ClassDoc) -> Document {
        let mut metadata = self.metadata(DocumentType::Class, &class.name);
        metadata.line_start = class.line_start;
        metadata.line_end = class.line_end;
        Document {
            id,
            content: class_content(&self.analysis.file_path, class),
            metadata,
        }
    }

    fn module_document(&self) -> Option<Document> {
        let a = self.analysis;
        if a.key_logic.is_empty() {
            return None;
        }
        let mut lines = vec![format!("Module: {}", a.file_path)];
        if !a.purpose.is_empty() {
            lines.push(format!("Purpose: {}", a.purpose));
        }
        lines.push("Key logic:".to_string());
        lines.extend(a.key_logic.iter().map(|k| format!("- {}", k)));

        Some(Document {
            id: self.id("module", ""),
            content: lines.join("\n"),
            metadata: self.metadata(DocumentType::Module, ""),
        })
    }
}

fn function_content(file_path: &str, f: &FunctionDoc) -> String {
    let mut lines = vec![format!("Function: {}", f.name)];
    if !f.signature.is_empty() {
        lines.push(format!("Signature: {}", f.signature));
    }
    lines.push(format!("Summary: {}", f.summary));
    if !f.parameters.is_empty() {
        let params: Vec<String> = f
            .parameters
            .iter()
            .map(|p| format!("{} ({}): {}", p.name, p.param_type, p.description))
            .collect();
        lines.push(format!("Parameters: {}", params.join("; ")));
    }
    if !f.returns.is_empty() {
        lines.push(format!("Returns: {}", f.returns));
    }
    lines.push(format!("File: {}", file_path));
    lines.join("\n")
}

fn class_content(file_path: &str, c: &ClassDoc) -> String {
    let mut lines = vec![
        format!("Class/Type: {}", c.name),
        format!("Summary: {}", c.summary),
    ];
    if !c.fields.is_empty() {
        let fields: Vec<String> = c
            .fields
            .iter()
            .map(|f| format!("{} ({}): {}", f.name, f.field_type, f.description))
            .collect();
        lines.push(format!("Fields: {}", fields.join("; ")));
    }
    if !c.methods.is_empty() {
        let methods: Vec<String> = c
            .methods
            .iter()
            .map(|m| format!("{}: {}", m.name, m.summary))
            .collect();
        lines.push(format!("Methods: {}", methods.join("; ")));
    }
    lines.push(format!("File: {}", file_path));
    lines.join("\n")
}
