use std::fmt::Write;

use super::SearchResult;

/// Renders search hits as plain text for the terminal.
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "Found {} result(s):\n", results.len());

    for (i, r) in results.iter().enumerate() {
        let meta = &r.document.metadata;
        let _ = writeln!(out, "--- Result {} (similarity: {:.4}) ---", i + 1, r.similarity);

        if !meta.file_path.is_empty() {
            let mut location = meta.file_path.clone();
            if meta.line_start > 0 {
                let _ = write!(location, ":{}", meta.line_start);
                if meta.line_end > meta.line_start {
                    let _ = write!(location, "-{}", meta.line_end);
                }
            }
            let _ = writeln!(out, "File: {}", location);
        }
        let _ = writeln!(out, "Type: {}", meta.doc_type);
        if !meta.symbol.is_empty() {
            let _ = writeln!(out, "Symbol: {}", meta.symbol);
        }
        if !meta.language.is_empty() {
            let _ = writeln!(out, "Language: {}", meta.language);
        }
        if !meta.tenant_id.is_empty() {
            let _ = writeln!(out, "Repository: {}", meta.tenant_id);
        }

        out.push('\n');
        out.push_str(&r.document.content);
        out.push_str("\n\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectordb::{Document, DocumentMetadata, DocumentType};

    #[test]
    fn test_empty() {
        assert_eq!(format_results(&[]), "No results found.");
    }

    #[test]
    fn test_location_with_line_range() {
        let mut metadata = DocumentMetadata::new("src/lib.rs", DocumentType::Function);
        metadata.line_start = 3;
        metadata.line_end = 9;
        metadata.symbol = "run".into();
        let results = vec![SearchResult {
            document: Document {
                id: "func:src/lib.rs:run".into(),
                content: "Function: run".into(),
                metadata,
            },
            similarity: 0.5,
        }];

        let text = format_results(&results);
        assert!(text.starts_with("Found 1 result(s):"));
        assert!(text.contains("File: src/lib.rs:3-9"));
        assert!(text.contains("Symbol: run"));
        assert!(text.contains("(similarity: 0.5000)"));
    }
}
