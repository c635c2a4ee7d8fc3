use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use ignore::WalkBuilder;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::analyzer::compute_hash;
use super::types::FileRecord;
use crate::config::{Config, STATE_DIR};
use crate::error::{IndexerError, Result};

/// Files above this size are skipped (1 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1 << 20;

const BINARY_SNIFF_BYTES: usize = 512;

const EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    ("go", "go"),
    ("py", "python"),
    ("pyi", "python"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("mts", "typescript"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("java", "java"),
    ("rs", "rust"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("hxx", "cpp"),
    ("cs", "csharp"),
    ("rb", "ruby"),
    ("php", "php"),
    ("swift", "swift"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("scala", "scala"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("zsh", "shell"),
    ("sql", "sql"),
    ("proto", "protobuf"),
    ("tf", "terraform"),
    ("lua", "lua"),
    ("dart", "dart"),
    ("ex", "elixir"),
    ("exs", "elixir"),
    ("hs", "haskell"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("toml", "toml"),
];

const FILENAME_LANGUAGES: &[(&str, &str)] = &[
    ("Dockerfile", "dockerfile"),
    ("Makefile", "makefile"),
    ("Jenkinsfile", "groovy"),
    ("Gemfile", "ruby"),
    ("Rakefile", "ruby"),
];

pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    EXTENSION_LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

pub fn language_for_path(path: &Path) -> Option<&'static str> {
    let name = path.file_name().and_then(|n| n.to_str())?;
    if let Some((_, lang)) = FILENAME_LANGUAGES.iter().find(|(f, _)| *f == name) {
        return Some(lang);
    }
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(language_for_extension)
}

/// Default scanner: gitignore-aware walk, glob filters, parallel hashing.
pub struct FileWalker {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    max_file_size: u64,
}

impl FileWalker {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.include, &config.exclude)
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = if bytes == 0 { DEFAULT_MAX_FILE_SIZE } else { bytes };
        self
    }

    /// Records sorted by relative path.
    pub fn walk(&self, root: &Path) -> Result<Vec<FileRecord>> {
        let walker = WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .ignore(true)
            .filter_entry(|entry| entry.file_name() != STATE_DIR)
            .build();

        let mut candidates: Vec<(PathBuf, String, &'static str)> = Vec::new();
        for entry in walker.flatten() {
            let path = entry.path();
            if !entry.file_type().map_or(false, |t| t.is_file()) {
                continue;
            }
            let Some(relative) = relative_path(root, path) else {
                continue;
            };
            if !self.is_included(&relative) {
                continue;
            }
            let Some(language) = language_for_path(path) else {
                continue;
            };
            candidates.push((path.to_path_buf(), relative, language));
        }

        let mut records: Vec<FileRecord> = candidates
            .par_iter()
            .filter_map(|(path, relative, language)| {
                self.read_record(path, relative, language)
            })
            .collect();
        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        debug!("Scanned {} files under {}", records.len(), root.display());
        Ok(records)
    }

    /// Include and exclude patterns are tried against the path and the file name.
    pub fn is_included(&self, relative: &str) -> bool {
        let included = self.include.is_empty() || matches_any(&self.include, relative);
        included && !matches_any(&self.exclude, relative)
    }

    fn read_record(&self, path: &Path, relative: &str, language: &str) -> Option<FileRecord> {
        let size = fs::metadata(path).ok()?.len();
        if size > self.max_file_size {
            debug!("Skipping {} ({} bytes)", relative, size);
            return None;
        }
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable {}: {}", relative, e);
                return None;
            }
        };
        if is_binary(&content) {
            return None;
        }
        Some(FileRecord {
            relative_path: relative.to_string(),
            language: language.to_string(),
            content_hash: compute_hash(&content),
            size_bytes: size,
        })
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| IndexerError::Config(format!("bad glob {:?}: {}", p, e)))
        })
        .collect()
}

fn matches_any(patterns: &[Pattern], relative: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let name = relative.rsplit('/').next().unwrap_or(relative);
    patterns
        .iter()
        .any(|p| p.matches_with(relative, options) || p.matches_with(name, options))
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

fn is_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_SNIFF_BYTES).any(|b| *b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_excludes;
    use crate::test_support::create_file;
    use tempfile::TempDir;

    fn create_walker() -> FileWalker {
        FileWalker::new(&["**".to_string()], &default_excludes()).unwrap()
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.relative_path.as_str()).collect()
    }

    #[test]
    fn test_walk_recursive_sorted() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "root.rs", "");
        create_file(temp_dir.path(), "src/lib.rs", "");
        create_file(temp_dir.path(), "src/module/deep/file.go", "package deep");

        let files = create_walker().walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["root.rs", "src/lib.rs", "src/module/deep/file.go"]);
        assert_eq!(files[2].language, "go");
    }

    #[test]
    fn test_records_carry_hash_and_size() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "main.go", "package main");

        let files = create_walker().walk(temp_dir.path()).unwrap();
        assert_eq!(files[0].content_hash, compute_hash(b"package main"));
        assert_eq!(files[0].size_bytes, 12);
    }

    #[test]
    fn test_walk_ignores_unsupported_and_binary() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "main.rs", "fn main() {}");
        create_file(temp_dir.path(), "notes.txt", "hello");
        create_file(temp_dir.path(), "blob.c", "ab\0cd");

        let files = create_walker().walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["main.rs"]);
    }

    #[test]
    fn test_walk_applies_excludes() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "app.js", "x");
        create_file(temp_dir.path(), "app.min.js", "x");
        create_file(temp_dir.path(), "vendor/lib/dep.go", "package dep");
        create_file(temp_dir.path(), "node_modules/pkg/index.js", "x");

        let files = create_walker().walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["app.js"]);
    }

    #[test]
    fn test_include_patterns() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "cmd/main.go", "package main");
        create_file(temp_dir.path(), "web/app.ts", "x");

        let walker = FileWalker::new(&["*.go".to_string()], &[]).unwrap();
        let files = walker.walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["cmd/main.go"]);
    }

    #[test]
    fn test_size_limit() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "small.go", "package a");
        create_file(temp_dir.path(), "big.go", &"x".repeat(200));

        let walker = create_walker().with_max_file_size(100);
        let files = walker.walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["small.go"]);
    }

    #[test]
    fn test_walk_skips_hidden_and_state_dir() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "visible.rs", "fn main() {}");
        create_file(temp_dir.path(), ".hidden.rs", "fn hidden() {}");
        create_file(temp_dir.path(), ".doc-indexer/state.yml", "a: 1");

        let files = create_walker().walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["visible.rs"]);
    }

    #[test]
    fn test_walk_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(create_walker().walk(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_bad_glob_is_config_error() {
        assert!(matches!(
            FileWalker::new(&["[".to_string()], &[]),
            Err(IndexerError::Config(_))
        ));
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(language_for_path(Path::new("a/b.go")), Some("go"));
        assert_eq!(language_for_path(Path::new("Main.JAVA")), Some("java"));
        assert_eq!(language_for_path(Path::new("Dockerfile")), Some("dockerfile"));
        assert_eq!(language_for_path(Path::new("README")), None);
        assert_eq!(language_for_path(Path::new("data.bin")), None);
    }
}
