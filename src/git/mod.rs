use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{IndexerError, Result};

/// Files that changed between the last indexed commit and `HEAD`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }

    pub fn total(&self) -> usize {
        self.modified.len() + self.added.len() + self.deleted.len()
    }

    /// Modified then added, the files that need re-analysis.
    pub fn directly_changed(&self) -> Vec<String> {
        self.modified.iter().chain(&self.added).cloned().collect()
    }

    fn push(&mut self, status: ChangeStatus, path: String) {
        match status {
            ChangeStatus::Added => self.added.push(path),
            ChangeStatus::Modified => self.modified.push(path),
            ChangeStatus::Deleted => self.deleted.push(path),
        }
    }
}

/// Type of change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
}

impl ChangeStatus {
    pub fn from_git_status(status: &str) -> Option<Self> {
        match status.chars().next()? {
            'A' => Some(ChangeStatus::Added),
            'D' => Some(ChangeStatus::Deleted),
            'M' | 'T' => Some(ChangeStatus::Modified),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Deleted => "deleted",
        }
    }
}

/// Version-control accessor used by incremental updates.
pub trait ChangeDetector: Send + Sync {
    /// Changes from `last_commit` to the current head. Empty `last_commit`
    /// yields an empty set.
    fn diff(&self, root: &Path, last_commit: &str) -> Result<ChangeSet>;

    /// Current head commit, or an empty string outside version control.
    fn head_commit(&self, root: &Path) -> String;
}

/// [`ChangeDetector`] backed by the `git` command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitChangeDetector;

impl ChangeDetector for GitChangeDetector {
    fn diff(&self, root: &Path, last_commit: &str) -> Result<ChangeSet> {
        if last_commit.is_empty() {
            return Ok(ChangeSet::default());
        }

        let output = Command::new("git")
            .args(["diff", "--name-status", "--no-renames", last_commit, "HEAD"])
            .current_dir(root)
            .output()
            .map_err(|e| IndexerError::Git(format!("Failed to run git diff: {}", e)))?;

        if !output.status.success() {
            return Err(IndexerError::Git(format!(
                "git diff {}..HEAD failed: {}",
                last_commit,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let changes = parse_name_status(&String::from_utf8_lossy(&output.stdout));
        debug!(
            "git diff {}..HEAD: {} modified, {} added, {} deleted",
            last_commit,
            changes.modified.len(),
            changes.added.len(),
            changes.deleted.len()
        );
        Ok(changes)
    }

    fn head_commit(&self, root: &Path) -> String {
        match try_head_commit(root) {
            Ok(Some(sha)) => sha,
            Ok(None) => {
                debug!("{} has no git history, recording no commit", root.display());
                String::new()
            }
            Err(e) => {
                warn!("Could not read HEAD in {}: {}", root.display(), e);
                String::new()
            }
        }
    }
}

/// Resolves `HEAD`. `Ok(None)` when `root` is not a repository or has no
/// commits yet; `Err` when git cannot be run or fails for another reason.
pub fn try_head_commit(root: &Path) -> Result<Option<String>> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(root)
        .output()
        .map_err(|e| IndexerError::Git(format!("Failed to run git rev-parse: {}", e)))?;

    if output.status.success() {
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        return Ok((!sha.is_empty()).then_some(sha));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if is_missing_history(&stderr) {
        return Ok(None);
    }
    Err(IndexerError::Git(format!(
        "git rev-parse HEAD failed: {}",
        stderr.trim()
    )))
}

fn is_missing_history(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("not a git repository")
        || stderr.contains("unknown revision")
        || stderr.contains("ambiguous argument 'head'")
}

pub fn parse_name_status(stdout: &str) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for (status, path) in stdout.lines().filter_map(parse_diff_line) {
        changes.push(status, path);
    }
    changes
}

fn parse_diff_line(line: &str) -> Option<(ChangeStatus, String)> {
    let (status, path) = line.split_once('\t')?;
    let status = ChangeStatus::from_git_status(status.trim())?;
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    Some((status, path.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_change_status_from_git_status() {
        assert_eq!(ChangeStatus::from_git_status("A"), Some(ChangeStatus::Added));
        assert_eq!(ChangeStatus::from_git_status("M"), Some(ChangeStatus::Modified));
        assert_eq!(ChangeStatus::from_git_status("D"), Some(ChangeStatus::Deleted));
        assert_eq!(ChangeStatus::from_git_status("T"), Some(ChangeStatus::Modified));
        assert_eq!(ChangeStatus::from_git_status("X"), None);
    }

    #[test]
    fn test_parse_diff_line() {
        let (status, path) = parse_diff_line("M\tsrc/main.rs").unwrap();
        assert_eq!(status, ChangeStatus::Modified);
        assert_eq!(path, "src/main.rs");

        let (status, path) = parse_diff_line("A\tdir with space/new file.rs").unwrap();
        assert_eq!(status, ChangeStatus::Added);
        assert_eq!(path, "dir with space/new file.rs");

        assert!(parse_diff_line("garbage").is_none());
    }

    #[test]
    fn test_parse_name_status() {
        let changes = parse_name_status("M\ta.go\nA\tb.go\nD\tc.go\nM\td.go\n");
        assert_eq!(changes.modified, vec!["a.go", "d.go"]);
        assert_eq!(changes.added, vec!["b.go"]);
        assert_eq!(changes.deleted, vec!["c.go"]);
        assert_eq!(changes.total(), 4);
        assert_eq!(changes.directly_changed(), vec!["a.go", "d.go", "b.go"]);
    }

    #[test]
    fn test_empty_last_commit_is_empty_diff() {
        let dir = TempDir::new().unwrap();
        let changes = GitChangeDetector.diff(dir.path(), "").unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_head_commit_outside_repo_is_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(GitChangeDetector.head_commit(dir.path()), "");
    }

    #[test]
    fn test_try_head_commit_distinguishes_missing_repo() {
        let dir = TempDir::new().unwrap();
        if !git(dir.path(), &["--version"]) {
            // git unavailable
            assert!(matches!(try_head_commit(dir.path()), Err(IndexerError::Git(_))));
            return;
        }
        assert!(matches!(try_head_commit(dir.path()), Ok(None)));

        assert!(git(dir.path(), &["init", "-q"]));
        assert!(matches!(try_head_commit(dir.path()), Ok(None)));
    }

    #[test]
    fn test_try_head_commit_missing_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        assert!(matches!(try_head_commit(&missing), Err(IndexerError::Git(_))));
    }

    #[test]
    fn test_missing_history_messages() {
        assert!(is_missing_history(
            "fatal: not a git repository (or any of the parent directories): .git"
        ));
        assert!(is_missing_history(
            "fatal: ambiguous argument 'HEAD': unknown revision or path not in the working tree."
        ));
        assert!(!is_missing_history("fatal: unable to read tree 1234abcd"));
    }

    #[test]
    fn test_diff_against_real_repo() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        if !git(root, &["init", "-q"]) {
            // git unavailable
            return;
        }
        git(root, &["config", "user.email", "t@example.com"]);
        git(root, &["config", "user.name", "t"]);
        std::fs::write(root.join("a.go"), "package a").unwrap();
        std::fs::write(root.join("c.go"), "package c").unwrap();
        git(root, &["add", "."]);
        if !git(root, &["commit", "-q", "--no-gpg-sign", "-m", "one"]) {
            return;
        }
        let first = GitChangeDetector.head_commit(root);
        assert!(!first.is_empty());

        std::fs::write(root.join("a.go"), "package a // changed").unwrap();
        std::fs::write(root.join("b.go"), "package b").unwrap();
        std::fs::remove_file(root.join("c.go")).unwrap();
        git(root, &["add", "-A"]);
        assert!(git(root, &["commit", "-q", "--no-gpg-sign", "-m", "two"]));

        let changes = GitChangeDetector.diff(root, &first).unwrap();
        assert_eq!(changes.modified, vec!["a.go"]);
        assert_eq!(changes.added, vec!["b.go"]);
        assert_eq!(changes.deleted, vec!["c.go"]);
    }
}
