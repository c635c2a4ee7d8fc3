//! Dependency-aware invalidation.
//!
//! Matching is by declared dependency name against file paths, not by real
//! import resolution. A generic name such as `utils` can pull in unrelated
//! files; that imprecision is accepted.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use super::types::AnalysisMap;

/// Result of expanding a set of directly changed files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Directly changed files followed by everything reached through dependencies
    pub expanded: Vec<String>,
    /// Only the files reached through dependencies
    pub affected_only: Vec<String>,
}

/// Breadth-first walk over reverse declared dependencies, starting from
/// `directly_changed`. Each path is visited at most once, so cycles terminate.
pub fn expand_changed_files(directly_changed: &[String], analyses: &AnalysisMap) -> Expansion {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut expanded: Vec<String> = Vec::new();
    for path in directly_changed {
        if visited.insert(path.as_str()) {
            expanded.push(path.clone());
        }
    }
    if analyses.is_empty() {
        return Expansion {
            expanded,
            affected_only: Vec::new(),
        };
    }

    // dependency name -> files declaring it
    let mut reverse: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (owner, analysis) in analyses {
        for dep in &analysis.dependencies {
            if !dep.name.trim().is_empty() {
                reverse.entry(dep.name.as_str()).or_default().insert(owner.as_str());
            }
        }
    }

    let mut queue: VecDeque<&str> = expanded.iter().map(|s| s.as_str()).collect();
    let mut affected_only = Vec::new();

    while let Some(current) = queue.pop_front() {
        for (dep_name, owners) in &reverse {
            if !dep_matches_path(dep_name, current) {
                continue;
            }
            for owner in owners {
                if visited.insert(owner) {
                    affected_only.push(owner.to_string());
                    queue.push_back(owner);
                }
            }
        }
    }

    expanded.extend(affected_only.iter().cloned());
    Expansion {
        expanded,
        affected_only,
    }
}

fn normalize(value: &str) -> String {
    let value = value.trim().replace('\\', "/").replace("::", "/");
    value.trim_start_matches("./").trim_end_matches('/').to_string()
}

/// Whether a declared dependency name plausibly refers to the file at `path`.
pub fn dep_matches_path(dep_name: &str, path: &str) -> bool {
    let dep = normalize(dep_name);
    let path = normalize(path);
    if dep.is_empty() || path.is_empty() {
        return false;
    }
    if dep == path {
        return true;
    }

    let (dir, file_name) = match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path.as_str()),
    };
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let without_ext = if dir.is_empty() {
        stem.to_string()
    } else {
        format!("{}/{}", dir, stem)
    };

    // file-level: "b", "pkg/b", "github.com/x/pkg/b"
    if !stem.is_empty()
        && (dep == stem || dep == without_ext || dep.ends_with(&format!("/{}", without_ext)))
    {
        return true;
    }

    // package-level: the file's directory
    if dir.is_empty() {
        return false;
    }
    let dir_base = dir.rsplit('/').next().unwrap_or(dir);
    dep == dir
        || dep == dir_base
        || dep.ends_with(&format!("/{}", dir))
        || dep.contains(&format!("/{}/", dir))
}
