use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use super::paths::is_addressable;
use crate::error::{AppError, AppResult};

/// Dependency, build and VCS metadata directories hidden from the editor by default.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules", ".git", ".next", ".turbo", ".cache", "dist", "build", "target", ".DS_Store",
];

/// Suffix of the gateway's in-flight temp files; never listed.
pub(crate) const TEMP_SUFFIX: &str = ".folio-tmp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    /// Root-relative, `/`-separated. Empty for the root.
    pub path: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    // Escape regex meta, then restore wildcards: ** -> .*, * -> [^/]*, ? -> [^/]
    let mut s = regex::escape(pattern);
    s = s.replace("\\*\\*", ".*");
    s = s.replace("\\*", "[^/]*");
    s = s.replace("\\?", "[^/]");
    Regex::new(&format!("^{}$", s))
}

static DEFAULTS: Lazy<ExcludeSet> = Lazy::new(|| ExcludeSet::new(DEFAULT_EXCLUDES.iter()).unwrap_or_default());

/// Names or globs matched against an entry's file name and its root-relative path.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<(String, Regex)>,
}

impl ExcludeSet {
    pub fn new<I, S>(patterns: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        set.add_all(patterns)?;
        Ok(set)
    }

    pub fn defaults() -> Self {
        DEFAULTS.clone()
    }

    fn add_all<I, S>(&mut self, patterns: I) -> AppResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for p in patterns {
            let p = p.as_ref().trim();
            if p.is_empty() || self.patterns.iter().any(|(q, _)| q == p) {
                continue;
            }
            let rx = glob_to_regex(p).map_err(|e| {
                AppError::invalid_input("invalid_exclude".to_string(), format!("exclude pattern '{p}': {e}"))
            })?;
            self.patterns.push((p.to_string(), rx));
        }
        Ok(())
    }

    /// This set plus per-request patterns.
    pub fn with_extra<I, S>(&self, extra: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = self.clone();
        set.add_all(extra)?;
        Ok(set)
    }

    pub fn is_excluded(&self, name: &str, rel: &str) -> bool {
        name.ends_with(TEMP_SUFFIX) || self.patterns.iter().any(|(_, rx)| rx.is_match(name) || rx.is_match(rel))
    }

    pub fn patterns(&self) -> Vec<String> {
        self.patterns.iter().map(|(p, _)| p.clone()).collect()
    }
}

#[derive(Default)]
struct DirBuilder {
    dirs: BTreeMap<String, DirBuilder>,
    files: BTreeMap<String, u64>,
}

impl DirBuilder {
    fn dir_mut(&mut self, segs: &[String]) -> &mut DirBuilder {
        let mut cur = self;
        for s in segs {
            cur = cur.dirs.entry(s.clone()).or_default();
        }
        cur
    }

    /// Directories without file descendants are dropped; the root is always kept.
    fn into_node(self, name: String, path: String, is_root: bool) -> Option<FileNode> {
        let mut children = Vec::with_capacity(self.dirs.len() + self.files.len());
        for (dname, sub) in self.dirs {
            let child_path = if path.is_empty() { dname.clone() } else { format!("{path}/{dname}") };
            if let Some(node) = sub.into_node(dname, child_path, false) {
                children.push(node);
            }
        }
        for (fname, size) in self.files {
            let child_path = if path.is_empty() { fname.clone() } else { format!("{path}/{fname}") };
            children.push(FileNode { name: fname, path: child_path, kind: NodeKind::File, size: Some(size), children: None });
        }
        if children.is_empty() && !is_root {
            return None;
        }
        Some(FileNode { name, path, kind: NodeKind::Directory, size: None, children: Some(children) })
    }
}

/// Root-relative segments, or `None` when a name is not valid UTF-8.
fn rel_segments(root: &Path, p: &Path) -> Option<Vec<String>> {
    let rel = p.strip_prefix(root).ok()?;
    rel.components().map(|c| c.as_os_str().to_str().map(|s| s.to_string())).collect()
}

/// Walk `root` into a nested tree. Symbolic links are neither followed nor listed.
/// Entries whose names could not be requested back through the path guard (non-UTF-8,
/// or spelled so that normalization would change them) are left out with their subtree.
pub fn build_tree(root: &Path, excludes: &ExcludeSet) -> AppResult<FileNode> {
    let mut top = DirBuilder::default();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let Some(segs) = rel_segments(root, e.path()).filter(|s| is_addressable(s)) else {
                debug!(target: "folio_admin::gateway", "skipping unaddressable entry '{}'", e.path().display());
                return false;
            };
            let name = e.file_name().to_string_lossy();
            !excludes.is_excluded(&name, &segs.join("/"))
        });
    for entry in walker {
        let entry = entry.map_err(|e| {
            let at = e.path().map(|p| p.display().to_string()).unwrap_or_default();
            AppError::io("walk_failed".to_string(), format!("listing '{at}': {e}"))
        })?;
        let ft = entry.file_type();
        if ft.is_symlink() {
            continue;
        }
        let Some(segs) = rel_segments(root, entry.path()) else { continue; };
        let Some((last, parents)) = segs.split_last() else { continue; };
        if ft.is_dir() {
            top.dir_mut(&segs);
        } else if ft.is_file() {
            let size = entry.metadata().map(|m| m.len()).map_err(|e| {
                AppError::io("walk_failed".to_string(), format!("stat '{}': {e}", entry.path().display()))
            })?;
            top.dir_mut(parents).files.insert(last.clone(), size);
        }
    }
    Ok(top
        .into_node(String::new(), String::new(), true)
        .unwrap_or(FileNode { name: String::new(), path: String::new(), kind: NodeKind::Directory, size: None, children: Some(Vec::new()) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globs_match_within_and_across_segments() {
        let set = ExcludeSet::new(["*.log", "docs/**", "node_modules"]).unwrap();
        assert!(set.is_excluded("debug.log", "debug.log"));
        assert!(!set.is_excluded("log.txt", "log.txt"));
        assert!(set.is_excluded("guide.md", "docs/api/guide.md"));
        assert!(set.is_excluded("node_modules", "web/node_modules"));
        assert!(!set.is_excluded("node_modules_backup", "node_modules_backup"));
        assert!(set.is_excluded("a.txt.1234.folio-tmp", "a.txt.1234.folio-tmp"));
    }

    #[test]
    fn with_extra_keeps_base_patterns() {
        let base = ExcludeSet::defaults();
        let more = base.with_extra(["secrets", ""]).unwrap();
        assert!(more.patterns().contains(&".git".to_string()));
        assert!(more.patterns().contains(&"secrets".to_string()));
        assert_eq!(more.patterns().len(), base.patterns().len() + 1);
    }
}
