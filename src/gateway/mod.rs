//!
//! folio-admin file gateway
//! -------------------------
//! A sandboxed view of one directory tree for the admin file editor: list the tree,
//! read, write, create and delete text files. Every operation admits its path through
//! `PathGuard` first; no file is opened for a rejected path.
//!
//! Writes go to a temp file next to the target and are renamed into place, so readers
//! see either the old or the new content. Writers to the same normalized path are
//! serialized through `KeyedLocks`. Directories are never deleted.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::locks::KeyedLocks;

pub mod paths;
pub mod tree;

pub use paths::{PathGuard, PathRejection, ResolvedPath};
pub use tree::{ExcludeSet, FileNode, NodeKind, DEFAULT_EXCLUDES};

pub struct FileSystemGateway {
    guard: PathGuard,
    excludes: ExcludeSet,
    locks: Arc<KeyedLocks>,
}

// ENOTDIR: an ancestor of the path is a regular file.
#[cfg(unix)]
fn is_not_dir(e: &std::io::Error) -> bool { e.raw_os_error() == Some(20) }
#[cfg(not(unix))]
fn is_not_dir(_e: &std::io::Error) -> bool { false }

fn is_missing(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::NotFound || is_not_dir(e)
}

fn file_not_found(rel: &str) -> AppError {
    AppError::not_found("file_not_found".to_string(), format!("file '{rel}' not found"))
}

fn needs_file_path(r: &ResolvedPath) -> AppResult<()> {
    if r.is_root() {
        return Err(AppError::invalid_path("not_a_file_path".to_string(), "path must name a file below the root".to_string()));
    }
    Ok(())
}

fn temp_sibling(target: &Path) -> PathBuf {
    let name = target.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    target.with_file_name(format!(".{}.{}{}", name, uuid::Uuid::new_v4().simple(), tree::TEMP_SUFFIX))
}

/// Write through a temp file in the target's directory, fsync, then rename over it.
/// An existing target's permission bits carry over to the new content.
fn atomic_write(target: &Path, content: &[u8]) -> std::io::Result<()> {
    let tmp = temp_sibling(target);
    let result = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(content)?;
        match fs::metadata(target) {
            Ok(meta) => f.set_permissions(meta.permissions())?,
            Err(e) if is_missing(&e) => {}
            Err(e) => return Err(e),
        }
        f.sync_all()?;
        fs::rename(&tmp, target)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

impl FileSystemGateway {
    pub fn new<P: AsRef<Path>>(root: P, excludes: ExcludeSet, locks: Arc<KeyedLocks>) -> AppResult<Self> {
        let guard = PathGuard::new(root)?;
        info!(target: "folio_admin::gateway", "file gateway rooted at '{}' excludes={:?}", guard.root().display(), excludes.patterns());
        Ok(Self { guard, excludes, locks })
    }

    pub fn root(&self) -> &Path { self.guard.root() }

    pub fn excludes(&self) -> &ExcludeSet { &self.excludes }

    /// Nested tree of the root, skipping configured plus per-request exclusions.
    pub fn list_tree<S: AsRef<str>>(&self, extra_excludes: &[S]) -> AppResult<FileNode> {
        let excludes = self.excludes.with_extra(extra_excludes)?;
        tree::build_tree(self.guard.root(), &excludes)
    }

    pub fn read_file(&self, path: &str) -> AppResult<String> {
        let r = self.guard.admit(path)?;
        let meta = match fs::metadata(&r.abs) {
            Ok(m) => m,
            Err(e) if is_missing(&e) => return Err(file_not_found(&r.rel)),
            Err(e) => return Err(AppError::from_io(&format!("stat '{}'", r.rel), &e)),
        };
        if !meta.is_file() {
            return Err(file_not_found(&r.rel));
        }
        let bytes = match fs::read(&r.abs) {
            Ok(b) => b,
            Err(e) if is_missing(&e) => return Err(file_not_found(&r.rel)),
            Err(e) => return Err(AppError::from_io(&format!("read '{}'", r.rel), &e)),
        };
        String::from_utf8(bytes).map_err(|_| {
            AppError::invalid_input("not_text".to_string(), format!("file '{}' is not UTF-8 text", r.rel))
        })
    }

    /// Overwrite or create a file whose parent directory already exists.
    pub fn write_file(&self, path: &str, content: &str) -> AppResult<()> {
        let r = self.guard.admit(path)?;
        needs_file_path(&r)?;
        let _key = self.locks.lock(&r.rel);
        match fs::metadata(&r.abs) {
            Ok(m) if m.is_dir() => {
                return Err(AppError::invalid_path("is_directory".to_string(), format!("'{}' is a directory", r.rel)));
            }
            Ok(_) => {}
            Err(e) if is_missing(&e) => {}
            Err(e) => return Err(AppError::from_io(&format!("stat '{}'", r.rel), &e)),
        }
        let parent_ok = r.abs.parent().map(|p| p.is_dir()).unwrap_or(false);
        if !parent_ok {
            return Err(AppError::invalid_path("parent_missing".to_string(), format!("parent directory of '{}' does not exist", r.rel)));
        }
        atomic_write(&r.abs, content.as_bytes()).map_err(|e| AppError::from_io(&format!("write '{}'", r.rel), &e))?;
        debug!(target: "folio_admin::gateway", "wrote file '{}' bytes={}", r.rel, content.len());
        Ok(())
    }

    /// Create a new file, making missing parent directories.
    pub fn create_file(&self, path: &str, initial_content: &str) -> AppResult<()> {
        let r = self.guard.admit(path)?;
        needs_file_path(&r)?;
        let _key = self.locks.lock(&r.rel);
        self.check_ancestors_are_dirs(&r)?;
        match fs::symlink_metadata(&r.abs) {
            Ok(_) => {
                return Err(AppError::already_exists("already_exists".to_string(), format!("'{}' already exists", r.rel)));
            }
            Err(e) if is_missing(&e) => {}
            Err(e) => return Err(AppError::from_io(&format!("stat '{}'", r.rel), &e)),
        }
        if let Some(parent) = r.abs.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::from_io(&format!("create parents of '{}'", r.rel), &e))?;
        }
        atomic_write(&r.abs, initial_content.as_bytes()).map_err(|e| AppError::from_io(&format!("write '{}'", r.rel), &e))?;
        info!(target: "folio_admin::gateway", "created file '{}' bytes={}", r.rel, initial_content.len());
        Ok(())
    }

    /// Remove one file. Directories are refused.
    pub fn delete_file(&self, path: &str) -> AppResult<()> {
        let r = self.guard.admit(path)?;
        needs_file_path(&r)?;
        let _key = self.locks.lock(&r.rel);
        match fs::symlink_metadata(&r.abs) {
            Ok(m) if m.is_dir() => {
                return Err(AppError::invalid_path("is_directory".to_string(), format!("'{}' is a directory; only files can be deleted", r.rel)));
            }
            Ok(_) => {}
            Err(e) if is_missing(&e) => return Err(file_not_found(&r.rel)),
            Err(e) => return Err(AppError::from_io(&format!("stat '{}'", r.rel), &e)),
        }
        fs::remove_file(&r.abs).map_err(|e| AppError::from_io(&format!("delete '{}'", r.rel), &e))?;
        info!(target: "folio_admin::gateway", "deleted file '{}'", r.rel);
        Ok(())
    }

    fn check_ancestors_are_dirs(&self, r: &ResolvedPath) -> AppResult<()> {
        let mut cur = self.guard.root().to_path_buf();
        let segs: Vec<&str> = r.rel.split('/').collect();
        for seg in &segs[..segs.len().saturating_sub(1)] {
            cur.push(seg);
            match fs::symlink_metadata(&cur) {
                Ok(m) if m.is_dir() => continue,
                Ok(_) => {
                    return Err(AppError::invalid_path("ancestor_not_directory".to_string(), format!("'{}' is not a directory", cur.strip_prefix(self.guard.root()).unwrap_or(&cur).display())));
                }
                Err(e) if is_missing(&e) => break,
                Err(e) => return Err(AppError::from_io("stat ancestor", &e)),
            }
        }
        Ok(())
    }
}
