//! Path guard for the file gateway.
//!
//! Every request path goes through `PathGuard::resolve` before any file is opened:
//! NUL bytes and absolute/drive prefixes are refused, `.`/`..` are resolved lexically,
//! each segment is matched to the existing directory entry with the same NFC form, the
//! result is joined with the root and absolutized, and finally it must be
//! component-wise inside the root. `\` is a separator on Windows only; elsewhere it is
//! an ordinary file name character.
use std::fs;
use std::path::{Component, Path, PathBuf};

use path_absolutize::Absolutize;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathRejection {
    #[error("path contains a NUL character")]
    Nul,
    #[error("absolute paths are not accepted: '{0}'")]
    Absolute(String),
    #[error("path '{0}' escapes the root directory")]
    Escapes(String),
    #[error("path '{0}' could not be absolutized: {1}")]
    Unresolvable(String, String),
    #[error("path '{0}' goes through a symbolic link")]
    Symlink(String),
}

impl PathRejection {
    pub fn code(&self) -> &'static str {
        match self {
            PathRejection::Nul => "path_nul",
            PathRejection::Absolute(_) => "path_absolute",
            PathRejection::Escapes(_) => "path_escapes_root",
            PathRejection::Unresolvable(..) => "path_unresolvable",
            PathRejection::Symlink(_) => "path_symlink",
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self {
        AppError::invalid_path(r.code().to_string(), r.to_string())
    }
}

/// Normalize a UTF-8 string to NFC.
pub fn normalize_nfc(input: &str) -> String {
    input.nfc().collect::<String>()
}

fn has_drive_prefix(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

#[cfg(windows)]
fn unify_separators(s: &str) -> String { s.replace('\\', "/") }
#[cfg(not(windows))]
fn unify_separators(s: &str) -> String { s.to_string() }

// `..` hidden behind `\` is a parent step on Windows; refused on every host.
fn hides_parent_step(seg: &str) -> bool {
    seg.contains('\\') && seg.split('\\').any(|p| p == "..")
}

/// Lexically normalize a root-relative request path into its segments. Segment bytes
/// are kept as given. Popping past the root is an escape.
pub fn normalize_relative(requested: &str) -> Result<Vec<String>, PathRejection> {
    if requested.contains('\0') {
        return Err(PathRejection::Nul);
    }
    let unified = unify_separators(requested);
    if unified.starts_with('/') || unified.starts_with('\\') || has_drive_prefix(&unified) {
        return Err(PathRejection::Absolute(requested.to_string()));
    }
    let mut segs: Vec<String> = Vec::new();
    for seg in unified.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                if segs.pop().is_none() {
                    return Err(PathRejection::Escapes(requested.to_string()));
                }
            }
            s if hides_parent_step(s) => return Err(PathRejection::Escapes(requested.to_string())),
            s => segs.push(s.to_string()),
        }
    }
    Ok(segs)
}

/// True when the on-disk segments come back unchanged through `normalize_relative`,
/// i.e. the joined path can be requested as listed.
pub fn is_addressable(segs: &[String]) -> bool {
    !segs.is_empty() && normalize_relative(&segs.join("/")).map(|n| n == segs).unwrap_or(false)
}

/// Spelling of `seg` as it exists under `dir`: the exact name when present, else the
/// entry whose NFC form matches, else the NFC form itself (for names yet to be created).
fn match_entry(dir: &Path, seg: &str) -> String {
    if fs::symlink_metadata(dir.join(seg)).is_ok() {
        return seg.to_string();
    }
    let wanted = normalize_nfc(seg);
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if normalize_nfc(name) == wanted {
                    return name.to_string();
                }
            }
        }
    }
    wanted
}

fn is_prefix_path(path: &Path, prefix: &Path) -> bool {
    // Component-wise, so /srv/site2 is not inside /srv/site
    path.starts_with(prefix)
}

/// A request path that passed the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Root-relative, `/`-separated, no dot segments. Empty for the root itself.
    pub rel: String,
    pub abs: PathBuf,
}

impl ResolvedPath {
    pub fn is_root(&self) -> bool { self.rel.is_empty() }
}

#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// The root must exist and be a directory; it is canonicalized once here.
    pub fn new<P: AsRef<Path>>(root: P) -> AppResult<Self> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).map_err(|e| AppError::from_io(&format!("open content root '{}'", root.display()), &e))?;
        if !canonical.is_dir() {
            return Err(AppError::invalid_path("root_not_directory".to_string(), format!("content root '{}' is not a directory", root.display())));
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path { &self.root }

    /// Normalize, match segments to existing entries, then verify containment. Only
    /// directory metadata is read.
    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath, PathRejection> {
        let mut cur = self.root.clone();
        let mut segs = Vec::new();
        for seg in normalize_relative(requested)? {
            let actual = match_entry(&cur, &seg);
            cur.push(&actual);
            segs.push(actual);
        }
        let rel = segs.join("/");
        let abs = cur
            .absolutize()
            .map_err(|e| PathRejection::Unresolvable(requested.to_string(), e.to_string()))?
            .to_path_buf();
        if !is_prefix_path(&abs, &self.root) {
            return Err(PathRejection::Escapes(requested.to_string()));
        }
        Ok(ResolvedPath { rel, abs })
    }

    /// Refuse paths where the target or any existing ancestor below the root is a
    /// symbolic link.
    pub fn reject_symlinks(&self, resolved: &ResolvedPath) -> Result<(), PathRejection> {
        let Ok(tail) = resolved.abs.strip_prefix(&self.root) else {
            return Err(PathRejection::Escapes(resolved.rel.clone()));
        };
        let mut cur = self.root.clone();
        for comp in tail.components() {
            if let Component::Normal(c) = comp {
                cur.push(c);
            }
            match fs::symlink_metadata(&cur) {
                Ok(m) if m.file_type().is_symlink() => return Err(PathRejection::Symlink(resolved.rel.clone())),
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        Ok(())
    }

    /// `resolve` followed by `reject_symlinks`, as the gateway operations use it.
    pub fn admit(&self, requested: &str) -> AppResult<ResolvedPath> {
        let resolved = self.resolve(requested)?;
        self.reject_symlinks(&resolved)?;
        Ok(resolved)
    }
}
