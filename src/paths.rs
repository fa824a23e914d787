//! # Entry Name Resolution
//!
//! Turns absolute source paths into archive-relative entry names in two
//! steps:
//!
//! 1. Infer a [`BasePath`] shared by the inputs with a shrinking
//!    common-prefix search over directory segments.
//! 2. Strip that base from every path (or keep only the file name when
//!    flattening), normalize separators to `/` and drop anything that could
//!    escape the archive root: drive prefixes, leading slashes, `.` and `..`.
//!
//! All comparisons are ASCII-case-insensitive and operate on paths whose
//! separators have already been normalized to `/`, so Windows-style inputs
//! resolve the same way on every host.
//!
//! Example: `/a/b/c/f1.txt`, `/a/b/d/f2.txt`, `/a/b/c/f3.txt` share the base
//! `/a/b/` and become `c/f1.txt`, `d/f2.txt`, `c/f3.txt`.

use std::fmt;
use std::path::Path;

use crate::common::SourceFile;
use crate::error::{ArchiveError, Result};

/// Directory prefix stripped from every entry name. Either empty ("no common
/// prefix") or ending with a single `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasePath(String);

impl BasePath {
    /// Builds a base from a directory string, normalizing separators.
    pub fn from_dir(dir: &str) -> Self {
        let dir = to_slash(dir);
        let trimmed = dir.trim_end_matches('/');
        if trimmed.is_empty() {
            BasePath(String::new())
        } else {
            BasePath(format!("{}/", trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replaces backslashes with forward slashes.
pub(crate) fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

fn path_string(path: &Path) -> String {
    to_slash(&path.to_string_lossy())
}

/// Directory portion of a `/`-separated path, without trailing separator.
/// `"/a/b/f.txt"` gives `"/a/b"`; `"/f.txt"` and `"f.txt"` give `""`.
fn dir_portion(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => path[..idx].trim_end_matches('/'),
        None => "",
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// True when `dir` equals `prefix` or lies below it. Matching stops at
/// segment boundaries, so `/a/bc` is not below `/a/b`.
fn dir_starts_with(dir: &str, prefix: &str) -> bool {
    match strip_prefix_ignore_case(dir, prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Drops trailing segments of `candidate` until the result is a prefix of
/// `dir`. Returns `None` when only the empty prefix would match.
fn shrink(candidate: &str, dir: &str) -> Option<String> {
    let segments: Vec<&str> = candidate.split('/').collect();
    for n in (1..segments.len()).rev() {
        let prefix = segments[..n].join("/");
        if prefix.is_empty() {
            break;
        }
        if dir_starts_with(dir, &prefix) {
            return Some(prefix);
        }
    }
    None
}

/// Infers the base shared by `paths`.
///
/// Once the candidate collapses to empty it stays empty for every remaining
/// path; no fresh prefix is computed from the rest of the list.
pub fn infer_base_path<S: AsRef<str>>(paths: &[S]) -> Result<BasePath> {
    let (first, rest) = paths
        .split_first()
        .ok_or_else(|| ArchiveError::Configuration("no source files given".into()))?;

    let mut candidate = dir_portion(&to_slash(first.as_ref())).to_string();
    for path in rest {
        if candidate.is_empty() {
            break;
        }
        let path = to_slash(path.as_ref());
        let dir = dir_portion(&path);
        if dir_starts_with(dir, &candidate) {
            continue;
        }
        candidate = shrink(&candidate, dir).unwrap_or_default();
    }
    Ok(BasePath::from_dir(&candidate))
}

fn strip_drive(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        &s[2..]
    } else {
        s
    }
}

/// Normalizes a raw name into a safe archive-relative one.
pub fn sanitize_entry_name(name: &str) -> String {
    let name = to_slash(name);
    strip_drive(&name)
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// Maps source paths to entry names for one request.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    base: BasePath,
    flatten: bool,
}

impl PathNormalizer {
    /// Resolves the base for `files`, or uses `base_override` verbatim when
    /// one is given.
    pub fn resolve(
        files: &[SourceFile],
        flatten: bool,
        base_override: Option<&Path>,
    ) -> Result<Self> {
        if files.is_empty() {
            return Err(ArchiveError::Configuration("no source files given".into()));
        }
        let base = match base_override {
            Some(dir) => BasePath::from_dir(&path_string(dir)),
            None => {
                let paths: Vec<String> = files.iter().map(|f| path_string(f.path())).collect();
                infer_base_path(&paths)?
            }
        };
        tracing::debug!(base = %base, flatten, "resolved base path");
        Ok(Self { base, flatten })
    }

    pub fn base(&self) -> &BasePath {
        &self.base
    }

    /// The archive-relative name for `path`. May be empty if the path has
    /// no usable component at all (e.g. `/..`).
    pub fn entry_name(&self, path: &Path) -> String {
        if self.flatten {
            if let Some(name) = path.file_name() {
                let name = name.to_string_lossy();
                // On non-Windows hosts a backslash path is one component.
                let name = to_slash(&name);
                return sanitize_entry_name(name.rsplit('/').next().unwrap_or(&name));
            }
        }
        let full = path_string(path);
        let relative = strip_prefix_ignore_case(&full, self.base.as_str()).unwrap_or(&full);
        sanitize_entry_name(relative)
    }
}
