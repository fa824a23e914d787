//! JSON request manifests.
//!
//! A manifest describes a whole `create` invocation so it can be kept next
//! to a build script:
//!
//! ```json
//! {
//!   "files": ["bin/tool", "docs"],
//!   "output": "dist/tool.zip",
//!   "level": 9,
//!   "flatten": false,
//!   "comment": "tool 1.4.0",
//!   "base_dir": ".",
//!   "stamp": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's own directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArchiveManifest {
    #[serde(default)]
    pub files: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub level: Option<i32>,
    #[serde(default)]
    pub flatten: bool,
    pub comment: Option<String>,
    pub base_dir: Option<PathBuf>,
    pub stamp: Option<DateTime<FixedOffset>>,
}

impl ArchiveManifest {
    /// Parses a manifest from JSON text. Paths are left as written.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ArchiveError::Configuration(format!("invalid manifest: {}", e)))
    }

    /// Loads a manifest file and anchors its relative paths at the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ArchiveError::io(e, path))?;
        let manifest = Self::from_json(&text)?;
        let root = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(manifest.anchored_at(root))
    }

    fn anchored_at(mut self, root: &Path) -> Self {
        let anchor = |p: PathBuf| if p.is_absolute() { p } else { root.join(p) };
        self.files = self.files.into_iter().map(anchor).collect();
        self.output = self.output.map(anchor);
        self.base_dir = self.base_dir.map(anchor);
        self
    }
}
