//! On-disk layout of a snapcraft project.

use std::path::{Path, PathBuf};

/// Per-part build and staging intermediates
pub const PARTS_DIR: &str = "parts";

/// Local plugins, kept inside the parts area but authored with the project
pub const PLUGINS_DIR: &str = "plugins";

/// Assembled-but-unpackaged files
pub const STAGE_DIR: &str = "stage";

/// Fully assembled package contents
pub const SNAP_DIR: &str = "snap";

/// Extension of produced package artifacts
pub const PACKAGE_EXTENSION: &str = "snap";

/// Suffix shared by every source snapshot archive
pub const SOURCE_ARCHIVE_SUFFIX: &str = "_source.tar.bz2";

/// Known locations inside a project tree.
///
/// Directory names are relative to the project root, so the same layout classifies
/// archive members and walked host paths alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    parts: PathBuf,
    stage: PathBuf,
    snap: PathBuf,
}

impl ProjectLayout {
    /// Standard snapcraft layout
    pub fn new() -> Self {
        Self {
            parts: PathBuf::from(PARTS_DIR),
            stage: PathBuf::from(STAGE_DIR),
            snap: PathBuf::from(SNAP_DIR),
        }
    }

    /// Parts area
    pub fn parts(&self) -> &Path {
        &self.parts
    }

    /// Plugins carve-out inside the parts area
    pub fn plugins(&self) -> PathBuf {
        self.parts.join(PLUGINS_DIR)
    }

    /// Staging area
    pub fn stage(&self) -> &Path {
        &self.stage
    }

    /// Final-output area
    pub fn snap(&self) -> &Path {
        &self.snap
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new()
    }
}
