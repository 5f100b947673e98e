//! Classification of project paths into snapshot members and build residue.

use crate::project::{PACKAGE_EXTENSION, ProjectLayout, SOURCE_ARCHIVE_SUFFIX};
use std::path::{Component, Path, PathBuf};

/// Prefix of the temporary file an archive is written to before it is renamed
pub const PARTIAL_ARCHIVE_PREFIX: &str = ".cleanbuild-";

/// Outcome of classifying one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Goes into the snapshot archive
    Include,
    /// Build residue, left out of the archive
    Exclude,
}

/// Decides which project paths belong in the source snapshot.
///
/// Rules, checked in order:
/// 1. anything under the parts area's `plugins` directory is included;
/// 2. anything below the parts area is excluded (the area itself stays, so the
///    plugins carve-out keeps its parent);
/// 3. the staging and final-output areas are excluded entirely;
/// 4. package files, source archives and unfinished archive writes at the project
///    root are excluded;
/// 5. everything else is included.
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    parts: PathBuf,
    plugins: PathBuf,
    residue_dirs: Vec<PathBuf>,
    archive_name: String,
}

impl ExclusionPolicy {
    /// Policy for a project layout whose snapshot is written as `archive_name`
    pub fn new(layout: &ProjectLayout, archive_name: impl Into<String>) -> Self {
        Self {
            parts: layout.parts().to_path_buf(),
            plugins: layout.plugins(),
            residue_dirs: vec![layout.stage().to_path_buf(), layout.snap().to_path_buf()],
            archive_name: archive_name.into(),
        }
    }

    /// File name of the archive this policy protects against re-inclusion
    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// Classify a path relative to the project root.
    ///
    /// A leading `./` is ignored, so archive member names classify the same way.
    pub fn classify(&self, relative: &Path) -> Verdict {
        let relative: PathBuf = relative
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();

        if relative.as_os_str().is_empty() {
            return Verdict::Include;
        }
        if relative.starts_with(&self.plugins) {
            return Verdict::Include;
        }
        if relative.starts_with(&self.parts) && relative != self.parts {
            return Verdict::Exclude;
        }
        if self.residue_dirs.iter().any(|dir| relative.starts_with(dir)) {
            return Verdict::Exclude;
        }
        if relative.components().count() == 1 && self.is_root_residue(&relative) {
            return Verdict::Exclude;
        }
        Verdict::Include
    }

    fn is_root_residue(&self, relative: &Path) -> bool {
        let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name == self.archive_name
            || name.ends_with(SOURCE_ARCHIVE_SUFFIX)
            || name.starts_with(PARTIAL_ARCHIVE_PREFIX)
            || Path::new(name)
                .extension()
                .is_some_and(|ext| ext == PACKAGE_EXTENSION)
    }
}
