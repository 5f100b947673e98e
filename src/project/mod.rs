//! Project metadata and layout from snapcraft.yaml

mod arch;
mod layout;

pub use arch::{Arch, host_deb_arch};
pub use layout::{
    PACKAGE_EXTENSION, PARTS_DIR, PLUGINS_DIR, ProjectLayout, SNAP_DIR, SOURCE_ARCHIVE_SUFFIX,
    STAGE_DIR,
};

use crate::error::{CleanBuildError, Result};
use std::path::Path;

/// Project manifest file name, at the project root
pub const MANIFEST_FILE: &str = "snapcraft.yaml";

/// Architecture label used when a project targets several architectures
const MULTI_ARCH: &str = "multi";

/// Metadata extracted from snapcraft.yaml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    /// Snap name
    pub name: String,

    /// Version exactly as written in the manifest (e.g. `1.0`)
    pub version: String,

    /// Architectures listed in the manifest; empty means "host"
    pub architectures: Vec<String>,

    /// Part names, in manifest order
    pub parts: Vec<String>,
}

impl ProjectMetadata {
    /// Load metadata from `<project_dir>/snapcraft.yaml`
    pub fn load(project_dir: &Path) -> Result<Self> {
        let manifest_path = project_dir.join(MANIFEST_FILE);
        let source = std::fs::read_to_string(&manifest_path).map_err(|e| {
            CleanBuildError::Manifest {
                path: manifest_path.clone(),
                reason: format!("Failed to read: {}", e),
            }
        })?;
        Self::parse(&source, &manifest_path)
    }

    /// Parse manifest text; `path` is only used in error messages
    pub fn parse(source: &str, path: &Path) -> Result<Self> {
        let invalid = |reason: String| CleanBuildError::Manifest {
            path: path.to_path_buf(),
            reason,
        };

        let value: serde_yaml::Value =
            serde_yaml::from_str(source).map_err(|e| invalid(format!("Failed to parse: {}", e)))?;

        let name = match value.get("name") {
            Some(serde_yaml::Value::String(name)) if !name.is_empty() => name.clone(),
            Some(_) => return Err(invalid("'name' must be a non-empty string".to_string())),
            None => return Err(invalid("Missing 'name'".to_string())),
        };

        // `version: 1.0` arrives as a YAML float; keep its written form.
        let version = match value.get("version") {
            Some(serde_yaml::Value::String(version)) => version.clone(),
            Some(serde_yaml::Value::Number(version)) => version.to_string(),
            Some(_) => return Err(invalid("'version' must be a string or number".to_string())),
            None => return Err(invalid("Missing 'version'".to_string())),
        };
        if version.is_empty() {
            return Err(invalid("'version' must not be empty".to_string()));
        }

        let architectures = value
            .get("architectures")
            .and_then(|v| v.as_sequence())
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let parts = value
            .get("parts")
            .and_then(|v| v.as_mapping())
            .map(|map| {
                map.keys()
                    .filter_map(|k| k.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            name,
            version,
            architectures,
            parts,
        })
    }

    /// Architecture label for the produced snap
    pub fn arch(&self) -> String {
        match self.architectures.as_slice() {
            [] => host_deb_arch(),
            [single] => single.clone(),
            _ => MULTI_ARCH.to_string(),
        }
    }

    /// `<name>_<version>_source.tar.bz2`
    pub fn source_archive_name(&self) -> String {
        format!("{}_{}{}", self.name, self.version, SOURCE_ARCHIVE_SUFFIX)
    }

    /// `<name>_<version>_<arch>.snap`
    pub fn snap_file_name(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.name,
            self.version,
            self.arch(),
            PACKAGE_EXTENSION
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "name: snap-test
version: 1.0
summary: test strip
description: if snap is succesful a snap package will be available
architectures: ['amd64']

parts:
    part1:
      plugin: nil
";

    fn parse(source: &str) -> Result<ProjectMetadata> {
        ProjectMetadata::parse(source, Path::new("snapcraft.yaml"))
    }

    #[test]
    fn reads_name_version_and_parts() {
        let project = parse(MANIFEST).unwrap();
        assert_eq!(project.name, "snap-test");
        assert_eq!(project.version, "1.0");
        assert_eq!(project.architectures, vec!["amd64".to_string()]);
        assert_eq!(project.parts, vec!["part1".to_string()]);
    }

    #[test]
    fn derives_file_names() {
        let project = parse(MANIFEST).unwrap();
        assert_eq!(project.source_archive_name(), "snap-test_1.0_source.tar.bz2");
        assert_eq!(project.snap_file_name(), "snap-test_1.0_amd64.snap");
    }

    #[test]
    fn several_architectures_make_a_multi_snap() {
        let project =
            parse("name: demo\nversion: '2'\narchitectures: [amd64, armhf]\n").unwrap();
        assert_eq!(project.snap_file_name(), "demo_2_multi.snap");
    }

    #[test]
    fn missing_architectures_use_the_host() {
        let project = parse("name: demo\nversion: '0.3'\n").unwrap();
        assert_eq!(project.arch(), host_deb_arch());
        assert!(project.parts.is_empty());
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = parse("version: 1\n").unwrap_err();
        assert!(matches!(err, CleanBuildError::Manifest { .. }));
        assert!(err.to_string().contains("Missing 'name'"));
    }

    #[test]
    fn load_reports_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectMetadata::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains(MANIFEST_FILE));
    }
}
