//! Shared test helpers for clean-build integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bzip2::read::BzDecoder;
use kodegen_bundler_cleanbuild::NetworkWait;
use kodegen_bundler_cleanbuild::container::{BuildOutcome, ContainerRuntime, RuntimeError};
use tempfile::TempDir;

/// snapcraft.yaml of the `snap-test` fixture project
pub const SNAP_TEST_YAML: &str = "name: snap-test
version: 1.0
summary: test strip
description: if snap is succesful a snap package will be available
architectures: ['amd64']

parts:
    part1:
      plugin: nil
";

/// Fixture files that must end up in the snapshot
pub const FILES_TAR: &[&str] = &["parts/plugins/x-plugin.py", "main.c"];

/// Fixture files that must stay out of the snapshot
pub const FILES_NO_TAR: &[&str] = &[
    "stage/binary",
    "snap/binary",
    "snap-test.snap",
    "snap-test_1.0_source.tar.bz2",
];

/// Short network bounds so tests never wait long
pub fn fast_network() -> NetworkWait {
    NetworkWait {
        poll_interval: Duration::from_millis(2),
        timeout: Duration::from_millis(200),
    }
}

/// Project tree with build residue from a previous host build.
pub fn snap_test_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("snapcraft.yaml"), SNAP_TEST_YAML).unwrap();

    for dir in ["parts/part1/src", "stage", "snap", "parts/plugins"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    for file in FILES_TAR.iter().chain(FILES_NO_TAR) {
        File::create(root.join(file)).unwrap();
    }
    temp
}

/// In-memory stand-in for a container runtime.
///
/// The "container" is a temporary directory; calls are recorded in order.
pub struct FakeRuntime {
    name: String,
    fs: TempDir,
    calls: Mutex<Vec<String>>,
    probes: AtomicUsize,
    ready_after: Option<usize>,
    build_exit: i32,
    produce_artifact: bool,
    fail_setup: bool,
    fail_push: bool,
}

impl FakeRuntime {
    /// Runtime whose network is ready on the first probe
    pub fn new() -> Self {
        Self {
            name: "snapcraft-fake".to_string(),
            fs: TempDir::new().unwrap(),
            calls: Mutex::new(Vec::new()),
            probes: AtomicUsize::new(0),
            ready_after: Some(1),
            build_exit: 0,
            produce_artifact: true,
            fail_setup: false,
            fail_push: false,
        }
    }

    /// Network becomes reachable on probe number `probes`
    pub fn ready_after(mut self, probes: usize) -> Self {
        self.ready_after = Some(probes);
        self
    }

    /// Network never becomes reachable
    pub fn never_ready(mut self) -> Self {
        self.ready_after = None;
        self
    }

    /// Build exits with `code`
    pub fn build_exit(mut self, code: i32) -> Self {
        self.build_exit = code;
        self
    }

    /// Build succeeds but writes no artifact
    pub fn without_artifact(mut self) -> Self {
        self.produce_artifact = false;
        self
    }

    /// Container creation fails
    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    /// Pushing the snapshot into the container fails
    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of network probes made
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Host path backing a container path
    pub fn container_path(&self, path: &str) -> PathBuf {
        self.fs.path().join(path.trim_start_matches('/'))
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl ContainerRuntime for FakeRuntime {
    fn container_name(&self) -> &str {
        &self.name
    }

    async fn ensure_environment(&self) -> Result<(), RuntimeError> {
        self.record("ensure_environment");
        if self.fail_setup {
            return Err(RuntimeError::new("lxc launch", "image not found"));
        }
        Ok(())
    }

    async fn push_path(&self, container_dir: &str, host_archive: &Path) -> Result<(), RuntimeError> {
        let name = host_archive.file_name().unwrap().to_string_lossy().into_owned();
        self.record(format!("push_path {} {}", container_dir, name));
        if self.fail_push {
            return Err(RuntimeError::new("lxc file push", "disk quota exceeded"));
        }

        let dir = self.container_path(container_dir);
        fs::create_dir_all(&dir).unwrap();
        let pushed = dir.join(&name);
        fs::copy(host_archive, &pushed).map_err(|e| RuntimeError::new("push", e.to_string()))?;

        let mut archive = tar::Archive::new(BzDecoder::new(File::open(&pushed).unwrap()));
        archive
            .unpack(&dir)
            .map_err(|e| RuntimeError::new("tar xvf", e.to_string()))
    }

    async fn is_network_ready(&self) -> bool {
        self.record("is_network_ready");
        let probe = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        self.ready_after.is_some_and(|after| probe >= after)
    }

    async fn exec_build(
        &self,
        container_dir: &str,
        artifact_name: &str,
    ) -> Result<BuildOutcome, RuntimeError> {
        self.record(format!("exec_build {} {}", container_dir, artifact_name));

        let dir = self.container_path(container_dir);
        if !dir.join("snapcraft.yaml").exists() {
            return Ok(BuildOutcome {
                exit_code: 1,
                output: vec!["snapcraft.yaml not found".to_string()],
            });
        }
        if self.build_exit != 0 {
            return Ok(BuildOutcome {
                exit_code: self.build_exit,
                output: vec!["Failed to build part1".to_string()],
            });
        }
        if self.produce_artifact {
            fs::write(dir.join(artifact_name), b"fake snap").unwrap();
        }
        Ok(BuildOutcome {
            exit_code: 0,
            output: vec![format!("Snapped {}", artifact_name)],
        })
    }

    async fn pull_artifact(
        &self,
        container_path: &str,
        host_dest: &Path,
    ) -> Result<PathBuf, RuntimeError> {
        self.record(format!("pull_artifact {}", container_path));
        let source = self.container_path(container_path);
        if !source.exists() {
            return Err(RuntimeError::new(
                "lxc file pull",
                format!("{} not found", container_path),
            ));
        }
        fs::copy(&source, host_dest).map_err(|e| RuntimeError::new("pull", e.to_string()))?;
        Ok(host_dest.to_path_buf())
    }

    async fn detach(&self) -> Result<(), RuntimeError> {
        self.record("detach");
        Ok(())
    }

    async fn release(&self) -> Result<(), RuntimeError> {
        self.record("release");
        Ok(())
    }
}

/// Member names of a `.tar.bz2` archive
pub fn archive_members(path: &Path) -> Vec<String> {
    let mut archive = tar::Archive::new(BzDecoder::new(File::open(path).unwrap()));
    archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect()
}
