//! End-to-end clean builds against an in-memory container runtime.

mod common;

use common::{
    FILES_NO_TAR, FILES_TAR, FakeRuntime, archive_members, fast_network, snap_test_project,
};
use kodegen_bundler_cleanbuild::lifecycle::{
    BuildRequest, Orchestrator, Phase, RecordingReporter,
};
use kodegen_bundler_cleanbuild::project::ProjectMetadata;
use kodegen_bundler_cleanbuild::snapshot::package_project;
use kodegen_bundler_cleanbuild::{CleanBuildConfig, CleanBuildError, clean_build};

const EXPECTED_TRACE: &str = "Setting up container with project assets\n\
                              Waiting for a network connection...\n\
                              Network connection established\n\
                              Retrieved snap-test_1.0_amd64.snap\n";

fn config_for(project: &tempfile::TempDir) -> CleanBuildConfig {
    CleanBuildConfig::new(project.path()).with_network(fast_network())
}

#[tokio::test]
async fn cleanbuild_snapshots_sources_and_retrieves_snap() {
    let project = snap_test_project();
    let runtime = FakeRuntime::new();
    let reporter = RecordingReporter::new();

    let outcome = clean_build(&config_for(&project), &|| true, &runtime, &reporter)
        .await
        .unwrap();

    assert_eq!(reporter.output(), EXPECTED_TRACE);

    let archive_path = project.path().join("snap-test_1.0_source.tar.bz2");
    assert_eq!(outcome.archive.path, archive_path);
    let members = archive_members(&archive_path);
    for file in FILES_NO_TAR {
        let name = format!("./{file}");
        assert!(!members.contains(&name), "{name} should not be in {members:?}");
    }
    for file in FILES_TAR {
        let name = format!("./{file}");
        assert!(members.contains(&name), "{name} should be in {members:?}");
    }

    let artifact = project.path().join("snap-test_1.0_amd64.snap");
    assert_eq!(outcome.artifact, artifact);
    assert_eq!(std::fs::read(&artifact).unwrap(), b"fake snap");
    assert_eq!(outcome.sha256.len(), 64);
}

#[tokio::test]
async fn phases_run_strictly_in_order() {
    let project = snap_test_project();
    let runtime = FakeRuntime::new();
    let reporter = RecordingReporter::new();

    clean_build(&config_for(&project), &|| true, &runtime, &reporter)
        .await
        .unwrap();

    assert_eq!(
        runtime.calls(),
        vec![
            "ensure_environment",
            "push_path /root snap-test_1.0_source.tar.bz2",
            "is_network_ready",
            "exec_build /root snap-test_1.0_amd64.snap",
            "pull_artifact /root/snap-test_1.0_amd64.snap",
            "release",
        ]
    );
    // The build saw the fully inflated snapshot.
    assert!(runtime.container_path("/root/main.c").exists());
    assert!(runtime.container_path("/root/parts/plugins/x-plugin.py").exists());
    assert!(!runtime.container_path("/root/stage/binary").exists());
}

#[tokio::test]
async fn repeated_polls_report_waiting_once() {
    let project = snap_test_project();
    let runtime = FakeRuntime::new().ready_after(4);
    let reporter = RecordingReporter::new();

    clean_build(&config_for(&project), &|| true, &runtime, &reporter)
        .await
        .unwrap();

    assert_eq!(runtime.probe_count(), 4);
    assert_eq!(reporter.output(), EXPECTED_TRACE);
}

#[tokio::test]
async fn missing_runtime_fails_before_any_work() {
    let project = snap_test_project();
    let archive_path = project.path().join("snap-test_1.0_source.tar.bz2");
    std::fs::remove_file(&archive_path).unwrap();
    let runtime = FakeRuntime::new();
    let reporter = RecordingReporter::new();

    let err = clean_build(&config_for(&project), &|| false, &runtime, &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, CleanBuildError::Dependency(_)));
    assert_eq!(
        err.to_string(),
        "The lxd package is not installed, in order to use `cleanbuild` \
         you must install lxd onto your system. Refer to the \
         \"Ubuntu Desktop and Ubuntu Server\" section on \
         https://linuxcontainers.org/lxd/getting-started-cli/\
         #ubuntu-desktop-and-ubuntu-server to enable a proper setup."
    );
    assert!(runtime.calls().is_empty());
    assert!(reporter.lines().is_empty());
    assert!(!archive_path.exists());
}

#[tokio::test]
async fn network_timeout_hands_off_container() {
    let project = snap_test_project();
    let runtime = FakeRuntime::new().never_ready();
    let reporter = RecordingReporter::new();

    let err = clean_build(&config_for(&project), &|| true, &runtime, &reporter)
        .await
        .unwrap_err();

    match &err {
        CleanBuildError::NetworkTimeout {
            phase, container, ..
        } => {
            assert_eq!(*phase, Phase::WaitingForNetwork);
            assert_eq!(container, "snapcraft-fake");
        }
        other => panic!("expected network timeout, got {other:?}"),
    }
    assert!(runtime.probe_count() >= 1);
    let calls = runtime.calls();
    assert!(!calls.contains(&"release".to_string()));
    assert_eq!(calls.last().map(String::as_str), Some("detach"));
    assert_eq!(
        reporter.lines(),
        vec![
            "Setting up container with project assets",
            "Waiting for a network connection...",
        ]
    );
}

#[tokio::test]
async fn failed_build_reports_exit_status_and_releases() {
    let project = snap_test_project();
    let runtime = FakeRuntime::new().build_exit(2);
    let reporter = RecordingReporter::new();

    let err = clean_build(&config_for(&project), &|| true, &runtime, &reporter)
        .await
        .unwrap_err();

    match &err {
        CleanBuildError::BuildExecution {
            phase,
            exit_code,
            output,
        } => {
            assert_eq!(*phase, Phase::Building);
            assert_eq!(*exit_code, 2);
            assert_eq!(output, &vec!["Failed to build part1".to_string()]);
        }
        other => panic!("expected build failure, got {other:?}"),
    }
    assert_eq!(runtime.calls().last().map(String::as_str), Some("release"));
    assert_eq!(reporter.lines().len(), 3);
    assert!(!project.path().join("snap-test_1.0_amd64.snap").exists());
}

#[tokio::test]
async fn missing_artifact_is_a_retrieval_error() {
    let project = snap_test_project();
    let runtime = FakeRuntime::new().without_artifact();
    let reporter = RecordingReporter::new();

    let err = clean_build(&config_for(&project), &|| true, &runtime, &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, CleanBuildError::Retrieval { .. }));
    assert_eq!(err.phase(), Some(Phase::Retrieving));
    assert!(err.to_string().contains("snap-test_1.0_amd64.snap"));
    assert_eq!(runtime.calls().last().map(String::as_str), Some("release"));
    assert_eq!(reporter.lines().len(), 3);
}

#[tokio::test]
async fn container_creation_failure_is_a_setup_error() {
    let project = snap_test_project();
    let runtime = FakeRuntime::new().failing_setup();
    let reporter = RecordingReporter::new();

    let err = clean_build(&config_for(&project), &|| true, &runtime, &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, CleanBuildError::ContainerSetup { .. }));
    assert_eq!(err.phase(), Some(Phase::Idle));
    assert!(err.to_string().contains("image not found"));
    assert_eq!(runtime.calls(), vec!["ensure_environment", "release"]);
    assert!(reporter.lines().is_empty());
}

#[tokio::test]
async fn failed_push_is_a_setup_error_and_releases() {
    let project = snap_test_project();
    let runtime = FakeRuntime::new().failing_push();
    let reporter = RecordingReporter::new();

    let err = clean_build(&config_for(&project), &|| true, &runtime, &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, CleanBuildError::ContainerSetup { .. }));
    assert_eq!(err.phase(), Some(Phase::SettingUp));
    assert!(err.to_string().contains("disk quota exceeded"));
    assert_eq!(
        runtime.calls(),
        vec![
            "ensure_environment",
            "push_path /root snap-test_1.0_source.tar.bz2",
            "release",
        ]
    );
    assert_eq!(
        reporter.lines(),
        vec!["Setting up container with project assets"]
    );
}

#[tokio::test]
async fn session_records_pushed_archive_and_artifact() {
    let project = snap_test_project();
    let metadata = ProjectMetadata::load(project.path()).unwrap();
    let archive = package_project(project.path(), &metadata).await.unwrap();
    let runtime = FakeRuntime::new();
    let reporter = RecordingReporter::new();

    let request = BuildRequest {
        archive: archive.path.clone(),
        artifact_name: metadata.snap_file_name(),
        output_dir: project.path().to_path_buf(),
    };
    let session = Orchestrator::new(&runtime, &reporter, fast_network())
        .run(&request)
        .await
        .unwrap();

    assert_eq!(session.phase, Phase::Done);
    assert_eq!(session.container, "snapcraft-fake");
    assert_eq!(
        session.pushed_archive.as_deref(),
        Some("/root/snap-test_1.0_source.tar.bz2")
    );
    assert_eq!(
        session.artifact,
        Some(project.path().join("snap-test_1.0_amd64.snap"))
    );
}

#[tokio::test]
async fn second_clean_build_never_archives_the_first() {
    let project = snap_test_project();
    let reporter = RecordingReporter::new();

    let first = clean_build(&config_for(&project), &|| true, &FakeRuntime::new(), &reporter)
        .await
        .unwrap();
    let second = clean_build(&config_for(&project), &|| true, &FakeRuntime::new(), &reporter)
        .await
        .unwrap();

    assert_eq!(first.archive.entries, second.archive.entries);
    let members = archive_members(&second.archive.path);
    assert!(!members.iter().any(|m| m.ends_with(".tar.bz2")));
    assert!(!members.iter().any(|m| m.ends_with(".snap")));
}
