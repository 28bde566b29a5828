//! End-to-end integration tests against the mock viewer
//!
//! These tests verify the scripted side of the harness by:
//! 1. Launching the mock viewer on a free port
//! 2. Driving it through the scripted client, the checks and the scenarios
//! 3. Running the CLI binary the way a CI job would

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use carta_harness::checks::ImageChecks;
use carta_harness::common::config::{ChecksConfig, Config, Timeouts};
use carta_harness::fixture::ViewerFixture;
use carta_harness::scenario::{ScenarioState, ScriptedRoundTrip};
use carta_harness::scripted::{LayoutKind, ScriptedClient, SnapshotOptions, ViewerLaunch};
use carta_harness::testing;
use carta_harness::Error;

const IMAGE: &str = "/scratch/Images/mexinputtest.fits";
const CUBE: &str = "/scratch/Images/3D_fits/m31_cropped.fits";

fn mock_viewer() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock_viewer"))
}

fn harness() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_carta-harness"))
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to find a free port")
}

fn test_timeouts() -> Timeouts {
    Timeouts {
        startup_settle_secs: 0,
        restore_settle_secs: 0,
        viewer_startup_secs: 10,
        request_secs: 5,
    }
}

fn launch_with_image() -> ViewerLaunch {
    ViewerLaunch::new(mock_viewer(), free_port()).with_image(IMAGE)
}

fn run_harness(config: &Path, args: &[&str]) -> Output {
    Command::new(harness())
        .arg("--config")
        .arg(config)
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run carta-harness")
}

fn write_config(dir: &Path, port: u16) -> PathBuf {
    let path = dir.join("config.toml");
    let content = format!(
        r#"
[viewer]
executable = "{}"
port = {}
image = "{}"

[timeouts]
startup_settle_secs = 0
restore_settle_secs = 0
viewer_startup_secs = 10
request_secs = 5

[checks]
cube = "{}"
"#,
        mock_viewer().display(),
        port,
        IMAGE,
        CUBE
    );
    fs::write(&path, content).expect("Failed to write config");
    path
}

#[tokio::test]
async fn test_pixel_value_at_origin() {
    let mut fixture = ViewerFixture::setup(&launch_with_image(), &test_timeouts())
        .await
        .unwrap();

    let (client, view) = fixture.parts();
    assert_eq!(client.get_pixel_value(view, 0, 0).await.unwrap(), Some(0.5));

    fixture.teardown().await.unwrap();
}

#[tokio::test]
async fn test_pixel_outside_image_is_sentinel() {
    let mut fixture = ViewerFixture::setup(&launch_with_image(), &test_timeouts())
        .await
        .unwrap();

    let (client, view) = fixture.parts();
    for (x, y) in [(-1, -1), (10, 0), (0, 10), (i64::MAX, 3)] {
        assert_eq!(
            client.get_pixel_value(view, x, y).await.unwrap(),
            None,
            "({}, {}) should have no data",
            x,
            y
        );
    }

    fixture.teardown().await.unwrap();
}

#[tokio::test]
async fn test_dimensions_and_channels_update_in_place() {
    let mut fixture = ViewerFixture::setup(&launch_with_image(), &test_timeouts())
        .await
        .unwrap();

    let (client, view) = fixture.parts();
    assert_eq!(client.get_image_dimensions(view).await.unwrap(), vec![10, 10]);
    assert_eq!(client.get_channel_count(view).await.unwrap(), 1);

    client.load_local_file(view, Path::new(CUBE)).await.unwrap();

    // Same handle, no new get_image_views call
    assert_eq!(client.get_channel_count(view).await.unwrap(), 3);

    fixture.teardown().await.unwrap();
}

#[tokio::test]
async fn test_image_check_suite_passes() {
    let mut fixture = ViewerFixture::setup(&launch_with_image(), &test_timeouts())
        .await
        .unwrap();

    let suite = ImageChecks::new(ChecksConfig::default()).with_cube(Path::new(CUBE));
    let (client, view) = fixture.parts();
    let outcomes = suite.run_all(client, view).await;

    assert_eq!(outcomes.len(), 4);
    for outcome in &outcomes {
        assert!(outcome.passed(), "{}: {:?}", outcome.name, outcome.result);
    }

    fixture.teardown().await.unwrap();
}

#[tokio::test]
async fn test_image_check_reports_mismatch() {
    let mut fixture = ViewerFixture::setup(&launch_with_image(), &test_timeouts())
        .await
        .unwrap();

    let config = ChecksConfig {
        expected_pixel: 0.75,
        expected_dimensions: vec![20, 20],
        ..ChecksConfig::default()
    };
    let suite = ImageChecks::new(config);
    let (client, view) = fixture.parts();

    let err = suite.pixel_value(client, view).await.unwrap_err();
    assert!(err.is_assertion());
    assert!(err.to_string().contains("expected 0.75, got 0.5"));

    let err = suite.dimensions(client, view).await.unwrap_err();
    assert!(matches!(err, Error::ValueMismatch { .. }));

    fixture.teardown().await.unwrap();
}

#[tokio::test]
async fn test_load_unknown_file_fails() {
    let mut fixture = ViewerFixture::setup(&launch_with_image(), &test_timeouts())
        .await
        .unwrap();

    let (client, view) = fixture.parts();
    let err = client
        .load_local_file(view, Path::new("/scratch/Images/nothing.fits"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ScriptedCommandFailed { ref command, .. } if command == "loadLocalFile"
    ));

    // The view still reports the original image
    assert_eq!(client.get_channel_count(view).await.unwrap(), 1);

    fixture.teardown().await.unwrap();
}

#[tokio::test]
async fn test_scripted_round_trip() {
    let mut client = ScriptedClient::launch(&launch_with_image(), &test_timeouts())
        .await
        .unwrap();

    let mut config = Config::default();
    config.timeouts = test_timeouts();
    let report = ScriptedRoundTrip::from_config(&config)
        .run(&mut client)
        .await
        .unwrap();

    assert_eq!(report.windows_before, 5);
    assert_eq!(report.windows_after, 5);
    assert_eq!(report.state, ScenarioState::Restored);
    assert_eq!(report.snapshot, "tSnapshotLayout");

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_restore_unknown_snapshot_fails() {
    let mut client = ScriptedClient::launch(&launch_with_image(), &test_timeouts())
        .await
        .unwrap();

    let err = client.restore_state("neverSaved").await.unwrap_err();
    assert!(matches!(
        err,
        Error::ScriptedCommandFailed { ref command, .. } if command == "restoreState"
    ));

    // The connection stays usable after a failed command
    client
        .save_state("saved", SnapshotOptions::layout_only())
        .await
        .unwrap();
    client.set_layout(LayoutKind::Clear).await.unwrap();
    assert_eq!(client.get_window_count().await.unwrap(), 0);
    client.restore_state("saved").await.unwrap();
    assert_eq!(client.get_window_count().await.unwrap(), 5);

    client.shutdown().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_launch_waits_for_slow_port() {
    use std::os::unix::fs::PermissionsExt;

    // Wrapper that opens the port only after a delay
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("slow_viewer.sh");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\nexec \"{}\" --startup-delay-ms 300 \"$@\"\n",
            mock_viewer().display()
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let launch = ViewerLaunch::new(&script, free_port()).with_image(IMAGE);
    let mut client = ScriptedClient::launch(&launch, &test_timeouts()).await.unwrap();
    assert_eq!(client.get_image_views().await.unwrap().len(), 1);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_launch_reports_early_exit() {
    let launch = ViewerLaunch::new(mock_viewer(), free_port()).with_image("/data/unknown.fits");
    let err = ScriptedClient::launch(&launch, &test_timeouts())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ViewerStartFailed(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_connect_without_viewer() {
    let addr = format!("127.0.0.1:{}", free_port());
    let err = ScriptedClient::connect(&addr, test_timeouts().request())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ViewerNotRunning(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_attach_fixture_to_running_viewer() {
    let port = free_port();
    let mut child = tokio::process::Command::new(mock_viewer())
        .arg("--scriptPort")
        .arg(port.to_string())
        .arg(IMAGE)
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    // Attach does not wait for startup, so poll the way a user would retry
    let addr = format!("127.0.0.1:{}", port);
    let mut fixture = None;
    for _ in 0..100 {
        match ViewerFixture::attach(&addr, &test_timeouts()).await {
            Ok(f) => {
                fixture = Some(f);
                break;
            }
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(50)).await,
        }
    }
    let mut fixture = fixture.expect("Mock viewer never opened its port");

    assert_eq!(fixture.view().id(), "view0");
    let (client, view) = fixture.parts();
    assert_eq!(client.get_pixel_value(view, 0, 0).await.unwrap(), Some(0.5));

    // Attached fixtures leave the viewer running
    fixture.teardown().await.unwrap();
    assert!(child.try_wait().unwrap().is_none());
    child.kill().await.unwrap();
}

#[tokio::test]
async fn test_yaml_scenario_passes() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = dir.path().join("layout.yml");
    fs::write(
        &scenario,
        format!(
            r#"
name: "Mock layout and pixels"
viewer:
  launch:
    executable: "{}"
    port: {}
    image: "{}"
steps:
  - action: pixel_value
    x: 0
    y: 0
    expect:
      value: 0.5
  - action: pixel_value
    x: -1
    y: -1
    expect:
      empty: true
  - action: image_dimensions
    expect: [10, 10]
  - action: channel_count
    expect: 1
  - action: load_file
    path: "{}"
  - action: channel_count
    expect: 3
  - action: window_count
    record: before
    expect: 5
  - action: save_state
    name: tSnapshotLayout
  - action: set_layout
    layout: image
  - action: window_count
    expect: 1
  - action: restore_state
    name: tSnapshotLayout
  - action: restore_state
    name: missing
    success: false
  - action: sleep
    ms: 10
  - action: window_count
    equals_recorded: before
"#,
            mock_viewer().display(),
            free_port(),
            IMAGE,
            CUBE
        ),
    )
    .unwrap();

    let result = testing::run_scenario(&scenario, false, &test_timeouts())
        .await
        .unwrap();
    assert!(result.passed, "{:?}", result.error);
    assert_eq!(result.steps_run, 14);
    assert_eq!(result.steps_total, 14);
}

#[tokio::test]
async fn test_yaml_scenario_reports_failing_step() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = dir.path().join("wrong.yml");
    fs::write(
        &scenario,
        format!(
            r#"
name: "Wrong expectation"
viewer:
  launch:
    executable: "{}"
    port: {}
    image: "{}"
steps:
  - action: image_dimensions
    expect: [10, 10]
  - action: pixel_value
    x: 0
    y: 0
    expect:
      value: 1.5
  - action: channel_count
    expect: 1
"#,
            mock_viewer().display(),
            free_port(),
            IMAGE
        ),
    )
    .unwrap();

    let result = testing::run_scenario(&scenario, false, &test_timeouts())
        .await
        .unwrap();
    assert!(!result.passed);
    assert_eq!(result.steps_run, 2);
    assert!(result.error.unwrap().contains("expected 1.5, got 0.5"));
}

#[test]
fn test_cli_image_checks() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), free_port());

    let output = run_harness(&config, &["image-checks"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("All checks passed"));
}

#[test]
fn test_cli_scripted_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), free_port());

    let output = run_harness(&config, &["scripted-roundtrip"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Window Count before save: 5"));
    assert!(stdout.contains("Window Count after restore: 5"));
}

#[test]
fn test_cli_failing_checks_exit_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), free_port());
    let mut content = fs::read_to_string(&config).unwrap();
    content = content.replace("[checks]\n", "[checks]\nexpected_channels = 2\n");
    fs::write(&config, content).unwrap();

    let output = run_harness(&config, &["image-checks"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("channel count"));
}

#[test]
fn test_cli_config_prints_settings() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), 4321);

    let output = run_harness(&config, &["config"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("address = 127.0.0.1:4321"));
    assert!(stdout.contains("snapshot_name = tSnapshotLayout"));
}

#[tokio::test]
async fn test_client_debug_names_peer_and_process() {
    let launch = launch_with_image();
    let client = ScriptedClient::launch(&launch, &test_timeouts()).await.unwrap();

    let debug = format!("{:?}", client);
    assert!(debug.contains(&launch.address()), "{}", debug);
    assert!(debug.contains("viewer_pid: Some("), "{}", debug);
    client.shutdown().await.unwrap();
}

#[test]
fn test_cli_test_keeps_going_after_unloadable_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), free_port());
    let scenario = dir.path().join("dims.yml");
    fs::write(
        &scenario,
        format!(
            r#"
name: "Dimensions only"
viewer:
  launch:
    executable: "{}"
    port: {}
    image: "{}"
steps:
  - action: image_dimensions
    expect: [10, 10]
"#,
            mock_viewer().display(),
            free_port(),
            IMAGE
        ),
    )
    .unwrap();
    let missing = dir.path().join("missing.yml");

    let output = run_harness(
        &config,
        &["test", missing.to_str().unwrap(), scenario.to_str().unwrap()],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "stdout: {}", stdout);
    assert!(stdout.contains("missing.yml"), "{}", stdout);
    assert!(stdout.contains("1 passed, 1 failed"), "{}", stdout);
}

#[tokio::test]
async fn test_cli_bare_attach_uses_configured_address() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();
    let config = write_config(dir.path(), port);

    let mut child = tokio::process::Command::new(mock_viewer())
        .arg("--scriptPort")
        .arg(port.to_string())
        .arg(IMAGE)
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let addr = format!("127.0.0.1:{}", port);
    for _ in 0..100 {
        if tokio::net::TcpStream::connect(&addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    let output = tokio::process::Command::new(harness())
        .arg("--config")
        .arg(&config)
        .args(["image-checks", "--attach"])
        .env("NO_COLOR", "1")
        .output()
        .await
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Attached runs leave the viewer running
    assert!(child.try_wait().unwrap().is_none());
    child.kill().await.unwrap();
}
