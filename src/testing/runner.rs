//! Test runner implementation
//!
//! Executes test scenarios by talking to the viewer through the scripted
//! client and asserting on parsed replies.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::checks::pixel_matches;
use crate::common::config::Timeouts;
use crate::common::{parse_address, paths, Error, Result};
use crate::scripted::{ScriptedClient, SnapshotOptions, ViewerLaunch};

use super::config::{LaunchTarget, PixelExpectation, TestScenario, TestStep};

/// Result of a test run
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

/// Window counts recorded by earlier steps
type Recorded = HashMap<String, usize>;

/// Load and parse a scenario file
pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read test scenario '{}': {}",
            path.display(),
            e
        ))
    })?;

    serde_yaml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse test scenario: {}", e)))
}

/// Run a test scenario from a YAML file
pub async fn run_scenario(path: &Path, verbose: bool, timeouts: &Timeouts) -> Result<TestResult> {
    let scenario = load_scenario(path)?;
    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        scenario.name.white().bold()
    );

    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    let scenario_dir = path.parent().unwrap_or(Path::new("."));

    let mut client = match (&scenario.viewer.launch, &scenario.viewer.attach) {
        (Some(target), None) => {
            let launch = launch_config(target, scenario_dir, verbose);

            println!("\n{}", "Starting viewer...".cyan());
            if verbose {
                println!(
                    "  Executable: {}",
                    launch.executable.display().to_string().dimmed()
                );
                println!("  Port: {}", launch.port.to_string().dimmed());
            }

            let client = ScriptedClient::launch(&launch, timeouts).await?;
            println!("  {} Viewer started", "✓".green());
            client
        }
        (None, Some(attach)) => {
            let addr = parse_address(attach)
                .ok_or_else(|| Error::Config(format!("Invalid attach address '{}'", attach)))?;

            println!("\n{}", "Attaching to viewer...".cyan());
            let client = ScriptedClient::connect(&addr, timeouts.request()).await?;
            println!("  {} Attached to {}", "✓".green(), addr);
            client
        }
        _ => {
            return Err(Error::Config(
                "Scenario viewer needs exactly one of 'launch' or 'attach'".to_string(),
            ))
        }
    };

    println!("\n{}", "Steps:".cyan());

    let mut recorded = Recorded::new();

    for (i, step) in scenario.steps.iter().enumerate() {
        let step_num = i + 1;

        if let Err(e) = execute_step(&mut client, step, step_num, &mut recorded).await {
            println!("  {} Step {}: {}", "✗".red(), step_num, e);

            let _ = client.shutdown().await;

            return Ok(TestResult {
                name: scenario.name.clone(),
                passed: false,
                steps_run: step_num,
                steps_total,
                error: Some(e.to_string()),
            });
        }
    }

    let _ = client.shutdown().await;

    println!(
        "\n{} {}\n",
        "✓".green().bold(),
        "Test Passed".green().bold()
    );

    Ok(TestResult {
        name: scenario.name,
        passed: true,
        steps_run: steps_total,
        steps_total,
        error: None,
    })
}

fn launch_config(target: &LaunchTarget, scenario_dir: &Path, verbose: bool) -> ViewerLaunch {
    // Bare executable names stay bare so they are looked up on PATH
    let executable = if target.executable.components().count() > 1 {
        paths::resolve_relative(scenario_dir, &target.executable)
    } else {
        target.executable.clone()
    };

    let resolve = |p: &Option<std::path::PathBuf>| {
        p.as_ref().map(|p| paths::resolve_relative(scenario_dir, p))
    };

    ViewerLaunch {
        executable,
        config_file: resolve(&target.config),
        host: "127.0.0.1".to_string(),
        port: target.port,
        html: resolve(&target.html),
        image: resolve(&target.image),
        verbose,
    }
}

/// Execute a single test step
async fn execute_step(
    client: &mut ScriptedClient,
    step: &TestStep,
    step_num: usize,
    recorded: &mut Recorded,
) -> Result<()> {
    let summary = match step {
        TestStep::PixelValue { view, x, y, expect } => {
            execute_pixel_step(client, *view, *x, *y, expect).await?
        }
        TestStep::ImageDimensions { view, expect } => {
            let handle = client.image_view(*view).await?;
            let dimensions = client.get_image_dimensions(&handle).await?;
            if &dimensions != expect {
                return Err(Error::mismatch("image dimensions", expect, dimensions));
            }
            format!("image_dimensions = {:?}", dimensions)
        }
        TestStep::ChannelCount { view, expect } => {
            let handle = client.image_view(*view).await?;
            let channels = client.get_channel_count(&handle).await?;
            if channels != *expect {
                return Err(Error::mismatch("channel count", expect, channels));
            }
            format!("channel_count = {}", channels)
        }
        TestStep::LoadFile { view, path } => {
            let handle = client.image_view(*view).await?;
            client.load_local_file(&handle, path).await?;
            format!("load_file {}", path.display())
        }
        TestStep::SetLayout { layout } => {
            client.set_layout(*layout).await?;
            format!("set_layout {:?}", layout)
        }
        TestStep::SaveState {
            name,
            preferences,
            layout,
            data,
        } => {
            let options = SnapshotOptions {
                preferences: *preferences,
                layout: *layout,
                data: *data,
            };
            client.save_state(name, options).await?;
            format!("save_state {}", name)
        }
        TestStep::RestoreState { name, success } => {
            let result = client.restore_state(name).await;
            match (result, *success) {
                (Ok(()), true) => format!("restore_state {}", name),
                (Err(Error::ScriptedCommandFailed { .. }), false) => {
                    format!("restore_state {} (expected failure)", name)
                }
                (Ok(()), false) => {
                    return Err(Error::TestAssertion(format!(
                        "Restoring '{}' was expected to fail but succeeded",
                        name
                    )))
                }
                (Err(e), _) => return Err(e),
            }
        }
        TestStep::WindowCount {
            record,
            expect,
            equals_recorded,
        } => {
            let count = client.get_window_count().await?;
            check_window_count(count, expect.as_ref(), equals_recorded.as_deref(), recorded)?;
            if let Some(key) = record {
                recorded.insert(key.clone(), count);
            }
            format!("window_count = {}", count)
        }
        TestStep::Sleep { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            format!("sleep {}ms", ms)
        }
    };

    println!("  {} Step {}: {}", "✓".green(), step_num, summary.dimmed());
    Ok(())
}

async fn execute_pixel_step(
    client: &mut ScriptedClient,
    view: usize,
    x: i64,
    y: i64,
    expect: &PixelExpectation,
) -> Result<String> {
    let handle = client.image_view(view).await?;
    let actual = client.get_pixel_value(&handle, x, y).await?;
    check_pixel(x, y, actual, expect)?;

    Ok(match actual {
        Some(value) => format!("pixel_value({}, {}) = {}", x, y, value),
        None => format!("pixel_value({}, {}) = no data", x, y),
    })
}

fn check_pixel(x: i64, y: i64, actual: Option<f64>, expect: &PixelExpectation) -> Result<()> {
    let what = format!("pixel value at ({}, {})", x, y);

    if expect.empty {
        return match actual {
            None => Ok(()),
            Some(value) => Err(Error::mismatch(&what, "no data", value)),
        };
    }

    let expected = expect.value.ok_or_else(|| {
        Error::Config("pixel_value step needs 'expect.value' or 'expect.empty'".to_string())
    })?;

    match actual {
        Some(value) if pixel_matches(expected, value, expect.tolerance) => Ok(()),
        Some(value) => Err(Error::mismatch(&what, expected, value)),
        None => Err(Error::mismatch(&what, expected, "no data")),
    }
}

fn check_window_count(
    count: usize,
    expect: Option<&usize>,
    equals_recorded: Option<&str>,
    recorded: &Recorded,
) -> Result<()> {
    if let Some(expected) = expect {
        if count != *expected {
            return Err(Error::mismatch("window count", expected, count));
        }
    }

    if let Some(key) = equals_recorded {
        let before = recorded.get(key).ok_or_else(|| {
            Error::Config(format!("No window count recorded under '{}'", key))
        })?;
        if count != *before {
            return Err(Error::mismatch(
                &format!("window count (recorded as '{}')", key),
                before,
                count,
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn expect_value(value: f64) -> PixelExpectation {
        PixelExpectation {
            value: Some(value),
            tolerance: 0.0,
            empty: false,
        }
    }

    #[test]
    fn test_check_pixel_exact() {
        assert!(check_pixel(0, 0, Some(0.5), &expect_value(0.5)).is_ok());
        let err = check_pixel(0, 0, Some(0.25), &expect_value(0.5)).unwrap_err();
        assert!(err.to_string().contains("expected 0.5, got 0.25"));
        assert!(check_pixel(0, 0, None, &expect_value(0.5)).is_err());
    }

    #[test]
    fn test_check_pixel_empty() {
        let empty = PixelExpectation {
            value: None,
            tolerance: 0.0,
            empty: true,
        };
        assert!(check_pixel(-1, -1, None, &empty).is_ok());
        assert!(check_pixel(-1, -1, Some(0.0), &empty).is_err());
    }

    #[test]
    fn test_check_pixel_without_expectation() {
        let nothing = PixelExpectation {
            value: None,
            tolerance: 0.0,
            empty: false,
        };
        assert!(matches!(
            check_pixel(0, 0, Some(0.5), &nothing),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_check_window_count() {
        let mut recorded = Recorded::new();
        recorded.insert("before".to_string(), 5);

        assert!(check_window_count(5, Some(&5), Some("before"), &recorded).is_ok());
        assert!(check_window_count(1, None, Some("before"), &recorded).is_err());
        assert!(check_window_count(1, Some(&5), None, &recorded).is_err());
        assert!(matches!(
            check_window_count(5, None, Some("missing"), &recorded),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_launch_paths_resolve_against_scenario() {
        let target = LaunchTarget {
            executable: PathBuf::from("bin/desktop"),
            port: 9000,
            config: None,
            html: None,
            image: Some(PathBuf::from("images/mexinputtest.fits")),
        };
        let launch = launch_config(&target, Path::new("/tests/scenarios"), false);
        assert_eq!(launch.executable, PathBuf::from("/tests/scenarios/bin/desktop"));
        assert_eq!(
            launch.image,
            Some(PathBuf::from("/tests/scenarios/images/mexinputtest.fits"))
        );

        let bare = LaunchTarget {
            executable: PathBuf::from("desktop"),
            port: 9000,
            config: None,
            html: None,
            image: None,
        };
        assert_eq!(
            launch_config(&bare, Path::new("/tests"), false).executable,
            PathBuf::from("desktop")
        );
    }
}
