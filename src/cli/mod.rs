//! CLI command handling
//!
//! Dispatches CLI commands and formats their reports.

use colored::Colorize;

use crate::checks::{self, ImageChecks};
use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{parse_address, paths, Error, Result};
use crate::fixture::ViewerFixture;
use crate::scenario::{LayoutRoundTrip, RoundTripReport, ScriptedRoundTrip};
use crate::scripted::{ScriptedClient, ViewerLaunch};
use crate::testing;
use crate::ui::{ControlMap, WebDriverSession};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::LayoutRoundtrip {
            webdriver,
            app_url,
            browser,
            snapshot,
            layout,
        } => {
            let mut config = config;
            if let Some(url) = webdriver {
                config.webdriver.url = url;
            }
            if let Some(url) = app_url {
                config.webdriver.app_url = url;
            }
            if let Some(name) = browser {
                config.webdriver.browser = name;
            }
            if let Some(name) = snapshot {
                config.scenario.snapshot_name = name;
            }
            if let Some(label) = layout {
                config.scenario.alternate_layout = label;
            }
            layout_roundtrip(&config).await
        }

        Commands::ScriptedRoundtrip { attach } => {
            let mut client = connect_or_launch(&config, attach.as_deref()).await?;
            let result = ScriptedRoundTrip::from_config(&config)
                .run(&mut client)
                .await;
            let _ = client.shutdown().await;

            print_round_trip(&result?);
            Ok(())
        }

        Commands::ImageChecks {
            attach,
            image,
            cube,
        } => {
            let mut fixture = match attach {
                Some(addr) => {
                    let addr = resolve_address(&config, &addr)?;
                    ViewerFixture::attach(&addr, &config.timeouts).await?
                }
                None => {
                    let mut launch = ViewerLaunch::from_config(&config.viewer);
                    if let Some(image) = image {
                        launch = launch.with_image(image);
                    }
                    ViewerFixture::setup(&launch, &config.timeouts).await?
                }
            };

            let mut suite = ImageChecks::new(config.checks.clone());
            if let Some(cube) = cube {
                suite = suite.with_cube(&cube);
            }

            println!(
                "\n{} {}",
                "Image checks on".blue().bold(),
                fixture.view().id().white().bold()
            );
            let (client, view) = fixture.parts();
            let outcomes = suite.run_all(client, view).await;
            let _ = fixture.teardown().await;

            if checks::print_report(&outcomes) {
                Ok(())
            } else {
                Err(Error::TestAssertion("image checks failed".to_string()))
            }
        }

        Commands::Test { paths, verbose } => {
            let mut failed = 0;
            for path in &paths {
                match testing::run_scenario(path, verbose, &config.timeouts).await {
                    Ok(result) if result.passed => {}
                    Ok(_) => failed += 1,
                    Err(e) => {
                        println!("{} {}: {}", "✗".red().bold(), path.display(), e);
                        failed += 1;
                    }
                }
            }

            if paths.len() > 1 {
                println!(
                    "{} passed, {} failed",
                    paths.len() - failed,
                    failed
                );
            }

            if failed > 0 {
                Err(Error::TestAssertion(format!(
                    "{} of {} scenarios failed",
                    failed,
                    paths.len()
                )))
            } else {
                Ok(())
            }
        }

        Commands::Config => {
            match paths::config_path() {
                Some(path) if path.exists() => println!("Config file: {}", path.display()),
                Some(path) => println!("Config file: {} (not present, using defaults)", path.display()),
                None => println!("Config file: unavailable on this platform"),
            }
            print_config(&config);
            Ok(())
        }
    }
}

async fn layout_roundtrip(config: &Config) -> Result<()> {
    let controls = ControlMap::with_overrides(&config.controls)?;
    let session = WebDriverSession::start(
        &config.webdriver.url,
        &config.webdriver.browser,
        config.timeouts.request(),
    )
    .await?;

    let result = match session.navigate(&config.webdriver.app_url).await {
        Ok(()) => LayoutRoundTrip::from_config(config)
            .run(&session, &controls)
            .await,
        Err(e) => Err(e),
    };

    if let Err(e) = session.quit().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }

    print_round_trip(&result?);
    Ok(())
}

/// Attach to `attach` when given, otherwise launch the configured viewer
async fn connect_or_launch(config: &Config, attach: Option<&str>) -> Result<ScriptedClient> {
    match attach {
        Some(addr) => {
            let addr = resolve_address(config, addr)?;
            ScriptedClient::connect(&addr, config.timeouts.request()).await
        }
        None => {
            let launch = ViewerLaunch::from_config(&config.viewer);
            ScriptedClient::launch(&launch, &config.timeouts).await
        }
    }
}

/// An empty `--attach` means the configured viewer address
fn resolve_address(config: &Config, addr: &str) -> Result<String> {
    if addr.is_empty() {
        return Ok(config.viewer.address());
    }
    parse_address(addr).ok_or_else(|| Error::Config(format!("Invalid viewer address '{}'", addr)))
}

fn print_round_trip(report: &RoundTripReport) {
    println!("Window Count before save: {}", report.windows_before);
    println!("Window Count after restore: {}", report.windows_after);
    println!(
        "{} Snapshot '{}' restored the layout",
        "✓".green().bold(),
        report.snapshot
    );
}

fn print_config(config: &Config) {
    println!("\n[viewer]");
    println!("  executable = {}", config.viewer.executable.display());
    println!("  address = {}", config.viewer.address());
    if let Some(image) = &config.viewer.image {
        println!("  image = {}", image.display());
    }

    println!("\n[webdriver]");
    println!("  url = {}", config.webdriver.url);
    println!("  browser = {}", config.webdriver.browser);
    println!("  app_url = {}", config.webdriver.app_url);

    println!("\n[timeouts]");
    println!("  startup_settle_secs = {}", config.timeouts.startup_settle_secs);
    println!("  restore_settle_secs = {}", config.timeouts.restore_settle_secs);
    println!("  viewer_startup_secs = {}", config.timeouts.viewer_startup_secs);
    println!("  request_secs = {}", config.timeouts.request_secs);

    println!("\n[scenario]");
    println!("  snapshot_name = {}", config.scenario.snapshot_name);
    println!("  alternate_layout = {}", config.scenario.alternate_layout);

    println!("\n[checks]");
    println!(
        "  pixel ({}, {}) = {} (tolerance {})",
        config.checks.pixel_x,
        config.checks.pixel_y,
        config.checks.expected_pixel,
        config.checks.pixel_tolerance
    );
    println!("  dimensions = {:?}", config.checks.expected_dimensions);
    println!(
        "  channels = {}, {} after loading {}",
        config.checks.expected_channels,
        config.checks.expected_cube_channels,
        config.checks.cube.display()
    );

    if !config.controls.is_empty() {
        println!("\n[controls]");
        let mut keys: Vec<_> = config.controls.keys().collect();
        keys.sort();
        for key in keys {
            println!("  {} = {}", key, config.controls[key]);
        }
    }
}
