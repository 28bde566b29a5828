//! Image checks against a running viewer
//!
//! Reads pixel values, dimensions and channel counts through the scripted
//! client and compares them with the configured expectations.

use std::path::Path;

use colored::Colorize;

use crate::common::config::ChecksConfig;
use crate::common::{Error, Result};
use crate::scripted::{ImageView, ScriptedClient};

/// Result of a single named check
#[derive(Debug)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub result: Result<String>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Whether an observed pixel value matches the expectation.
///
/// A tolerance of zero demands exact equality.
pub fn pixel_matches(expected: f64, actual: f64, tolerance: f64) -> bool {
    if tolerance <= 0.0 {
        actual == expected
    } else {
        (actual - expected).abs() <= tolerance
    }
}

/// The image check suite
pub struct ImageChecks {
    config: ChecksConfig,
}

impl ImageChecks {
    pub fn new(config: ChecksConfig) -> Self {
        Self { config }
    }

    /// Calibration pixel equals the expected value
    pub async fn pixel_value(&self, client: &mut ScriptedClient, view: &ImageView) -> Result<String> {
        let (x, y) = (self.config.pixel_x, self.config.pixel_y);
        let what = format!("pixel value at ({}, {})", x, y);

        match client.get_pixel_value(view, x, y).await? {
            Some(value) if pixel_matches(self.config.expected_pixel, value, self.config.pixel_tolerance) => {
                Ok(format!("{} = {}", what, value))
            }
            Some(value) => Err(Error::mismatch(&what, self.config.expected_pixel, value)),
            None => Err(Error::mismatch(&what, self.config.expected_pixel, "no data")),
        }
    }

    /// Coordinates outside the image report no data rather than a number or
    /// an error
    pub async fn out_of_bounds(&self, client: &mut ScriptedClient, view: &ImageView) -> Result<String> {
        let mut probes = vec![(-1, -1)];
        if let [width, height, ..] = self.config.expected_dimensions[..] {
            probes.push((i64::from(width), 0));
            probes.push((0, i64::from(height)));
        }

        for &(x, y) in &probes {
            if let Some(value) = client.get_pixel_value(view, x, y).await? {
                return Err(Error::mismatch(
                    &format!("pixel value at ({}, {})", x, y),
                    "no data",
                    value,
                ));
            }
        }

        Ok(format!("{} outside coordinates report no data", probes.len()))
    }

    pub async fn dimensions(&self, client: &mut ScriptedClient, view: &ImageView) -> Result<String> {
        let dimensions = client.get_image_dimensions(view).await?;
        if dimensions != self.config.expected_dimensions {
            return Err(Error::mismatch(
                "image dimensions",
                &self.config.expected_dimensions,
                dimensions,
            ));
        }
        Ok(format!("dimensions {:?}", dimensions))
    }

    /// Channel count of the initial image, then of the cube loaded into the
    /// same view handle
    pub async fn channel_count(&self, client: &mut ScriptedClient, view: &ImageView) -> Result<String> {
        let initial = client.get_channel_count(view).await?;
        if initial != self.config.expected_channels {
            return Err(Error::mismatch(
                "channel count",
                self.config.expected_channels,
                initial,
            ));
        }

        client.load_local_file(view, &self.config.cube).await?;

        let loaded = client.get_channel_count(view).await?;
        if loaded != self.config.expected_cube_channels {
            return Err(Error::mismatch(
                &format!("channel count after loading {}", self.config.cube.display()),
                self.config.expected_cube_channels,
                loaded,
            ));
        }

        Ok(format!("channels {} then {} after load", initial, loaded))
    }

    /// Run every check in order. Checks are independent; one failing does
    /// not skip the rest, except that the channel check (which loads the
    /// cube) always runs last.
    pub async fn run_all(&self, client: &mut ScriptedClient, view: &ImageView) -> Vec<CheckOutcome> {
        vec![
            CheckOutcome {
                name: "pixel value",
                result: self.pixel_value(client, view).await,
            },
            CheckOutcome {
                name: "out of bounds",
                result: self.out_of_bounds(client, view).await,
            },
            CheckOutcome {
                name: "dimensions",
                result: self.dimensions(client, view).await,
            },
            CheckOutcome {
                name: "channel count",
                result: self.channel_count(client, view).await,
            },
        ]
    }

    /// Override the cube path, e.g. from the command line
    pub fn with_cube(mut self, cube: &Path) -> Self {
        self.config.cube = cube.to_path_buf();
        self
    }
}

/// Print one line per check; returns whether all passed
pub fn print_report(outcomes: &[CheckOutcome]) -> bool {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(detail) => println!("  {} {}: {}", "✓".green(), outcome.name, detail.dimmed()),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "✗".red(), outcome.name, e);
            }
        }
    }

    if failed == 0 {
        println!("\n{} {}", "✓".green().bold(), "All checks passed".green().bold());
    } else {
        println!(
            "\n{} {}",
            "✗".red().bold(),
            format!("{} of {} checks failed", failed, outcomes.len()).red().bold()
        );
    }

    failed == 0
}
