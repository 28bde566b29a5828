//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Save a layout snapshot in the web client, switch layout, restore it
    /// and check the window count came back
    LayoutRoundtrip {
        /// WebDriver server URL
        #[arg(long)]
        webdriver: Option<String>,

        /// URL of the viewer's web client
        #[arg(long)]
        app_url: Option<String>,

        /// Browser requested from the WebDriver server
        #[arg(long)]
        browser: Option<String>,

        /// Snapshot name to save and restore
        #[arg(long)]
        snapshot: Option<String>,

        /// Layout menu entry to switch to between save and restore
        #[arg(long)]
        layout: Option<String>,
    },

    /// The same round trip through the scripting port
    ScriptedRoundtrip {
        /// Attach to a running viewer instead of launching one. Takes host:port
        /// or a port; without a value, the configured viewer address is used
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        attach: Option<String>,
    },

    /// Pixel, dimension and channel checks on a loaded image
    ImageChecks {
        /// Attach to a running viewer instead of launching one. Takes host:port
        /// or a port; without a value, the configured viewer address is used
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        attach: Option<String>,

        /// Image the launched viewer opens at startup
        #[arg(long)]
        image: Option<PathBuf>,

        /// Multi-channel cube loaded for the channel check
        #[arg(long)]
        cube: Option<PathBuf>,
    },

    /// Run YAML test scenarios against a viewer
    Test {
        /// Paths to the YAML test scenario files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// Show the configuration file location and effective settings
    Config,
}
