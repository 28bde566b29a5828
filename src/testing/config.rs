//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use serde::Deserialize;
use std::path::PathBuf;

use crate::scripted::LayoutKind;

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// How to reach the viewer
    pub viewer: ViewerTarget,
    /// The sequence of test steps to execute
    pub steps: Vec<TestStep>,
}

/// The viewer under test: launched for the scenario or already running.
/// Exactly one of the two must be given.
#[derive(Deserialize, Debug)]
pub struct ViewerTarget {
    pub launch: Option<LaunchTarget>,
    /// `host:port` or a bare port of a running viewer
    pub attach: Option<String>,
}

/// Launch settings; relative paths resolve against the scenario file
#[derive(Deserialize, Debug)]
pub struct LaunchTarget {
    /// Viewer executable (bare names are looked up on PATH)
    pub executable: PathBuf,
    /// Scripted command port
    pub port: u16,
    /// Viewer configuration file
    pub config: Option<PathBuf>,
    /// Entry document of the embedded web client
    pub html: Option<PathBuf>,
    /// Image loaded at startup
    pub image: Option<PathBuf>,
}

fn default_view() -> usize {
    0
}

/// A single test step in the execution flow
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Read a pixel value
    PixelValue {
        /// Index into the viewer's image views
        #[serde(default = "default_view")]
        view: usize,
        x: i64,
        y: i64,
        expect: PixelExpectation,
    },
    /// Check the image dimensions
    ImageDimensions {
        #[serde(default = "default_view")]
        view: usize,
        expect: Vec<u32>,
    },
    /// Check the channel count
    ChannelCount {
        #[serde(default = "default_view")]
        view: usize,
        expect: u32,
    },
    /// Load a file into an existing view
    LoadFile {
        #[serde(default = "default_view")]
        view: usize,
        /// Path on the viewer's filesystem, passed through unchanged
        path: PathBuf,
    },
    /// Switch to a predefined layout
    SetLayout { layout: LayoutKind },
    /// Save a snapshot (layout only unless flags say otherwise)
    SaveState {
        name: String,
        #[serde(default)]
        preferences: bool,
        #[serde(default = "default_true")]
        layout: bool,
        #[serde(default)]
        data: bool,
    },
    /// Restore a snapshot by name
    RestoreState {
        name: String,
        /// Whether the restore should succeed (default: true)
        #[serde(default = "default_true")]
        success: bool,
    },
    /// Count display windows
    WindowCount {
        /// Remember the count under this key
        record: Option<String>,
        /// Expected count
        expect: Option<usize>,
        /// Key of an earlier recorded count that must match
        equals_recorded: Option<String>,
    },
    /// Pause between steps
    Sleep { ms: u64 },
}

fn default_true() -> bool {
    true
}

/// Expected pixel reading
#[derive(Deserialize, Debug)]
pub struct PixelExpectation {
    /// Expected value
    pub value: Option<f64>,
    /// Allowed absolute difference (default: exact)
    #[serde(default)]
    pub tolerance: f64,
    /// Expect the no-data sentinel
    #[serde(default)]
    pub empty: bool,
}
