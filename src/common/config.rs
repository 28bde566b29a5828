//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// How to launch or reach the viewer's scripting port
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Browser automation endpoint
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Timeout and settle settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Layout round trip parameters
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Expected values for the scripted image checks
    #[serde(default)]
    pub checks: ChecksConfig,

    /// Per-action locator overrides, e.g. `session_menu = "css:[data-action=session]"`
    #[serde(default)]
    pub controls: HashMap<String, String>,
}

/// Viewer launch settings
#[derive(Debug, Deserialize, Clone)]
pub struct ViewerConfig {
    /// Path to the viewer executable (bare names are looked up on PATH)
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    /// Viewer configuration file passed with --config
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Scripted command port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host the scripting port listens on
    #[serde(default = "default_host")]
    pub host: String,

    /// Entry document passed with --html
    #[serde(default)]
    pub html: Option<PathBuf>,

    /// Image loaded at startup
    #[serde(default)]
    pub image: Option<PathBuf>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            config_file: None,
            port: default_port(),
            host: default_host(),
            html: None,
            image: None,
        }
    }
}

fn default_executable() -> PathBuf {
    PathBuf::from("desktop")
}
fn default_port() -> u16 {
    9999
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl ViewerConfig {
    /// Address of the scripting port
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// WebDriver settings
#[derive(Debug, Deserialize, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server URL (geckodriver, chromedriver, selenium)
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// Browser name requested in the session capabilities
    #[serde(default = "default_browser")]
    pub browser: String,

    /// URL of the viewer's web client
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            browser: default_browser(),
            app_url: default_app_url(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://127.0.0.1:4444".to_string()
}
fn default_browser() -> String {
    "firefox".to_string()
}
fn default_app_url() -> String {
    "http://localhost:8080/pureweb.html".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Settle delay after attaching to the application
    #[serde(default = "default_startup_settle")]
    pub startup_settle_secs: u64,

    /// Settle delay after a restore, before re-counting windows
    #[serde(default = "default_restore_settle")]
    pub restore_settle_secs: u64,

    /// How long a launched viewer has to open its scripting port
    #[serde(default = "default_viewer_startup")]
    pub viewer_startup_secs: u64,

    /// Timeout for a single scripted or WebDriver request
    #[serde(default = "default_request")]
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            startup_settle_secs: default_startup_settle(),
            restore_settle_secs: default_restore_settle(),
            viewer_startup_secs: default_viewer_startup(),
            request_secs: default_request(),
        }
    }
}

fn default_startup_settle() -> u64 {
    5
}
fn default_restore_settle() -> u64 {
    2
}
fn default_viewer_startup() -> u64 {
    30
}
fn default_request() -> u64 {
    30
}

impl Timeouts {
    pub fn startup_settle(&self) -> Duration {
        Duration::from_secs(self.startup_settle_secs)
    }

    pub fn restore_settle(&self) -> Duration {
        Duration::from_secs(self.restore_settle_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

/// Layout round trip settings
#[derive(Debug, Deserialize, Clone)]
pub struct ScenarioConfig {
    /// Name the layout snapshot is saved under
    #[serde(default = "default_snapshot_name")]
    pub snapshot_name: String,

    /// Menu label of the layout switched to between save and restore
    #[serde(default = "default_alternate_layout")]
    pub alternate_layout: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            snapshot_name: default_snapshot_name(),
            alternate_layout: default_alternate_layout(),
        }
    }
}

fn default_snapshot_name() -> String {
    "tSnapshotLayout".to_string()
}
fn default_alternate_layout() -> String {
    "Image Layout".to_string()
}

/// Expected values for the image checks
#[derive(Debug, Deserialize, Clone)]
pub struct ChecksConfig {
    #[serde(default)]
    pub pixel_x: i64,
    #[serde(default)]
    pub pixel_y: i64,

    /// Calibration value at (pixel_x, pixel_y)
    #[serde(default = "default_expected_pixel")]
    pub expected_pixel: f64,

    /// Allowed absolute difference; 0 means exact equality
    #[serde(default)]
    pub pixel_tolerance: f64,

    #[serde(default = "default_expected_dimensions")]
    pub expected_dimensions: Vec<u32>,

    #[serde(default = "default_expected_channels")]
    pub expected_channels: u32,

    /// Multi-channel cube loaded to check in-place channel updates
    #[serde(default = "default_cube")]
    pub cube: PathBuf,

    #[serde(default = "default_expected_cube_channels")]
    pub expected_cube_channels: u32,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            pixel_x: 0,
            pixel_y: 0,
            expected_pixel: default_expected_pixel(),
            pixel_tolerance: 0.0,
            expected_dimensions: default_expected_dimensions(),
            expected_channels: default_expected_channels(),
            cube: default_cube(),
            expected_cube_channels: default_expected_cube_channels(),
        }
    }
}

fn default_expected_pixel() -> f64 {
    0.5
}
fn default_expected_dimensions() -> Vec<u32> {
    vec![10, 10]
}
fn default_expected_channels() -> u32 {
    1
}
fn default_cube() -> PathBuf {
    PathBuf::from("m31_cropped.fits")
}
fn default_expected_cube_channels() -> u32 {
    3
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.viewer.port, 9999);
        assert_eq!(config.scenario.snapshot_name, "tSnapshotLayout");
        assert_eq!(config.scenario.alternate_layout, "Image Layout");
        assert_eq!(config.checks.expected_dimensions, vec![10, 10]);
        assert_eq!(config.checks.expected_pixel, 0.5);
        assert_eq!(config.timeouts.startup_settle_secs, 5);
        assert_eq!(config.timeouts.restore_settle_secs, 2);
        assert!(config.controls.is_empty());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
[viewer]
executable = "/opt/carta/desktop"
port = 7777
image = "/scratch/Images/mexinputtest.fits"

[timeouts]
restore_settle_secs = 0

[controls]
session_menu = "css:[data-action='session']"
"#,
        )
        .unwrap();

        assert_eq!(config.viewer.executable, PathBuf::from("/opt/carta/desktop"));
        assert_eq!(config.viewer.address(), "127.0.0.1:7777");
        assert_eq!(config.timeouts.restore_settle_secs, 0);
        assert_eq!(config.timeouts.startup_settle_secs, 5);
        assert_eq!(
            config.controls.get("session_menu").map(String::as_str),
            Some("css:[data-action='session']")
        );
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = Config::parse("[viewer]\nport = \"not a number\"").unwrap_err();
        assert!(matches!(err, crate::common::Error::ConfigParse(_)));
    }
}
