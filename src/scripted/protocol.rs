//! Scripted command types
//!
//! A command line is `<name>` or `<name> <params>`, where params is a
//! comma-separated list of `key:value` pairs. Only the first `:` of each
//! pair separates key from value, so values may carry further colons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::common::{Error, Result};

/// Prefix the viewer puts on failed command replies
pub const ERROR_PREFIX: &str = "error:";

/// Reply to a successful `saveState`
pub const SAVE_OK: &str = "State was successfully saved.";

/// Reply to a successful `restoreState`
pub const RESTORE_OK: &str = "State was successfully restored.";

/// Which parts of the application state a snapshot captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    #[serde(default)]
    pub preferences: bool,
    #[serde(default = "default_true")]
    pub layout: bool,
    #[serde(default)]
    pub data: bool,
}

fn default_true() -> bool {
    true
}

impl SnapshotOptions {
    /// Persist only the window layout
    pub fn layout_only() -> Self {
        Self {
            preferences: false,
            layout: true,
            data: false,
        }
    }
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self::layout_only()
    }
}

/// Predefined workspace layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Analysis,
    Image,
    Clear,
}

/// Ordered `key:value` parameters of a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    /// Parse `key:value,key:value`
    pub fn parse(s: &str) -> Result<Self> {
        let mut params = Vec::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once(':').ok_or_else(|| {
                Error::ScriptedProtocol(format!("Parameter '{}' is not key:value", pair))
            })?;
            params.push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(Self(params))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::ScriptedProtocol(format!("Missing parameter '{}'", key)))
    }

    fn require_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.require(key)?;
        raw.parse().map_err(|_| {
            Error::ScriptedProtocol(format!("Invalid value for '{}': {}", key, raw))
        })
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => Err(Error::ScriptedProtocol(format!(
                "Invalid flag for '{}': {}",
                key, other
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
        f.write_str(&rendered.join(","))
    }
}

/// Commands understood by the viewer's scripting port
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedCommand {
    GetImageViews,
    GetPixelValue { view: String, x: i64, y: i64 },
    GetImageDimensions { view: String },
    GetChannelCount { view: String },
    LoadLocalFile { view: String, file: PathBuf },
    SetLayout(LayoutKind),
    GetWindowCount,
    SaveState { name: String, options: SnapshotOptions },
    RestoreState { name: String },
}

impl ScriptedCommand {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            ScriptedCommand::GetImageViews => "getImageViews",
            ScriptedCommand::GetPixelValue { .. } => "getPixelValue",
            ScriptedCommand::GetImageDimensions { .. } => "getImageDimensions",
            ScriptedCommand::GetChannelCount { .. } => "getChannelCount",
            ScriptedCommand::LoadLocalFile { .. } => "loadLocalFile",
            ScriptedCommand::SetLayout(LayoutKind::Analysis) => "setAnalysisLayout",
            ScriptedCommand::SetLayout(LayoutKind::Image) => "setImageLayout",
            ScriptedCommand::SetLayout(LayoutKind::Clear) => "clearLayout",
            ScriptedCommand::GetWindowCount => "getWindowCount",
            ScriptedCommand::SaveState { .. } => "saveState",
            ScriptedCommand::RestoreState { .. } => "restoreState",
        }
    }

    fn params(&self) -> Params {
        match self {
            ScriptedCommand::GetPixelValue { view, x, y } => {
                Params::new().with("id", view).with("x", x).with("y", y)
            }
            ScriptedCommand::GetImageDimensions { view }
            | ScriptedCommand::GetChannelCount { view } => Params::new().with("id", view),
            ScriptedCommand::LoadLocalFile { view, file } => Params::new()
                .with("id", view)
                .with("file", file.display()),
            ScriptedCommand::SaveState { name, options } => Params::new()
                .with("name", name)
                .with("preferences", options.preferences)
                .with("layout", options.layout)
                .with("data", options.data),
            ScriptedCommand::RestoreState { name } => Params::new().with("name", name),
            _ => Params::new(),
        }
    }

    /// Render the command line (without the trailing newline)
    pub fn to_line(&self) -> String {
        let params = self.params();
        if params.is_empty() {
            self.name().to_string()
        } else {
            format!("{} {}", self.name(), params)
        }
    }

    /// Parse a command line as the viewer receives it
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, rest) = match line.split_once(' ') {
            Some((name, rest)) => (name, rest),
            None => (line, ""),
        };
        let params = Params::parse(rest)?;

        let cmd = match name {
            "getImageViews" => ScriptedCommand::GetImageViews,
            "getPixelValue" => ScriptedCommand::GetPixelValue {
                view: params.require("id")?.to_string(),
                x: params.require_parsed("x")?,
                y: params.require_parsed("y")?,
            },
            "getImageDimensions" => ScriptedCommand::GetImageDimensions {
                view: params.require("id")?.to_string(),
            },
            "getChannelCount" => ScriptedCommand::GetChannelCount {
                view: params.require("id")?.to_string(),
            },
            "loadLocalFile" => ScriptedCommand::LoadLocalFile {
                view: params.require("id")?.to_string(),
                file: PathBuf::from(params.require("file")?),
            },
            "setAnalysisLayout" => ScriptedCommand::SetLayout(LayoutKind::Analysis),
            "setImageLayout" => ScriptedCommand::SetLayout(LayoutKind::Image),
            "clearLayout" => ScriptedCommand::SetLayout(LayoutKind::Clear),
            "getWindowCount" => ScriptedCommand::GetWindowCount,
            "saveState" => ScriptedCommand::SaveState {
                name: params.require("name")?.to_string(),
                options: SnapshotOptions {
                    preferences: params.flag("preferences", false)?,
                    layout: params.flag("layout", true)?,
                    data: params.flag("data", false)?,
                },
            },
            "restoreState" => ScriptedCommand::RestoreState {
                name: params.require("name")?.to_string(),
            },
            "" => return Err(Error::ScriptedProtocol("Empty command".to_string())),
            other => {
                return Err(Error::ScriptedProtocol(format!(
                    "Unknown command: {}",
                    other
                )))
            }
        };
        Ok(cmd)
    }
}

/// Split off an `error:` reply
pub fn check_reply<'a>(command: &ScriptedCommand, payload: &'a str) -> Result<&'a str> {
    match payload.strip_prefix(ERROR_PREFIX) {
        Some(message) => Err(Error::command_failed(command.name(), message.trim())),
        None => Ok(payload),
    }
}

/// Parse a pixel reply; the empty payload means no data at that coordinate
pub fn parse_pixel(payload: &str) -> Result<Option<f64>> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(None);
    }
    payload
        .parse::<f64>()
        .map(Some)
        .map_err(|_| Error::ScriptedProtocol(format!("Invalid pixel value: {}", payload)))
}

/// Parse a comma-separated list reply
pub fn parse_list<T: std::str::FromStr>(payload: &str) -> Result<Vec<T>> {
    payload
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| Error::ScriptedProtocol(format!("Invalid list element: {}", s)))
        })
        .collect()
}

/// Parse a single integer reply
pub fn parse_count<T: std::str::FromStr>(payload: &str) -> Result<T> {
    payload
        .trim()
        .parse()
        .map_err(|_| Error::ScriptedProtocol(format!("Invalid count: {}", payload)))
}
