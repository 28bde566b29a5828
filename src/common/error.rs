//! Error types for the CARTA harness
//!
//! Every failure is terminal for the scenario or check that raised it.
//! Messages name what was being attempted so a failing run can be read
//! without re-running it.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === UI Errors ===
    #[error("Could not find the control for '{action}' (locator: {locator})")]
    ElementNotFound { action: String, locator: String },

    #[error("Cannot tell whether '{action}' is checked (locator: {locator})")]
    CheckStateUnknown { action: String, locator: String },

    #[error("Could not start a WebDriver session: {0}")]
    WebDriverSession(#[from] fantoccini::error::NewSessionError),

    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    // === Viewer / Scripted Client Errors ===
    #[error("Viewer not reachable at {0}. Is it running with --scriptPort?")]
    ViewerNotRunning(String),

    #[error("Viewer failed to start: {0}")]
    ViewerStartFailed(String),

    #[error("Viewer did not accept scripted connections within {0} seconds")]
    ViewerSpawnTimeout(u64),

    #[error("Viewer closed the scripted connection")]
    ConnectionClosed,

    #[error("Scripted protocol error: {0}")]
    ScriptedProtocol(String),

    #[error("Scripted command '{command}' failed: {message}")]
    ScriptedCommandFailed { command: String, message: String },

    #[error("Viewer reported no image views")]
    NoImageViews,

    #[error("Image view {index} not found (viewer has {available})")]
    ViewNotFound { index: usize, available: usize },

    // === Assertion Errors ===
    #[error("{what}: expected {expected}, got {actual}")]
    ValueMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Timeout Errors ===
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

}

impl Error {
    /// Create an element not found error for a named action
    pub fn element_not_found(action: &str, locator: impl std::fmt::Display) -> Self {
        Self::ElementNotFound {
            action: action.to_string(),
            locator: locator.to_string(),
        }
    }

    /// Create a value mismatch error
    pub fn mismatch(
        what: &str,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::ValueMismatch {
            what: what.to_string(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    /// Create a scripted command failure
    pub fn command_failed(command: &str, message: &str) -> Self {
        Self::ScriptedCommandFailed {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether this error came from a failed expectation rather than the
    /// harness or the transport
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            Error::ValueMismatch { .. } | Error::TestAssertion(_) | Error::ElementNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_names_expected_and_actual() {
        let err = Error::mismatch("window count", 5usize, 1usize);
        assert_eq!(err.to_string(), "window count: expected 5, got 1");
        assert!(err.is_assertion());
    }

    #[test]
    fn test_element_not_found_message() {
        let err = Error::element_not_found("select snapshot", "//div[text()='x']/..");
        assert!(err.to_string().contains("select snapshot"));
        assert!(err.to_string().contains("//div[text()='x']/.."));
    }

    #[test]
    fn test_transport_errors_are_not_assertions() {
        assert!(!Error::ConnectionClosed.is_assertion());
        assert!(!Error::Timeout(3).is_assertion());
    }
}
