//! CARTA harness - end-to-end checks for the CARTA image viewer
//!
//! This library drives the viewer through its web client (W3C WebDriver)
//! and through its scripted command port.

pub mod checks;
pub mod cli;
pub mod commands;
pub mod common;
pub mod fixture;
pub mod scenario;
pub mod scripted;
pub mod testing;
pub mod ui;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use scripted::{ImageView, ScriptedClient, ViewerLaunch};
