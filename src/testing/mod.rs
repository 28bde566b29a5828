//! Scenario runner
//!
//! Reads YAML test scenarios and executes them against a viewer through
//! the scripted client, asserting on parsed replies rather than raw text.

mod config;
mod runner;

pub use config::*;
pub use runner::{load_scenario, run_scenario, TestResult};
