//! Layout save/restore round trip through the web client
//!
//! Saves a layout-only snapshot, switches to another layout, restores the
//! snapshot and checks the display window count came back.

use std::fmt;
use std::time::Duration;

use crate::common::config::{Config, Timeouts};
use crate::common::{Error, Result};
use crate::ui::{ControlMap, UiActions, UiDriver};

/// Where the scenario is in the round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Idle,
    SaveDialogOpen,
    LayoutChanged,
    RestoreDialogOpen,
    Restored,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::Idle => "idle",
            ScenarioState::SaveDialogOpen => "save dialog open",
            ScenarioState::LayoutChanged => "layout changed",
            ScenarioState::RestoreDialogOpen => "restore dialog open",
            ScenarioState::Restored => "restored",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripReport {
    pub snapshot: String,
    pub windows_before: usize,
    pub windows_after: usize,
    pub state: ScenarioState,
}

/// Parameters of the UI round trip
#[derive(Debug, Clone)]
pub struct LayoutRoundTrip {
    pub snapshot_name: String,
    pub alternate_layout: String,
    pub startup_settle: Duration,
    pub restore_settle: Duration,
}

impl LayoutRoundTrip {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.scenario.snapshot_name,
            &config.scenario.alternate_layout,
            &config.timeouts,
        )
    }

    pub fn new(snapshot_name: &str, alternate_layout: &str, timeouts: &Timeouts) -> Self {
        Self {
            snapshot_name: snapshot_name.to_string(),
            alternate_layout: alternate_layout.to_string(),
            startup_settle: timeouts.startup_settle(),
            restore_settle: timeouts.restore_settle(),
        }
    }

    /// Run the scenario against an attached driver
    pub async fn run(&self, driver: &dyn UiDriver, controls: &ControlMap) -> Result<RoundTripReport> {
        let ui = UiActions::new(driver, controls);
        let mut state = ScenarioState::Idle;

        tokio::time::sleep(self.startup_settle).await;
        let windows_before = ui.count_windows().await?;
        tracing::info!(windows = windows_before, "Window count before save");

        ui.click_session_menu().await?;
        ui.click_session_save().await?;
        transition(&mut state, ScenarioState::SaveDialogOpen);

        ui.set_save_options(false, true, false).await?;
        ui.set_save_name(&self.snapshot_name).await?;
        ui.save_snapshot().await?;
        ui.close_save().await?;
        transition(&mut state, ScenarioState::Idle);

        ui.switch_layout(&self.alternate_layout).await?;
        transition(&mut state, ScenarioState::LayoutChanged);
        let windows_changed = ui.count_windows().await?;
        tracing::debug!(
            windows = windows_changed,
            layout = %self.alternate_layout,
            "Window count after layout change"
        );

        ui.click_session_menu().await?;
        ui.click_session_restore().await?;
        transition(&mut state, ScenarioState::RestoreDialogOpen);

        ui.select_restore_snapshot(&self.snapshot_name).await?;
        ui.restore_snapshot().await?;
        ui.close_restore().await?;
        tokio::time::sleep(self.restore_settle).await;
        transition(&mut state, ScenarioState::Restored);

        let windows_after = ui.count_windows().await?;
        tracing::info!(windows = windows_after, "Window count after restore");

        if windows_after != windows_before {
            return Err(Error::mismatch(
                "display windows after restore",
                windows_before,
                windows_after,
            ));
        }

        Ok(RoundTripReport {
            snapshot: self.snapshot_name.clone(),
            windows_before,
            windows_after,
            state,
        })
    }
}

fn transition(state: &mut ScenarioState, next: ScenarioState) {
    tracing::debug!(from = %state, to = %next, "Scenario state");
    *state = next;
}
