//! Layout round trip through the scripting port
//!
//! Same invariant as the UI scenario, without a browser: save the current
//! layout, switch to the image layout, restore, compare window counts.

use std::time::Duration;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::scripted::{LayoutKind, ScriptedClient, SnapshotOptions};

use super::layout::{RoundTripReport, ScenarioState};

#[derive(Debug, Clone)]
pub struct ScriptedRoundTrip {
    pub snapshot_name: String,
    pub alternate: LayoutKind,
    pub restore_settle: Duration,
}

impl ScriptedRoundTrip {
    pub fn from_config(config: &Config) -> Self {
        Self {
            snapshot_name: config.scenario.snapshot_name.clone(),
            alternate: LayoutKind::Image,
            restore_settle: config.timeouts.restore_settle(),
        }
    }

    pub async fn run(&self, client: &mut ScriptedClient) -> Result<RoundTripReport> {
        let windows_before = client.get_window_count().await?;
        tracing::info!(windows = windows_before, "Window count before save");

        client
            .save_state(&self.snapshot_name, SnapshotOptions::layout_only())
            .await?;
        client.set_layout(self.alternate).await?;
        let windows_changed = client.get_window_count().await?;
        tracing::debug!(
            windows = windows_changed,
            layout = ?self.alternate,
            "Window count after layout change"
        );

        client.restore_state(&self.snapshot_name).await?;
        tokio::time::sleep(self.restore_settle).await;

        let windows_after = client.get_window_count().await?;
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
            state: ScenarioState::Restored,
        })
    }
}
