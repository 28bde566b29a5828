//! Viewer fixture: one viewer, one connection, one image view
//!
//! `setup` launches the viewer and resolves its first image view;
//! `teardown` closes the connection and stops the process. Dropping a
//! fixture without teardown still kills a launched viewer.

use crate::common::config::Timeouts;
use crate::common::Result;
use crate::scripted::{ImageView, ScriptedClient, ViewerLaunch};

pub struct ViewerFixture {
    client: ScriptedClient,
    view: ImageView,
}

impl ViewerFixture {
    /// Launch a viewer and bind to its first image view
    pub async fn setup(launch: &ViewerLaunch, timeouts: &Timeouts) -> Result<Self> {
        let client = ScriptedClient::launch(launch, timeouts).await?;
        Self::bind(client).await
    }

    /// Attach to a viewer that is already running
    pub async fn attach(addr: &str, timeouts: &Timeouts) -> Result<Self> {
        let client = ScriptedClient::connect(addr, timeouts.request()).await?;
        Self::bind(client).await
    }

    async fn bind(mut client: ScriptedClient) -> Result<Self> {
        let view = match client.image_view(0).await {
            Ok(view) => view,
            Err(e) => {
                let _ = client.shutdown().await;
                return Err(e);
            }
        };
        tracing::info!(peer = %client.peer(), view = %view.id(), "Viewer fixture ready");
        Ok(Self { client, view })
    }

    pub fn view(&self) -> &ImageView {
        &self.view
    }

    /// Client and view together, for calls that need both
    pub fn parts(&mut self) -> (&mut ScriptedClient, &ImageView) {
        (&mut self.client, &self.view)
    }

    pub async fn teardown(self) -> Result<()> {
        tracing::debug!(peer = %self.client.peer(), "Tearing down viewer fixture");
        self.client.shutdown().await
    }
}

impl std::fmt::Debug for ViewerFixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerFixture")
            .field("peer", &self.client.peer())
            .field("view", &self.view)
            .finish()
    }
}

