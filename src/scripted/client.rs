//! Scripted client for a running viewer
//!
//! Holds a single connection to the viewer's scripting port and, when the
//! client launched the viewer itself, the viewer process.

use std::path::Path;
use std::time::Duration;

use tokio::io::{BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::process::Child;

use crate::common::config::Timeouts;
use crate::common::{Error, Result};

use super::codec;
use super::launch::{self, ViewerLaunch};
use super::protocol::{self, LayoutKind, ScriptedCommand, SnapshotOptions};

/// Handle to an image view inside the viewer.
///
/// Handles stay valid across `load_local_file`; the view's metadata changes
/// in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageView {
    id: String,
}

impl ImageView {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Client for the viewer's scripted command port
pub struct ScriptedClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    peer: String,
    request_timeout: Duration,
    /// Viewer process, when this client started it
    viewer: Option<Child>,
}

impl ScriptedClient {
    /// Connect to an already running viewer
    pub async fn connect(addr: &str, request_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                Error::ViewerNotRunning(addr.to_string())
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Self::from_stream(stream, addr, request_timeout, None))
    }

    /// Start a viewer and connect to it once its port is open
    pub async fn launch(config: &ViewerLaunch, timeouts: &Timeouts) -> Result<Self> {
        let mut child = launch::spawn_viewer(config)?;
        let addr = config.address();

        let stream = match launch::wait_for_port(&addr, &mut child, timeouts.viewer_startup_secs).await {
            Ok(stream) => stream,
            Err(e) => {
                launch::terminate(&mut child).await;
                return Err(e);
            }
        };

        tracing::info!(addr = %addr, "Connected to launched viewer");
        Ok(Self::from_stream(stream, &addr, timeouts.request(), Some(child)))
    }

    fn from_stream(
        stream: TcpStream,
        peer: &str,
        request_timeout: Duration,
        viewer: Option<Child>,
    ) -> Self {
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            peer: peer.to_string(),
            request_timeout,
            viewer,
        }
    }

    /// Address of the viewer this client talks to
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Send a command and return its raw reply payload
    pub async fn request(&mut self, command: &ScriptedCommand) -> Result<String> {
        let line = command.to_line();
        tracing::debug!(">>> {}", line);

        let request_timeout = self.request_timeout;
        let writer = &mut self.writer;
        let reader = &mut self.reader;
        let exchange = async move {
            codec::write_command(writer, &line).await?;
            codec::read_reply(reader).await
        };

        let payload = tokio::time::timeout(request_timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(request_timeout.as_secs()))??;

        tracing::debug!("<<< {:?}", payload);
        protocol::check_reply(command, &payload).map(str::to_string)
    }

    /// Image views in viewer order
    pub async fn get_image_views(&mut self) -> Result<Vec<ImageView>> {
        let payload = self.request(&ScriptedCommand::GetImageViews).await?;
        let ids: Vec<String> = protocol::parse_list(&payload)?;
        Ok(ids.into_iter().map(ImageView::new).collect())
    }

    /// View at `index` in `get_image_views` order
    pub async fn image_view(&mut self, index: usize) -> Result<ImageView> {
        let views = self.get_image_views().await?;
        if views.is_empty() {
            return Err(Error::NoImageViews);
        }
        let available = views.len();
        views
            .into_iter()
            .nth(index)
            .ok_or(Error::ViewNotFound { index, available })
    }

    /// Pixel value at (x, y); `None` when the coordinate has no data
    pub async fn get_pixel_value(&mut self, view: &ImageView, x: i64, y: i64) -> Result<Option<f64>> {
        let payload = self
            .request(&ScriptedCommand::GetPixelValue {
                view: view.id.clone(),
                x,
                y,
            })
            .await?;
        protocol::parse_pixel(&payload)
    }

    /// Image dimensions, one entry per axis
    pub async fn get_image_dimensions(&mut self, view: &ImageView) -> Result<Vec<u32>> {
        let payload = self
            .request(&ScriptedCommand::GetImageDimensions {
                view: view.id.clone(),
            })
            .await?;
        protocol::parse_list(&payload)
    }

    pub async fn get_channel_count(&mut self, view: &ImageView) -> Result<u32> {
        let payload = self
            .request(&ScriptedCommand::GetChannelCount {
                view: view.id.clone(),
            })
            .await?;
        protocol::parse_count(&payload)
    }

    /// Load a file from the viewer's filesystem into an existing view
    pub async fn load_local_file(&mut self, view: &ImageView, path: &Path) -> Result<()> {
        self.request(&ScriptedCommand::LoadLocalFile {
            view: view.id.clone(),
            file: path.to_path_buf(),
        })
        .await?;
        Ok(())
    }

    pub async fn set_layout(&mut self, layout: LayoutKind) -> Result<()> {
        self.request(&ScriptedCommand::SetLayout(layout)).await?;
        Ok(())
    }

    /// Number of display windows in the workspace
    pub async fn get_window_count(&mut self) -> Result<usize> {
        let payload = self.request(&ScriptedCommand::GetWindowCount).await?;
        protocol::parse_count(&payload)
    }

    pub async fn save_state(&mut self, name: &str, options: SnapshotOptions) -> Result<()> {
        let command = ScriptedCommand::SaveState {
            name: name.to_string(),
            options,
        };
        let reply = self.request(&command).await?;
        if reply != protocol::SAVE_OK {
            return Err(Error::command_failed(command.name(), &reply));
        }
        Ok(())
    }

    pub async fn restore_state(&mut self, name: &str) -> Result<()> {
        let command = ScriptedCommand::RestoreState {
            name: name.to_string(),
        };
        let reply = self.request(&command).await?;
        if reply != protocol::RESTORE_OK {
            return Err(Error::command_failed(command.name(), &reply));
        }
        Ok(())
    }

    /// Close the connection and stop the viewer if this client launched it
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(mut child) = self.viewer.take() {
            tracing::debug!(peer = %self.peer, "Stopping viewer");
            launch::terminate(&mut child).await;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedClient")
            .field("peer", &self.peer)
            .field("viewer_pid", &self.viewer.as_ref().and_then(Child::id))
            .finish()
    }
}

impl Drop for ScriptedClient {
    fn drop(&mut self) {
        // Best effort, we can't await in drop
        if let Some(child) = self.viewer.as_mut() {
            let _ = child.start_kill();
        }
    }
}
