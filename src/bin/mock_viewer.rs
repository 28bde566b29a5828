//! Mock viewer binary for integration testing
//!
//! Listens on the scripted command port and answers the harness's commands
//! from an in-memory image catalogue and workspace, so tests run without a
//! real viewer build.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use carta_harness::common::logging;
use carta_harness::scripted::codec;
use carta_harness::scripted::protocol::{
    self, LayoutKind, ScriptedCommand, SnapshotOptions, ERROR_PREFIX,
};

#[derive(Parser)]
#[command(name = "mock_viewer", about = "Scripted-port stand-in for the viewer")]
struct Args {
    /// Scripted command port
    #[arg(long = "scriptPort")]
    script_port: u16,

    /// Viewer configuration file (accepted and ignored)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Web client entry document (accepted and ignored)
    #[arg(long)]
    html: Option<PathBuf>,

    /// Delay before the port opens
    #[arg(long, default_value_t = 0)]
    startup_delay_ms: u64,

    /// Image loaded into the first view
    image: Option<PathBuf>,
}

const VIEW_ID: &str = "view0";

#[tokio::main]
async fn main() {
    logging::init_cli();
    let args = Args::parse();
    tracing::debug!(config = ?args.config, html = ?args.html, "Ignoring viewer options");

    let mut state = MockState::default();
    if let Some(image) = &args.image {
        if let Err(e) = state.load(VIEW_ID, image) {
            eprintln!("mock_viewer: {}", e);
            std::process::exit(2);
        }
    }

    if args.startup_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(args.startup_delay_ms)).await;
    }

    let listener = match TcpListener::bind(("127.0.0.1", args.script_port)).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("mock_viewer: cannot listen on {}: {}", args.script_port, e);
            std::process::exit(2);
        }
    };
    tracing::info!(port = args.script_port, "Mock viewer listening");

    let state = Arc::new(Mutex::new(state));
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            continue;
        };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = serve(stream, state).await {
                tracing::debug!("Connection ended: {}", e);
            }
        });
    }
}

async fn serve(stream: TcpStream, state: Arc<Mutex<MockState>>) -> carta_harness::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);

    while let Some(line) = codec::read_command(&mut reader).await? {
        if line.is_empty() {
            continue;
        }
        let reply = match ScriptedCommand::parse(&line) {
            Ok(command) => state.lock().await.execute(command),
            Err(e) => Err(e.to_string()),
        };
        let payload = match reply {
            Ok(payload) => payload,
            Err(message) => format!("{}{}", ERROR_PREFIX, message),
        };
        codec::write_reply(&mut writer, &payload).await?;
    }
    Ok(())
}

/// An image in the mock catalogue
#[derive(Clone)]
struct MockImage {
    width: u32,
    height: u32,
    channels: u32,
}

impl MockImage {
    fn dimensions(&self) -> Vec<u32> {
        if self.channels > 1 {
            vec![self.width, self.height, self.channels]
        } else {
            vec![self.width, self.height]
        }
    }

    /// Deterministic ramp with 0.5 at the origin
    fn pixel(&self, x: i64, y: i64) -> Option<f64> {
        let inside = (0..i64::from(self.width)).contains(&x) && (0..i64::from(self.height)).contains(&y);
        inside.then(|| 0.5 + (x + y) as f64 * 0.25)
    }
}

fn catalogue(path: &Path) -> Option<MockImage> {
    match path.file_name()?.to_str()? {
        "mexinputtest.fits" => Some(MockImage {
            width: 10,
            height: 10,
            channels: 1,
        }),
        "m31_cropped.fits" => Some(MockImage {
            width: 40,
            height: 40,
            channels: 3,
        }),
        _ => None,
    }
}

fn layout_windows(layout: LayoutKind) -> usize {
    match layout {
        // animator, controller, histogram, colormap, statistics
        LayoutKind::Analysis => 5,
        LayoutKind::Image => 1,
        LayoutKind::Clear => 0,
    }
}

struct StoredState {
    options: SnapshotOptions,
    windows: usize,
}

struct MockState {
    views: Vec<(String, Option<MockImage>)>,
    windows: usize,
    snapshots: HashMap<String, StoredState>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            views: vec![(VIEW_ID.to_string(), None)],
            windows: layout_windows(LayoutKind::Analysis),
            snapshots: HashMap::new(),
        }
    }
}

impl MockState {
    fn view(&self, id: &str) -> Result<Option<&MockImage>, String> {
        self.views
            .iter()
            .find(|(view, _)| view == id)
            .map(|(_, image)| image.as_ref())
            .ok_or_else(|| format!("No image view '{}'", id))
    }

    fn load(&mut self, id: &str, path: &Path) -> Result<(), String> {
        let image = catalogue(path).ok_or_else(|| format!("Could not load image {}", path.display()))?;
        let slot = self
            .views
            .iter_mut()
            .find(|(view, _)| view == id)
            .ok_or_else(|| format!("No image view '{}'", id))?;
        slot.1 = Some(image);
        Ok(())
    }

    fn execute(&mut self, command: ScriptedCommand) -> Result<String, String> {
        match command {
            ScriptedCommand::GetImageViews => Ok(self
                .views
                .iter()
                .map(|(id, _)| id.as_str())
                .collect::<Vec<_>>()
                .join(",")),
            ScriptedCommand::GetPixelValue { view, x, y } => Ok(self
                .view(&view)?
                .and_then(|image| image.pixel(x, y))
                .map(|value| value.to_string())
                .unwrap_or_default()),
            ScriptedCommand::GetImageDimensions { view } => Ok(self
                .view(&view)?
                .map(|image| {
                    image
                        .dimensions()
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_default()),
            ScriptedCommand::GetChannelCount { view } => Ok(self
                .view(&view)?
                .map_or(0, |image| image.channels)
                .to_string()),
            ScriptedCommand::LoadLocalFile { view, file } => {
                self.load(&view, &file)?;
                Ok(String::new())
            }
            ScriptedCommand::SetLayout(layout) => {
                self.windows = layout_windows(layout);
                Ok(String::new())
            }
            ScriptedCommand::GetWindowCount => Ok(self.windows.to_string()),
            ScriptedCommand::SaveState { name, options } => {
                if name.is_empty() {
                    return Err("Snapshot name is empty".to_string());
                }
                self.snapshots.insert(
                    name,
                    StoredState {
                        options,
                        windows: self.windows,
                    },
                );
                Ok(protocol::SAVE_OK.to_string())
            }
            ScriptedCommand::RestoreState { name } => {
                let stored = self
                    .snapshots
                    .get(&name)
                    .ok_or_else(|| "There was an error restoring state.".to_string())?;
                if stored.options.layout {
                    self.windows = stored.windows;
                }
                Ok(protocol::RESTORE_OK.to_string())
            }
        }
    }
}
