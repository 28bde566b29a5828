//! Viewer process launching
//!
//! Spawns the viewer with its scripting port enabled and waits for the
//! port to accept a connection.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::process::{Child, Command};

use crate::common::config::ViewerConfig;
use crate::common::{paths, Error, Result};

/// Interval between connection attempts while the viewer starts
const POLL_INTERVAL_MS: u64 = 50;

/// Grace period between SIGTERM and a hard kill
const TERMINATE_GRACE_MS: u64 = 500;

/// Everything needed to start a viewer instance
#[derive(Debug, Clone)]
pub struct ViewerLaunch {
    /// Viewer executable
    pub executable: PathBuf,
    /// Viewer configuration file
    pub config_file: Option<PathBuf>,
    /// Host the scripted command port is reached on
    pub host: String,
    /// Scripted command port
    pub port: u16,
    /// Entry document for the embedded web client
    pub html: Option<PathBuf>,
    /// Image loaded at startup
    pub image: Option<PathBuf>,
    /// Pass viewer stdout/stderr through instead of discarding it
    pub verbose: bool,
}

impl ViewerLaunch {
    pub fn new(executable: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            executable: executable.into(),
            config_file: None,
            host: "127.0.0.1".to_string(),
            port,
            html: None,
            image: None,
            verbose: false,
        }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            config_file: config.config_file.clone(),
            host: config.host.clone(),
            port: config.port,
            html: config.html.clone(),
            image: config.image.clone(),
            verbose: false,
        }
    }

    pub fn with_image(mut self, image: impl Into<PathBuf>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Command-line arguments handed to the viewer
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--scriptPort".into(), self.port.to_string().into()];
        if let Some(config) = &self.config_file {
            args.push("--config".into());
            args.push(config.clone().into_os_string());
        }
        if let Some(html) = &self.html {
            args.push("--html".into());
            args.push(html.clone().into_os_string());
        }
        if let Some(image) = &self.image {
            args.push(image.clone().into_os_string());
        }
        args
    }

    /// Address of the scripting port
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Spawn the viewer process
pub(crate) fn spawn_viewer(launch: &ViewerLaunch) -> Result<Child> {
    let executable = paths::find_executable(&launch.executable).ok_or_else(|| {
        Error::ViewerStartFailed(format!(
            "Executable not found: {}",
            launch.executable.display()
        ))
    })?;

    tracing::debug!(
        executable = %executable.display(),
        port = launch.port,
        "Spawning viewer"
    );

    let output = || {
        if launch.verbose {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    };

    Command::new(&executable)
        .args(launch.args())
        .stdin(Stdio::null())
        .stdout(output())
        .stderr(output())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            Error::ViewerStartFailed(format!("Failed to start {}: {}", executable.display(), e))
        })
}

/// Poll the scripting port until it accepts a connection
pub(crate) async fn wait_for_port(
    addr: &str,
    child: &mut Child,
    timeout_secs: u64,
) -> Result<TcpStream> {
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);

    loop {
        if let Some(status) = child.try_wait()? {
            return Err(Error::ViewerStartFailed(format!(
                "Viewer exited during startup with {}",
                status
            )));
        }

        match TcpStream::connect(addr).await {
            Ok(stream) => {
                tracing::debug!(addr, "Viewer accepted scripted connection");
                return Ok(stream);
            }
            Err(_) if Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(_) => return Err(Error::ViewerSpawnTimeout(timeout_secs)),
        }
    }
}

/// Stop the viewer: SIGTERM first on unix, then kill
pub(crate) async fn terminate(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }

    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: plain signal delivery to a child we spawned
        let sent = unsafe { libc::kill(pid as i32, libc::SIGTERM) } == 0;
        if sent {
            let grace = Duration::from_millis(TERMINATE_GRACE_MS);
            if tokio::time::timeout(grace, child.wait()).await.is_ok() {
                return;
            }
        }
    }

    let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_follow_viewer_flags() {
        let launch = ViewerLaunch {
            executable: PathBuf::from("/build/cpp/desktop/desktop"),
            config_file: Some(PathBuf::from("/home/user/.cartavis/config.json")),
            host: "127.0.0.1".to_string(),
            port: 9999,
            html: Some(PathBuf::from("/VFS/DesktopDevel/desktop/desktopIndex.html")),
            image: Some(PathBuf::from("/scratch/Images/mexinputtest.fits")),
            verbose: false,
        };

        let args: Vec<String> = launch
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "--scriptPort",
                "9999",
                "--config",
                "/home/user/.cartavis/config.json",
                "--html",
                "/VFS/DesktopDevel/desktop/desktopIndex.html",
                "/scratch/Images/mexinputtest.fits",
            ]
        );
    }

    #[test]
    fn test_minimal_launch_args() {
        let launch = ViewerLaunch::new("desktop", 7000);
        let args: Vec<String> = launch
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["--scriptPort", "7000"]);
        assert_eq!(launch.address(), "127.0.0.1:7000");
    }

    #[test]
    fn test_address_uses_configured_host() {
        let config = ViewerConfig {
            host: "viewer.local".to_string(),
            port: 9123,
            ..ViewerConfig::default()
        };
        assert_eq!(ViewerLaunch::from_config(&config).address(), "viewer.local:9123");
        assert_eq!(ViewerLaunch::from_config(&config).address(), config.address());
    }

    #[test]
    fn test_spawn_missing_executable() {
        let launch = ViewerLaunch::new("/no/such/viewer/binary", 7001);
        assert!(matches!(
            spawn_viewer(&launch),
            Err(Error::ViewerStartFailed(_))
        ));
    }
}
