//! Common utilities shared by the UI scenario and the scripted checks

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};

/// Parse a `host:port` address, defaulting the host to loopback when only a
/// port is given.
pub fn parse_address(addr: &str) -> Option<String> {
    let addr = addr.trim();
    if addr.is_empty() {
        return None;
    }
    if let Ok(port) = addr.parse::<u16>() {
        return Some(format!("127.0.0.1:{}", port));
    }
    let (host, port) = addr.rsplit_once(':')?;
    port.parse::<u16>().ok()?;
    let host = if host.is_empty() { "127.0.0.1" } else { host };
    Some(format!("{}:{}", host, port))
}
