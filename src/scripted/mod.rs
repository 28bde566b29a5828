//! Scripted client for the viewer's remote command port
//!
//! The viewer listens on a TCP port for newline-terminated commands and
//! answers each with a length-prefixed reply.

pub mod client;
pub mod codec;
pub mod launch;
pub mod protocol;

pub use client::{ImageView, ScriptedClient};
pub use launch::ViewerLaunch;
pub use protocol::{LayoutKind, SnapshotOptions};
