//! Layout save/restore scenarios

pub mod layout;
pub mod scripted;

pub use layout::{LayoutRoundTrip, RoundTripReport, ScenarioState};
pub use scripted::ScriptedRoundTrip;
