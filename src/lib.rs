//! Synthetic per-second household power traces for NILM research.

pub mod config;
/// Load-model components and appliance definitions.
pub mod devices;
pub mod error;
pub mod io;
/// Activity interpretation, scheduling, and the synthesis engine.
pub mod sim;
