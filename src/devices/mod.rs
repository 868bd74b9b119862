//! Appliance models: analytic load components and appliance programs.

/// Appliance programs, candidate directories, and model selection.
pub mod appliance;
/// Analytic waveform components (on/off, linear, decay, growth, noise).
pub mod components;

pub use appliance::{Appliance, ApplianceModel, ModelSelection};
pub use components::LoadComponent;
