//! Appliance programs and per-type model directories.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use super::components::LoadComponent;
use crate::sim::types::SECS_PER_DAY;

/// One candidate definition of an appliance: its usual duration and the
/// ordered load-model components that make up one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceModel {
    /// Identifier of the definition (e.g. a file stem or model label).
    pub name: String,
    /// Operation length in seconds used when a state asks for the default.
    pub usual_duration: usize,
    pub components: Vec<LoadComponent>,
}

impl ApplianceModel {
    pub fn new(name: &str, usual_duration: usize, components: Vec<LoadComponent>) -> Self {
        Self {
            name: name.to_string(),
            usual_duration,
            components,
        }
    }

    /// Renders one operation of `duration` seconds.
    ///
    /// Component fractions are scaled to `duration` and laid out back to back.
    /// A component rounding to no samples, or to more than one day, is skipped
    /// and does not advance the layout. Samples past `duration` are truncated;
    /// seconds no component covers stay at zero.
    pub fn render(&self, duration: usize, rng: &mut StdRng) -> Vec<f32> {
        let mut samples = vec![0.0; duration];
        let mut cursor = 0;

        for component in &self.components {
            let len = (component.fraction() * duration as f64).round();
            if len <= 0.0 || len > SECS_PER_DAY as f64 {
                debug!(
                    model = %self.name,
                    kind = component.kind(),
                    len,
                    "skipping load-model component"
                );
                continue;
            }
            let len = len as usize;

            let waveform = component.synthesize(len, rng);
            if cursor < duration {
                for (slot, value) in samples[cursor..].iter_mut().zip(&waveform) {
                    *slot += value;
                }
            }
            cursor += len;
        }

        samples
    }
}

/// An appliance type with its directory of candidate definitions.
///
/// Immutable once built; shared between activities through `Arc`.
#[derive(Debug, Clone)]
pub struct Appliance {
    appliance_type: String,
    candidates: Vec<Arc<ApplianceModel>>,
    initial: Arc<ApplianceModel>,
}

impl Appliance {
    /// Creates an appliance and draws its initial definition.
    ///
    /// Returns `None` when `candidates` is empty.
    pub fn new(
        appliance_type: &str,
        candidates: Vec<ApplianceModel>,
        rng: &mut StdRng,
    ) -> Option<Self> {
        let candidates: Vec<Arc<ApplianceModel>> = candidates.into_iter().map(Arc::new).collect();
        if candidates.is_empty() {
            return None;
        }
        let initial = Arc::clone(&candidates[rng.random_range(0..candidates.len())]);
        Some(Self {
            appliance_type: appliance_type.to_string(),
            candidates,
            initial,
        })
    }

    pub fn appliance_type(&self) -> &str {
        &self.appliance_type
    }

    pub fn candidates(&self) -> &[Arc<ApplianceModel>] {
        &self.candidates
    }

    /// The definition drawn at construction.
    pub fn initial_model(&self) -> Arc<ApplianceModel> {
        Arc::clone(&self.initial)
    }

    /// Draws a definition uniformly from the candidate directory.
    pub fn pick_model(&self, rng: &mut StdRng) -> Arc<ApplianceModel> {
        Arc::clone(&self.candidates[rng.random_range(0..self.candidates.len())])
    }
}

/// Warns when a definition declares a device type other than the one it is
/// registered under.
pub fn check_declared_type(appliance_type: &str, model: &str, declared: Option<&str>) {
    let Some(declared) = declared else {
        return;
    };
    if !declared.eq_ignore_ascii_case(appliance_type) {
        warn!(
            appliance = appliance_type,
            model, declared, "definition models a different device type"
        );
    }
}

/// Currently active definition per appliance type, as seen by one activity.
///
/// Starts from each appliance's initial definition; [`ModelSelection::redraw`]
/// replaces the handle, and it persists until the next redraw.
#[derive(Debug, Clone, Default)]
pub struct ModelSelection {
    active: BTreeMap<String, Arc<ApplianceModel>>,
}

impl ModelSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the active definition for `appliance`.
    pub fn current(&mut self, appliance: &Appliance) -> Arc<ApplianceModel> {
        Arc::clone(
            self.active
                .entry(appliance.appliance_type().to_string())
                .or_insert_with(|| appliance.initial_model()),
        )
    }

    /// Draws a new active definition for `appliance`.
    pub fn redraw(&mut self, appliance: &Appliance, rng: &mut StdRng) -> Arc<ApplianceModel> {
        let model = appliance.pick_model(rng);
        self.active
            .insert(appliance.appliance_type().to_string(), Arc::clone(&model));
        model
    }
}
