//! Analytic load-model components.
//!
//! Each component covers a fraction of one appliance operation and turns a
//! sample count into a power waveform in watts.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// Upper bound on redraws for one out-of-bounds noise sample.
const MAX_NOISE_REDRAWS: usize = 10_000;

/// One waveform segment of an appliance program.
///
/// `fraction` is the share of the requested operation duration the segment
/// occupies; fractions of a program nominally sum to 1.0 but are not checked.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadComponent {
    /// Constant draw.
    OnOff { fraction: f64, power: f32 },
    /// Straight line from `start` to `end`, both inclusive.
    Linear { fraction: f64, start: f32, end: f32 },
    /// `base + delta * exp(-rate * x)` for `x = 0..n-1`.
    Decay {
        fraction: f64,
        base: f32,
        delta: f32,
        rate: f32,
    },
    /// `base + scale * ln(stretch * x)` for `x = 1..=n`.
    Growth {
        fraction: f64,
        base: f32,
        scale: f32,
        stretch: f32,
    },
    /// Normally distributed samples, redrawn until inside `[low, high]`.
    Noise {
        fraction: f64,
        low: f32,
        mean: f32,
        stdev: f32,
        high: f32,
    },
}

impl LoadComponent {
    /// Share of the operation duration covered by this component.
    pub fn fraction(&self) -> f64 {
        match *self {
            Self::OnOff { fraction, .. }
            | Self::Linear { fraction, .. }
            | Self::Decay { fraction, .. }
            | Self::Growth { fraction, .. }
            | Self::Noise { fraction, .. } => fraction,
        }
    }

    /// Short name of the component kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OnOff { .. } => "on_off",
            Self::Linear { .. } => "linear",
            Self::Decay { .. } => "decay",
            Self::Growth { .. } => "growth",
            Self::Noise { .. } => "noise",
        }
    }

    /// Generates `len` power samples.
    ///
    /// Only the noise component consumes randomness.
    pub fn synthesize(&self, len: usize, rng: &mut StdRng) -> Vec<f32> {
        match *self {
            Self::OnOff { power, .. } => vec![power; len],
            Self::Linear { start, end, .. } => linear(start, end, len),
            Self::Decay {
                base, delta, rate, ..
            } => (0..len)
                .map(|x| base + delta * (-rate * x as f32).exp())
                .collect(),
            Self::Growth {
                base,
                scale,
                stretch,
                ..
            } => (1..=len)
                .map(|x| base + scale * (stretch * x as f32).ln())
                .collect(),
            Self::Noise {
                low,
                mean,
                stdev,
                high,
                ..
            } => bounded_noise(low, mean, stdev, high, len, rng),
        }
    }
}

/// Evenly spaced samples from `start` to `end`; a single sample is `start`.
fn linear(start: f32, end: f32, len: usize) -> Vec<f32> {
    match len {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (len - 1) as f32;
            (0..len).map(|i| start + step * i as f32).collect()
        }
    }
}

fn bounded_noise(low: f32, mean: f32, stdev: f32, high: f32, len: usize, rng: &mut StdRng) -> Vec<f32> {
    let Ok(normal) = Normal::new(mean, stdev) else {
        return vec![mean.clamp(low, high); len];
    };
    let in_bounds = |v: f32| (low..=high).contains(&v);

    (0..len)
        .map(|_| {
            let mut value = normal.sample(rng);
            let mut redraws = 0;
            while !in_bounds(value) && redraws < MAX_NOISE_REDRAWS {
                value = normal.sample(rng);
                redraws += 1;
            }
            value.clamp(low, high)
        })
        .collect()
}
