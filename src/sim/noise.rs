//! Background noise added to the aggregate trace after synthesis.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::error::ConfigError;

/// Post-processing applied to the `"total"` array.
///
/// Written as `none`, `G<watts>` (Gaussian), or `C<watts>` (constant).
///
/// # Examples
///
/// ```
/// use nilm_tracegen::sim::noise::BackgroundNoise;
///
/// let noise: BackgroundNoise = "G50".parse().unwrap();
/// assert_eq!(noise, BackgroundNoise::Gaussian { amplitude: 50.0 });
/// assert_eq!(noise.to_string(), "G50");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BackgroundNoise {
    #[default]
    None,
    /// Adds `normal(amplitude, amplitude / 10)` per second, then clamps
    /// negative samples to zero. Amplitudes are non-negative.
    Gaussian { amplitude: f32 },
    /// Adds `amplitude` to every second.
    Constant { amplitude: f32 },
}

impl BackgroundNoise {
    /// Applies the noise to `samples` in place.
    pub fn apply(&self, samples: &mut [f32], rng: &mut StdRng) {
        match *self {
            Self::None => {}
            Self::Gaussian { amplitude } => {
                let Ok(normal) = Normal::new(amplitude, amplitude / 10.0) else {
                    return;
                };
                for s in samples.iter_mut() {
                    *s = (*s + normal.sample(rng)).max(0.0);
                }
            }
            Self::Constant { amplitude } => {
                for s in samples.iter_mut() {
                    *s += amplitude;
                }
            }
        }
    }
}

impl FromStr for BackgroundNoise {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(Self::None);
        }

        let invalid = || {
            ConfigError::invalid(
                "general.noise",
                format!("expected none, G<watts> or C<watts>, got {s:?}"),
            )
        };
        let (kind, amplitude) = s.split_at_checked(1).ok_or_else(invalid)?;
        let amplitude: f32 = amplitude
            .parse()
            .ok()
            .filter(|a: &f32| a.is_finite() && *a >= 0.0)
            .ok_or_else(invalid)?;

        match kind {
            "G" | "g" => Ok(Self::Gaussian { amplitude }),
            "C" | "c" => Ok(Self::Constant { amplitude }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for BackgroundNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Gaussian { amplitude } => write!(f, "G{amplitude}"),
            Self::Constant { amplitude } => write!(f, "C{amplitude}"),
        }
    }
}
