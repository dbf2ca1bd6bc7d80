//! Engine-wide construction settings.
//!
//! An [`EngineConfig`] fixes the memory a module reserves up front and the
//! time constants of its smoothing. Modules never reallocate, so the limits
//! here bound every later `set_sample_rate` call.
//!
//! With the `serde` feature the config can be loaded from TOML:
//!
//! ```toml
//! max_sample_rate = 96000
//! max_delay_samples = 131072
//! recompute_interval_ms = 1.0
//! gain_smoothing_ms = 1.5
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ModuleError;

/// Lowest sample rate a config may target.
pub const MIN_SAMPLE_RATE: u32 = 8000;

/// Highest sample rate a config may target.
pub const MAX_SAMPLE_RATE: u32 = 768_000;

/// Largest delay line a config may request (16M samples).
pub const MAX_DELAY_SAMPLES: usize = 1 << 24;

/// Construction settings shared by every module.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Highest sample rate the module must support; sizes sample-rate
    /// dependent buffers.
    pub max_sample_rate: u32,
    /// Delay memory per channel in samples; must be a power of two.
    pub max_delay_samples: usize,
    /// Interval between coefficient recomputes while parameters glide.
    pub recompute_interval_ms: f32,
    /// Length of per-sample gain ramps.
    pub gain_smoothing_ms: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_sample_rate: 192_000,
            max_delay_samples: 262_144,
            recompute_interval_ms: 1.0,
            gain_smoothing_ms: 1.5,
        }
    }
}

impl EngineConfig {
    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ModuleError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.max_sample_rate) {
            return Err(ModuleError::invalid_config(
                "max_sample_rate",
                format!(
                    "{} is outside {}..={}",
                    self.max_sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
                ),
            ));
        }
        if !self.max_delay_samples.is_power_of_two() {
            return Err(ModuleError::invalid_config(
                "max_delay_samples",
                format!("{} is not a power of two", self.max_delay_samples),
            ));
        }
        if !(1024..=MAX_DELAY_SAMPLES).contains(&self.max_delay_samples) {
            return Err(ModuleError::invalid_config(
                "max_delay_samples",
                format!(
                    "{} is outside 1024..={}",
                    self.max_delay_samples, MAX_DELAY_SAMPLES
                ),
            ));
        }
        if !(self.recompute_interval_ms > 0.0 && self.recompute_interval_ms <= 100.0) {
            return Err(ModuleError::invalid_config(
                "recompute_interval_ms",
                format!("{} must be in (0, 100]", self.recompute_interval_ms),
            ));
        }
        if !(self.gain_smoothing_ms >= 0.0 && self.gain_smoothing_ms <= 1000.0) {
            return Err(ModuleError::invalid_config(
                "gain_smoothing_ms",
                format!("{} must be in [0, 1000]", self.gain_smoothing_ms),
            ));
        }
        Ok(())
    }

    /// Clamps a requested sample rate into `1..=max_sample_rate`.
    pub fn clamp_sample_rate(&self, sample_rate: u32) -> u32 {
        if sample_rate > self.max_sample_rate {
            tracing::warn!(
                requested = sample_rate,
                max = self.max_sample_rate,
                "sample rate above preallocated maximum, clamping"
            );
            self.max_sample_rate
        } else {
            sample_rate.max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_power_of_two_delay() {
        let config = EngineConfig {
            max_delay_samples: 100_000,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ModuleError::InvalidConfig {
                field: "max_delay_samples",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_rates_and_times() {
        let low_rate = EngineConfig {
            max_sample_rate: 4000,
            ..EngineConfig::default()
        };
        assert!(low_rate.validate().is_err());

        let zero_interval = EngineConfig {
            recompute_interval_ms: 0.0,
            ..EngineConfig::default()
        };
        assert!(zero_interval.validate().is_err());

        let nan_smoothing = EngineConfig {
            gain_smoothing_ms: f32::NAN,
            ..EngineConfig::default()
        };
        assert!(nan_smoothing.validate().is_err());
    }

    #[test]
    fn test_clamp_sample_rate() {
        let config = EngineConfig {
            max_sample_rate: 48000,
            ..EngineConfig::default()
        };
        assert_eq!(config.clamp_sample_rate(96000), 48000);
        assert_eq!(config.clamp_sample_rate(44100), 44100);
        assert_eq!(config.clamp_sample_rate(0), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_toml_roundtrip() {
        let text = "max_sample_rate = 96000\nmax_delay_samples = 131072\n";
        let config: EngineConfig = toml::from_str(text).unwrap();
        assert_eq!(config.max_sample_rate, 96000);
        assert_eq!(config.max_delay_samples, 131072);
        assert_eq!(config.recompute_interval_ms, 1.0);
        assert!(config.validate().is_ok());

        let serialized = toml::to_string(&config).unwrap();
        let back: EngineConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(back, config);
    }
}
