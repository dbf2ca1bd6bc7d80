//! Output stage shared by the [`Mono`](crate::Mono) and
//! [`Stereo`](crate::Stereo) utilities.
//!
//! Per frame: mute and phase invert, inter-channel delay, stereo base,
//! stereo phase rotation, output balance and output level.

use velour_core::{StereoDelayLine, ms_to_samples, round_half_away};

use crate::config::EngineConfig;
use crate::error::ModuleError;
use crate::meters::LevelMeter;
use crate::params::ParamBank;

/// Largest inter-channel delay in milliseconds, either direction.
pub const MAX_CHANNEL_DELAY_MS: f32 = 20.0;

/// User-facing settings of a [`StereoStage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSettings {
    /// Per-channel mute.
    pub mute: [bool; 2],
    /// Per-channel polarity inversion.
    pub invert: [bool; 2],
    /// Positive delays the right channel, negative the left.
    pub delay_ms: f32,
    /// -1 narrows to mono, 0 is neutral, 1 widens.
    pub base: f32,
    /// Rotation of the stereo image in degrees.
    pub phase_degrees: f32,
    /// -1 is full left, 1 full right.
    pub balance: f32,
    /// Linear output gain.
    pub level: f32,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            mute: [false; 2],
            invert: [false; 2],
            delay_ms: 0.0,
            base: 0.0,
            phase_degrees: 0.0,
            balance: 0.0,
            level: 1.0,
        }
    }
}

/// Balance multipliers for the left and right channel.
#[inline]
pub(crate) fn balance_gains(balance: f32) -> [f32; 2] {
    [1.0 - balance.max(0.0), 1.0 + balance.min(0.0)]
}

#[derive(Debug)]
pub(crate) struct StereoStage {
    line: StereoDelayLine,
    polarity: [f32; 2],
    delay: usize,
    delay_right: bool,
    base: f32,
    phase_cos: f32,
    phase_sin: f32,
    balance: [f32; 2],
    level: f32,
}

impl StereoStage {
    pub(crate) fn try_new(config: &EngineConfig) -> Result<Self, ModuleError> {
        let samples = ms_to_samples(MAX_CHANNEL_DELAY_MS, config.max_sample_rate as f32) as usize + 1;
        let line = StereoDelayLine::try_new(samples)
            .map_err(|e| ModuleError::allocation("channel delay", samples, e))?;
        let mut stage = Self {
            line,
            polarity: [1.0; 2],
            delay: 0,
            delay_right: true,
            base: 0.0,
            phase_cos: 1.0,
            phase_sin: 0.0,
            balance: [1.0; 2],
            level: 1.0,
        };
        stage.configure(&StageSettings::default(), 44100.0);
        Ok(stage)
    }

    pub(crate) fn configure(&mut self, settings: &StageSettings, sample_rate: f32) {
        for ch in 0..2 {
            self.polarity[ch] = match (settings.mute[ch], settings.invert[ch]) {
                (true, _) => 0.0,
                (false, true) => -1.0,
                (false, false) => 1.0,
            };
        }
        let delay_ms = settings
            .delay_ms
            .clamp(-MAX_CHANNEL_DELAY_MS, MAX_CHANNEL_DELAY_MS);
        let samples = round_half_away(ms_to_samples(delay_ms.abs(), sample_rate)) as usize;
        self.delay = samples.min(self.line.max_delay());
        self.delay_right = delay_ms >= 0.0;

        let base = settings.base.clamp(-1.0, 1.0);
        self.base = if base < 0.0 { base * 0.5 } else { base };

        let angle = settings.phase_degrees.to_radians();
        self.phase_cos = libm::cosf(angle);
        self.phase_sin = libm::sinf(angle);
        self.balance = balance_gains(settings.balance.clamp(-1.0, 1.0));
        self.level = settings.level;
    }

    /// Inter-channel delay in samples and whether it applies to the right.
    pub(crate) fn delay(&self) -> (usize, bool) {
        (self.delay, self.delay_right)
    }

    #[inline]
    pub(crate) fn process(&mut self, frame: [f32; 2]) -> [f32; 2] {
        let mut l = frame[0] * self.polarity[0];
        let mut r = frame[1] * self.polarity[1];

        let input = [l, r];
        if self.delay > 0 {
            if self.delay_right {
                r = self.line.read(1, self.delay);
            } else {
                l = self.line.read(0, self.delay);
            }
        }
        // History keeps running while the delay is off.
        self.line.push(input);

        let (bl, br) = (
            l + self.base * l - self.base * r,
            r + self.base * r - self.base * l,
        );

        let pl = bl * self.phase_cos - br * self.phase_sin;
        let pr = bl * self.phase_sin + br * self.phase_cos;

        [
            pl * self.balance[0] * self.level,
            pr * self.balance[1] * self.level,
        ]
    }

    pub(crate) fn clear(&mut self) {
        self.line.clear();
    }
}

/// A level meter paired with its read-only parameter slots.
#[derive(Debug)]
pub(crate) struct MeterSlot {
    pub(crate) meter: LevelMeter,
    level: usize,
    clip: usize,
}

impl MeterSlot {
    pub(crate) fn new(level: usize, clip: usize) -> Self {
        Self {
            meter: LevelMeter::new(44100),
            level,
            clip,
        }
    }

    pub(crate) fn publish(&self, bank: &ParamBank) {
        self.meter.publish(bank, self.level, Some(self.clip));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(settings: StageSettings) -> StereoStage {
        let mut stage = StereoStage::try_new(&EngineConfig::default()).unwrap();
        stage.configure(&settings, 48000.0);
        stage
    }

    #[test]
    fn test_neutral_settings_pass_through() {
        let mut stage = stage(StageSettings::default());
        let [l, r] = stage.process([0.3, -0.7]);
        assert!((l - 0.3).abs() < 1e-6);
        assert!((r + 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_mute_and_invert() {
        let mut stage = stage(StageSettings {
            mute: [true, false],
            invert: [false, true],
            ..StageSettings::default()
        });
        assert_eq!(stage.process([0.5, 0.5]), [0.0, -0.5]);
    }

    #[test]
    fn test_positive_delay_lags_right() {
        let mut stage = stage(StageSettings {
            delay_ms: 1.0,
            ..StageSettings::default()
        });
        assert_eq!(stage.delay(), (48, true));
        let first = stage.process([1.0, 1.0]);
        assert_eq!(first, [1.0, 0.0]);
        for _ in 1..48 {
            stage.process([0.0, 0.0]);
        }
        assert_eq!(stage.process([0.0, 0.0]), [0.0, 1.0]);
    }

    #[test]
    fn test_delay_toggle_does_not_replay_old_history() {
        let delayed = StageSettings {
            delay_ms: 10.0,
            ..StageSettings::default()
        };
        let mut stage = stage(delayed);
        for _ in 0..4800 {
            stage.process([0.9, 0.9]);
        }

        stage.configure(&StageSettings::default(), 48000.0);
        for _ in 0..48000 {
            stage.process([0.0, 0.0]);
        }

        stage.configure(&delayed, 48000.0);
        let peak = (0..960)
            .map(|_| stage.process([0.0, 0.0])[1].abs())
            .fold(0.0f32, f32::max);
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn test_negative_delay_lags_left() {
        let stage = stage(StageSettings {
            delay_ms: -30.0,
            ..StageSettings::default()
        });
        // Clamped to 20 ms.
        assert_eq!(stage.delay(), (960, false));
    }

    #[test]
    fn test_base_minus_one_sums_to_mono() {
        let mut stage = stage(StageSettings {
            base: -1.0,
            ..StageSettings::default()
        });
        let [l, r] = stage.process([1.0, 0.0]);
        assert!((l - 0.5).abs() < 1e-6);
        assert!((r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_phase_rotation_180_inverts() {
        let mut stage = stage(StageSettings {
            phase_degrees: 180.0,
            ..StageSettings::default()
        });
        let [l, r] = stage.process([0.5, 0.25]);
        assert!((l + 0.5).abs() < 1e-5);
        assert!((r + 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_balance_and_level() {
        let mut stage = stage(StageSettings {
            balance: 0.5,
            level: 2.0,
            ..StageSettings::default()
        });
        let [l, r] = stage.process([1.0, 1.0]);
        assert!((l - 1.0).abs() < 1e-6);
        assert!((r - 2.0).abs() < 1e-6);
    }
}
