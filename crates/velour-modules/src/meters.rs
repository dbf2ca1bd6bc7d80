//! Peak meters and clip indicators published as read-only parameters.

use velour_core::flush_denormal;

use crate::params::ParamBank;

/// Peak decay rate of a meter, in dB per second.
pub const METER_FALLOFF_DB_PER_SEC: f32 = 20.0;

/// Peak meter with exponential falloff and a held clip flag.
///
/// A sample above full scale holds the clip flag for an eighth of a second.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    level: f32,
    falloff: f32,
    clip_hold: u32,
    clip_remaining: u32,
}

impl LevelMeter {
    /// Creates a meter for the given sample rate.
    pub fn new(sample_rate: u32) -> Self {
        let mut meter = Self {
            level: 0.0,
            falloff: 1.0,
            clip_hold: 0,
            clip_remaining: 0,
        };
        meter.set_sample_rate(sample_rate);
        meter
    }

    /// Recomputes the falloff factor and clip hold time.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        let sr = sample_rate.max(1) as f32;
        self.falloff = libm::powf(10.0, -METER_FALLOFF_DB_PER_SEC / (20.0 * sr));
        self.clip_hold = sample_rate >> 3;
    }

    /// Feeds one sample.
    #[inline]
    pub fn update(&mut self, sample: f32) {
        let magnitude = sample.abs();
        self.level = if magnitude > self.level {
            magnitude
        } else {
            flush_denormal(self.level * self.falloff)
        };
        if magnitude > 1.0 {
            self.clip_remaining = self.clip_hold;
        } else {
            self.clip_remaining = self.clip_remaining.saturating_sub(1);
        }
    }

    /// Feeds the louder of two samples.
    #[inline]
    pub fn update_stereo(&mut self, left: f32, right: f32) {
        self.update(left.abs().max(right.abs()));
    }

    /// Current peak level (linear).
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Returns `true` while the clip flag is held.
    pub fn clipping(&self) -> bool {
        self.clip_remaining > 0
    }

    /// Writes the level and, if given, the clip flag into a bank.
    pub fn publish(&self, bank: &ParamBank, level_index: usize, clip_index: Option<usize>) {
        bank.publish(level_index, self.level);
        if let Some(index) = clip_index {
            bank.publish(index, if self.clipping() { 1.0 } else { 0.0 });
        }
    }

    /// Clears the level and clip flag.
    pub fn reset(&mut self) {
        self.level = 0.0;
        self.clip_remaining = 0;
    }
}

/// Running phase correlation of a stereo signal, in `[-1, 1]`.
///
/// 1 is mono-compatible, 0 uncorrelated, -1 out of phase. Silence reports 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationMeter {
    lr: f32,
    ll: f32,
    rr: f32,
}

impl CorrelationMeter {
    /// Adds one frame.
    #[inline]
    pub fn update(&mut self, left: f32, right: f32) {
        self.lr += left * right;
        self.ll += left * left;
        self.rr += right * right;
    }

    /// Correlation of every frame since the last reset.
    pub fn value(&self) -> f32 {
        let denom = libm::sqrtf(self.ll * self.rr);
        if denom <= f32::MIN_POSITIVE {
            0.0
        } else {
            (self.lr / denom).clamp(-1.0, 1.0)
        }
    }

    /// Starts a new measurement.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Block phase correlation of a stereo pair.
pub fn phase_correlation(left: &[f32], right: &[f32]) -> f32 {
    let mut meter = CorrelationMeter::default();
    for (&l, &r) in left.iter().zip(right) {
        meter.update(l, r);
    }
    meter.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_and_falloff() {
        let mut meter = LevelMeter::new(48000);
        meter.update(0.5);
        assert_eq!(meter.level(), 0.5);
        for _ in 0..48000 {
            meter.update(0.0);
        }
        // 20 dB down after one second
        assert!((meter.level() - 0.05).abs() < 1e-3, "got {}", meter.level());
    }

    #[test]
    fn test_clip_hold() {
        let mut meter = LevelMeter::new(8000);
        meter.update(1.5);
        assert!(meter.clipping());
        for _ in 0..999 {
            meter.update(0.0);
        }
        assert!(meter.clipping());
        meter.update(0.0);
        assert!(!meter.clipping());
    }

    #[test]
    fn test_correlation() {
        let sig: Vec<f32> = (0..256).map(|i| libm::sinf(i as f32 * 0.1)).collect();
        let inv: Vec<f32> = sig.iter().map(|s| -s).collect();
        assert!((phase_correlation(&sig, &sig) - 1.0).abs() < 1e-5);
        assert!((phase_correlation(&sig, &inv) + 1.0).abs() < 1e-5);
        assert_eq!(phase_correlation(&[0.0; 8], &[0.0; 8]), 0.0);
    }

    #[test]
    fn test_correlation_meter_reset() {
        let mut meter = CorrelationMeter::default();
        for i in 0..64 {
            let s = libm::sinf(i as f32 * 0.2);
            meter.update(s, -s);
        }
        assert!((meter.value() + 1.0).abs() < 1e-5);
        meter.reset();
        assert_eq!(meter.value(), 0.0);
        meter.update(0.5, 0.25);
        assert!((meter.value() - 1.0).abs() < 1e-5);
    }
}
