//! One-pole (6 dB/oct) tone filters.
//!
//! A single-pole IIR lowpass with the difference equation:
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n])
//! ```
//!
//! where `coeff = exp(-2π * freq / sample_rate)`. The highpass response is
//! the input minus that lowpass. Used for the bass and treble cuts in front
//! of the reverb tank and for damping inside feedback paths.
//!
//! ```rust
//! use velour_core::OnePole;
//!
//! let mut lp = OnePole::lowpass(48000.0, 4000.0);
//! let filtered = lp.process(1.0);
//! assert!(filtered < 1.0);
//! ```

use crate::flush_denormal;
use libm::expf;

/// Which side of the cutoff a [`OnePole`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnePoleMode {
    /// Keep frequencies below the cutoff.
    #[default]
    Lowpass,
    /// Keep frequencies above the cutoff.
    Highpass,
}

/// One-pole lowpass or highpass filter.
///
/// # Invariants
///
/// - `coeff` is in [0, 1) for positive frequencies
/// - `state` is flushed to zero when below 1e-20
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    sample_rate: f32,
    freq: f32,
    mode: OnePoleMode,
}

impl OnePole {
    /// Creates a one-pole lowpass.
    pub fn lowpass(sample_rate: f32, freq_hz: f32) -> Self {
        Self::with_mode(OnePoleMode::Lowpass, sample_rate, freq_hz)
    }

    /// Creates a one-pole highpass.
    pub fn highpass(sample_rate: f32, freq_hz: f32) -> Self {
        Self::with_mode(OnePoleMode::Highpass, sample_rate, freq_hz)
    }

    fn with_mode(mode: OnePoleMode, sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            sample_rate,
            freq: freq_hz,
            mode,
        };
        filter.recalculate_coeff();
        filter
    }

    /// Sets the cutoff frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        if freq_hz != self.freq {
            self.freq = freq_hz;
            self.recalculate_coeff();
        }
    }

    /// Cutoff frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        match self.mode {
            OnePoleMode::Lowpass => self.state,
            OnePoleMode::Highpass => input - self.state,
        }
    }

    /// Resets the state to zero.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    /// Updates the sample rate and recalculates the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    fn recalculate_coeff(&mut self) {
        let ratio = (self.freq / self.sample_rate.max(1.0)).clamp(0.0, 0.5);
        self.coeff = expf(-core::f32::consts::TAU * ratio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_passes_dc() {
        let mut lp = OnePole::lowpass(48000.0, 1000.0);
        let mut out = 0.0;
        for _ in 0..4800 {
            out = lp.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-3, "got {}", out);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut hp = OnePole::highpass(48000.0, 200.0);
        let mut out = 1.0;
        for _ in 0..48000 {
            out = hp.process(1.0);
        }
        assert!(out.abs() < 1e-3, "got {}", out);
    }

    #[test]
    fn test_highpass_passes_nyquist() {
        let mut hp = OnePole::highpass(48000.0, 200.0);
        let mut out = 0.0;
        for i in 0..1000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            out = hp.process(x);
        }
        assert!(out.abs() > 0.9, "got {}", out);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut lp = OnePole::lowpass(48000.0, 1000.0);
        lp.process(1.0);
        lp.reset();
        assert_eq!(lp.process(0.0), 0.0);
    }
}
