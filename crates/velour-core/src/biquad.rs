//! Biquad (bi-quadratic) filter section.
//!
//! A second-order IIR section plus RBJ Audio EQ Cookbook coefficient
//! designs for low-pass, high-pass, band-pass and band-reject responses.
//! [`FilterCore`](crate::FilterCore) cascades up to three of these per
//! channel.

use core::f32::consts::PI;
use libm::{cosf, sinf};

use crate::math::{SILENCE_THRESHOLD, flush_denormal};

/// Coefficient tuple `(b0, b1, b2, a0, a1, a2)` as produced by the cookbook
/// designs, before normalization by `a0`.
pub type Coefficients = (f32, f32, f32, f32, f32, f32);

/// Second-order IIR section with its coefficients and state.
///
/// Implements the Direct Form I structure:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // Input taps x[n-1], x[n-2]
    x1: f32,
    x2: f32,

    // Output taps y[n-1], y[n-2]
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a biquad with passthrough coefficients (`y[n] = x[n]`).
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Sets the coefficients, normalizing by `a0`.
    pub fn set_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Sets the coefficients from a cookbook tuple, scaling the feed-forward
    /// terms by `gain`.
    pub fn set_design(&mut self, design: Coefficients, gain: f32) {
        let (b0, b1, b2, a0, a1, a2) = design;
        self.set_coefficients(b0 * gain, b1 * gain, b2 * gain, a0, a1, a2);
    }

    /// Copies coefficients (not state) from another section.
    pub fn copy_coefficients(&mut self, other: &Biquad) {
        self.b0 = other.b0;
        self.b1 = other.b1;
        self.b2 = other.b2;
        self.a1 = other.a1;
        self.a2 = other.a2;
    }

    /// Normalized coefficients `(b0, b1, b2, a1, a2)`.
    pub fn coefficients(&self) -> (f32, f32, f32, f32, f32) {
        (self.b0, self.b1, self.b2, self.a1, self.a2)
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Advances the state as if fed silence, returning the output.
    #[inline]
    pub fn process_zero(&mut self) -> f32 {
        self.process(0.0)
    }

    /// Returns `true` if every tap is below the silence threshold.
    ///
    /// A quiet section fed silence keeps producing silence.
    #[inline]
    pub fn is_quiet(&self) -> bool {
        self.x1.abs() < SILENCE_THRESHOLD
            && self.x2.abs() < SILENCE_THRESHOLD
            && self.y1.abs() < SILENCE_THRESHOLD
            && self.y2.abs() < SILENCE_THRESHOLD
    }

    /// Flushes subnormal values out of the state.
    #[inline]
    pub fn sanitize(&mut self) {
        self.x1 = flush_denormal(self.x1);
        self.x2 = flush_denormal(self.x2);
        self.y1 = flush_denormal(self.y1);
        self.y2 = flush_denormal(self.y2);
    }

    /// Clears the state without changing coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared cookbook intermediates: `(cos(w0), alpha)`.
#[inline]
fn omega_alpha(frequency: f32, q: f32, sample_rate: f32) -> (f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    (cosf(omega), sinf(omega) / (2.0 * q))
}

/// RBJ low-pass design.
///
/// # Arguments
///
/// * `frequency` - Cutoff frequency in Hz
/// * `q` - Q factor (0.707 for a Butterworth response)
/// * `sample_rate` - Sample rate in Hz
pub fn lowpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, alpha) = omega_alpha(frequency, q, sample_rate);

    let b0 = (1.0 - cos_omega) / 2.0;
    let b1 = 1.0 - cos_omega;
    let b2 = (1.0 - cos_omega) / 2.0;
    (b0, b1, b2, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// RBJ high-pass design.
pub fn highpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, alpha) = omega_alpha(frequency, q, sample_rate);

    let b0 = (1.0 + cos_omega) / 2.0;
    let b1 = -(1.0 + cos_omega);
    let b2 = (1.0 + cos_omega) / 2.0;
    (b0, b1, b2, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// RBJ band-pass design with constant 0 dB peak gain.
///
/// Bandwidth is `frequency / q`.
pub fn bandpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, alpha) = omega_alpha(frequency, q, sample_rate);
    (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha)
}

/// RBJ band-reject (notch) design.
pub fn notch_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, alpha) = omega_alpha(frequency, q, sample_rate);
    let b1 = -2.0 * cos_omega;
    (1.0, b1, 1.0, 1.0 + alpha, b1, 1.0 - alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biquad_passthrough() {
        let mut biquad = Biquad::new();
        for i in 0..10 {
            let input = i as f32 * 0.1;
            let output = biquad.process(input);
            assert!((output - input).abs() < 0.0001);
        }
    }

    #[test]
    fn test_biquad_clear() {
        let mut biquad = Biquad::new();
        for _ in 0..10 {
            biquad.process(1.0);
        }
        biquad.clear();
        assert_eq!(biquad.x1, 0.0);
        assert_eq!(biquad.x2, 0.0);
        assert_eq!(biquad.y1, 0.0);
        assert_eq!(biquad.y2, 0.0);
        assert!(biquad.is_quiet());
    }

    #[test]
    fn test_lowpass_dc_pass() {
        let mut biquad = Biquad::new();
        biquad.set_design(lowpass_coefficients(1000.0, 0.707, 44100.0), 1.0);
        let mut output = 0.0;
        for _ in 0..1000 {
            output = biquad.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut biquad = Biquad::new();
        biquad.set_design(highpass_coefficients(1000.0, 0.707, 44100.0), 1.0);
        let mut output = 1.0;
        for _ in 0..2000 {
            output = biquad.process(1.0);
        }
        assert!(output.abs() < 0.01, "HP should reject DC, got {}", output);
    }

    #[test]
    fn test_design_gain_scales_output() {
        let mut unity = Biquad::new();
        let mut doubled = Biquad::new();
        let design = bandpass_coefficients(1000.0, 1.0, 44100.0);
        unity.set_design(design, 1.0);
        doubled.set_design(design, 2.0);
        for i in 0..64 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let a = unity.process(x);
            let b = doubled.process(x);
            assert!((b - 2.0 * a).abs() < 1e-6);
        }
    }

    #[test]
    fn test_notch_coefficients_finite() {
        let (b0, b1, b2, a0, a1, a2) = notch_coefficients(1000.0, 1.0, 44100.0);
        for c in [b0, b1, b2, a0, a1, a2] {
            assert!(c.is_finite());
        }
    }

    #[test]
    fn test_copy_coefficients() {
        let mut a = Biquad::new();
        a.set_design(lowpass_coefficients(500.0, 0.707, 48000.0), 1.0);
        a.process(1.0);
        let mut b = Biquad::new();
        b.copy_coefficients(&a);
        assert_eq!(a.coefficients(), b.coefficients());
        assert!(b.is_quiet());
    }

    #[test]
    fn test_sanitize_flushes_subnormals() {
        let mut biquad = Biquad::new();
        biquad.y1 = 1e-30;
        biquad.sanitize();
        assert_eq!(biquad.y1, 0.0);
    }
}
