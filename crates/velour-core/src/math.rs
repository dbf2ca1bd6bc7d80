//! Mathematical utility functions for DSP.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//!
//! # Utilities
//!
//! - [`lerp`] - Linear interpolation
//! - [`note_to_hz`] - MIDI note (plus cents) to frequency
//! - [`round_half_away`] - Rounding used for integer/enum parameters
//! - [`flush_denormal`] - Subnormal protection for feedback paths
//! - [`is_silent`] / [`peak`] - Block-level silence detection

use libm::{atanf, expf, logf, powf};

/// Absolute sample level below which a channel counts as silent.
///
/// Roughly -144 dBFS, the 24-bit noise floor.
pub const SILENCE_THRESHOLD: f32 = 1.0 / 16_777_216.0;

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use velour_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Inputs at or below zero are floored to 1e-10 (-200 dB).
///
/// # Example
/// ```rust
/// use velour_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Linear interpolation between two values.
///
/// `t = 0` yields `a`, `t = 1` yields `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert a MIDI note number plus a detune in cents to Hz.
///
/// Note 69 is A4 = 440 Hz. Fractional notes are allowed.
///
/// # Example
/// ```rust
/// use velour_core::note_to_hz;
///
/// assert!((note_to_hz(69.0, 0.0) - 440.0).abs() < 1e-3);
/// assert!((note_to_hz(81.0, 0.0) - 880.0).abs() < 1e-2);
/// assert!((note_to_hz(69.0, 1200.0) - 880.0).abs() < 1e-2);
/// ```
#[inline]
pub fn note_to_hz(note: f32, cents: f32) -> f32 {
    440.0 * powf(2.0, (note - 69.0 + cents / 100.0) / 12.0)
}

/// Round to the nearest integer, halves away from zero.
///
/// `2.5 -> 3.0`, `-2.5 -> -3.0`. Used to snap integer, boolean and enum
/// parameters after denormalization.
#[inline]
pub fn round_half_away(x: f32) -> f32 {
    if x > 0.0 {
        (x + 0.5) as i32 as f32
    } else {
        (x - 0.5) as i32 as f32
    }
}

/// Convert milliseconds to samples.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Flush subnormal (denormalized) floats to zero.
///
/// Values below 1e-20 are replaced with zero, leaving margin before the
/// IEEE 754 subnormal range. Use in feedback loops where signal can decay
/// indefinitely toward zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Arctangent soft clipper normalized so that `atan_clip(1.0, level) == 1.0`.
///
/// `level` controls the knee; higher values saturate harder. Levels at or
/// below zero pass the signal through.
#[inline]
pub fn atan_clip(x: f32, level: f32) -> f32 {
    if level <= 0.0 {
        return x;
    }
    atanf(x * level) / atanf(level)
}

/// Largest absolute sample value in a block.
#[inline]
pub fn peak(block: &[f32]) -> f32 {
    block.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

/// Returns `true` if every sample in the block is below [`SILENCE_THRESHOLD`].
#[inline]
pub fn is_silent(block: &[f32]) -> bool {
    block.iter().all(|s| s.abs() < SILENCE_THRESHOLD)
}
