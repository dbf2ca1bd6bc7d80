//! Fixed-length ramps between a start and a target value.
//!
//! A [`RampGenerator`] moves its value toward a target over exactly
//! `length` ticks. The curve between the endpoints is chosen by a
//! [`RampShape`] strategy:
//!
//! - [`ExponentialRamp`]: `current = target + (current - target) * decay`,
//!   natural for frequencies and resonance
//! - [`LinearRamp`]: constant increment per tick, used for gains
//!
//! Whatever the shape, the final tick lands on the target exactly, so
//! `elapsed == length` always implies `current == target`.
//!
//! ```rust
//! use velour_core::{ExponentialRamp, RampGenerator};
//!
//! let mut ramp = RampGenerator::new(ExponentialRamp::default(), 8, 100.0);
//! ramp.start(1000.0);
//! for _ in 0..8 {
//!     ramp.step();
//! }
//! assert_eq!(ramp.current(), 1000.0);
//! assert!(!ramp.is_active());
//! ```

use libm::powf;

/// Fraction of the initial error an exponential ramp would carry after
/// `length` ticks. The final tick snaps the remainder away.
pub const RESIDUAL: f32 = 1.0e-4;

/// Interpolation curve used by a [`RampGenerator`].
pub trait RampShape {
    /// Prepares a ramp from `start` to `end` lasting `length` ticks.
    ///
    /// Called with `length >= 1`.
    fn begin(&mut self, start: f32, end: f32, length: u32);

    /// Returns the value following `current` on the way to `target`.
    fn next(&self, current: f32, target: f32) -> f32;
}

/// Exponential convergence toward the target.
///
/// The per-tick decay is `RESIDUAL^(1/length)`, so the error left for the
/// final snapping tick is a small multiple of `RESIDUAL`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialRamp {
    decay: f32,
}

impl ExponentialRamp {
    /// Per-tick decay factor of the ramp in progress.
    pub fn decay(&self) -> f32 {
        self.decay
    }
}

impl Default for ExponentialRamp {
    fn default() -> Self {
        Self { decay: 0.0 }
    }
}

impl RampShape for ExponentialRamp {
    fn begin(&mut self, _start: f32, _end: f32, length: u32) {
        self.decay = powf(RESIDUAL, 1.0 / length as f32);
    }

    #[inline]
    fn next(&self, current: f32, target: f32) -> f32 {
        target + (current - target) * self.decay
    }
}

/// Constant-rate interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearRamp {
    delta: f32,
}

impl RampShape for LinearRamp {
    fn begin(&mut self, start: f32, end: f32, length: u32) {
        self.delta = (end - start) / length as f32;
    }

    #[inline]
    fn next(&self, current: f32, _target: f32) -> f32 {
        current + self.delta
    }
}

/// Interpolates a scalar to a target over a fixed number of ticks.
///
/// # Invariants
///
/// - `elapsed <= length`
/// - `elapsed == length` implies `current == target` exactly
#[derive(Debug, Clone)]
pub struct RampGenerator<S> {
    shape: S,
    current: f32,
    target: f32,
    elapsed: u32,
    length: u32,
}

impl<S: RampShape> RampGenerator<S> {
    /// Creates an idle ramp resting at `initial`.
    pub fn new(shape: S, length: u32, initial: f32) -> Self {
        Self {
            shape,
            current: initial,
            target: initial,
            elapsed: length,
            length,
        }
    }

    /// Begins a new ramp from the current value toward `target`.
    ///
    /// With a zero length the value jumps to the target immediately.
    pub fn start(&mut self, target: f32) {
        self.target = target;
        if self.length == 0 {
            self.current = target;
            self.elapsed = 0;
            return;
        }
        self.shape.begin(self.current, target, self.length);
        self.elapsed = 0;
    }

    /// Advances one tick and returns the new value.
    ///
    /// Idle ramps return the target unchanged.
    #[inline]
    pub fn step(&mut self) -> f32 {
        if self.elapsed < self.length {
            self.elapsed += 1;
            self.current = if self.elapsed == self.length {
                self.target
            } else {
                self.shape.next(self.current, self.target)
            };
        }
        self.current
    }

    /// Changes the ramp length.
    ///
    /// A ramp in progress restarts from its current value so that it still
    /// lands on the target after exactly `length` further ticks.
    pub fn set_length(&mut self, length: u32) {
        if length == self.length {
            return;
        }
        let active = self.is_active();
        self.length = length;
        if active {
            self.start(self.target);
        } else {
            self.elapsed = length;
        }
    }

    /// Jumps to `value` and cancels any ramp in progress.
    pub fn reset(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.elapsed = self.length;
    }

    /// Returns `true` while the ramp has ticks left.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.elapsed < self.length
    }

    /// Current value without advancing.
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Value the ramp is heading to.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Ticks taken since the ramp started.
    #[inline]
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Configured ramp length in ticks.
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// The shape strategy.
    pub fn shape(&self) -> &S {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_lands_exactly() {
        let mut ramp = RampGenerator::new(ExponentialRamp::default(), 20, 20.0);
        ramp.start(20000.0);
        for i in 0..20 {
            assert!(ramp.is_active(), "should be active at tick {}", i);
            ramp.step();
        }
        assert_eq!(ramp.current(), 20000.0);
        assert_eq!(ramp.elapsed(), ramp.length());
    }

    #[test]
    fn test_exponential_error_shrinks_monotonically() {
        let mut ramp = RampGenerator::new(ExponentialRamp::default(), 16, 0.0);
        ramp.start(1.0);
        let mut last_err = 1.0f32;
        for _ in 0..15 {
            let err = (1.0 - ramp.step()).abs();
            assert!(err < last_err);
            last_err = err;
        }
        // One tick before the end only RESIDUAL^(15/16) of the error is left
        assert!(last_err < 1e-3, "residual {}", last_err);
    }

    #[test]
    fn test_linear_is_evenly_spaced() {
        let mut ramp = RampGenerator::new(LinearRamp::default(), 4, 0.0);
        ramp.start(1.0);
        assert!((ramp.step() - 0.25).abs() < 1e-6);
        assert!((ramp.step() - 0.5).abs() < 1e-6);
        assert!((ramp.step() - 0.75).abs() < 1e-6);
        assert_eq!(ramp.step(), 1.0);
        // Idle steps hold the target
        assert_eq!(ramp.step(), 1.0);
    }

    #[test]
    fn test_zero_length_snaps() {
        let mut ramp = RampGenerator::new(ExponentialRamp::default(), 0, 5.0);
        ramp.start(7.0);
        assert!(!ramp.is_active());
        assert_eq!(ramp.current(), 7.0);
    }

    #[test]
    fn test_set_length_restarts_active_ramp() {
        let mut ramp = RampGenerator::new(LinearRamp::default(), 10, 0.0);
        ramp.start(10.0);
        ramp.step();
        ramp.set_length(3);
        assert_eq!(ramp.elapsed(), 0);
        ramp.step();
        ramp.step();
        assert_eq!(ramp.step(), 10.0);
        assert!(!ramp.is_active());
    }

    #[test]
    fn test_set_length_while_idle_stays_idle() {
        let mut ramp = RampGenerator::new(LinearRamp::default(), 10, 2.0);
        ramp.set_length(50);
        assert!(!ramp.is_active());
        assert_eq!(ramp.current(), 2.0);
    }
}
