//! Inertia: click-free parameter smoothing built on [`RampGenerator`].
//!
//! One [`Inertia`] instance exists per smoothed parameter. The control side
//! calls [`set_target`](Inertia::set_target) whenever the host value changes;
//! the audio side calls [`step`](Inertia::step) once per tick (a scheduler
//! period for coefficients, a sample for gains) and reads
//! [`get_last`](Inertia::get_last) as often as it likes.
//!
//! ```rust
//! use velour_core::{GainSmoothing, Inertia};
//!
//! let mut cutoff = Inertia::exponential(20, 1000.0);
//! cutoff.set_target(4000.0);
//! assert!(cutoff.active());
//!
//! let mut gain = GainSmoothing::linear(64, 0.0);
//! gain.set_target(1.0);
//! let first = gain.get();
//! assert!(first > 0.0 && first < 1.0);
//! ```

use crate::ramp::{ExponentialRamp, LinearRamp, RampGenerator, RampShape};

/// Relative distance below which a new target counts as "already there".
pub const TARGET_EPSILON: f32 = 1.0e-6;

/// A smoothed control value.
#[derive(Debug, Clone)]
pub struct Inertia<S> {
    ramp: RampGenerator<S>,
}

/// Linear per-sample smoothing for gains.
pub type GainSmoothing = Inertia<LinearRamp>;

impl Inertia<ExponentialRamp> {
    /// Exponential inertia converging over `length` ticks.
    pub fn exponential(length: u32, initial: f32) -> Self {
        Self::new(ExponentialRamp::default(), length, initial)
    }
}

impl Inertia<LinearRamp> {
    /// Linear inertia converging over `length` ticks.
    pub fn linear(length: u32, initial: f32) -> Self {
        Self::new(LinearRamp::default(), length, initial)
    }
}

impl<S: RampShape> Inertia<S> {
    /// Creates a settled inertia at `initial` with the given shape and length.
    pub fn new(shape: S, length: u32, initial: f32) -> Self {
        Self {
            ramp: RampGenerator::new(shape, length, initial),
        }
    }

    /// Sets a new target value.
    ///
    /// Re-sending the target a ramp is already heading to does nothing.
    /// A target within [`TARGET_EPSILON`] of the current value is applied
    /// immediately; anything else starts a fresh ramp of the configured
    /// length from the current value.
    pub fn set_target(&mut self, value: f32) {
        if value == self.ramp.target() {
            return;
        }
        let scale = value.abs().max(1.0);
        if (value - self.ramp.current()).abs() <= TARGET_EPSILON * scale {
            self.ramp.reset(value);
            return;
        }
        self.ramp.start(value);
    }

    /// Advances one tick and returns the new value.
    #[inline]
    pub fn step(&mut self) -> f32 {
        self.ramp.step()
    }

    /// Advances one tick and returns the new value (per-sample use).
    #[inline]
    pub fn get(&mut self) -> f32 {
        self.ramp.step()
    }

    /// Most recently computed value, without advancing.
    #[inline]
    pub fn get_last(&self) -> f32 {
        self.ramp.current()
    }

    /// Returns `true` while the value is still converging.
    #[inline]
    pub fn active(&self) -> bool {
        self.ramp.is_active()
    }

    /// Value being converged to.
    #[inline]
    pub fn target(&self) -> f32 {
        self.ramp.target()
    }

    /// Jumps to `value` without smoothing.
    pub fn set_now(&mut self, value: f32) {
        self.ramp.reset(value);
    }

    /// Completes any ramp in progress.
    pub fn snap_to_target(&mut self) {
        let target = self.ramp.target();
        self.ramp.reset(target);
    }

    /// Sets the convergence length in ticks.
    pub fn set_length(&mut self, length: u32) {
        self.ramp.set_length(length);
    }

    /// Sets the convergence length from a time at a given tick rate.
    ///
    /// Rounds to the nearest tick; non-positive times disable smoothing.
    pub fn set_time(&mut self, time_ms: f32, tick_rate: f32) {
        let ticks = if time_ms > 0.0 && tick_rate > 0.0 {
            (time_ms * tick_rate / 1000.0 + 0.5) as u32
        } else {
            0
        };
        self.ramp.set_length(ticks);
    }

    /// Convergence length in ticks.
    #[inline]
    pub fn length(&self) -> u32 {
        self.ramp.length()
    }

    /// Underlying ramp state.
    pub fn ramp(&self) -> &RampGenerator<S> {
        &self.ramp
    }
}
