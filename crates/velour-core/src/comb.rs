//! Damped feedback comb filter for reverb tanks.
//!
//! The feedback path includes a one-pole lowpass for high-frequency damping,
//! simulating absorption in real rooms. Delay memory is sized once for the
//! longest loop the caller needs; the active loop length can then change
//! (room size, sample rate) without reallocating.

use alloc::collections::TryReserveError;

use crate::delay_line::DelayBuffer;
use crate::flush_denormal;

/// Comb filter with feedback and damping.
///
/// # Example
///
/// ```rust
/// use velour_core::CombFilter;
///
/// let mut comb = CombFilter::try_new(2048).unwrap();
/// comb.set_length(1116);
/// comb.set_feedback(0.8);
/// comb.set_damp(0.3);
///
/// let output = comb.process(1.0);
/// assert_eq!(output, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct CombFilter {
    delay: DelayBuffer,
    length: usize,
    feedback: f32,
    damp1: f32,
    damp2: f32,
    filterstore: f32,
}

impl CombFilter {
    /// Allocates a comb able to loop up to `max_length` samples.
    ///
    /// The initial loop length is `max_length`.
    pub fn try_new(max_length: usize) -> Result<Self, TryReserveError> {
        let delay = DelayBuffer::try_new(max_length + 1)?;
        Ok(Self {
            length: max_length.clamp(1, delay.max_delay()),
            delay,
            feedback: 0.5,
            damp1: 0.5,
            damp2: 0.5,
            filterstore: 0.0,
        })
    }

    /// Sets the loop length in samples, clamped to the allocated memory.
    pub fn set_length(&mut self, length: usize) {
        self.length = length.clamp(1, self.delay.max_delay());
    }

    /// Loop length in samples.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Sets the feedback amount (0.0 to 0.99).
    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    /// Current feedback amount.
    #[inline]
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Sets the damping amount (0.0 bright to 1.0 dark).
    #[inline]
    pub fn set_damp(&mut self, damp: f32) {
        self.damp1 = damp.clamp(0.0, 1.0);
        self.damp2 = 1.0 - self.damp1;
    }

    /// Processes one sample and returns the loop output.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.delay.read(self.length);

        // filterstore = output * (1 - damp) + filterstore * damp
        self.filterstore = flush_denormal(output * self.damp2 + self.filterstore * self.damp1);
        self.delay.write(input + self.filterstore * self.feedback);

        output
    }

    /// Clears the loop memory and damping state.
    pub fn clear(&mut self) {
        self.delay.clear();
        self.filterstore = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comb_basic() {
        let mut comb = CombFilter::try_new(100).unwrap();
        comb.set_feedback(0.5);
        comb.set_damp(0.2);

        let first = comb.process(1.0);
        assert_eq!(first, 0.0);

        for _ in 0..99 {
            comb.process(0.0);
        }

        let echo = comb.process(0.0);
        assert!(echo.abs() > 0.1, "Should have echo, got {}", echo);
    }

    #[test]
    fn test_length_change_without_realloc() {
        let mut comb = CombFilter::try_new(400).unwrap();
        comb.set_length(10);
        comb.process(1.0);
        for _ in 0..9 {
            comb.process(0.0);
        }
        assert_eq!(comb.process(0.0), 1.0);
        comb.set_length(100_000);
        assert!(comb.length() < 1024);
    }

    #[test]
    fn test_comb_damping() {
        let mut bright = CombFilter::try_new(20).unwrap();
        bright.set_feedback(0.8);
        bright.set_damp(0.0);

        let mut dark = CombFilter::try_new(20).unwrap();
        dark.set_feedback(0.8);
        dark.set_damp(0.8);

        bright.process(1.0);
        dark.process(1.0);

        let mut bright_sum = 0.0f32;
        let mut dark_sum = 0.0f32;
        for _ in 0..200 {
            bright_sum += bright.process(0.0).abs();
            dark_sum += dark.process(0.0).abs();
        }

        assert!(dark_sum < bright_sum, "Damped should have less energy");
    }

    #[test]
    fn test_comb_clear() {
        let mut comb = CombFilter::try_new(10).unwrap();
        for _ in 0..20 {
            comb.process(1.0);
        }
        comb.clear();
        for _ in 0..20 {
            assert!(comb.process(0.0).abs() < 1e-10, "Should be silent after clear");
        }
    }

    #[test]
    fn test_no_denormals_after_silence() {
        let mut comb = CombFilter::try_new(100).unwrap();
        comb.set_feedback(0.9);
        comb.set_damp(0.3);

        for _ in 0..1000 {
            comb.process(0.5);
        }
        for i in 0..100_000 {
            let out = comb.process(0.0);
            assert!(
                out == 0.0 || out.abs() > f32::MIN_POSITIVE,
                "Denormal detected at sample {}: {:.2e}",
                i,
                out
            );
        }
    }
}
