//! Schroeder allpass filter for reverb diffusion.
//!
//! Passes all frequencies at equal amplitude while smearing phase, which
//! turns the sparse echoes of a comb bank into a dense tail.

use alloc::collections::TryReserveError;

use crate::delay_line::DelayBuffer;
use crate::flush_denormal;

/// Schroeder allpass with a variable loop length.
///
/// # Example
///
/// ```rust
/// use velour_core::AllpassFilter;
///
/// let mut allpass = AllpassFilter::try_new(556).unwrap();
/// allpass.set_feedback(0.5);
/// assert_eq!(allpass.process(1.0), -1.0);
/// ```
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    delay: DelayBuffer,
    length: usize,
    feedback: f32,
}

impl AllpassFilter {
    /// Allocates an allpass able to loop up to `max_length` samples.
    pub fn try_new(max_length: usize) -> Result<Self, TryReserveError> {
        let delay = DelayBuffer::try_new(max_length + 1)?;
        Ok(Self {
            length: max_length.clamp(1, delay.max_delay()),
            delay,
            feedback: 0.5,
        })
    }

    /// Sets the loop length in samples, clamped to the allocated memory.
    pub fn set_length(&mut self, length: usize) {
        self.length = length.clamp(1, self.delay.max_delay());
    }

    /// Sets the feedback coefficient; stable for |feedback| < 1.
    #[inline]
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(-0.99, 0.99);
    }

    /// Current feedback coefficient.
    #[inline]
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Processes one sample.
    ///
    /// `output = delayed - input`, `delay_input = input + delayed * feedback`.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.delay.read(self.length);
        let output = -input + delayed;
        self.delay
            .write(flush_denormal(input + delayed * self.feedback));
        output
    }

    /// Clears the loop memory.
    pub fn clear(&mut self) {
        self.delay.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allpass_impulse_response() {
        let mut allpass = AllpassFilter::try_new(10).unwrap();
        allpass.set_feedback(0.5);

        let first = allpass.process(1.0);
        assert!((first - (-1.0)).abs() < 0.01, "First output should be -input");

        for _ in 0..9 {
            allpass.process(0.0);
        }
        let delayed = allpass.process(0.0);
        assert!(delayed.abs() > 0.3, "Should have delayed output");
    }

    #[test]
    fn test_allpass_energy_roughly_preserved() {
        let mut allpass = AllpassFilter::try_new(50).unwrap();
        allpass.set_feedback(0.5);

        let input_energy: f32 = (0..500)
            .map(|i| if i < 100 { 1.0f32 } else { 0.0 })
            .map(|x| x * x)
            .sum();
        let output_energy: f32 = (0..500)
            .map(|i| {
                let x = if i < 100 { 1.0 } else { 0.0 };
                let y = allpass.process(x);
                y * y
            })
            .sum();

        let ratio = output_energy / input_energy;
        assert!(ratio > 0.5 && ratio < 2.0, "Energy ratio {} should be close to 1.0", ratio);
    }

    #[test]
    fn test_allpass_clear() {
        let mut allpass = AllpassFilter::try_new(10).unwrap();
        for _ in 0..20 {
            allpass.process(1.0);
        }
        allpass.clear();
        assert!(allpass.process(0.0).abs() < 1e-10, "Should be silent after clear");
    }
}
