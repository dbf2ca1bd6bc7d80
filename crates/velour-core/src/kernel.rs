//! The DSP kernel capability driven by a module's processing loop.
//!
//! A kernel owns the per-channel signal state (filter taps, delay memory)
//! and knows how to turn smoothed control values into cached coefficients.
//! The orchestration loop (inertia, scheduling, lifecycle) lives outside
//! the kernel and calls into it through this trait.

/// Smoothed control values handed to [`DspKernel::calculate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelControls {
    /// Center or cutoff frequency in Hz.
    pub frequency: f32,
    /// Resonance (Q) of a single section.
    pub resonance: f32,
    /// Raw mode index; kernels clamp unknown values to a safe default.
    pub mode: i32,
    /// Linear gain.
    pub gain: f32,
}

impl Default for KernelControls {
    fn default() -> Self {
        Self {
            frequency: 1000.0,
            resonance: core::f32::consts::FRAC_1_SQRT_2,
            mode: 0,
            gain: 1.0,
        }
    }
}

/// Signal-processing half of a module.
///
/// None of these methods may allocate, lock or block; `process_channel`
/// runs on the real-time thread.
pub trait DspKernel {
    /// Number of channels [`process_channel`](Self::process_channel) accepts.
    fn channel_count(&self) -> usize;

    /// Updates sample-rate dependent constants.
    fn set_sample_rate(&mut self, sample_rate: u32);

    /// Clears transitional state before processing starts.
    fn activate(&mut self);

    /// Recomputes cached coefficients from smoothed control values.
    fn calculate(&mut self, controls: &KernelControls);

    /// Processes one channel of one sub-block.
    ///
    /// A missing input is processed as silence so state stays continuous.
    /// Returns `1 << channel` if the output carries audible signal, else 0.
    fn process_channel(&mut self, channel: usize, input: Option<&[f32]>, output: &mut [f32])
    -> u32;
}
