//! The host-facing module interface.
//!
//! Every effect implements [`AudioModule`]. A host drives it through a fixed
//! lifecycle: `set_sample_rate` → `activate` → any number of `process` and
//! `params_changed` calls → `deactivate`. Channel buffers are passed as
//! slices; `offset` and `numsamples` select the frames to render and the
//! masks say which inputs carry signal and which outputs are wanted.

use std::sync::Arc;

use velour_core::SILENCE_THRESHOLD;

use crate::params::ParamBank;

/// Whether a module is currently processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Constructed or deactivated; `process` is a no-op.
    #[default]
    Inactive,
    /// Activated; `process` renders audio.
    Active,
}

impl LifecycleState {
    /// Returns `true` in the active state.
    pub fn is_active(self) -> bool {
        self == LifecycleState::Active
    }
}

/// Real-time audio module.
///
/// `process`, `params_changed`, `note_on` and `note_off` never allocate,
/// lock or panic. Invalid parameter values are clamped, unknown modes fall
/// back to a default and out-of-range buffer requests are clipped to the
/// buffers actually passed in.
pub trait AudioModule {
    /// Number of audio inputs.
    fn input_count(&self) -> usize;

    /// Number of audio outputs.
    fn output_count(&self) -> usize;

    /// Shared parameter storage.
    fn params(&self) -> &Arc<ParamBank>;

    /// Current lifecycle state.
    fn lifecycle(&self) -> LifecycleState;

    /// Sets the sample rate; call before [`activate`](Self::activate).
    ///
    /// Rates above the configured maximum are clamped.
    fn set_sample_rate(&mut self, sample_rate: u32);

    /// Prepares for processing: reads parameters, settles smoothing and
    /// clears transitional state.
    fn activate(&mut self);

    /// Stops processing. Buffers are kept.
    fn deactivate(&mut self);

    /// Pulls the current parameter values into the smoothing targets.
    fn params_changed(&mut self);

    /// Note start. Only note-controlled modules react.
    fn note_on(&mut self, _note: u8, _velocity: u8) {}

    /// Note end. Only note-controlled modules react.
    fn note_off(&mut self, _note: u8, _velocity: u8) {}

    /// Renders frames `offset..offset + numsamples`.
    ///
    /// Input `i` is read only if bit `i` of `inputs_mask` is set; otherwise
    /// it is treated as silence. Output `o` is written only if bit `o` of
    /// `outputs_mask` is set; internal state advances either way. Returns a
    /// mask of written outputs that carry audible signal. An inactive module returns 0 and leaves the outputs alone.
    fn process(
        &mut self,
        ins: &[&[f32]],
        outs: &mut [&mut [f32]],
        offset: usize,
        numsamples: usize,
        inputs_mask: u32,
        outputs_mask: u32,
    ) -> u32;
}

/// End of the renderable range.
///
/// `offset + numsamples` clipped to the shortest of the first `inputs`
/// input buffers and first `outputs` output buffers.
pub(crate) fn block_end(
    ins: &[&[f32]],
    inputs: usize,
    outs: &[&mut [f32]],
    outputs: usize,
    offset: usize,
    numsamples: usize,
) -> usize {
    let mut end = offset.saturating_add(numsamples);
    for buf in ins.iter().take(inputs) {
        end = end.min(buf.len());
    }
    for buf in outs.iter().take(outputs) {
        end = end.min(buf.len());
    }
    end
}

/// Input buffer for `channel` if it is present and flagged in the mask.
#[inline]
pub(crate) fn channel_input<'a>(ins: &[&'a [f32]], channel: usize, mask: u32) -> Option<&'a [f32]> {
    if channel < 32 && mask & (1 << channel) != 0 {
        ins.get(channel).copied()
    } else {
        None
    }
}

/// The first two output buffers, if both exist.
#[inline]
pub(crate) fn stereo_outputs<'a>(
    outs: &'a mut [&mut [f32]],
) -> Option<(&'a mut [f32], &'a mut [f32])> {
    match outs {
        [left, right, ..] => Some((&mut **left, &mut **right)),
        _ => None,
    }
}

/// Stereo output pair that writes only the outputs a host asked for.
///
/// Modules that render whole stereo frames advance their state for every
/// frame and hand the result here; outputs whose mask bit is clear are left
/// untouched. Tracks which written outputs carry signal.
pub(crate) struct StereoWriter<'a> {
    left: &'a mut [f32],
    right: &'a mut [f32],
    wanted: u32,
    audible: u32,
}

impl<'a> StereoWriter<'a> {
    /// Wraps the first two output buffers, or `None` if either is missing.
    pub(crate) fn new(outs: &'a mut [&mut [f32]], outputs_mask: u32) -> Option<Self> {
        let (left, right) = stereo_outputs(outs)?;
        Some(Self {
            left,
            right,
            wanted: outputs_mask & 0b11,
            audible: 0,
        })
    }

    #[inline]
    pub(crate) fn write(&mut self, index: usize, frame: [f32; 2]) {
        if self.wanted & 1 != 0 {
            self.left[index] = frame[0];
            if frame[0].abs() >= SILENCE_THRESHOLD {
                self.audible |= 1;
            }
        }
        if self.wanted & 2 != 0 {
            self.right[index] = frame[1];
            if frame[1].abs() >= SILENCE_THRESHOLD {
                self.audible |= 2;
            }
        }
    }

    /// Mask of written outputs that carried audible signal.
    pub(crate) fn audible(&self) -> u32 {
        self.audible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_end_clips_to_shortest() {
        let a = [0.0f32; 64];
        let b = [0.0f32; 32];
        let mut c = [0.0f32; 48];
        let mut d = [0.0f32; 16];
        let ins: [&[f32]; 2] = [&a, &b];
        let outs: [&mut [f32]; 2] = [&mut c, &mut d];

        assert_eq!(block_end(&ins, 1, &outs, 1, 0, 100), 48);
        assert_eq!(block_end(&ins, 2, &outs, 1, 0, 100), 32);
        assert_eq!(block_end(&ins, 2, &outs, 2, 4, 8), 12);
        assert_eq!(block_end(&ins, 2, &outs, 2, 0, 100), 16);
        assert_eq!(block_end(&ins, 0, &outs, 0, usize::MAX, 5), usize::MAX);
    }

    #[test]
    fn test_channel_input_respects_mask() {
        let a = [1.0f32; 4];
        let ins: [&[f32]; 1] = [&a];
        assert!(channel_input(&ins, 0, 1).is_some());
        assert!(channel_input(&ins, 0, 0).is_none());
        assert!(channel_input(&ins, 1, 3).is_none());
        assert!(channel_input(&ins, 40, u32::MAX).is_none());
    }

    #[test]
    fn test_stereo_outputs() {
        let mut l = [0.0f32; 4];
        let mut r = [0.0f32; 4];
        let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
        let (left, right) = stereo_outputs(&mut outs).unwrap();
        left[0] = 1.0;
        right[0] = 2.0;
        assert_eq!(l[0], 1.0);
        assert_eq!(r[0], 2.0);

        let mut m = [0.0f32; 4];
        let mut mono: [&mut [f32]; 1] = [&mut m];
        assert!(stereo_outputs(&mut mono).is_none());
    }
}
