//! Cascaded biquad filter core.
//!
//! [`FilterCore`] runs the same cookbook section one to three times in
//! series per channel, giving 6/12/18 dB (band-pass, band-reject) or
//! 12/24/36 dB (low-pass, high-pass) responses. Coefficients are shared by
//! every section of both channels and only change through
//! [`calculate_filter`](FilterCore::calculate_filter).
//!
//! ```rust
//! use velour_core::{FilterCore, FilterMode};
//!
//! let mut filter = FilterCore::new(48000);
//! filter.calculate_filter(1000.0, 0.707, FilterMode::Lp24, 1.0);
//! assert_eq!(filter.order(), 2);
//!
//! let input = [1.0, 0.0, 0.0, 0.0];
//! let mut output = [0.0; 4];
//! let mask = filter.process_channel(0, Some(&input[..]), &mut output);
//! assert_eq!(mask, 1);
//! ```

use libm::powf;

use crate::biquad::{
    Biquad, bandpass_coefficients, highpass_coefficients, lowpass_coefficients,
    notch_coefficients,
};
use crate::kernel::{DspKernel, KernelControls};
use crate::math::is_silent;

/// Maximum number of cascaded sections per channel.
pub const MAX_ORDER: usize = 3;

/// Number of channels a [`FilterCore`] processes.
pub const FILTER_CHANNELS: usize = 2;

/// Lowest accepted cutoff in Hz.
pub const MIN_FREQUENCY: f32 = 10.0;

/// Lowest accepted resonance.
pub const MIN_RESONANCE: f32 = 0.1;

/// Response family and slope of a [`FilterCore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// 12 dB/oct low-pass.
    #[default]
    Lp12,
    /// 24 dB/oct low-pass.
    Lp24,
    /// 36 dB/oct low-pass.
    Lp36,
    /// 12 dB/oct high-pass.
    Hp12,
    /// 24 dB/oct high-pass.
    Hp24,
    /// 36 dB/oct high-pass.
    Hp36,
    /// 6 dB/oct band-pass.
    Bp6,
    /// 12 dB/oct band-pass.
    Bp12,
    /// 18 dB/oct band-pass.
    Bp18,
    /// 6 dB/oct band-reject.
    Br6,
    /// 12 dB/oct band-reject.
    Br12,
    /// 18 dB/oct band-reject.
    Br18,
}

/// Display labels in index order.
pub const FILTER_MODE_LABELS: [&str; 12] = [
    "12dB/oct Lowpass",
    "24dB/oct Lowpass",
    "36dB/oct Lowpass",
    "12dB/oct Highpass",
    "24dB/oct Highpass",
    "36dB/oct Highpass",
    "6dB/oct Bandpass",
    "12dB/oct Bandpass",
    "18dB/oct Bandpass",
    "6dB/oct Bandreject",
    "12dB/oct Bandreject",
    "18dB/oct Bandreject",
];

impl FilterMode {
    /// All modes in index order.
    pub const ALL: [FilterMode; 12] = [
        FilterMode::Lp12,
        FilterMode::Lp24,
        FilterMode::Lp36,
        FilterMode::Hp12,
        FilterMode::Hp24,
        FilterMode::Hp36,
        FilterMode::Bp6,
        FilterMode::Bp12,
        FilterMode::Bp18,
        FilterMode::Br6,
        FilterMode::Br12,
        FilterMode::Br18,
    ];

    /// Maps an index to a mode; anything out of range falls back to [`FilterMode::Lp12`].
    pub fn from_index(index: i32) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    /// Position of this mode in [`FilterMode::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of cascaded sections (1 to 3).
    pub fn order(self) -> usize {
        self.index() % 3 + 1
    }

    /// Returns `true` for the band-pass family.
    pub fn is_bandpass(self) -> bool {
        matches!(self, FilterMode::Bp6 | FilterMode::Bp12 | FilterMode::Bp18)
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        FILTER_MODE_LABELS[self.index()]
    }
}

/// Stereo cascade of up to [`MAX_ORDER`] biquad sections per channel.
#[derive(Debug, Clone)]
pub struct FilterCore {
    sections: [[Biquad; MAX_ORDER]; FILTER_CHANNELS],
    order: usize,
    mode: FilterMode,
    sample_rate: f32,
}

impl FilterCore {
    /// Creates a passthrough filter core at the given sample rate.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sections: Default::default(),
            order: 1,
            mode: FilterMode::default(),
            sample_rate: sample_rate.max(1) as f32,
        }
    }

    /// Designs the cascade for a frequency, per-filter resonance, mode and gain.
    ///
    /// The frequency is clamped to `[MIN_FREQUENCY, 0.49 * sample_rate]` and
    /// the resonance to at least [`MIN_RESONANCE`]. Each section of an
    /// order-`n` low/high/band-pass gets `q^(1/n)`; band-reject sections get
    /// `n * 0.1 * q`. Every section carries the same coefficients, gain
    /// included.
    pub fn calculate_filter(&mut self, frequency: f32, resonance: f32, mode: FilterMode, gain: f32) {
        let nyquist_limit = 0.49 * self.sample_rate;
        let freq = if frequency.is_finite() {
            frequency.clamp(MIN_FREQUENCY, nyquist_limit.max(MIN_FREQUENCY))
        } else {
            MIN_FREQUENCY
        };
        let q = if resonance.is_finite() {
            resonance.max(MIN_RESONANCE)
        } else {
            MIN_RESONANCE
        };
        let gain = if gain.is_finite() { gain } else { 1.0 };

        let order = mode.order();
        let section_q = powf(q, 1.0 / order as f32);
        let sr = self.sample_rate;
        let design = match mode {
            FilterMode::Lp12 | FilterMode::Lp24 | FilterMode::Lp36 => {
                lowpass_coefficients(freq, section_q, sr)
            }
            FilterMode::Hp12 | FilterMode::Hp24 | FilterMode::Hp36 => {
                highpass_coefficients(freq, section_q, sr)
            }
            FilterMode::Bp6 | FilterMode::Bp12 | FilterMode::Bp18 => {
                bandpass_coefficients(freq, section_q, sr)
            }
            FilterMode::Br6 | FilterMode::Br12 | FilterMode::Br18 => {
                notch_coefficients(freq, order as f32 * 0.1 * q, sr)
            }
        };

        let [left, right] = &mut self.sections;
        left[0].set_design(design, gain);
        for i in 1..MAX_ORDER {
            let (head, tail) = left.split_at_mut(i);
            tail[0].copy_coefficients(&head[0]);
        }
        for (r, l) in right.iter_mut().zip(left.iter()) {
            r.copy_coefficients(l);
        }

        self.order = order;
        self.mode = mode;
    }

    /// Runs one channel through the cascade.
    ///
    /// `None` input is treated as silence; if the cascade is already quiet
    /// the output is zeroed without touching state. Returns `1 << channel`
    /// when the output or the remaining tail is audible.
    pub fn process_channel(
        &mut self,
        channel: usize,
        input: Option<&[f32]>,
        output: &mut [f32],
    ) -> u32 {
        let order = self.order;
        let Some(chain) = self.sections.get_mut(channel) else {
            return 0;
        };
        let chain = &mut chain[..order];

        match input {
            Some(input) => {
                for (x, y) in input.iter().zip(output.iter_mut()) {
                    let mut s = *x;
                    for section in chain.iter_mut() {
                        s = section.process(s);
                    }
                    *y = s;
                }
            }
            None if chain.iter().all(Biquad::is_quiet) => {
                output.fill(0.0);
                return 0;
            }
            None => {
                for y in output.iter_mut() {
                    let mut s = chain[0].process_zero();
                    for section in chain[1..].iter_mut() {
                        s = section.process(s);
                    }
                    *y = s;
                }
            }
        }

        for section in chain.iter_mut() {
            section.sanitize();
        }

        let tail_audible = chain.last().is_some_and(|s| !s.is_quiet());
        if tail_audible || !is_silent(output) {
            1 << channel
        } else {
            0
        }
    }

    /// Clears every section's state.
    pub fn reset(&mut self) {
        for chain in &mut self.sections {
            for section in chain.iter_mut() {
                section.clear();
            }
        }
    }

    /// Updates the sample rate used by subsequent designs.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1) as f32;
    }

    /// Number of active sections per channel.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Mode of the current design.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// First section of a channel, for inspection.
    pub fn section(&self, channel: usize, index: usize) -> Option<&Biquad> {
        self.sections.get(channel).and_then(|c| c.get(index))
    }
}

impl DspKernel for FilterCore {
    fn channel_count(&self) -> usize {
        FILTER_CHANNELS
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        FilterCore::set_sample_rate(self, sample_rate);
    }

    fn activate(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(mode = self.mode.label(), order = self.order, "filter core activated");
        self.reset();
    }

    fn calculate(&mut self, controls: &KernelControls) {
        self.calculate_filter(
            controls.frequency,
            controls.resonance,
            FilterMode::from_index(controls.mode),
            controls.gain,
        );
    }

    fn process_channel(
        &mut self,
        channel: usize,
        input: Option<&[f32]>,
        output: &mut [f32],
    ) -> u32 {
        FilterCore::process_channel(self, channel, input, output)
    }
}
