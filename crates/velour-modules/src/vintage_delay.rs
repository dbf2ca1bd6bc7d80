//! Tempo-synced stereo delay with tape-style coloration.
//!
//! Delay times are expressed in subdivisions of a beat:
//! `samples = round(60 * sr / (bpm * subdivision) * time)`. The repeats can
//! stay on their side, bounce between channels or run through one line
//! into the other (see [`MixMode`]). The tape media darken each pass of the
//! feedback loop.

use std::sync::Arc;

use velour_core::{
    Biquad, DelayTaps, GainSmoothing, MIX_MODE_LABELS, MixMode, ParamDescriptor, ParamId,
    ParamUnit, StereoDelayLine, bandpass_coefficients, flush_denormal, lowpass_coefficients,
    stereo_mix, tempo_delay_samples,
};

use crate::config::EngineConfig;
use crate::error::ModuleError;
use crate::module::{AudioModule, LifecycleState, StereoWriter, block_end, channel_input};
use crate::params::ParamBank;

/// Labels of the [`Medium`] parameter.
pub const MEDIUM_LABELS: [&str; 3] = ["Plain", "Tape", "Old Tape"];

/// Coloration applied inside the feedback loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Medium {
    /// No filtering.
    Plain,
    /// 6 kHz low-pass.
    #[default]
    Tape,
    /// 6 kHz low-pass followed by a 4.5 kHz band-pass.
    OldTape,
}

impl Medium {
    /// Maps a parameter index to a medium; out-of-range indices give `Plain`.
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Medium::Tape,
            2 => Medium::OldTape,
            _ => Medium::Plain,
        }
    }

    /// Number of filter stages this medium uses.
    pub fn stages(self) -> usize {
        match self {
            Medium::Plain => 0,
            Medium::Tape => 1,
            Medium::OldTape => 2,
        }
    }
}

/// Parameter table of [`VintageDelay`].
pub static VINTAGE_DELAY_PARAMS: [ParamDescriptor; 10] = [
    ParamDescriptor::float("Tempo", "BPM", 30.0, 300.0, 120.0)
        .with_unit(ParamUnit::Bpm)
        .with_id(ParamId(300), "vd_bpm"),
    ParamDescriptor::integer("Subdivide", "Subdiv", 1.0, 16.0, 4.0)
        .with_id(ParamId(301), "vd_subdiv"),
    ParamDescriptor::integer("Time L", "TimeL", 1.0, 16.0, 3.0).with_id(ParamId(302), "vd_time_l"),
    ParamDescriptor::integer("Time R", "TimeR", 1.0, 16.0, 5.0).with_id(ParamId(303), "vd_time_r"),
    ParamDescriptor::percent("Feedback", "Fb", 0.5).with_id(ParamId(304), "vd_feedback"),
    ParamDescriptor::gain("Amount", "Amount", 0.0, 4.0, 0.25).with_id(ParamId(305), "vd_amount"),
    ParamDescriptor::enumeration("Mix Mode", "MixMode", &MIX_MODE_LABELS, 1)
        .with_id(ParamId(306), "vd_mix_mode"),
    ParamDescriptor::enumeration("Medium", "Medium", &MEDIUM_LABELS, 1)
        .with_id(ParamId(307), "vd_medium"),
    ParamDescriptor::gain("Dry Amount", "Dry", 0.0, 4.0, 1.0).with_id(ParamId(308), "vd_dry"),
    ParamDescriptor::float("Stereo Width", "Width", -1.0, 1.0, 1.0)
        .with_id(ParamId(309), "vd_width"),
];

/// Tempo-synced stereo delay.
///
/// Delay memory is reserved once from
/// [`EngineConfig::max_delay_samples`]. Tap lengths are clamped so that the
/// longest read (left plus right in the chained mix modes) stays inside it.
///
/// # Example
///
/// ```rust
/// use velour_modules::{AudioModule, EngineConfig, VintageDelay};
///
/// let mut delay = VintageDelay::new(&EngineConfig::default()).unwrap();
/// delay.set_sample_rate(48000);
/// delay.activate();
/// // 120 bpm, quarter-note subdivision of 4: 3/16 and 5/16 of a bar
/// assert_eq!(delay.taps().left, 18000);
/// assert_eq!(delay.taps().right, 30000);
/// ```
#[derive(Debug)]
pub struct VintageDelay {
    params: Arc<ParamBank>,
    config: EngineConfig,
    line: StereoDelayLine,
    lifecycle: LifecycleState,
    sample_rate: u32,
    taps: DelayTaps,
    mix_mode: MixMode,
    medium: Medium,
    filters_for: Option<(Medium, u32)>,
    tone: [[Biquad; 2]; 2],
    amt_left: GainSmoothing,
    amt_right: GainSmoothing,
    fb_left: GainSmoothing,
    fb_right: GainSmoothing,
    dry: GainSmoothing,
    chmix: GainSmoothing,
}

impl VintageDelay {
    /// Index of the tempo parameter.
    pub const BPM: usize = 0;
    /// Index of the subdivision parameter.
    pub const SUBDIVIDE: usize = 1;
    /// Index of the left time parameter.
    pub const TIME_L: usize = 2;
    /// Index of the right time parameter.
    pub const TIME_R: usize = 3;
    /// Index of the feedback parameter.
    pub const FEEDBACK: usize = 4;
    /// Index of the wet amount parameter.
    pub const AMOUNT: usize = 5;
    /// Index of the mix mode parameter.
    pub const MIX_MODE: usize = 6;
    /// Index of the medium parameter.
    pub const MEDIUM: usize = 7;
    /// Index of the dry amount parameter.
    pub const DRY: usize = 8;
    /// Index of the stereo width parameter.
    pub const WIDTH: usize = 9;

    /// Creates an inactive delay, reserving its delay memory.
    pub fn new(config: &EngineConfig) -> Result<Self, ModuleError> {
        config.validate()?;
        let samples = config.max_delay_samples;
        let line = StereoDelayLine::try_new(samples)
            .map_err(|e| ModuleError::allocation("vintage delay line", samples, e))?;
        tracing::debug!(samples, "vintage delay memory reserved");

        let smoothing = || GainSmoothing::linear(0, 0.0);
        let mut delay = Self {
            params: Arc::new(ParamBank::new(&VINTAGE_DELAY_PARAMS)),
            config: config.clone(),
            line,
            lifecycle: LifecycleState::Inactive,
            sample_rate: 44100,
            taps: DelayTaps { left: 0, right: 0 },
            mix_mode: MixMode::default(),
            medium: Medium::default(),
            filters_for: None,
            tone: Default::default(),
            amt_left: smoothing(),
            amt_right: smoothing(),
            fb_left: smoothing(),
            fb_right: smoothing(),
            dry: smoothing(),
            chmix: smoothing(),
        };
        delay.set_sample_rate(44100);
        delay.params_changed();
        delay.snap_gains();
        Ok(delay)
    }

    /// Current tap lengths in samples.
    pub fn taps(&self) -> DelayTaps {
        self.taps
    }

    /// Current routing.
    pub fn mix_mode(&self) -> MixMode {
        self.mix_mode
    }

    /// Current feedback medium.
    pub fn medium(&self) -> Medium {
        self.medium
    }

    fn gains_mut(&mut self) -> [&mut GainSmoothing; 6] {
        [
            &mut self.amt_left,
            &mut self.amt_right,
            &mut self.fb_left,
            &mut self.fb_right,
            &mut self.dry,
            &mut self.chmix,
        ]
    }

    fn snap_gains(&mut self) {
        for gain in self.gains_mut() {
            gain.snap_to_target();
        }
    }

    fn calc_filters(&mut self) {
        let sr = self.sample_rate as f32;
        let lp = lowpass_coefficients(6000.0, 0.707, sr);
        let bp = bandpass_coefficients(4500.0, 0.25, sr);
        for stages in &mut self.tone {
            stages[0].set_design(lp, 1.0);
            stages[1].set_design(bp, 1.0);
        }
        self.filters_for = Some((self.medium, self.sample_rate));
    }
}

impl AudioModule for VintageDelay {
    fn input_count(&self) -> usize {
        2
    }

    fn output_count(&self) -> usize {
        2
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = self.config.clamp_sample_rate(sample_rate);
        let sr = self.sample_rate as f32;
        let ms = self.config.gain_smoothing_ms;
        for gain in self.gains_mut() {
            gain.set_time(ms, sr);
        }
        self.filters_for = None;
        tracing::debug!(sample_rate = self.sample_rate, "vintage delay sample rate set");
    }

    fn activate(&mut self) {
        self.line.clear();
        for stages in &mut self.tone {
            for stage in stages.iter_mut() {
                stage.clear();
            }
        }
        self.params_changed();
        self.snap_gains();
        self.lifecycle = LifecycleState::Active;
        tracing::debug!(taps = ?self.taps, mode = self.mix_mode.label(), "vintage delay activated");
    }

    fn deactivate(&mut self) {
        self.lifecycle = LifecycleState::Inactive;
        tracing::debug!("vintage delay deactivated");
    }

    fn params_changed(&mut self) {
        let p = Arc::clone(&self.params);
        let sr = self.sample_rate as f32;
        let bpm = p.get(Self::BPM);
        let subdiv = p.get(Self::SUBDIVIDE);
        let time_l = p.get(Self::TIME_L);
        let time_r = p.get(Self::TIME_R);

        let limit = self.line.max_delay() / 2;
        self.taps = DelayTaps {
            left: tempo_delay_samples(bpm, subdiv, time_l, sr).min(limit),
            right: tempo_delay_samples(bpm, subdiv, time_r, sr).min(limit),
        };

        let amount = p.get(Self::AMOUNT);
        let fb = p.get(Self::FEEDBACK);
        self.mix_mode = MixMode::from_index(p.get_int(Self::MIX_MODE));
        self.medium = Medium::from_index(p.get_int(Self::MEDIUM));

        self.amt_left.set_target(amount);
        self.amt_right.set_target(amount);
        self.dry.set_target(p.get(Self::DRY));
        self.chmix.set_target((1.0 - p.get(Self::WIDTH)) * 0.5);
        self.fb_left.set_target(fb);
        let fb_right = match self.mix_mode {
            MixMode::Stereo => libm::powf(fb, time_r / time_l),
            _ => fb,
        };
        self.fb_right.set_target(fb_right);

        if self.filters_for != Some((self.medium, self.sample_rate)) {
            self.calc_filters();
        }
    }

    fn process(
        &mut self,
        ins: &[&[f32]],
        outs: &mut [&mut [f32]],
        offset: usize,
        numsamples: usize,
        inputs_mask: u32,
        outputs_mask: u32,
    ) -> u32 {
        if !self.lifecycle.is_active() || outputs_mask & 0b11 == 0 {
            return 0;
        }
        let end = block_end(ins, 2, outs, 2, offset, numsamples);
        let in_l = channel_input(ins, 0, inputs_mask);
        let in_r = channel_input(ins, 1, inputs_mask);
        let Some(mut out) = StereoWriter::new(outs, outputs_mask) else {
            return 0;
        };
        let stages = self.medium.stages();

        for i in offset..end {
            let input = [
                in_l.map_or(0.0, |b| b[i]),
                in_r.map_or(0.0, |b| b[i]),
            ];
            let feedback = [self.fb_left.get(), self.fb_right.get()];
            let mut frame = self.line.route(self.mix_mode, input, self.taps, feedback);

            for (feed, chain) in frame.feed.iter_mut().zip(self.tone.iter_mut()) {
                for stage in chain.iter_mut().take(stages) {
                    *feed = stage.process(*feed);
                }
                *feed = flush_denormal(*feed);
            }
            self.line.push(frame.feed);

            let wet = [
                frame.wet[0] * self.amt_left.get(),
                frame.wet[1] * self.amt_right.get(),
            ];
            out.write(i, stereo_mix(input, wet, self.dry.get(), self.chmix.get()));
        }

        if stages > 0 {
            for chain in &mut self.tone {
                for stage in chain.iter_mut() {
                    stage.sanitize();
                }
            }
        }

        out.audible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_delay(sample_rate: u32) -> VintageDelay {
        let mut delay = VintageDelay::new(&EngineConfig::default()).unwrap();
        delay.set_sample_rate(sample_rate);
        delay.activate();
        delay
    }

    #[test]
    fn test_tempo_taps() {
        let mut delay = active_delay(4000);
        delay.params().set(VintageDelay::TIME_L, 1.0);
        delay.params().set(VintageDelay::TIME_R, 2.0);
        delay.params_changed();
        assert_eq!(delay.taps().left, 500);
        assert_eq!(delay.taps().right, 1000);
    }

    #[test]
    fn test_medium_and_mode_from_params() {
        let mut delay = active_delay(48000);
        assert_eq!(delay.mix_mode(), MixMode::PingPong);
        assert_eq!(delay.medium(), Medium::Tape);
        delay.params().set(VintageDelay::MIX_MODE, 3.0);
        delay.params().set(VintageDelay::MEDIUM, 2.0);
        delay.params_changed();
        assert_eq!(delay.mix_mode(), MixMode::RightToLeft);
        assert_eq!(delay.medium(), Medium::OldTape);
    }

    #[test]
    fn test_taps_clamped_to_memory() {
        let config = EngineConfig {
            max_delay_samples: 1024,
            ..EngineConfig::default()
        };
        let mut delay = VintageDelay::new(&config).unwrap();
        delay.set_sample_rate(48000);
        delay.activate();
        assert!(delay.taps().left + delay.taps().right <= 1023);
    }

    #[test]
    fn test_dry_only_passthrough() {
        let mut delay = active_delay(48000);
        delay.params().set(VintageDelay::AMOUNT, 0.0);
        delay.params_changed();
        // Let the amount ramp settle.
        let zeros = [0.0f32; 256];
        let mut l = [0.0f32; 256];
        let mut r = [0.0f32; 256];
        let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
        delay.process(&[&zeros[..], &zeros[..]], &mut outs, 0, 256, 0b11, 0b11);

        let input: Vec<f32> = (0..256).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
        delay.process(&[&input[..], &input[..]], &mut outs, 0, 256, 0b11, 0b11);
        for i in 0..256 {
            assert!((l[i] - input[i]).abs() < 1e-6);
            assert!((r[i] - input[i]).abs() < 1e-6);
        }
    }
}
