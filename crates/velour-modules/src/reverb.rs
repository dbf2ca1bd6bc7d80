//! Stereo comb/allpass reverb.
//!
//! The input is summed to mono, pre-delayed and band-limited, then fed to two
//! tanks of eight damped combs and four series allpasses. The right tank's
//! loops are slightly longer than the left's, which decorrelates the tails.

use std::sync::Arc;

use velour_core::{
    AllpassFilter, CombFilter, DelayBuffer, GainSmoothing, OnePole, ParamDescriptor, ParamId,
    ParamScale, ParamUnit, flush_denormal, ms_to_samples, round_half_away,
};

use crate::config::EngineConfig;
use crate::error::ModuleError;
use crate::meters::LevelMeter;
use crate::module::{AudioModule, LifecycleState, StereoWriter, block_end, channel_input};
use crate::params::ParamBank;

const COMB_TUNING: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNING: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const TUNING_RATE: f32 = 44100.0;
const COMB_MIX: f32 = 0.125;
const MAX_PREDELAY_MS: f32 = 50.0;

/// Labels of the room size parameter.
pub const ROOM_LABELS: [&str; 6] = [
    "Small",
    "Medium",
    "Large",
    "Tunnel-like",
    "Large/smooth",
    "Experimental",
];

/// Loop length multiplier for each room size.
pub const ROOM_SCALES: [f32; 6] = [0.4, 0.6, 1.0, 1.6, 1.2, 2.0];

const MAX_ROOM_SCALE: f32 = 2.0;

/// Parameter table of [`Reverb`].
pub static REVERB_PARAMS: [ParamDescriptor; 12] = [
    ParamDescriptor::float("Decay Time", "Decay", 0.4, 15.0, 1.5)
        .with_scale(ParamScale::Logarithmic)
        .with_unit(ParamUnit::Seconds)
        .with_id(ParamId(400), "rev_decay"),
    ParamDescriptor::frequency("High Frq Damp", "HFDamp", 2000.0, 20000.0, 5000.0)
        .with_id(ParamId(401), "rev_hf_damp"),
    ParamDescriptor::enumeration("Room Size", "Room", &ROOM_LABELS, 2)
        .with_id(ParamId(402), "rev_room_size"),
    ParamDescriptor::percent("Diffusion", "Diff", 0.5).with_id(ParamId(403), "rev_diffusion"),
    ParamDescriptor::gain("Wet Amount", "Wet", 0.0, 2.0, 0.25).with_id(ParamId(404), "rev_amount"),
    ParamDescriptor::gain("Dry Amount", "Dry", 0.0, 2.0, 1.0).with_id(ParamId(405), "rev_dry"),
    ParamDescriptor::float("Pre Delay", "PreDly", 0.0, MAX_PREDELAY_MS, 0.0)
        .with_unit(ParamUnit::Milliseconds)
        .with_id(ParamId(406), "rev_predelay"),
    ParamDescriptor::frequency("Bass Cut", "BassCut", 20.0, 20000.0, 300.0)
        .with_id(ParamId(407), "rev_bass_cut"),
    ParamDescriptor::frequency("Treble Cut", "TrebCut", 20.0, 20000.0, 5000.0)
        .with_id(ParamId(408), "rev_treble_cut"),
    ParamDescriptor::meter("Wet Level", "WetLvl", 1.0).with_id(ParamId(409), "rev_meter_wet"),
    ParamDescriptor::meter("Output Level", "OutLvl", 1.0).with_id(ParamId(410), "rev_meter_out"),
    ParamDescriptor::indicator("Clip", "Clip").with_id(ParamId(411), "rev_clip"),
];

#[derive(Debug)]
struct Tank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
    spread: usize,
}

impl Tank {
    fn try_new(spread: usize, max_rate: u32) -> Result<Self, ModuleError> {
        let longest = |tuning: usize| scaled_length(tuning + spread, max_rate as f32, MAX_ROOM_SCALE);
        let combs = COMB_TUNING
            .iter()
            .map(|&t| {
                let samples = longest(t);
                CombFilter::try_new(samples)
                    .map_err(|e| ModuleError::allocation("reverb comb", samples, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let allpasses = ALLPASS_TUNING
            .iter()
            .map(|&t| {
                let samples = longest(t);
                AllpassFilter::try_new(samples)
                    .map_err(|e| ModuleError::allocation("reverb allpass", samples, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            combs,
            allpasses,
            spread,
        })
    }

    fn tune(&mut self, sample_rate: f32, scale: f32, decay: f32, damp: f32, diffusion: f32) {
        let rt = (decay * sample_rate).max(1.0);
        for (comb, &t) in self.combs.iter_mut().zip(&COMB_TUNING) {
            let length = scaled_length(t + self.spread, sample_rate, scale);
            comb.set_length(length);
            // 60 dB down after `decay` seconds
            comb.set_feedback(libm::powf(0.001, length as f32 / rt));
            comb.set_damp(damp);
        }
        for (allpass, &t) in self.allpasses.iter_mut().zip(&ALLPASS_TUNING) {
            allpass.set_length(scaled_length(t + self.spread, sample_rate, scale));
            allpass.set_feedback(0.7 * diffusion);
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input);
        }
        out *= COMB_MIX;
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        flush_denormal(out)
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
    }
}

fn scaled_length(tuning: usize, sample_rate: f32, scale: f32) -> usize {
    (round_half_away(tuning as f32 * scale * sample_rate / TUNING_RATE) as usize).max(1)
}

/// Stereo reverb with pre-delay and input tone controls.
///
/// # Example
///
/// ```rust
/// use velour_modules::{AudioModule, EngineConfig, Reverb};
///
/// let mut reverb = Reverb::new(&EngineConfig::default()).unwrap();
/// reverb.set_sample_rate(48000);
/// reverb.activate();
///
/// let mut input = [0.0f32; 4096];
/// input[0] = 1.0;
/// let mut left = [0.0f32; 4096];
/// let mut right = [0.0f32; 4096];
/// let mut outs: [&mut [f32]; 2] = [&mut left, &mut right];
/// let mask = reverb.process(&[&input[..], &input[..]], &mut outs, 0, 4096, 0b11, 0b11);
/// assert_eq!(mask, 0b11);
/// ```
#[derive(Debug)]
pub struct Reverb {
    params: Arc<ParamBank>,
    config: EngineConfig,
    lifecycle: LifecycleState,
    sample_rate: u32,
    tanks: [Tank; 2],
    predelay: DelayBuffer,
    predelay_samples: usize,
    bass_cut: OnePole,
    treble_cut: OnePole,
    amount: GainSmoothing,
    dry: GainSmoothing,
    wet_meter: LevelMeter,
    out_meter: LevelMeter,
}

impl Reverb {
    /// Index of the decay time parameter.
    pub const DECAY: usize = 0;
    /// Index of the high frequency damping parameter.
    pub const HF_DAMP: usize = 1;
    /// Index of the room size parameter.
    pub const ROOM_SIZE: usize = 2;
    /// Index of the diffusion parameter.
    pub const DIFFUSION: usize = 3;
    /// Index of the wet amount parameter.
    pub const AMOUNT: usize = 4;
    /// Index of the dry amount parameter.
    pub const DRY: usize = 5;
    /// Index of the pre-delay parameter.
    pub const PREDELAY: usize = 6;
    /// Index of the bass cut parameter.
    pub const BASS_CUT: usize = 7;
    /// Index of the treble cut parameter.
    pub const TREBLE_CUT: usize = 8;
    /// Index of the wet level meter.
    pub const METER_WET: usize = 9;
    /// Index of the output level meter.
    pub const METER_OUT: usize = 10;
    /// Index of the clip indicator.
    pub const CLIP: usize = 11;

    /// Creates an inactive reverb, reserving tank memory for the
    /// configured maximum sample rate and the largest room.
    pub fn new(config: &EngineConfig) -> Result<Self, ModuleError> {
        config.validate()?;
        let max_rate = config.max_sample_rate;
        let tanks = [Tank::try_new(0, max_rate)?, Tank::try_new(STEREO_SPREAD, max_rate)?];
        let predelay_capacity = ms_to_samples(MAX_PREDELAY_MS, max_rate as f32) as usize + 1;
        let predelay = DelayBuffer::try_new(predelay_capacity)
            .map_err(|e| ModuleError::allocation("reverb pre-delay", predelay_capacity, e))?;
        tracing::debug!(max_rate, predelay_capacity, "reverb memory reserved");

        let sample_rate = 44100;
        let mut reverb = Self {
            params: Arc::new(ParamBank::new(&REVERB_PARAMS)),
            config: config.clone(),
            lifecycle: LifecycleState::Inactive,
            sample_rate,
            tanks,
            predelay,
            predelay_samples: 0,
            bass_cut: OnePole::highpass(sample_rate as f32, 300.0),
            treble_cut: OnePole::lowpass(sample_rate as f32, 5000.0),
            amount: GainSmoothing::linear(0, 0.0),
            dry: GainSmoothing::linear(0, 0.0),
            wet_meter: LevelMeter::new(sample_rate),
            out_meter: LevelMeter::new(sample_rate),
        };
        reverb.set_sample_rate(sample_rate);
        reverb.params_changed();
        reverb.amount.snap_to_target();
        reverb.dry.snap_to_target();
        Ok(reverb)
    }

    /// Pre-delay in samples at the current sample rate.
    pub fn predelay_samples(&self) -> usize {
        self.predelay_samples
    }

    /// Feedback of the first left comb, for inspection.
    pub fn comb_feedback(&self) -> f32 {
        self.tanks[0].combs[0].feedback()
    }

    /// Loop length of the first left comb, for inspection.
    pub fn comb_length(&self) -> usize {
        self.tanks[0].combs[0].length()
    }

    fn clear(&mut self) {
        for tank in &mut self.tanks {
            tank.clear();
        }
        self.predelay.clear();
        self.bass_cut.reset();
        self.treble_cut.reset();
        self.wet_meter.reset();
        self.out_meter.reset();
    }
}

impl AudioModule for Reverb {
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
        self.bass_cut.set_sample_rate(sr);
        self.treble_cut.set_sample_rate(sr);
        self.amount.set_time(self.config.gain_smoothing_ms, sr);
        self.dry.set_time(self.config.gain_smoothing_ms, sr);
        self.wet_meter.set_sample_rate(self.sample_rate);
        self.out_meter.set_sample_rate(self.sample_rate);
        tracing::debug!(sample_rate = self.sample_rate, "reverb sample rate set");
    }

    fn activate(&mut self) {
        self.params_changed();
        self.amount.snap_to_target();
        self.dry.snap_to_target();
        self.clear();
        self.lifecycle = LifecycleState::Active;
        tracing::debug!(
            room = self.params.get_int(Self::ROOM_SIZE),
            decay = self.params.get(Self::DECAY),
            "reverb activated"
        );
    }

    fn deactivate(&mut self) {
        self.lifecycle = LifecycleState::Inactive;
        tracing::debug!("reverb deactivated");
    }

    fn params_changed(&mut self) {
        let p = Arc::clone(&self.params);
        let sr = self.sample_rate as f32;
        let room = (p.get_int(Self::ROOM_SIZE).max(0) as usize).min(ROOM_SCALES.len() - 1);
        let scale = ROOM_SCALES[room];
        let damp = libm::expf(-std::f32::consts::TAU * p.get(Self::HF_DAMP) / sr);
        let decay = p.get(Self::DECAY);
        let diffusion = p.get(Self::DIFFUSION);
        for tank in &mut self.tanks {
            tank.tune(sr, scale, decay, damp, diffusion);
        }

        let predelay = round_half_away(ms_to_samples(p.get(Self::PREDELAY), sr)) as usize;
        self.predelay_samples = predelay.min(self.predelay.max_delay());
        self.bass_cut.set_frequency(p.get(Self::BASS_CUT).min(0.49 * sr));
        self.treble_cut.set_frequency(p.get(Self::TREBLE_CUT).min(0.49 * sr));
        self.amount.set_target(p.get(Self::AMOUNT));
        self.dry.set_target(p.get(Self::DRY));
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

        for i in offset..end {
            let dry_l = in_l.map_or(0.0, |b| b[i]);
            let dry_r = in_r.map_or(0.0, |b| b[i]);
            let mono = (dry_l + dry_r) * 0.5;

            let delayed = if self.predelay_samples == 0 {
                mono
            } else {
                self.predelay.read(self.predelay_samples)
            };
            self.predelay.write(mono);

            let feed = self.treble_cut.process(self.bass_cut.process(delayed));
            let amount = self.amount.get();
            let wet_l = self.tanks[0].process(feed) * amount;
            let wet_r = self.tanks[1].process(feed) * amount;
            self.wet_meter.update_stereo(wet_l, wet_r);

            let dry = self.dry.get();
            let l = dry_l * dry + wet_l;
            let r = dry_r * dry + wet_r;
            self.out_meter.update_stereo(l, r);
            out.write(i, [l, r]);
        }

        self.wet_meter.publish(&self.params, Self::METER_WET, None);
        self.out_meter
            .publish(&self.params, Self::METER_OUT, Some(Self::CLIP));

        out.audible()
    }
}
