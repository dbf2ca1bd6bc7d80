//! Mono-to-stereo utility.

use std::sync::Arc;

use velour_core::{ParamDescriptor, ParamId, ParamScale, ParamUnit, atan_clip};

use crate::config::EngineConfig;
use crate::error::ModuleError;
use crate::module::{AudioModule, LifecycleState, StereoWriter, block_end, channel_input};
use crate::params::ParamBank;
use crate::stereo_tools::{MAX_CHANNEL_DELAY_MS, MeterSlot, StageSettings, StereoStage};

/// Parameter table of [`Mono`].
pub static MONO_PARAMS: [ParamDescriptor; 19] = [
    ParamDescriptor::toggle("Bypass", "Bypass", false).with_id(ParamId(500), "mono_bypass"),
    ParamDescriptor::gain("Input Gain", "LvlIn", 0.015625, 64.0, 1.0)
        .with_id(ParamId(501), "mono_level_in"),
    ParamDescriptor::gain("Output Gain", "LvlOut", 0.015625, 64.0, 1.0)
        .with_id(ParamId(502), "mono_level_out"),
    ParamDescriptor::toggle("Softclip", "SClip", false).with_id(ParamId(503), "mono_softclip"),
    ParamDescriptor::float("Softclip Drive", "SCDrive", 0.1, 16.0, 1.0)
        .with_scale(ParamScale::Logarithmic)
        .with_id(ParamId(504), "mono_sc_level"),
    ParamDescriptor::toggle("Mute L", "MuteL", false).with_id(ParamId(505), "mono_mute_l"),
    ParamDescriptor::toggle("Mute R", "MuteR", false).with_id(ParamId(506), "mono_mute_r"),
    ParamDescriptor::toggle("Phase L", "PhaseL", false).with_id(ParamId(507), "mono_phase_l"),
    ParamDescriptor::toggle("Phase R", "PhaseR", false).with_id(ParamId(508), "mono_phase_r"),
    ParamDescriptor::float("Delay", "Delay", -MAX_CHANNEL_DELAY_MS, MAX_CHANNEL_DELAY_MS, 0.0)
        .with_unit(ParamUnit::Milliseconds)
        .with_id(ParamId(509), "mono_delay"),
    ParamDescriptor::float("Stereo Base", "Base", -1.0, 1.0, 0.0)
        .with_id(ParamId(510), "mono_stereo_base"),
    ParamDescriptor::float("Stereo Phase", "SPhase", 0.0, 360.0, 0.0)
        .with_unit(ParamUnit::Degrees)
        .with_id(ParamId(511), "mono_stereo_phase"),
    ParamDescriptor::float("Balance Out", "BalOut", -1.0, 1.0, 0.0)
        .with_id(ParamId(512), "mono_balance_out"),
    ParamDescriptor::meter("Input Level", "MtrIn", 1.0).with_id(ParamId(513), "mono_meter_in"),
    ParamDescriptor::meter("Output Level L", "MtrOutL", 1.0)
        .with_id(ParamId(514), "mono_meter_out_l"),
    ParamDescriptor::meter("Output Level R", "MtrOutR", 1.0)
        .with_id(ParamId(515), "mono_meter_out_r"),
    ParamDescriptor::indicator("Clip In", "ClipIn").with_id(ParamId(516), "mono_clip_in"),
    ParamDescriptor::indicator("Clip Out L", "ClipOutL").with_id(ParamId(517), "mono_clip_out_l"),
    ParamDescriptor::indicator("Clip Out R", "ClipOutR").with_id(ParamId(518), "mono_clip_out_r"),
];

/// Spreads a mono input over a stereo pair.
///
/// # Example
///
/// ```rust
/// use velour_modules::{AudioModule, EngineConfig, Mono};
///
/// let mut mono = Mono::new(&EngineConfig::default()).unwrap();
/// mono.params().set(Mono::PHASE_R, 1.0);
/// mono.set_sample_rate(48000);
/// mono.activate();
///
/// let input = [0.5f32; 8];
/// let mut left = [0.0f32; 8];
/// let mut right = [0.0f32; 8];
/// let mut outs: [&mut [f32]; 2] = [&mut left, &mut right];
/// mono.process(&[&input[..]], &mut outs, 0, 8, 1, 0b11);
/// assert_eq!(left[0], 0.5);
/// assert_eq!(right[0], -0.5);
/// ```
#[derive(Debug)]
pub struct Mono {
    params: Arc<ParamBank>,
    config: EngineConfig,
    lifecycle: LifecycleState,
    sample_rate: u32,
    stage: StereoStage,
    bypass: bool,
    level_in: f32,
    softclip: Option<f32>,
    meter_in: MeterSlot,
    meter_out: [MeterSlot; 2],
}

impl Mono {
    /// Index of the bypass switch.
    pub const BYPASS: usize = 0;
    /// Index of the input gain.
    pub const LEVEL_IN: usize = 1;
    /// Index of the output gain.
    pub const LEVEL_OUT: usize = 2;
    /// Index of the soft clip switch.
    pub const SOFTCLIP: usize = 3;
    /// Index of the soft clip drive.
    pub const SC_LEVEL: usize = 4;
    /// Index of the left mute switch.
    pub const MUTE_L: usize = 5;
    /// Index of the right mute switch.
    pub const MUTE_R: usize = 6;
    /// Index of the left polarity switch.
    pub const PHASE_L: usize = 7;
    /// Index of the right polarity switch.
    pub const PHASE_R: usize = 8;
    /// Index of the inter-channel delay.
    pub const DELAY: usize = 9;
    /// Index of the stereo base.
    pub const STEREO_BASE: usize = 10;
    /// Index of the stereo phase rotation.
    pub const STEREO_PHASE: usize = 11;
    /// Index of the output balance.
    pub const BALANCE_OUT: usize = 12;
    /// Index of the input level meter.
    pub const METER_IN: usize = 13;
    /// Index of the left output meter.
    pub const METER_OUT_L: usize = 14;
    /// Index of the right output meter.
    pub const METER_OUT_R: usize = 15;
    /// Index of the input clip indicator.
    pub const CLIP_IN: usize = 16;
    /// Index of the left output clip indicator.
    pub const CLIP_OUT_L: usize = 17;
    /// Index of the right output clip indicator.
    pub const CLIP_OUT_R: usize = 18;

    /// Creates an inactive utility with neutral settings.
    pub fn new(config: &EngineConfig) -> Result<Self, ModuleError> {
        config.validate()?;
        let mut mono = Self {
            params: Arc::new(ParamBank::new(&MONO_PARAMS)),
            config: config.clone(),
            lifecycle: LifecycleState::Inactive,
            sample_rate: 44100,
            stage: StereoStage::try_new(config)?,
            bypass: false,
            level_in: 1.0,
            softclip: None,
            meter_in: MeterSlot::new(Self::METER_IN, Self::CLIP_IN),
            meter_out: [
                MeterSlot::new(Self::METER_OUT_L, Self::CLIP_OUT_L),
                MeterSlot::new(Self::METER_OUT_R, Self::CLIP_OUT_R),
            ],
        };
        mono.params_changed();
        Ok(mono)
    }

    fn meters_mut(&mut self) -> [&mut MeterSlot; 3] {
        let [l, r] = &mut self.meter_out;
        [&mut self.meter_in, l, r]
    }
}

impl AudioModule for Mono {
    fn input_count(&self) -> usize {
        1
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
        let sr = self.sample_rate;
        for slot in self.meters_mut() {
            slot.meter.set_sample_rate(sr);
        }
        self.params_changed();
        tracing::debug!(sample_rate = sr, "mono sample rate set");
    }

    fn activate(&mut self) {
        self.params_changed();
        self.stage.clear();
        for slot in self.meters_mut() {
            slot.meter.reset();
        }
        self.lifecycle = LifecycleState::Active;
        tracing::debug!("mono activated");
    }

    fn deactivate(&mut self) {
        self.lifecycle = LifecycleState::Inactive;
        tracing::debug!("mono deactivated");
    }

    fn params_changed(&mut self) {
        let p = &self.params;
        self.bypass = p.get_bool(Self::BYPASS);
        self.level_in = p.get(Self::LEVEL_IN);
        self.softclip = p
            .get_bool(Self::SOFTCLIP)
            .then(|| p.get(Self::SC_LEVEL));
        let settings = StageSettings {
            mute: [p.get_bool(Self::MUTE_L), p.get_bool(Self::MUTE_R)],
            invert: [p.get_bool(Self::PHASE_L), p.get_bool(Self::PHASE_R)],
            delay_ms: p.get(Self::DELAY),
            base: p.get(Self::STEREO_BASE),
            phase_degrees: p.get(Self::STEREO_PHASE),
            balance: p.get(Self::BALANCE_OUT),
            level: p.get(Self::LEVEL_OUT),
        };
        self.stage.configure(&settings, self.sample_rate as f32);
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
        let end = block_end(ins, 1, outs, 2, offset, numsamples);
        let input = channel_input(ins, 0, inputs_mask);
        let Some(mut out) = StereoWriter::new(outs, outputs_mask) else {
            return 0;
        };

        for i in offset..end {
            let dry = input.map_or(0.0, |b| b[i]);
            let [l, r] = if self.bypass {
                self.meter_in.meter.update(dry);
                [dry, dry]
            } else {
                let mut x = dry * self.level_in;
                if let Some(drive) = self.softclip {
                    x = atan_clip(x, drive);
                }
                self.meter_in.meter.update(x);
                self.stage.process([x, x])
            };
            self.meter_out[0].meter.update(l);
            self.meter_out[1].meter.update(r);
            out.write(i, [l, r]);
        }

        self.meter_in.publish(&self.params);
        for slot in &self.meter_out {
            slot.publish(&self.params);
        }

        out.audible()
    }
}
