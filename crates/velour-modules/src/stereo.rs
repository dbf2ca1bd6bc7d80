//! Stereo image utility: mid/side routing, balance and width.

use std::sync::Arc;

use velour_core::{ParamDescriptor, ParamFlags, ParamId, ParamScale, ParamUnit, atan_clip};

use crate::config::EngineConfig;
use crate::error::ModuleError;
use crate::meters::CorrelationMeter;
use crate::module::{AudioModule, LifecycleState, StereoWriter, block_end, channel_input};
use crate::params::ParamBank;
use crate::stereo_tools::{
    MAX_CHANNEL_DELAY_MS, MeterSlot, StageSettings, StereoStage, balance_gains,
};

/// Labels of the routing parameter.
pub const ROUTING_LABELS: [&str; 7] = [
    "LR > LR (Stereo Default)",
    "LR > MS (Stereo to Mid-Side)",
    "MS > LR (Mid-Side to Stereo)",
    "LR > LL (Mono Left Channel)",
    "LR > RR (Mono Right Channel)",
    "LR > L+R (Mono Sum L+R)",
    "LR > RL (Stereo Flip Channels)",
];

/// How the input pair is mapped onto the output pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Routing {
    /// Stereo through a mid/side matrix with level and pan controls.
    #[default]
    Stereo,
    /// Encode left/right to mid/side.
    StereoToMidSide,
    /// Decode mid/side to left/right.
    MidSideToStereo,
    /// Left on both sides.
    LeftOnly,
    /// Right on both sides.
    RightOnly,
    /// Mono sum on both sides.
    MonoSum,
    /// Left and right swapped.
    Swap,
}

impl Routing {
    /// Maps a parameter index to a routing; out-of-range indices give `Stereo`.
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Routing::StereoToMidSide,
            2 => Routing::MidSideToStereo,
            3 => Routing::LeftOnly,
            4 => Routing::RightOnly,
            5 => Routing::MonoSum,
            6 => Routing::Swap,
            _ => Routing::Stereo,
        }
    }
}

/// Parameter table of [`Stereo`].
pub static STEREO_PARAMS: [ParamDescriptor; 28] = [
    ParamDescriptor::toggle("Bypass", "Bypass", false).with_id(ParamId(600), "st_bypass"),
    ParamDescriptor::gain("Input Gain", "LvlIn", 0.015625, 64.0, 1.0)
        .with_id(ParamId(601), "st_level_in"),
    ParamDescriptor::gain("Output Gain", "LvlOut", 0.015625, 64.0, 1.0)
        .with_id(ParamId(602), "st_level_out"),
    ParamDescriptor::float("Balance In", "BalIn", -1.0, 1.0, 0.0)
        .with_id(ParamId(603), "st_balance_in"),
    ParamDescriptor::float("Balance Out", "BalOut", -1.0, 1.0, 0.0)
        .with_id(ParamId(604), "st_balance_out"),
    ParamDescriptor::toggle("Softclip", "SClip", false).with_id(ParamId(605), "st_softclip"),
    ParamDescriptor::float("Softclip Drive", "SCDrive", 0.1, 16.0, 1.0)
        .with_scale(ParamScale::Logarithmic)
        .with_id(ParamId(606), "st_sc_level"),
    ParamDescriptor::toggle("Mute L", "MuteL", false).with_id(ParamId(607), "st_mute_l"),
    ParamDescriptor::toggle("Mute R", "MuteR", false).with_id(ParamId(608), "st_mute_r"),
    ParamDescriptor::toggle("Phase L", "PhaseL", false).with_id(ParamId(609), "st_phase_l"),
    ParamDescriptor::toggle("Phase R", "PhaseR", false).with_id(ParamId(610), "st_phase_r"),
    ParamDescriptor::enumeration("Mode", "Mode", &ROUTING_LABELS, 0)
        .with_id(ParamId(611), "st_mode"),
    ParamDescriptor::gain("Side Level", "SLev", 0.015625, 64.0, 1.0)
        .with_id(ParamId(612), "st_side_level"),
    ParamDescriptor::float("Side Balance", "SBal", -1.0, 1.0, 0.0)
        .with_id(ParamId(613), "st_side_balance"),
    ParamDescriptor::gain("Mid Level", "MLev", 0.015625, 64.0, 1.0)
        .with_id(ParamId(614), "st_mid_level"),
    ParamDescriptor::float("Mid Pan", "MPan", -1.0, 1.0, 0.0).with_id(ParamId(615), "st_mid_pan"),
    ParamDescriptor::float("Stereo Base", "Base", -1.0, 1.0, 0.0)
        .with_id(ParamId(616), "st_stereo_base"),
    ParamDescriptor::float("Delay", "Delay", -MAX_CHANNEL_DELAY_MS, MAX_CHANNEL_DELAY_MS, 0.0)
        .with_unit(ParamUnit::Milliseconds)
        .with_id(ParamId(617), "st_delay"),
    ParamDescriptor::float("Stereo Phase", "SPhase", 0.0, 360.0, 0.0)
        .with_unit(ParamUnit::Degrees)
        .with_id(ParamId(618), "st_stereo_phase"),
    ParamDescriptor::meter("Input Level L", "MtrInL", 1.0).with_id(ParamId(619), "st_meter_in_l"),
    ParamDescriptor::meter("Input Level R", "MtrInR", 1.0).with_id(ParamId(620), "st_meter_in_r"),
    ParamDescriptor::meter("Output Level L", "MtrOutL", 1.0)
        .with_id(ParamId(621), "st_meter_out_l"),
    ParamDescriptor::meter("Output Level R", "MtrOutR", 1.0)
        .with_id(ParamId(622), "st_meter_out_r"),
    ParamDescriptor::indicator("Clip In L", "ClipInL").with_id(ParamId(623), "st_clip_in_l"),
    ParamDescriptor::indicator("Clip In R", "ClipInR").with_id(ParamId(624), "st_clip_in_r"),
    ParamDescriptor::indicator("Clip Out L", "ClipOutL").with_id(ParamId(625), "st_clip_out_l"),
    ParamDescriptor::indicator("Clip Out R", "ClipOutR").with_id(ParamId(626), "st_clip_out_r"),
    ParamDescriptor::float("Phase Correlation", "Corr", -1.0, 1.0, 0.0)
        .with_flags(ParamFlags::READ_ONLY)
        .with_id(ParamId(627), "st_correlation"),
];

#[derive(Debug, Clone, Copy)]
struct MidSide {
    mid: [f32; 2],
    side: [f32; 2],
    mid_level: f32,
    side_level: f32,
}

impl MidSide {
    fn new(mid_level: f32, mid_pan: f32, side_level: f32, side_balance: f32) -> Self {
        let mid = balance_gains(mid_pan.clamp(-1.0, 1.0));
        let side = balance_gains(side_balance.clamp(-1.0, 1.0));
        Self {
            mid: [mid[0] * mid_level, mid[1] * mid_level],
            side: [side[0] * side_level, side[1] * side_level],
            mid_level,
            side_level,
        }
    }

    #[inline]
    fn route(&self, routing: Routing, l: f32, r: f32) -> [f32; 2] {
        match routing {
            Routing::Stereo => {
                let m = (l + r) * 0.5;
                let s = (l - r) * 0.5;
                [m * self.mid[0] + s * self.side[0], m * self.mid[1] - s * self.side[1]]
            }
            Routing::StereoToMidSide => [
                (l + r) * 0.5 * self.mid_level,
                (l - r) * 0.5 * self.side_level,
            ],
            Routing::MidSideToStereo => {
                let m = l * self.mid_level;
                let s = r * self.side_level;
                [m + s, m - s]
            }
            Routing::LeftOnly => [l, l],
            Routing::RightOnly => [r, r],
            Routing::MonoSum => {
                let sum = (l + r) * 0.5;
                [sum, sum]
            }
            Routing::Swap => [r, l],
        }
    }
}

/// Stereo imaging and routing utility.
///
/// # Example
///
/// ```rust
/// use velour_modules::{AudioModule, EngineConfig, Stereo};
///
/// let mut stereo = Stereo::new(&EngineConfig::default()).unwrap();
/// stereo.params().set(Stereo::MODE, 6.0); // swap
/// stereo.set_sample_rate(48000);
/// stereo.activate();
///
/// let left_in = [1.0f32; 4];
/// let right_in = [0.0f32; 4];
/// let mut left = [0.0f32; 4];
/// let mut right = [0.0f32; 4];
/// let mut outs: [&mut [f32]; 2] = [&mut left, &mut right];
/// stereo.process(&[&left_in[..], &right_in[..]], &mut outs, 0, 4, 0b11, 0b11);
/// assert_eq!(left[0], 0.0);
/// assert_eq!(right[0], 1.0);
/// ```
#[derive(Debug)]
pub struct Stereo {
    params: Arc<ParamBank>,
    config: EngineConfig,
    lifecycle: LifecycleState,
    sample_rate: u32,
    stage: StereoStage,
    bypass: bool,
    level_in: f32,
    balance_in: [f32; 2],
    softclip: Option<f32>,
    routing: Routing,
    mid_side: MidSide,
    meter_in: [MeterSlot; 2],
    meter_out: [MeterSlot; 2],
}

impl Stereo {
    /// Index of the bypass switch.
    pub const BYPASS: usize = 0;
    /// Index of the input gain.
    pub const LEVEL_IN: usize = 1;
    /// Index of the output gain.
    pub const LEVEL_OUT: usize = 2;
    /// Index of the input balance.
    pub const BALANCE_IN: usize = 3;
    /// Index of the output balance.
    pub const BALANCE_OUT: usize = 4;
    /// Index of the soft clip switch.
    pub const SOFTCLIP: usize = 5;
    /// Index of the soft clip drive.
    pub const SC_LEVEL: usize = 6;
    /// Index of the left mute switch.
    pub const MUTE_L: usize = 7;
    /// Index of the right mute switch.
    pub const MUTE_R: usize = 8;
    /// Index of the left polarity switch.
    pub const PHASE_L: usize = 9;
    /// Index of the right polarity switch.
    pub const PHASE_R: usize = 10;
    /// Index of the routing mode.
    pub const MODE: usize = 11;
    /// Index of the side level.
    pub const SIDE_LEVEL: usize = 12;
    /// Index of the side balance.
    pub const SIDE_BALANCE: usize = 13;
    /// Index of the mid level.
    pub const MID_LEVEL: usize = 14;
    /// Index of the mid pan.
    pub const MID_PAN: usize = 15;
    /// Index of the stereo base.
    pub const STEREO_BASE: usize = 16;
    /// Index of the inter-channel delay.
    pub const DELAY: usize = 17;
    /// Index of the stereo phase rotation.
    pub const STEREO_PHASE: usize = 18;
    /// Index of the left input meter.
    pub const METER_IN_L: usize = 19;
    /// Index of the right input meter.
    pub const METER_IN_R: usize = 20;
    /// Index of the left output meter.
    pub const METER_OUT_L: usize = 21;
    /// Index of the right output meter.
    pub const METER_OUT_R: usize = 22;
    /// Index of the left input clip indicator.
    pub const CLIP_IN_L: usize = 23;
    /// Index of the right input clip indicator.
    pub const CLIP_IN_R: usize = 24;
    /// Index of the left output clip indicator.
    pub const CLIP_OUT_L: usize = 25;
    /// Index of the right output clip indicator.
    pub const CLIP_OUT_R: usize = 26;
    /// Index of the phase correlation meter.
    pub const CORRELATION: usize = 27;

    /// Creates an inactive utility with neutral settings.
    pub fn new(config: &EngineConfig) -> Result<Self, ModuleError> {
        config.validate()?;
        let mut stereo = Self {
            params: Arc::new(ParamBank::new(&STEREO_PARAMS)),
            config: config.clone(),
            lifecycle: LifecycleState::Inactive,
            sample_rate: 44100,
            stage: StereoStage::try_new(config)?,
            bypass: false,
            level_in: 1.0,
            balance_in: [1.0; 2],
            softclip: None,
            routing: Routing::default(),
            mid_side: MidSide::new(1.0, 0.0, 1.0, 0.0),
            meter_in: [
                MeterSlot::new(Self::METER_IN_L, Self::CLIP_IN_L),
                MeterSlot::new(Self::METER_IN_R, Self::CLIP_IN_R),
            ],
            meter_out: [
                MeterSlot::new(Self::METER_OUT_L, Self::CLIP_OUT_L),
                MeterSlot::new(Self::METER_OUT_R, Self::CLIP_OUT_R),
            ],
        };
        stereo.params_changed();
        Ok(stereo)
    }

    /// Current routing.
    pub fn routing(&self) -> Routing {
        self.routing
    }

    fn meters_mut(&mut self) -> impl Iterator<Item = &mut MeterSlot> {
        self.meter_in.iter_mut().chain(self.meter_out.iter_mut())
    }
}

impl AudioModule for Stereo {
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
        let sr = self.sample_rate;
        for slot in self.meters_mut() {
            slot.meter.set_sample_rate(sr);
        }
        self.params_changed();
        tracing::debug!(sample_rate = sr, "stereo sample rate set");
    }

    fn activate(&mut self) {
        self.params_changed();
        self.stage.clear();
        for slot in self.meters_mut() {
            slot.meter.reset();
        }
        self.params.publish(Self::CORRELATION, 0.0);
        self.lifecycle = LifecycleState::Active;
        tracing::debug!(routing = ?self.routing, "stereo activated");
    }

    fn deactivate(&mut self) {
        self.lifecycle = LifecycleState::Inactive;
        tracing::debug!("stereo deactivated");
    }

    fn params_changed(&mut self) {
        let p = &self.params;
        self.bypass = p.get_bool(Self::BYPASS);
        self.level_in = p.get(Self::LEVEL_IN);
        self.balance_in = balance_gains(p.get(Self::BALANCE_IN));
        self.softclip = p
            .get_bool(Self::SOFTCLIP)
            .then(|| p.get(Self::SC_LEVEL));
        self.routing = Routing::from_index(p.get_int(Self::MODE));
        self.mid_side = MidSide::new(
            p.get(Self::MID_LEVEL),
            p.get(Self::MID_PAN),
            p.get(Self::SIDE_LEVEL),
            p.get(Self::SIDE_BALANCE),
        );
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
        let end = block_end(ins, 2, outs, 2, offset, numsamples);
        let in_l = channel_input(ins, 0, inputs_mask);
        let in_r = channel_input(ins, 1, inputs_mask);
        let Some(mut out) = StereoWriter::new(outs, outputs_mask) else {
            return 0;
        };
        let mut correlation = CorrelationMeter::default();

        for i in offset..end {
            let dry_l = in_l.map_or(0.0, |b| b[i]);
            let dry_r = in_r.map_or(0.0, |b| b[i]);
            let [l, r] = if self.bypass {
                self.meter_in[0].meter.update(dry_l);
                self.meter_in[1].meter.update(dry_r);
                [dry_l, dry_r]
            } else {
                let mut l = dry_l * self.level_in * self.balance_in[0];
                let mut r = dry_r * self.level_in * self.balance_in[1];
                if let Some(drive) = self.softclip {
                    l = atan_clip(l, drive);
                    r = atan_clip(r, drive);
                }
                self.meter_in[0].meter.update(l);
                self.meter_in[1].meter.update(r);
                let routed = self.mid_side.route(self.routing, l, r);
                self.stage.process(routed)
            };
            self.meter_out[0].meter.update(l);
            self.meter_out[1].meter.update(r);
            correlation.update(l, r);
            out.write(i, [l, r]);
        }

        for slot in self.meter_in.iter().chain(&self.meter_out) {
            slot.publish(&self.params);
        }
        if offset < end {
            self.params.publish(Self::CORRELATION, correlation.value());
        }

        out.audible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> Stereo {
        let mut stereo = Stereo::new(&EngineConfig::default()).unwrap();
        stereo.set_sample_rate(48000);
        stereo.activate();
        stereo
    }

    fn run(stereo: &mut Stereo, left: &[f32], right: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![0.0f32; left.len()];
        let mut r = vec![0.0f32; left.len()];
        let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
        stereo.process(&[left, right], &mut outs, 0, left.len(), 0b11, 0b11);
        (l, r)
    }

    fn set_mode(stereo: &mut Stereo, routing: Routing) {
        let index = match routing {
            Routing::Stereo => 0.0,
            Routing::StereoToMidSide => 1.0,
            Routing::MidSideToStereo => 2.0,
            Routing::LeftOnly => 3.0,
            Routing::RightOnly => 4.0,
            Routing::MonoSum => 5.0,
            Routing::Swap => 6.0,
        };
        stereo.params().set(Stereo::MODE, index);
        stereo.params_changed();
        assert_eq!(stereo.routing(), routing);
    }

    #[test]
    fn test_default_is_identity() {
        let mut stereo = active();
        let (l, r) = run(&mut stereo, &[0.5, -0.25], &[0.1, 0.3]);
        for (a, b) in l.iter().zip([0.5, -0.25]) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in r.iter().zip([0.1, 0.3]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mid_side_round_trip() {
        let mut encode = active();
        set_mode(&mut encode, Routing::StereoToMidSide);
        let (m, s) = run(&mut encode, &[0.8], &[0.2]);
        assert!((m[0] - 0.5).abs() < 1e-6);
        assert!((s[0] - 0.3).abs() < 1e-6);

        let mut decode = active();
        set_mode(&mut decode, Routing::MidSideToStereo);
        let (l, r) = run(&mut decode, &m, &s);
        assert!((l[0] - 0.8).abs() < 1e-6);
        assert!((r[0] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_mono_routings() {
        let mut stereo = active();
        set_mode(&mut stereo, Routing::LeftOnly);
        assert_eq!(run(&mut stereo, &[0.4], &[0.2]), (vec![0.4], vec![0.4]));
        set_mode(&mut stereo, Routing::RightOnly);
        assert_eq!(run(&mut stereo, &[0.4], &[0.2]), (vec![0.2], vec![0.2]));
        set_mode(&mut stereo, Routing::MonoSum);
        let (l, r) = run(&mut stereo, &[0.4], &[0.2]);
        assert!((l[0] - 0.3).abs() < 1e-6);
        assert_eq!(l, r);
    }

    #[test]
    fn test_side_level_zero_collapses_image() {
        let mut stereo = active();
        stereo.params().set(Stereo::SIDE_LEVEL, 0.0);
        stereo.params_changed();
        // Clamped to the parameter minimum, so a sliver of side remains.
        let (l, r) = run(&mut stereo, &[1.0], &[0.0]);
        assert!((l[0] - r[0]).abs() < 0.02);
    }

    #[test]
    fn test_input_balance() {
        let mut stereo = active();
        stereo.params().set(Stereo::BALANCE_IN, -1.0);
        stereo.params_changed();
        let (l, r) = run(&mut stereo, &[0.5], &[0.5]);
        assert!((l[0] - 0.5).abs() < 1e-6);
        assert_eq!(r[0], 0.0);
    }

    #[test]
    fn test_correlation_meter() {
        let mut stereo = active();
        let signal: Vec<f32> = (0..256).map(|i| (i as f32 * 0.1).sin()).collect();
        run(&mut stereo, &signal, &signal);
        assert!((stereo.params().get(Stereo::CORRELATION) - 1.0).abs() < 1e-4);

        let inverted: Vec<f32> = signal.iter().map(|s| -s).collect();
        run(&mut stereo, &signal, &inverted);
        assert!((stereo.params().get(Stereo::CORRELATION) + 1.0).abs() < 1e-4);
    }
}
