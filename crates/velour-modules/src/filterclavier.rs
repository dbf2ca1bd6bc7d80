//! Note-controlled filter: the keyboard plays the cutoff.
//!
//! A note-on moves the cutoff to the note's pitch and the resonance to a
//! velocity-scaled value between the minimum and the `Max Resonance`
//! parameter. Band-pass modes also boost the gain with velocity so that a
//! narrow band stays audible. Releasing the last note returns resonance to
//! its minimum and gain to unity; the cutoff stays where it was.

use std::sync::Arc;

use velour_core::{
    FILTER_MODE_LABELS, FilterCore, FilterMode, ParamDescriptor, ParamId, ParamScale, ParamUnit,
    note_to_hz,
};

use crate::config::EngineConfig;
use crate::driver::ModuleDriver;
use crate::error::ModuleError;
use crate::module::{AudioModule, LifecycleState};
use crate::params::ParamBank;

/// Gain at velocity 0 and outside band-pass modes.
pub const MIN_GAIN: f32 = 1.0;

/// Gain at velocity 127 in 6 dB band-pass mode.
pub const MAX_GAIN: f32 = 32.0;

/// Parameter table of [`Filterclavier`].
pub static FILTERCLAVIER_PARAMS: [ParamDescriptor; 5] = [
    ParamDescriptor::integer("Transpose", "Transp", -48.0, 48.0, 0.0)
        .with_unit(ParamUnit::Semitones)
        .with_id(ParamId(200), "fcl_transpose"),
    ParamDescriptor::float("Detune", "Detune", -100.0, 100.0, 0.0)
        .with_unit(ParamUnit::Cents)
        .with_id(ParamId(201), "fcl_detune"),
    ParamDescriptor::float("Max Resonance", "MaxRes", 0.707, 32.0, 32.0)
        .with_scale(ParamScale::Logarithmic)
        .with_id(ParamId(202), "fcl_max_resonance"),
    ParamDescriptor::enumeration("Mode", "Mode", &FILTER_MODE_LABELS, 6)
        .with_id(ParamId(203), "fcl_mode"),
    ParamDescriptor::integer("Inertia", "Inertia", 0.0, 100.0, 20.0)
        .with_id(ParamId(204), "fcl_inertia"),
];

/// Keyboard-tracking stereo filter.
///
/// # Example
///
/// ```rust
/// use velour_modules::{AudioModule, EngineConfig, Filterclavier};
///
/// let mut fcl = Filterclavier::new(&EngineConfig::default()).unwrap();
/// fcl.set_sample_rate(48000);
/// fcl.activate();
/// fcl.note_on(69, 127);
/// assert_eq!(fcl.driver().cutoff_target(), 440.0);
/// ```
#[derive(Debug)]
pub struct Filterclavier {
    driver: ModuleDriver<FilterCore>,
    params: Arc<ParamBank>,
    config: EngineConfig,
    last_note: Option<u8>,
    last_velocity: u8,
}

impl Filterclavier {
    /// Index of the transpose parameter.
    pub const TRANSPOSE: usize = 0;
    /// Index of the detune parameter.
    pub const DETUNE: usize = 1;
    /// Index of the max resonance parameter.
    pub const MAX_RESONANCE: usize = 2;
    /// Index of the mode parameter.
    pub const MODE: usize = 3;
    /// Index of the inertia parameter.
    pub const INERTIA: usize = 4;

    /// Creates an inactive filterclavier with no note held.
    pub fn new(config: &EngineConfig) -> Result<Self, ModuleError> {
        config.validate()?;
        let mut driver = ModuleDriver::new(FilterCore::new(44100), config);
        driver.resonance_mut().set_now(Self::min_resonance());
        Ok(Self {
            driver,
            params: Arc::new(ParamBank::new(&FILTERCLAVIER_PARAMS)),
            config: config.clone(),
            last_note: None,
            last_velocity: 0,
        })
    }

    /// The processing loop, for inspection.
    pub fn driver(&self) -> &ModuleDriver<FilterCore> {
        &self.driver
    }

    /// Most recent note, if any was played.
    pub fn last_note(&self) -> Option<u8> {
        self.last_note
    }

    fn min_resonance() -> f32 {
        FILTERCLAVIER_PARAMS[Self::MAX_RESONANCE].min
    }

    fn note_frequency(&self, note: u8) -> f32 {
        let transpose = self.params.get(Self::TRANSPOSE);
        let detune = self.params.get(Self::DETUNE);
        note_to_hz(f32::from(note) + transpose, detune)
    }

    fn velocity_resonance(&self, velocity: u8) -> f32 {
        let min = Self::min_resonance();
        let max = self.params.get(Self::MAX_RESONANCE);
        f32::from(velocity) / 127.0 * (max - min + 0.001) + min
    }

    /// Sets the gain for the current mode: band-pass modes scale with
    /// velocity, everything else stays at unity.
    fn adjust_gain_for_mode(&mut self, velocity: u8) {
        let mode = FilterMode::from_index(self.params.get_int(Self::MODE));
        let gain = if mode.is_bandpass() {
            let mode_max = match mode {
                FilterMode::Bp12 => MAX_GAIN / 6.0,
                FilterMode::Bp18 => MAX_GAIN / 10.5,
                _ => MAX_GAIN,
            };
            f32::from(velocity) / 127.0 * (mode_max - MIN_GAIN) + MIN_GAIN
        } else {
            MIN_GAIN
        };
        self.driver.gain_mut().set_now(gain);
    }

    fn sync_driver_settings(&mut self) {
        self.driver.set_mode(self.params.get_int(Self::MODE));
        self.driver
            .set_inertia(self.params.get_int(Self::INERTIA).max(0) as u32);
    }
}

impl AudioModule for Filterclavier {
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
        self.driver.lifecycle()
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        let sample_rate = self.config.clamp_sample_rate(sample_rate);
        tracing::debug!(sample_rate, "filterclavier sample rate set");
        self.driver.set_sample_rate(sample_rate);
    }

    fn activate(&mut self) {
        self.params_changed();
        self.driver.activate();
    }

    fn deactivate(&mut self) {
        self.driver.deactivate();
    }

    fn params_changed(&mut self) {
        self.sync_driver_settings();
        if let Some(note) = self.last_note {
            let freq = self.note_frequency(note);
            self.driver.cutoff_mut().set_target(freq);
        }
        let resonance = self.velocity_resonance(self.last_velocity);
        self.driver.resonance_mut().set_target(resonance);
        self.adjust_gain_for_mode(self.last_velocity);
        self.driver.calculate();
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        let note = note.min(127);
        let velocity = velocity.min(127);
        self.last_note = Some(note);
        self.last_velocity = velocity;

        self.sync_driver_settings();
        let freq = self.note_frequency(note);
        self.driver.cutoff_mut().set_target(freq);
        let resonance = self.velocity_resonance(velocity);
        self.driver.resonance_mut().set_target(resonance);
        self.adjust_gain_for_mode(velocity);
        self.driver.calculate();
    }

    fn note_off(&mut self, note: u8, _velocity: u8) {
        if self.last_note != Some(note) {
            return;
        }
        self.driver
            .resonance_mut()
            .set_target(Self::min_resonance());
        self.driver.gain_mut().set_target(MIN_GAIN);
        self.last_velocity = 0;
        self.driver.calculate();
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
        self.driver
            .process(ins, outs, offset, numsamples, inputs_mask, outputs_mask)
    }
}
