//! Resonant multimode filter with smoothed cutoff and resonance.

use std::sync::Arc;

use velour_core::{
    FILTER_MODE_LABELS, FilterCore, FilterMode, ParamDescriptor, ParamId, ParamScale,
};

use crate::config::EngineConfig;
use crate::driver::ModuleDriver;
use crate::error::ModuleError;
use crate::module::{AudioModule, LifecycleState};
use crate::params::ParamBank;

/// Parameter table of [`FilterModule`].
pub static FILTER_PARAMS: [ParamDescriptor; 4] = [
    ParamDescriptor::frequency("Frequency", "Freq", 10.0, 20000.0, 2000.0)
        .with_id(ParamId(100), "flt_cutoff"),
    ParamDescriptor::float("Resonance", "Res", 0.707, 32.0, 0.707)
        .with_scale(ParamScale::Logarithmic)
        .with_id(ParamId(101), "flt_resonance"),
    ParamDescriptor::enumeration("Mode", "Mode", &FILTER_MODE_LABELS, 0)
        .with_id(ParamId(102), "flt_mode"),
    ParamDescriptor::integer("Inertia", "Inertia", 0.0, 100.0, 20.0)
        .with_id(ParamId(103), "flt_inertia"),
];

/// Stereo multimode filter.
///
/// Cutoff and resonance glide over `inertia` recompute ticks (one tick per
/// millisecond by default) so automation never clicks.
///
/// # Parameters
///
/// - `Frequency`: 10-20000 Hz, default 2000
/// - `Resonance`: 0.707-32, default 0.707
/// - `Mode`: one of the twelve [`FilterMode`]s, default 12 dB low-pass
/// - `Inertia`: 0-100 ticks, default 20
///
/// # Example
///
/// ```rust
/// use velour_modules::{AudioModule, EngineConfig, FilterModule};
///
/// let mut filter = FilterModule::new(&EngineConfig::default()).unwrap();
/// filter.params().set(FilterModule::CUTOFF, 500.0);
/// filter.set_sample_rate(48000);
/// filter.activate();
///
/// let input = [0.25f32; 64];
/// let mut left = [0.0f32; 64];
/// let mut right = [0.0f32; 64];
/// let mut outs: [&mut [f32]; 2] = [&mut left, &mut right];
/// let mask = filter.process(&[&input[..], &input[..]], &mut outs, 0, 64, 0b11, 0b11);
/// assert_eq!(mask, 0b11);
/// ```
#[derive(Debug)]
pub struct FilterModule {
    driver: ModuleDriver<FilterCore>,
    params: Arc<ParamBank>,
    config: EngineConfig,
}

impl FilterModule {
    /// Index of the cutoff parameter.
    pub const CUTOFF: usize = 0;
    /// Index of the resonance parameter.
    pub const RESONANCE: usize = 1;
    /// Index of the mode parameter.
    pub const MODE: usize = 2;
    /// Index of the inertia parameter.
    pub const INERTIA: usize = 3;

    /// Creates an inactive filter with default parameters.
    pub fn new(config: &EngineConfig) -> Result<Self, ModuleError> {
        config.validate()?;
        Ok(Self {
            driver: ModuleDriver::new(FilterCore::new(44100), config),
            params: Arc::new(ParamBank::new(&FILTER_PARAMS)),
            config: config.clone(),
        })
    }

    /// The processing loop, for inspection.
    pub fn driver(&self) -> &ModuleDriver<FilterCore> {
        &self.driver
    }

    /// Mode of the current coefficient set.
    pub fn mode(&self) -> FilterMode {
        self.driver.kernel().mode()
    }
}

impl AudioModule for FilterModule {
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
        tracing::debug!(sample_rate, "filter sample rate set");
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
        let params = &self.params;
        self.driver.set_mode(params.get_int(Self::MODE));
        self.driver
            .set_inertia(params.get_int(Self::INERTIA).max(0) as u32);
        self.driver
            .cutoff_mut()
            .set_target(params.get(Self::CUTOFF));
        self.driver
            .resonance_mut()
            .set_target(params.get(Self::RESONANCE));
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
