//! Inertia-driven processing loop shared by the filter modules.
//!
//! A [`ModuleDriver`] owns a [`DspKernel`] plus three exponential inertias
//! (cutoff, resonance, gain) and a [`BlockScheduler`]. While any inertia is
//! moving, each host block is split at scheduler boundaries; at every
//! boundary the inertias advance one tick and the kernel recomputes its
//! coefficients. Once everything has settled the whole remainder of a block
//! is processed in one go.

use std::sync::Arc;

use velour_core::{
    BlockScheduler, DspKernel, ExponentialRamp, GenerationTag, Inertia, KernelControls,
    period_for,
};

use crate::config::EngineConfig;
use crate::module::{LifecycleState, block_end, channel_input};

/// Default inertia length in recompute ticks.
pub const DEFAULT_INERTIA: u32 = 20;

/// Orchestrates smoothing, recompute scheduling and a kernel.
///
/// # Example
///
/// ```rust
/// use velour_core::{FilterCore, FilterMode};
/// use velour_modules::{EngineConfig, ModuleDriver};
///
/// let mut driver = ModuleDriver::new(FilterCore::new(48000), &EngineConfig::default());
/// driver.set_sample_rate(48000);
/// driver.set_mode(FilterMode::Lp24.index() as i32);
/// driver.cutoff_mut().set_target(800.0);
/// driver.activate();
///
/// let input = vec![0.5f32; 256];
/// let mut left = vec![0.0f32; 256];
/// let mut right = vec![0.0f32; 256];
/// let mut outs: [&mut [f32]; 2] = [&mut left, &mut right];
/// driver.process(&[&input[..], &input[..]], &mut outs, 0, 256, 0b11, 0b11);
/// ```
#[derive(Debug)]
pub struct ModuleDriver<K> {
    kernel: K,
    cutoff: Inertia<ExponentialRamp>,
    resonance: Inertia<ExponentialRamp>,
    gain: Inertia<ExponentialRamp>,
    mode: i32,
    timer: BlockScheduler,
    generation: Arc<GenerationTag>,
    lifecycle: LifecycleState,
    sample_rate: u32,
    interval_ms: f32,
}

impl<K: DspKernel> ModuleDriver<K> {
    /// Wraps a kernel with settled inertias at neutral values.
    pub fn new(kernel: K, config: &EngineConfig) -> Self {
        let defaults = KernelControls::default();
        let sample_rate = 44100;
        Self {
            kernel,
            cutoff: Inertia::exponential(DEFAULT_INERTIA, defaults.frequency),
            resonance: Inertia::exponential(DEFAULT_INERTIA, defaults.resonance),
            gain: Inertia::exponential(DEFAULT_INERTIA, defaults.gain),
            mode: defaults.mode,
            timer: BlockScheduler::for_sample_rate(sample_rate, config.recompute_interval_ms),
            generation: Arc::new(GenerationTag::new(0)),
            lifecycle: LifecycleState::Inactive,
            sample_rate,
            interval_ms: config.recompute_interval_ms,
        }
    }

    /// Updates the kernel and the recompute period for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
        self.kernel.set_sample_rate(self.sample_rate);
        self.timer
            .set_period(period_for(self.sample_rate, self.interval_ms));
    }

    /// Settles inertia, recomputes coefficients, clears the kernel and
    /// starts the scheduler.
    pub fn activate(&mut self) {
        self.cutoff.snap_to_target();
        self.resonance.snap_to_target();
        self.gain.snap_to_target();
        self.calculate();
        self.kernel.activate();
        self.timer = BlockScheduler::for_sample_rate(self.sample_rate, self.interval_ms);
        self.timer.start();
        self.lifecycle = LifecycleState::Active;
        tracing::debug!(
            sample_rate = self.sample_rate,
            period = self.timer.period(),
            "driver activated"
        );
    }

    /// Marks the driver inactive; kernel state persists.
    pub fn deactivate(&mut self) {
        self.lifecycle = LifecycleState::Inactive;
        tracing::debug!("driver deactivated");
    }

    /// Sets the kernel mode index used by the next recompute.
    pub fn set_mode(&mut self, mode: i32) {
        self.mode = mode;
    }

    /// Sets the inertia length of all three controls, in recompute ticks.
    pub fn set_inertia(&mut self, ticks: u32) {
        if ticks != self.cutoff.length() {
            self.cutoff.set_length(ticks);
            self.resonance.set_length(ticks);
            self.gain.set_length(ticks);
        }
    }

    /// Cutoff inertia.
    pub fn cutoff_mut(&mut self) -> &mut Inertia<ExponentialRamp> {
        &mut self.cutoff
    }

    /// Resonance inertia.
    pub fn resonance_mut(&mut self) -> &mut Inertia<ExponentialRamp> {
        &mut self.resonance
    }

    /// Gain inertia.
    pub fn gain_mut(&mut self) -> &mut Inertia<ExponentialRamp> {
        &mut self.gain
    }

    /// Value the cutoff is gliding toward.
    pub fn cutoff_target(&self) -> f32 {
        self.cutoff.target()
    }

    /// Value the resonance is gliding toward.
    pub fn resonance_target(&self) -> f32 {
        self.resonance.target()
    }

    /// Value the gain is gliding toward.
    pub fn gain_target(&self) -> f32 {
        self.gain.target()
    }

    /// Current smoothed controls.
    pub fn controls(&self) -> KernelControls {
        KernelControls {
            frequency: self.cutoff.get_last(),
            resonance: self.resonance.get_last(),
            mode: self.mode,
            gain: self.gain.get_last(),
        }
    }

    /// Recomputes kernel coefficients from the current smoothed values.
    pub fn calculate(&mut self) {
        let controls = self.controls();
        self.kernel.calculate(&controls);
    }

    /// Returns `true` while any control is still gliding.
    pub fn inertia_active(&self) -> bool {
        self.cutoff.active() || self.resonance.active() || self.gain.active()
    }

    fn on_timer(&mut self) {
        self.cutoff.step();
        self.resonance.step();
        self.gain.step();
        self.calculate();
        self.timer.restart();
        self.generation.publish(self.timer.generation());
    }

    /// Renders frames `offset..offset + numsamples` through the kernel.
    ///
    /// See [`AudioModule::process`](crate::AudioModule::process) for the
    /// mask semantics.
    pub fn process(
        &mut self,
        ins: &[&[f32]],
        outs: &mut [&mut [f32]],
        offset: usize,
        numsamples: usize,
        inputs_mask: u32,
        outputs_mask: u32,
    ) -> u32 {
        if !self.lifecycle.is_active() {
            return 0;
        }
        let channels = self.kernel.channel_count().min(32);
        let end = block_end(ins, channels, outs, channels, offset, numsamples);

        let mut ostate = 0;
        let mut pos = offset;
        while pos < end {
            let mut numnow = end - pos;
            if self.inertia_active() {
                numnow = self.timer.get(numnow);
            }

            for (channel, out) in outs.iter_mut().enumerate().take(channels) {
                if outputs_mask & (1 << channel) == 0 {
                    continue;
                }
                let input = channel_input(ins, channel, inputs_mask).map(|b| &b[pos..pos + numnow]);
                ostate |= self
                    .kernel
                    .process_channel(channel, input, &mut out[pos..pos + numnow]);
            }

            if self.timer.elapsed() {
                self.on_timer();
            }
            pos += numnow;
        }
        ostate
    }

    /// Shared handle to the recompute generation, for observers on other
    /// threads.
    pub fn generation_tag(&self) -> Arc<GenerationTag> {
        Arc::clone(&self.generation)
    }

    /// Number of recomputes since activation.
    pub fn generation(&self) -> u32 {
        self.timer.generation()
    }

    /// Recompute period in samples.
    pub fn period(&self) -> usize {
        self.timer.period()
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Current sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The wrapped kernel.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use velour_core::{FilterCore, FilterMode};

    fn driver() -> ModuleDriver<FilterCore> {
        let mut driver = ModuleDriver::new(FilterCore::new(48000), &EngineConfig::default());
        driver.set_sample_rate(48000);
        driver
    }

    #[test]
    fn test_inactive_process_is_noop() {
        let mut driver = driver();
        let input = [1.0f32; 16];
        let mut out = [7.0f32; 16];
        let mut outs: [&mut [f32]; 1] = [&mut out];
        assert_eq!(driver.process(&[&input[..]], &mut outs, 0, 16, 1, 1), 0);
        assert!(out.iter().all(|&s| s == 7.0));
    }

    #[test]
    fn test_activate_snaps_inertia() {
        let mut driver = driver();
        driver.cutoff_mut().set_target(5000.0);
        assert!(driver.inertia_active());
        driver.activate();
        assert!(!driver.inertia_active());
        assert_eq!(driver.controls().frequency, 5000.0);
        assert_eq!(driver.lifecycle(), LifecycleState::Active);
        assert_eq!(driver.period(), 48);
    }

    #[test]
    fn test_glide_advances_once_per_period() {
        let mut driver = driver();
        driver.set_mode(FilterMode::Lp12.index() as i32);
        driver.activate();
        driver.cutoff_mut().set_target(8000.0);

        let input = [0.0f32; 480];
        let mut l = [0.0f32; 480];
        let mut outs: [&mut [f32]; 1] = [&mut l];
        driver.process(&[&input[..]], &mut outs, 0, 480, 1, 1);
        assert_eq!(driver.generation(), 10);
        assert_eq!(driver.generation_tag().load(), 10);
        assert!(driver.inertia_active());

        let mut l = [0.0f32; 480];
        let mut outs: [&mut [f32]; 1] = [&mut l];
        driver.process(&[&input[..]], &mut outs, 0, 480, 1, 1);
        assert!(!driver.inertia_active());
        assert_eq!(driver.controls().frequency, 8000.0);
    }

    #[test]
    fn test_set_inertia_changes_all_lengths() {
        let mut driver = driver();
        driver.set_inertia(5);
        driver.activate();
        driver.resonance_mut().set_target(4.0);

        let input = [0.0f32; 240];
        let mut l = [0.0f32; 240];
        let mut outs: [&mut [f32]; 1] = [&mut l];
        driver.process(&[&input[..]], &mut outs, 0, 240, 1, 1);
        assert!(!driver.inertia_active());
        assert_eq!(driver.controls().resonance, 4.0);
    }
}
