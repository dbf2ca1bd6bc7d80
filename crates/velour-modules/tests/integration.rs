//! End-to-end behaviour of the modules through the host interface.

use std::cell::Cell;
use std::rc::Rc;

use velour_core::{Biquad, DspKernel, KernelControls, lowpass_coefficients};
use velour_modules::{
    AudioModule, EngineConfig, FilterModule, ModuleDriver, ModuleError, ModuleKind, VintageDelay,
    create_module,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn impulse(len: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; len];
    v[0] = 1.0;
    v
}

fn sine(len: usize, step: f32) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * step).sin() * 0.5).collect()
}

/// Runs a stereo module over `input` in host blocks of the given sizes,
/// cycling through them.
fn run_blocks(
    module: &mut impl AudioModule,
    left: &[f32],
    right: &[f32],
    blocks: &[usize],
) -> (Vec<f32>, Vec<f32>) {
    let len = left.len();
    let mut out_l = vec![0.0f32; len];
    let mut out_r = vec![0.0f32; len];
    let mut pos = 0;
    let mut sizes = blocks.iter().cycle();
    while pos < len {
        let n = (*sizes.next().unwrap()).min(len - pos);
        let mut outs: [&mut [f32]; 2] = [&mut out_l, &mut out_r];
        module.process(&[left, right], &mut outs, pos, n, 0b11, 0b11);
        pos += n;
    }
    (out_l, out_r)
}

fn active_filter(sample_rate: u32) -> FilterModule {
    let mut filter = FilterModule::new(&EngineConfig::default()).unwrap();
    filter.set_sample_rate(sample_rate);
    filter.activate();
    filter
}

#[test]
fn filter_output_independent_of_host_block_size() {
    init_tracing();
    let input = sine(4096, 0.07);

    let mut reference = active_filter(48000);
    reference.params().set(FilterModule::CUTOFF, 9000.0);
    reference.params().set(FilterModule::RESONANCE, 4.0);
    reference.params_changed();
    let (want_l, want_r) = run_blocks(&mut reference, &input, &input, &[4096]);

    for blocks in [&[1usize][..], &[7, 64, 13], &[256], &[31, 1, 500]] {
        let mut filter = active_filter(48000);
        filter.params().set(FilterModule::CUTOFF, 9000.0);
        filter.params().set(FilterModule::RESONANCE, 4.0);
        filter.params_changed();
        let (got_l, got_r) = run_blocks(&mut filter, &input, &input, blocks);
        for i in 0..input.len() {
            assert!(
                (got_l[i] - want_l[i]).abs() < 1e-6,
                "blocks {:?}: left differs at {}",
                blocks,
                i
            );
            assert!((got_r[i] - want_r[i]).abs() < 1e-6);
        }
        assert_eq!(filter.driver().generation(), reference.driver().generation());
    }
}

#[test]
fn settled_lowpass_matches_reference_biquad() {
    let mut filter = active_filter(48000);
    filter.params().set(FilterModule::CUTOFF, 1000.0);
    filter.params().set(FilterModule::RESONANCE, 0.707);
    filter.params().set(FilterModule::MODE, 0.0);
    filter.activate();

    let mut reference = Biquad::new();
    reference.set_design(lowpass_coefficients(1000.0, 0.707, 48000.0), 1.0);

    let input = impulse(512);
    let (out_l, out_r) = run_blocks(&mut filter, &input, &input, &[512]);
    for i in 0..input.len() {
        let expected = reference.process(input[i]);
        assert!((out_l[i] - expected).abs() < 1e-5, "sample {}", i);
        assert_eq!(out_l[i], out_r[i]);
    }
}

fn plain_delay(mix_mode: f32) -> VintageDelay {
    let mut delay = VintageDelay::new(&EngineConfig::default()).unwrap();
    let p = delay.params();
    p.set(VintageDelay::BPM, 120.0);
    p.set(VintageDelay::SUBDIVIDE, 4.0);
    p.set(VintageDelay::TIME_L, 1.0);
    p.set(VintageDelay::TIME_R, 1.0);
    p.set(VintageDelay::FEEDBACK, 0.5);
    p.set(VintageDelay::AMOUNT, 1.0);
    p.set(VintageDelay::DRY, 0.0);
    p.set(VintageDelay::MIX_MODE, mix_mode);
    p.set(VintageDelay::MEDIUM, 0.0);
    p.set(VintageDelay::WIDTH, 1.0);
    delay.set_sample_rate(4000);
    delay.activate();
    delay
}

#[test]
fn delay_repeats_halve_each_period() {
    let mut delay = plain_delay(0.0);
    assert_eq!(delay.taps().left, 500);

    let left = impulse(2001);
    let right = vec![0.0f32; 2001];
    let (out_l, out_r) = run_blocks(&mut delay, &left, &right, &[64]);

    for (n, t) in [500usize, 1000, 1500, 2000].into_iter().enumerate() {
        let expected = 0.5f32.powi(n as i32);
        assert!((out_l[t] - expected).abs() < 1e-6, "repeat {} at {}", n, t);
    }
    for (t, &s) in out_l.iter().enumerate() {
        if t % 500 != 0 || t == 0 {
            assert_eq!(s, 0.0, "stray signal at {}", t);
        }
    }
    assert!(out_r.iter().all(|&s| s == 0.0));
}

#[test]
fn ping_pong_alternates_sides() {
    let mut delay = plain_delay(1.0);
    let left = impulse(1501);
    let right = vec![0.0f32; 1501];
    let (out_l, out_r) = run_blocks(&mut delay, &left, &right, &[100]);

    assert!((out_r[500] - 1.0).abs() < 1e-6);
    assert_eq!(out_l[500], 0.0);
    assert!((out_l[1000] - 0.5).abs() < 1e-6);
    assert_eq!(out_r[1000], 0.0);
    assert!((out_r[1500] - 0.25).abs() < 1e-6);
}

#[test]
fn stereo_feedback_equalizes_decay_rate() {
    let mut delay = plain_delay(0.0);
    delay.params().set(VintageDelay::TIME_R, 2.0);
    delay.params_changed();
    delay.activate();

    let input = impulse(2001);
    let (out_l, out_r) = run_blocks(&mut delay, &input, &input, &[2001]);
    // Left repeats every 500 samples at 0.5, right every 1000 at 0.25: the
    // same loss per second on both sides.
    assert!((out_l[1000] - 0.5).abs() < 1e-6);
    assert!((out_r[1000] - 1.0).abs() < 1e-6);
    assert!((out_l[2000] - 0.125).abs() < 1e-6);
    assert!((out_r[2000] - 0.25).abs() < 1e-6);
}

/// Kernel that only counts what the driver asks of it.
#[derive(Debug)]
struct CountingKernel {
    calculations: Rc<Cell<u32>>,
    last_frequency: f32,
}

impl DspKernel for CountingKernel {
    fn channel_count(&self) -> usize {
        2
    }

    fn set_sample_rate(&mut self, _sample_rate: u32) {}

    fn activate(&mut self) {}

    fn calculate(&mut self, controls: &KernelControls) {
        self.calculations.set(self.calculations.get() + 1);
        self.last_frequency = controls.frequency;
    }

    fn process_channel(&mut self, channel: usize, input: Option<&[f32]>, output: &mut [f32]) -> u32 {
        match input {
            Some(input) => output.copy_from_slice(input),
            None => output.fill(0.0),
        }
        1 << channel
    }
}

#[test]
fn recompute_once_per_period_only_while_gliding() {
    let calculations = Rc::new(Cell::new(0));
    let kernel = CountingKernel {
        calculations: Rc::clone(&calculations),
        last_frequency: 0.0,
    };
    let mut driver = ModuleDriver::new(kernel, &EngineConfig::default());
    driver.set_sample_rate(48000);
    driver.activate();
    assert_eq!(driver.period(), 48);

    let input = vec![0.1f32; 48 * 40];
    let mut l = vec![0.0f32; input.len()];
    let mut r = vec![0.0f32; input.len()];

    // Settled: no recomputes at all.
    calculations.set(0);
    let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
    driver.process(&[&input[..], &input[..]], &mut outs, 0, input.len(), 0b11, 0b11);
    assert_eq!(calculations.get(), 0);
    assert_eq!(l, input);

    // A glide of the default 20 ticks recomputes exactly 20 times.
    driver.cutoff_mut().set_target(5000.0);
    let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
    driver.process(&[&input[..], &input[..]], &mut outs, 0, input.len(), 0b11, 0b11);
    assert_eq!(calculations.get(), 20);
    assert_eq!(driver.generation(), 20);
    assert_eq!(driver.kernel().last_frequency, 5000.0);
    assert!(!driver.inertia_active());
}

#[test]
fn output_mask_limits_written_channels() {
    let config = EngineConfig::default();
    let input = sine(64, 0.2);
    for kind in ModuleKind::ALL {
        for (wanted, skipped) in [(0usize, 1usize), (1, 0)] {
            let mut module = create_module(kind.descriptor().id, &config).unwrap();
            module.set_sample_rate(48000);
            module.activate();
            module.note_on(69, 100);

            let mut bufs = [vec![9.0f32; 64], vec![9.0f32; 64]];
            let [l, r] = &mut bufs;
            let mut outs: [&mut [f32]; 2] = [l, r];
            let mask = module.process(
                &[&input[..], &input[..]],
                &mut outs,
                0,
                64,
                0b11,
                1 << wanted,
            );
            assert_eq!(mask & (1 << skipped), 0, "{:?}", kind);
            assert!(
                bufs[skipped].iter().all(|&s| s == 9.0),
                "{:?}: output {} written while masked",
                kind,
                skipped
            );
            assert!(
                bufs[wanted].iter().any(|&s| s != 9.0),
                "{:?}: output {} not written",
                kind,
                wanted
            );
        }
    }
}

#[test]
fn offset_and_short_buffers_are_respected() {
    let mut filter = active_filter(48000);
    let input = sine(64, 0.2);
    let mut l = vec![9.0f32; 64];
    let mut r = vec![9.0f32; 32];
    let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
    filter.process(&[&input[..], &input[..]], &mut outs, 16, 1000, 0b11, 0b11);
    assert!(l[..16].iter().all(|&s| s == 9.0));
    assert!(l[32..].iter().all(|&s| s == 9.0));
    assert!(r[..16].iter().all(|&s| s == 9.0));
}

#[test]
fn registry_builds_every_kind() {
    init_tracing();
    let config = EngineConfig::default();
    for kind in ModuleKind::ALL {
        let mut module = create_module(kind.descriptor().id, &config).unwrap();
        module.set_sample_rate(44100);
        module.activate();
        module.note_on(60, 100);
        module.note_off(60, 0);

        let input = sine(256, 0.05);
        let mut l = vec![0.0f32; 256];
        let mut r = vec![0.0f32; 256];
        let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
        module.process(&[&input[..], &input[..]], &mut outs, 0, 256, 0b11, 0b11);
        assert!(l.iter().chain(&r).all(|s| s.is_finite()), "{:?}", kind);

        module.deactivate();
        let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
        assert_eq!(
            module.process(&[&input[..], &input[..]], &mut outs, 0, 256, 0b11, 0b11),
            0
        );
    }
}

#[test]
fn unknown_module_and_bad_config_are_errors() {
    let config = EngineConfig::default();
    assert!(matches!(
        create_module("phaser", &config),
        Err(ModuleError::UnknownModule(_))
    ));

    let bad = EngineConfig {
        max_delay_samples: 3000,
        ..EngineConfig::default()
    };
    assert!(matches!(
        create_module("vintagedelay", &bad),
        Err(ModuleError::InvalidConfig { field: "max_delay_samples", .. })
    ));
}

#[test]
fn param_bank_is_shared_with_control_thread() {
    let mut filter = active_filter(48000);
    let bank = std::sync::Arc::clone(filter.params());
    std::thread::spawn(move || {
        bank.set(FilterModule::CUTOFF, 440.0);
    })
    .join()
    .unwrap();
    filter.params_changed();
    assert_eq!(filter.driver().cutoff_target(), 440.0);
}
