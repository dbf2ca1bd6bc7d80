//! Extreme parameter tests for every registered module.
//!
//! Verifies that each module produces finite output with all parameters at
//! their minimum or maximum, with garbage written to the parameter bank, and
//! at the lowest and highest supported sample rates.

use velour_modules::{AudioModule, EngineConfig, Module, ModuleKind, create_module};

const DEFAULT_SAMPLE_RATE: u32 = 48000;
const LOW_SAMPLE_RATE: u32 = 8000;
const HIGH_SAMPLE_RATE: u32 = 192000;
const NUM_SAMPLES: usize = 1000;
const BLOCK: usize = 100;

fn create(kind: ModuleKind, sample_rate: u32) -> Module {
    let mut module = create_module(kind.descriptor().id, &EngineConfig::default()).unwrap();
    module.set_sample_rate(sample_rate);
    module.activate();
    module
}

/// Process `NUM_SAMPLES` of a square-ish signal and assert all outputs are finite.
fn assert_finite_output(module: &mut Module, label: &str) {
    module.note_on(127, 127);
    let input: Vec<f32> = (0..NUM_SAMPLES)
        .map(|i| match i % 3 {
            0 => 0.5,
            1 => -0.5,
            _ => 0.0,
        })
        .collect();
    let mut l = vec![0.0f32; NUM_SAMPLES];
    let mut r = vec![0.0f32; NUM_SAMPLES];
    for start in (0..NUM_SAMPLES).step_by(BLOCK) {
        let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
        module.process(&[&input[..], &input[..]], &mut outs, start, BLOCK, 0b11, 0b11);
    }
    for (i, (a, b)) in l.iter().zip(&r).enumerate() {
        assert!(
            a.is_finite() && b.is_finite(),
            "{}: non-finite output at sample {}: {} {}",
            label,
            i,
            a,
            b
        );
    }
}

fn set_all(module: &mut Module, pick: impl Fn(f32, f32) -> f32) {
    let bank = std::sync::Arc::clone(module.params());
    for (i, desc) in bank.descriptors().iter().enumerate() {
        bank.set(i, pick(desc.min, desc.max));
    }
    module.params_changed();
}

fn run_extreme_test(kind: ModuleKind) {
    let name = kind.descriptor().name;

    {
        let mut module = create(kind, DEFAULT_SAMPLE_RATE);
        set_all(&mut module, |min, _| min);
        assert_finite_output(&mut module, &format!("{} (all min)", name));
    }

    {
        let mut module = create(kind, DEFAULT_SAMPLE_RATE);
        set_all(&mut module, |_, max| max);
        assert_finite_output(&mut module, &format!("{} (all max)", name));
    }

    {
        let mut module = create(kind, DEFAULT_SAMPLE_RATE);
        set_all(&mut module, |_, _| f32::NAN);
        assert_finite_output(&mut module, &format!("{} (NaN params)", name));
        set_all(&mut module, |_, _| f32::INFINITY);
        assert_finite_output(&mut module, &format!("{} (inf params)", name));
    }

    {
        let mut module = create(kind, LOW_SAMPLE_RATE);
        set_all(&mut module, |_, max| max);
        assert_finite_output(&mut module, &format!("{} (8 kHz, all max)", name));
    }

    {
        let mut module = create(kind, HIGH_SAMPLE_RATE);
        set_all(&mut module, |_, max| max);
        assert_finite_output(&mut module, &format!("{} (192 kHz, all max)", name));
    }

    {
        // Above the preallocated maximum: clamped, not reallocated.
        let mut module = create(kind, 384000);
        assert_finite_output(&mut module, &format!("{} (384 kHz)", name));
    }
}

#[test]
fn test_extreme_filter() {
    run_extreme_test(ModuleKind::Filter);
}

#[test]
fn test_extreme_filterclavier() {
    run_extreme_test(ModuleKind::Filterclavier);
}

#[test]
fn test_extreme_vintage_delay() {
    run_extreme_test(ModuleKind::VintageDelay);
}

#[test]
fn test_extreme_reverb() {
    run_extreme_test(ModuleKind::Reverb);
}

#[test]
fn test_extreme_mono() {
    run_extreme_test(ModuleKind::Mono);
}

#[test]
fn test_extreme_stereo() {
    run_extreme_test(ModuleKind::Stereo);
}
