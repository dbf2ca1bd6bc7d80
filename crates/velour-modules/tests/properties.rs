//! Property-based tests across the registry.
//!
//! Uses proptest to check invariants that must hold for every module and
//! every parameter setting: finite output, parameter values staying in
//! range, and rendering that does not depend on how a host slices blocks.

use proptest::prelude::*;
use velour_modules::{AudioModule, EngineConfig, FilterModule, ModuleKind, create_module};

fn render(module: &mut impl AudioModule, input: &[f32], blocks: &[usize]) -> Vec<f32> {
    let mut l = vec![0.0f32; input.len()];
    let mut r = vec![0.0f32; input.len()];
    let mut pos = 0;
    let mut sizes = blocks.iter().cycle();
    while pos < input.len() {
        let n = sizes.next().copied().unwrap_or(input.len()).max(1);
        let mut outs: [&mut [f32]; 2] = [&mut l, &mut r];
        module.process(&[input, input], &mut outs, pos, n, 0b11, 0b11);
        pos += n;
    }
    l
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// With any normalized parameter values, every module stays finite.
    #[test]
    fn all_modules_finite_output(
        input in prop::collection::vec(-1.0f32..=1.0f32, 256),
        param_values in prop::array::uniform32(0.0f32..=1.0f32),
        kind_idx in 0usize..ModuleKind::ALL.len(),
    ) {
        let kind = ModuleKind::ALL[kind_idx];
        let mut module = create_module(kind.descriptor().id, &EngineConfig::default()).unwrap();
        module.set_sample_rate(48000);
        for i in 0..module.params().len() {
            module.params().set_normalized(i, param_values[i % 32]);
        }
        module.activate();
        module.note_on(64, 90);

        let out = render(&mut module, &input, &[64]);
        for (i, s) in out.iter().enumerate() {
            prop_assert!(s.is_finite(), "{:?}: non-finite at {}", kind, i);
        }
    }

    /// Whatever is written, a parameter reads back inside its range.
    #[test]
    fn params_stay_in_range(
        value in prop::num::f32::ANY,
        kind_idx in 0usize..ModuleKind::ALL.len(),
    ) {
        let kind = ModuleKind::ALL[kind_idx];
        let module = create_module(kind.descriptor().id, &EngineConfig::default()).unwrap();
        let bank = module.params();
        for (i, desc) in bank.descriptors().iter().enumerate() {
            bank.set(i, value);
            let got = bank.get(i);
            prop_assert!(got >= desc.min && got <= desc.max, "{}: {}", desc.name, got);
        }
    }

    /// Filter output does not depend on the host block size, even mid-glide.
    #[test]
    fn filter_block_split_invariance(
        cutoff in 50.0f32..15000.0,
        resonance in 0.707f32..8.0,
        mode in 0u32..12,
        blocks in prop::collection::vec(1usize..200, 1..6),
    ) {
        let input: Vec<f32> = (0..2048).map(|i| ((i * 7919) % 113) as f32 / 113.0 - 0.5).collect();
        let make = || {
            let mut filter = FilterModule::new(&EngineConfig::default()).unwrap();
            filter.set_sample_rate(44100);
            filter.activate();
            filter.params().set(FilterModule::CUTOFF, cutoff);
            filter.params().set(FilterModule::RESONANCE, resonance);
            filter.params().set(FilterModule::MODE, mode as f32);
            filter.params_changed();
            filter
        };

        let whole = render(&mut make(), &input, &[input.len()]);
        let split = render(&mut make(), &input, &blocks);
        for i in 0..input.len() {
            prop_assert!((whole[i] - split[i]).abs() < 1e-5, "sample {}", i);
        }
    }
}
