//! Velour Core - real-time DSP primitives for inertia-smoothed effect modules
//!
//! This crate provides the signal-level building blocks that the effect
//! modules in `velour-modules` are assembled from. Nothing here allocates
//! after construction, locks or blocks, so every type can be driven from an
//! audio callback.
//!
//! # Core Abstractions
//!
//! ## Parameter Smoothing
//!
//! - [`RampGenerator`] - Fixed-length ramp toward a target ([`ExponentialRamp`], [`LinearRamp`])
//! - [`Inertia`] - Target/current pair that glides instead of jumping
//! - [`BlockScheduler`] - Bounds sub-block lengths so coefficients refresh once per period
//!
//! ## Filters
//!
//! - [`Biquad`] - Direct Form I second-order section with RBJ cookbook designs
//! - [`FilterCore`] - Up to three cascaded biquads per channel, twelve modes
//! - [`OnePole`] - 6 dB/oct lowpass/highpass tone shaping
//! - [`CombFilter`] - Damped feedback comb for reverb tanks
//! - [`AllpassFilter`] - Schroeder allpass for diffusion
//!
//! ## Delay Lines
//!
//! - [`DelayBuffer`] - Power-of-two ring buffer with masked reads
//! - [`StereoDelayLine`] - Two lines plus the four stereo [`MixMode`] routings
//!
//! ## Parameters
//!
//! - [`ParamDescriptor`] - Range, [`ParamScale`] and display of a control
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`note_to_hz`], [`flush_denormal`], etc.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! velour-core = { version = "0.1", default-features = false }
//! ```
//!
//! The optional `tracing` feature emits debug events from activation paths.
//!
//! # Example
//!
//! ```rust
//! use velour_core::{FilterCore, FilterMode, Inertia};
//!
//! let mut cutoff = Inertia::exponential(20, 1000.0);
//! cutoff.set_target(4000.0);
//!
//! let mut core = FilterCore::new(48000);
//! let input = [0.5f32; 48];
//! let mut output = [0.0f32; 48];
//! while cutoff.active() {
//!     core.calculate_filter(cutoff.get(), 0.707, FilterMode::Lp24, 1.0);
//!     core.process_channel(0, Some(&input[..]), &mut output);
//! }
//! assert_eq!(cutoff.get_last(), 4000.0);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: Allocation happens in fallible constructors only
//! - **No dependencies on std**: `libm` for math
//! - **Denormal hygiene**: Recursive state is flushed to zero below audibility

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std as alloc;

pub mod allpass;
pub mod biquad;
pub mod comb;
pub mod delay_line;
pub mod filter;
pub mod inertia;
pub mod kernel;
pub mod math;
pub mod one_pole;
pub mod param_info;
pub mod ramp;
pub mod scheduler;

// Re-export main types at crate root
pub use allpass::AllpassFilter;
pub use biquad::{
    Biquad, Coefficients, bandpass_coefficients, highpass_coefficients, lowpass_coefficients,
    notch_coefficients,
};
pub use comb::CombFilter;
pub use delay_line::{
    DelayBuffer, DelayFrame, DelayTaps, MIX_MODE_LABELS, MixMode, StereoDelayLine, stereo_mix,
    tempo_delay_samples,
};
pub use filter::{FILTER_CHANNELS, FILTER_MODE_LABELS, FilterCore, FilterMode, MAX_ORDER};
pub use inertia::{GainSmoothing, Inertia};
pub use kernel::{DspKernel, KernelControls};
pub use math::{
    SILENCE_THRESHOLD, atan_clip, db_to_linear, flush_denormal, is_silent, lerp, linear_to_db,
    ms_to_samples, note_to_hz, peak, round_half_away,
};
pub use one_pole::{OnePole, OnePoleMode};
pub use param_info::{
    FAKE_INFINITY, GAIN_FLOOR, ParamDescriptor, ParamDisplay, ParamFlags, ParamId, ParamKind,
    ParamScale, ParamUnit, is_fake_infinity,
};
pub use ramp::{ExponentialRamp, LinearRamp, RampGenerator, RampShape};
pub use scheduler::{BlockScheduler, DEFAULT_INTERVAL_MS, GenerationTag, period_for};
