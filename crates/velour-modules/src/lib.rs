//! Velour Modules - host-facing effect modules built on `velour-core`
//!
//! Every module implements [`AudioModule`]: a host sets the sample rate,
//! activates the module and then calls `process` with per-channel buffers,
//! an offset, a frame count and channel masks. Parameters live in a shared
//! [`ParamBank`] that a control thread may write at any time; the audio
//! thread picks the values up in `params_changed`.
//!
//! # Modules
//!
//! | id              | type               | notes                                   |
//! |-----------------|--------------------|-----------------------------------------|
//! | `filter`        | [`FilterModule`]   | 12-mode cascade with inertia            |
//! | `filterclavier` | [`Filterclavier`]  | cutoff and resonance follow notes       |
//! | `vintagedelay`  | [`VintageDelay`]   | tempo delay, four mix modes, tape media |
//! | `reverb`        | [`Reverb`]         | comb/allpass tank with pre-delay        |
//! | `mono`          | [`Mono`]           | mono to stereo imaging                  |
//! | `stereo`        | [`Stereo`]         | mid/side routing and imaging            |
//!
//! The filter modules share [`ModuleDriver`], which splits each block at
//! recompute boundaries while a control is gliding and recomputes the
//! coefficients once per boundary.
//!
//! # Configuration
//!
//! [`EngineConfig`] bounds the memory every module reserves up front
//! (maximum sample rate, delay capacity) and sets the recompute interval.
//! With the `serde` feature it can be loaded from any serde format.
//!
//! # Example
//!
//! ```rust
//! use velour_modules::{AudioModule, EngineConfig, create_module};
//!
//! let mut module = create_module("filter", &EngineConfig::default()).unwrap();
//! module.set_sample_rate(44100);
//! module.activate();
//!
//! let input = [0.5f32; 128];
//! let mut left = [0.0f32; 128];
//! let mut right = [0.0f32; 128];
//! let mut outs: [&mut [f32]; 2] = [&mut left, &mut right];
//! let mask = module.process(&[&input[..], &input[..]], &mut outs, 0, 128, 0b11, 0b11);
//! assert_eq!(mask, 0b11);
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod filter;
pub mod filterclavier;
pub mod meters;
pub mod module;
pub mod mono;
pub mod params;
pub mod registry;
pub mod reverb;
pub mod stereo;
pub mod stereo_tools;
pub mod vintage_delay;

pub use config::EngineConfig;
pub use driver::{DEFAULT_INERTIA, ModuleDriver};
pub use error::ModuleError;
pub use filter::{FILTER_PARAMS, FilterModule};
pub use filterclavier::{FILTERCLAVIER_PARAMS, Filterclavier};
pub use meters::{CorrelationMeter, LevelMeter, METER_FALLOFF_DB_PER_SEC, phase_correlation};
pub use module::{AudioModule, LifecycleState};
pub use mono::{MONO_PARAMS, Mono};
pub use params::ParamBank;
pub use registry::{
    Module, ModuleCategory, ModuleDescriptor, ModuleKind, all_modules, create_module,
};
pub use reverb::{REVERB_PARAMS, ROOM_LABELS, Reverb};
pub use stereo::{ROUTING_LABELS, Routing, STEREO_PARAMS, Stereo};
pub use stereo_tools::{MAX_CHANNEL_DELAY_MS, StageSettings};
pub use vintage_delay::{MEDIUM_LABELS, Medium, VINTAGE_DELAY_PARAMS, VintageDelay};
