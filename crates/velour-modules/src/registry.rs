//! Module registry and factory.
//!
//! The set of modules is closed: [`ModuleKind`] names every one of them and
//! [`Module`] wraps a constructed instance behind the [`AudioModule`]
//! interface without boxing. Hosts pick a module by its string id.
//!
//! # Example
//!
//! ```rust
//! use velour_modules::{AudioModule, EngineConfig, ModuleCategory, create_module, registry};
//!
//! let config = EngineConfig::default();
//! let mut reverb = create_module("reverb", &config).unwrap();
//! reverb.set_sample_rate(48000);
//! reverb.activate();
//!
//! for desc in registry::modules_in_category(ModuleCategory::TimeBased) {
//!     println!("{}: {}", desc.name, desc.description);
//! }
//! assert!(create_module("chorus", &config).is_err());
//! ```

use std::sync::Arc;

use velour_core::ParamDescriptor;

use crate::config::EngineConfig;
use crate::error::ModuleError;
use crate::filter::{FILTER_PARAMS, FilterModule};
use crate::filterclavier::{FILTERCLAVIER_PARAMS, Filterclavier};
use crate::module::{AudioModule, LifecycleState};
use crate::mono::{MONO_PARAMS, Mono};
use crate::params::ParamBank;
use crate::reverb::{REVERB_PARAMS, Reverb};
use crate::stereo::{STEREO_PARAMS, Stereo};
use crate::vintage_delay::{VINTAGE_DELAY_PARAMS, VintageDelay};

/// Category of module for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleCategory {
    /// Filters, static or note-controlled.
    Filter,
    /// Delays and reverbs.
    TimeBased,
    /// Gain staging and stereo imaging.
    Utility,
}

impl ModuleCategory {
    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            ModuleCategory::Filter => "Filter",
            ModuleCategory::TimeBased => "Time-Based",
            ModuleCategory::Utility => "Utility",
        }
    }
}

/// Every module this crate can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// [`FilterModule`].
    Filter,
    /// [`Filterclavier`].
    Filterclavier,
    /// [`VintageDelay`].
    VintageDelay,
    /// [`Reverb`].
    Reverb,
    /// [`Mono`].
    Mono,
    /// [`Stereo`].
    Stereo,
}

impl ModuleKind {
    /// All kinds, in registry order.
    pub const ALL: [ModuleKind; 6] = [
        ModuleKind::Filter,
        ModuleKind::Filterclavier,
        ModuleKind::VintageDelay,
        ModuleKind::Reverb,
        ModuleKind::Mono,
        ModuleKind::Stereo,
    ];

    /// Looks a kind up by its string id.
    pub fn from_id(id: &str) -> Option<Self> {
        find(id).map(|desc| desc.kind)
    }

    /// Registry entry of this kind.
    pub fn descriptor(self) -> &'static ModuleDescriptor {
        &MODULES[self as usize]
    }
}

/// Describes a module in the registry.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Which module this is.
    pub kind: ModuleKind,
    /// Unique identifier (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category for organization.
    pub category: ModuleCategory,
    /// Number of audio inputs.
    pub inputs: usize,
    /// Number of audio outputs.
    pub outputs: usize,
    /// Parameter table, outputs included.
    pub params: &'static [ParamDescriptor],
}

static MODULES: [ModuleDescriptor; 6] = [
    ModuleDescriptor {
        kind: ModuleKind::Filter,
        id: "filter",
        name: "Filter",
        description: "Resonant multimode filter with parameter inertia",
        category: ModuleCategory::Filter,
        inputs: 2,
        outputs: 2,
        params: &FILTER_PARAMS,
    },
    ModuleDescriptor {
        kind: ModuleKind::Filterclavier,
        id: "filterclavier",
        name: "Filterclavier",
        description: "Filter whose cutoff and resonance follow MIDI notes",
        category: ModuleCategory::Filter,
        inputs: 2,
        outputs: 2,
        params: &FILTERCLAVIER_PARAMS,
    },
    ModuleDescriptor {
        kind: ModuleKind::VintageDelay,
        id: "vintagedelay",
        name: "Vintage Delay",
        description: "Tempo-synced stereo delay with tape coloration",
        category: ModuleCategory::TimeBased,
        inputs: 2,
        outputs: 2,
        params: &VINTAGE_DELAY_PARAMS,
    },
    ModuleDescriptor {
        kind: ModuleKind::Reverb,
        id: "reverb",
        name: "Reverb",
        description: "Comb/allpass stereo reverb with pre-delay",
        category: ModuleCategory::TimeBased,
        inputs: 2,
        outputs: 2,
        params: &REVERB_PARAMS,
    },
    ModuleDescriptor {
        kind: ModuleKind::Mono,
        id: "mono",
        name: "Mono Input",
        description: "Mono to stereo with width, delay and phase tools",
        category: ModuleCategory::Utility,
        inputs: 1,
        outputs: 2,
        params: &MONO_PARAMS,
    },
    ModuleDescriptor {
        kind: ModuleKind::Stereo,
        id: "stereo",
        name: "Stereo Tools",
        description: "Mid/side routing, balance and stereo imaging",
        category: ModuleCategory::Utility,
        inputs: 2,
        outputs: 2,
        params: &STEREO_PARAMS,
    },
];

/// Descriptors of every module.
pub fn all_modules() -> &'static [ModuleDescriptor] {
    &MODULES
}

/// Descriptor for a module id.
pub fn find(id: &str) -> Option<&'static ModuleDescriptor> {
    MODULES.iter().find(|desc| desc.id == id)
}

/// Descriptors of the modules in a category.
pub fn modules_in_category(
    category: ModuleCategory,
) -> impl Iterator<Item = &'static ModuleDescriptor> {
    MODULES.iter().filter(move |desc| desc.category == category)
}

/// A constructed module of any kind.
#[derive(Debug)]
pub enum Module {
    /// See [`FilterModule`].
    Filter(FilterModule),
    /// See [`Filterclavier`].
    Filterclavier(Filterclavier),
    /// See [`VintageDelay`].
    VintageDelay(VintageDelay),
    /// See [`Reverb`].
    Reverb(Reverb),
    /// See [`Mono`].
    Mono(Mono),
    /// See [`Stereo`].
    Stereo(Stereo),
}

impl Module {
    /// Builds an inactive module of the given kind.
    pub fn new(kind: ModuleKind, config: &EngineConfig) -> Result<Self, ModuleError> {
        let module = match kind {
            ModuleKind::Filter => Module::Filter(FilterModule::new(config)?),
            ModuleKind::Filterclavier => Module::Filterclavier(Filterclavier::new(config)?),
            ModuleKind::VintageDelay => Module::VintageDelay(VintageDelay::new(config)?),
            ModuleKind::Reverb => Module::Reverb(Reverb::new(config)?),
            ModuleKind::Mono => Module::Mono(Mono::new(config)?),
            ModuleKind::Stereo => Module::Stereo(Stereo::new(config)?),
        };
        tracing::debug!(id = kind.descriptor().id, "module created");
        Ok(module)
    }

    /// Which kind of module this is.
    pub fn kind(&self) -> ModuleKind {
        match self {
            Module::Filter(_) => ModuleKind::Filter,
            Module::Filterclavier(_) => ModuleKind::Filterclavier,
            Module::VintageDelay(_) => ModuleKind::VintageDelay,
            Module::Reverb(_) => ModuleKind::Reverb,
            Module::Mono(_) => ModuleKind::Mono,
            Module::Stereo(_) => ModuleKind::Stereo,
        }
    }

    /// Registry entry of this module.
    pub fn descriptor(&self) -> &'static ModuleDescriptor {
        self.kind().descriptor()
    }
}

macro_rules! dispatch {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            Module::Filter($m) => $body,
            Module::Filterclavier($m) => $body,
            Module::VintageDelay($m) => $body,
            Module::Reverb($m) => $body,
            Module::Mono($m) => $body,
            Module::Stereo($m) => $body,
        }
    };
}

impl AudioModule for Module {
    fn input_count(&self) -> usize {
        dispatch!(self, m => m.input_count())
    }

    fn output_count(&self) -> usize {
        dispatch!(self, m => m.output_count())
    }

    fn params(&self) -> &Arc<ParamBank> {
        dispatch!(self, m => m.params())
    }

    fn lifecycle(&self) -> LifecycleState {
        dispatch!(self, m => m.lifecycle())
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        dispatch!(self, m => m.set_sample_rate(sample_rate))
    }

    fn activate(&mut self) {
        dispatch!(self, m => m.activate())
    }

    fn deactivate(&mut self) {
        dispatch!(self, m => m.deactivate())
    }

    fn params_changed(&mut self) {
        dispatch!(self, m => m.params_changed())
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        dispatch!(self, m => m.note_on(note, velocity))
    }

    fn note_off(&mut self, note: u8, velocity: u8) {
        dispatch!(self, m => m.note_off(note, velocity))
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
        dispatch!(self, m => m.process(ins, outs, offset, numsamples, inputs_mask, outputs_mask))
    }
}

/// Creates an inactive module by string id.
///
/// # Errors
///
/// [`ModuleError::UnknownModule`] for an id not in the registry, or any
/// construction error of the module itself.
pub fn create_module(id: &str, config: &EngineConfig) -> Result<Module, ModuleError> {
    let kind = ModuleKind::from_id(id).ok_or_else(|| {
        tracing::warn!(id, "unknown module id");
        ModuleError::UnknownModule(id.to_owned())
    })?;
    Module::new(kind, config)
}
