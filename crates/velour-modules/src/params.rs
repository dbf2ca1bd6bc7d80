//! Lock-free parameter storage shared between control and audio threads.
//!
//! Values are stored as atomic `u32` (f32 bit-cast) with relaxed ordering.
//! A late read only delays a change by one block, and every read is clamped
//! against the descriptor, so no ordering between slots is required.

use std::sync::atomic::{AtomicU32, Ordering};

use velour_core::{ParamDescriptor, ParamId, round_half_away};

/// Current values of one module's parameters.
///
/// The control thread writes with [`set`](Self::set); the module reads with
/// [`get`](Self::get) during `params_changed` and publishes meter outputs
/// with [`publish`](Self::publish). Shared as `Arc<ParamBank>`.
///
/// # Example
///
/// ```rust
/// use velour_core::ParamDescriptor;
/// use velour_modules::ParamBank;
///
/// static PARAMS: [ParamDescriptor; 1] =
///     [ParamDescriptor::percent("Mix", "Mix", 0.5)];
///
/// let bank = ParamBank::new(&PARAMS);
/// bank.set(0, 2.0);
/// assert_eq!(bank.get(0), 1.0);
/// ```
#[derive(Debug)]
pub struct ParamBank {
    descriptors: &'static [ParamDescriptor],
    values: Box<[AtomicU32]>,
}

impl ParamBank {
    /// Creates a bank holding every descriptor's default.
    pub fn new(descriptors: &'static [ParamDescriptor]) -> Self {
        let values = descriptors
            .iter()
            .map(|d| AtomicU32::new(d.default.to_bits()))
            .collect();
        Self {
            descriptors,
            values,
        }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if the module has no parameters.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All descriptors in index order.
    pub fn descriptors(&self) -> &'static [ParamDescriptor] {
        self.descriptors
    }

    /// Descriptor at `index`.
    pub fn descriptor(&self, index: usize) -> Option<&'static ParamDescriptor> {
        self.descriptors.get(index)
    }

    /// Find parameter index by string id (`"flt_cutoff"`).
    pub fn index_of(&self, string_id: &str) -> Option<usize> {
        self.descriptors
            .iter()
            .position(|d| d.string_id == string_id)
    }

    /// Find parameter index by stable `ParamId`.
    pub fn index_by_id(&self, id: ParamId) -> Option<usize> {
        self.descriptors.iter().position(|d| d.id == id)
    }

    /// Current plain value, clamped to the descriptor range.
    ///
    /// Unknown indices read as 0.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        match (self.values.get(index), self.descriptors.get(index)) {
            (Some(slot), Some(desc)) => desc.clamp(f32::from_bits(slot.load(Ordering::Relaxed))),
            _ => 0.0,
        }
    }

    /// Current value rounded half away from zero (modes, toggles, counts).
    #[inline]
    pub fn get_int(&self, index: usize) -> i32 {
        round_half_away(self.get(index)) as i32
    }

    /// Current value as a switch.
    #[inline]
    pub fn get_bool(&self, index: usize) -> bool {
        self.get(index) >= 0.5
    }

    /// Writes a plain value from the control side.
    ///
    /// The value is clamped; read-only outputs and unknown indices are
    /// ignored. Returns `true` if the slot was written.
    pub fn set(&self, index: usize, value: f32) -> bool {
        match (self.values.get(index), self.descriptors.get(index)) {
            (Some(slot), Some(desc)) if !desc.is_read_only() => {
                slot.store(desc.clamp(value).to_bits(), Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    /// Writes a module output (meters, indicators).
    #[inline]
    pub fn publish(&self, index: usize, value: f32) {
        if let (Some(slot), Some(desc)) = (self.values.get(index), self.descriptors.get(index)) {
            slot.store(desc.clamp(value).to_bits(), Ordering::Relaxed);
        }
    }

    /// Current value in `[0, 1]`.
    pub fn get_normalized(&self, index: usize) -> f32 {
        self.descriptors
            .get(index)
            .map_or(0.0, |desc| desc.to_normalized(self.get(index)))
    }

    /// Writes a normalized `[0, 1]` value from the control side.
    pub fn set_normalized(&self, index: usize, normalized: f32) -> bool {
        match self.descriptors.get(index) {
            Some(desc) => self.set(index, desc.from_normalized(normalized)),
            None => false,
        }
    }

    /// Display string for the current value, with unit.
    pub fn format(&self, index: usize) -> Option<String> {
        self.descriptors
            .get(index)
            .map(|desc| desc.display(self.get(index)).to_string())
    }

    /// Restores every parameter, outputs included, to its default.
    pub fn reset_to_defaults(&self) {
        for (slot, desc) in self.values.iter().zip(self.descriptors) {
            slot.store(desc.default.to_bits(), Ordering::Relaxed);
        }
    }
}
