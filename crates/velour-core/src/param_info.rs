//! Parameter metadata: ranges, scaling laws and display formatting.
//!
//! Every control a module exposes is described by a [`ParamDescriptor`].
//! Hosts and GUIs speak normalized `[0, 1]` values; the DSP side speaks
//! engineering units (Hz, linear gain, ticks). The descriptor's
//! [`ParamScale`] maps between the two and is monotonic and invertible, so
//! `to_normalized(from_normalized(x)) ≈ x` and automation round-trips.
//!
//! # Scaling Laws
//!
//! | Scale | `from_normalized(v)` |
//! |-------|----------------------|
//! | Linear, Percent | `min + (max - min) * v` |
//! | Quadratic | `min + (max - min) * v²` |
//! | Logarithmic | `min * (max / min)^v` |
//! | LogInfinity | as Logarithmic over the first `(step-1)/step`, then [`FAKE_INFINITY`] |
//! | Gain | `rmin * (max / rmin)^v` with `rmin = max(min, 1/1024)`, `min` at 0 |
//!
//! Integer, boolean and enum parameters are rounded half away from zero
//! after mapping.
//!
//! Descriptors are `const`-constructible so modules can keep their tables
//! in statics:
//!
//! ```rust
//! use velour_core::{ParamDescriptor, ParamId, ParamScale};
//!
//! static CUTOFF: ParamDescriptor =
//!     ParamDescriptor::frequency("Frequency", "Freq", 10.0, 20000.0, 2000.0)
//!         .with_id(ParamId(100), "flt_cutoff");
//!
//! let n = CUTOFF.to_normalized(2000.0);
//! assert!((CUTOFF.from_normalized(n) - 2000.0).abs() < 0.01);
//! assert_eq!(CUTOFF.scale, ParamScale::Logarithmic);
//! ```

use core::fmt;

use libm::{log, pow, sqrt};

use crate::math::{linear_to_db, round_half_away};

/// Stand-in for an infinite value on [`ParamScale::LogInfinity`] parameters.
pub const FAKE_INFINITY: f32 = 65536.0 * 16.0;

/// Lowest non-zero level on [`ParamScale::Gain`] parameters (-60 dB).
pub const GAIN_FLOOR: f32 = 1.0 / 1024.0;

/// Returns `true` if `value` is the [`FAKE_INFINITY`] marker.
#[inline]
pub fn is_fake_infinity(value: f32) -> bool {
    (value - FAKE_INFINITY).abs() < 1.0
}

/// Mapping curve between normalized and plain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamScale {
    /// Equal resolution across the range.
    #[default]
    Linear,
    /// More resolution near `min`.
    Quadratic,
    /// Exponential sweep; requires `min > 0`. Used for frequencies.
    Logarithmic,
    /// Logarithmic with the top step reserved for "infinite".
    /// Requires `step > 1`.
    LogInfinity,
    /// Logarithmic gain with a -60 dB floor below which the value is `min`.
    Gain,
    /// Linear over a 0..1 fraction, displayed as a percentage.
    Percent,
}

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamKind {
    /// Continuous value.
    #[default]
    Float,
    /// Whole numbers.
    Int,
    /// 0 or 1.
    Bool,
    /// Index into [`ParamDescriptor::labels`].
    Enum,
}

/// Stable parameter identifier that survives reordering.
///
/// Once assigned, a `ParamId` must never change for a given parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(pub u32);

/// Parameter capability flags.
///
/// ```rust
/// use velour_core::ParamFlags;
///
/// let flags = ParamFlags::AUTOMATABLE.union(ParamFlags::STEPPED);
/// assert!(flags.contains(ParamFlags::STEPPED));
/// assert!(!flags.contains(ParamFlags::READ_ONLY));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamFlags(u8);

impl ParamFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Host can automate this parameter.
    pub const AUTOMATABLE: Self = Self(1 << 0);
    /// Parameter has discrete steps.
    pub const STEPPED: Self = Self(1 << 1);
    /// Parameter should be hidden from generic host UI.
    pub const HIDDEN: Self = Self(1 << 2);
    /// Output written by the module (meters, indicators); host writes are ignored.
    pub const READ_ONLY: Self = Self(1 << 3);

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for ParamFlags {
    fn default() -> Self {
        Self::AUTOMATABLE
    }
}

/// Unit used when formatting a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamUnit {
    /// Dimensionless.
    #[default]
    None,
    /// Decibels.
    Decibels,
    /// Hertz.
    Hertz,
    /// Seconds.
    Seconds,
    /// Milliseconds.
    Milliseconds,
    /// Cents of a semitone.
    Cents,
    /// Semitones.
    Semitones,
    /// Beats per minute.
    Bpm,
    /// Degrees.
    Degrees,
    /// MIDI note number, shown as a note name.
    Note,
}

impl ParamUnit {
    /// Unit suffix for display.
    ///
    /// ```rust
    /// use velour_core::ParamUnit;
    ///
    /// assert_eq!(ParamUnit::Hertz.suffix(), " Hz");
    /// assert_eq!(ParamUnit::None.suffix(), "");
    /// ```
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::None | ParamUnit::Note => "",
            ParamUnit::Decibels => " dB",
            ParamUnit::Hertz => " Hz",
            ParamUnit::Seconds => " s",
            ParamUnit::Milliseconds => " ms",
            ParamUnit::Cents => " ct",
            ParamUnit::Semitones => "#",
            ParamUnit::Bpm => " bpm",
            ParamUnit::Degrees => " deg",
        }
    }
}

/// Describes one parameter's range, scaling, kind and display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Full name for display.
    pub name: &'static str,
    /// Short name, at most 8 characters, for hardware displays.
    pub short_name: &'static str,
    /// Display unit.
    pub unit: ParamUnit,
    /// Value type.
    pub kind: ParamKind,
    /// Minimum plain value.
    pub min: f32,
    /// Maximum plain value.
    pub max: f32,
    /// Value after construction or reset.
    pub default: f32,
    /// Step hint; for [`ParamScale::LogInfinity`] the number of positions.
    pub step: f32,
    /// Stable numeric ID.
    pub id: ParamId,
    /// Stable string ID (`"module_param"`).
    pub string_id: &'static str,
    /// Normalization curve.
    pub scale: ParamScale,
    /// Capability flags.
    pub flags: ParamFlags,
    /// Group for host tree display; empty means top level.
    pub group: &'static str,
    /// Labels for [`ParamKind::Enum`] values, in index order.
    pub labels: &'static [&'static str],
}

impl ParamDescriptor {
    /// Continuous linear parameter.
    pub const fn float(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::None,
            kind: ParamKind::Float,
            min,
            max,
            default,
            step: 0.0,
            id: ParamId(0),
            string_id: "",
            scale: ParamScale::Linear,
            flags: ParamFlags::AUTOMATABLE,
            group: "",
            labels: &[],
        }
    }

    /// Logarithmic frequency in Hz.
    pub const fn frequency(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self::float(name, short_name, min, max, default)
            .with_scale(ParamScale::Logarithmic)
            .with_unit(ParamUnit::Hertz)
    }

    /// Linear gain factor with a logarithmic (dB-like) control law.
    pub const fn gain(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self::float(name, short_name, min, max, default).with_scale(ParamScale::Gain)
    }

    /// Fraction in `[0, 1]` shown as a percentage.
    pub const fn percent(name: &'static str, short_name: &'static str, default: f32) -> Self {
        Self::float(name, short_name, 0.0, 1.0, default).with_scale(ParamScale::Percent)
    }

    /// Whole-number parameter.
    pub const fn integer(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        let mut desc = Self::float(name, short_name, min, max, default);
        desc.kind = ParamKind::Int;
        desc.step = 1.0;
        desc.flags = ParamFlags::AUTOMATABLE.union(ParamFlags::STEPPED);
        desc
    }

    /// On/off switch.
    pub const fn toggle(name: &'static str, short_name: &'static str, default: bool) -> Self {
        let mut desc = Self::integer(name, short_name, 0.0, 1.0, if default { 1.0 } else { 0.0 });
        desc.kind = ParamKind::Bool;
        desc
    }

    /// Choice among labelled options; the value is the label index.
    pub const fn enumeration(
        name: &'static str,
        short_name: &'static str,
        labels: &'static [&'static str],
        default: usize,
    ) -> Self {
        let max = if labels.is_empty() { 0.0 } else { (labels.len() - 1) as f32 };
        let mut desc = Self::integer(name, short_name, 0.0, max, default as f32);
        desc.kind = ParamKind::Enum;
        desc.labels = labels;
        desc
    }

    /// Read-only level meter in linear gain.
    pub const fn meter(name: &'static str, short_name: &'static str, max: f32) -> Self {
        Self::gain(name, short_name, 0.0, max, 0.0).with_flags(ParamFlags::READ_ONLY)
    }

    /// Read-only on/off indicator (clip LEDs).
    pub const fn indicator(name: &'static str, short_name: &'static str) -> Self {
        Self::toggle(name, short_name, false).with_flags(ParamFlags::READ_ONLY)
    }

    /// Sets the stable numeric and string IDs.
    pub const fn with_id(mut self, id: ParamId, string_id: &'static str) -> Self {
        self.id = id;
        self.string_id = string_id;
        self
    }

    /// Sets the normalization scale.
    pub const fn with_scale(mut self, scale: ParamScale) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the display unit.
    pub const fn with_unit(mut self, unit: ParamUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Sets the step hint.
    pub const fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    /// Replaces the flags.
    pub const fn with_flags(mut self, flags: ParamFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the group.
    pub const fn with_group(mut self, group: &'static str) -> Self {
        self.group = group;
        self
    }

    /// Returns `true` for module-written outputs.
    #[inline]
    pub const fn is_read_only(&self) -> bool {
        self.flags.contains(ParamFlags::READ_ONLY)
    }

    /// Clamps a value into `[min, max]`; non-finite values become the default.
    ///
    /// [`FAKE_INFINITY`] passes through on [`ParamScale::LogInfinity`].
    ///
    /// ```rust
    /// use velour_core::ParamDescriptor;
    ///
    /// let desc = ParamDescriptor::float("Mix", "Mix", 0.0, 1.0, 0.5);
    /// assert_eq!(desc.clamp(2.0), 1.0);
    /// assert_eq!(desc.clamp(f32::NAN), 0.5);
    /// ```
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.default;
        }
        if self.scale == ParamScale::LogInfinity && is_fake_infinity(value) {
            return FAKE_INFINITY;
        }
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    /// Maps a normalized value in `[0, 1]` to the plain range.
    ///
    /// Inputs outside `[0, 1]` are clipped first.
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        let v = if normalized.is_finite() {
            f64::from(normalized.clamp(0.0, 1.0))
        } else {
            0.0
        };
        let min = f64::from(self.min);
        let max = f64::from(self.max);

        let value = match self.scale {
            ParamScale::Linear | ParamScale::Percent => min + (max - min) * v,
            ParamScale::Quadratic => min + (max - min) * v * v,
            ParamScale::Logarithmic => {
                if min <= 0.0 {
                    return self.min;
                }
                min * pow(max / min, v)
            }
            ParamScale::Gain => {
                if v < 0.00001 {
                    min
                } else {
                    let rmin = min.max(f64::from(GAIN_FLOOR));
                    rmin * pow(max / rmin, v)
                }
            }
            ParamScale::LogInfinity => {
                let step = f64::from(self.step);
                if min <= 0.0 || step <= 1.0 {
                    return self.min;
                }
                if v > (step - 1.0) / step {
                    return FAKE_INFINITY;
                }
                min * pow(max / min, v * step / (step - 1.0))
            }
        };

        let value = value as f32;
        match self.kind {
            ParamKind::Float => value,
            ParamKind::Int | ParamKind::Bool | ParamKind::Enum => round_half_away(value),
        }
    }

    /// Maps a plain value to `[0, 1]`.
    ///
    /// Inverse of [`from_normalized`](Self::from_normalized). Degenerate
    /// ranges and values outside the domain of the scale map to the nearest
    /// end.
    pub fn to_normalized(&self, value: f32) -> f32 {
        let min = f64::from(self.min);
        let max = f64::from(self.max);
        if max == min || !value.is_finite() {
            return 0.0;
        }
        let x = f64::from(value);

        let normalized = match self.scale {
            ParamScale::Linear | ParamScale::Percent => (x - min) / (max - min),
            ParamScale::Quadratic => sqrt(((x - min) / (max - min)).max(0.0)),
            ParamScale::Logarithmic => {
                if min <= 0.0 || x <= 0.0 {
                    return 0.0;
                }
                log(x / min) / log(max / min)
            }
            ParamScale::LogInfinity => {
                if is_fake_infinity(value) {
                    return 1.0;
                }
                let step = f64::from(self.step);
                if min <= 0.0 || x <= 0.0 || step <= 1.0 {
                    return 0.0;
                }
                (step - 1.0) * log(x / min) / (step * log(max / min))
            }
            ParamScale::Gain => {
                if value < GAIN_FLOOR {
                    return 0.0;
                }
                let rmin = min.max(f64::from(GAIN_FLOOR));
                log(x / rmin) / log(max / rmin)
            }
        };

        (normalized as f32).clamp(0.0, 1.0)
    }

    /// Recommended increment in normalized space.
    pub fn normalized_step(&self) -> f32 {
        if self.step > 1.0 {
            1.0 / (self.step - 1.0)
        } else if self.step > 0.0 && self.step < 1.0 {
            self.step
        } else if self.kind != ParamKind::Float && self.max > self.min {
            1.0 / (self.max - self.min)
        } else {
            0.01
        }
    }

    /// Display adapter for a value of this parameter.
    ///
    /// ```rust
    /// use velour_core::ParamDescriptor;
    ///
    /// let amount = ParamDescriptor::gain("Amount", "Amount", 0.0, 4.0, 1.0);
    /// assert_eq!(amount.display(1.0).to_string(), "0.0 dB");
    /// assert_eq!(amount.display(0.0).to_string(), "-inf dB");
    ///
    /// let width = ParamDescriptor::percent("Width", "Width", 1.0);
    /// assert_eq!(width.display(0.25).to_string(), "25%");
    /// ```
    pub fn display(&self, value: f32) -> ParamDisplay<'_> {
        ParamDisplay { desc: self, value }
    }
}

/// Formats a parameter value with its unit; see [`ParamDescriptor::display`].
#[derive(Debug, Clone, Copy)]
pub struct ParamDisplay<'a> {
    desc: &'a ParamDescriptor,
    value: f32,
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

impl fmt::Display for ParamDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = self.desc;
        let value = self.value;

        match desc.scale {
            ParamScale::Percent => return write!(f, "{:.0}%", 100.0 * value),
            ParamScale::Gain => {
                if value < GAIN_FLOOR {
                    return f.write_str("-inf dB");
                }
                return write!(f, "{:.1} dB", linear_to_db(value));
            }
            ParamScale::LogInfinity if is_fake_infinity(value) => return f.write_str("+inf"),
            _ => {}
        }

        if desc.kind == ParamKind::Enum {
            let index = value as i64;
            if let Some(label) = usize::try_from(index).ok().and_then(|i| desc.labels.get(i)) {
                return f.write_str(label);
            }
        }

        if desc.unit == ParamUnit::Note {
            let note = value as i32;
            if !(0..=127).contains(&note) {
                return f.write_str("---");
            }
            return write!(f, "{}{}", NOTE_NAMES[(note % 12) as usize], note / 12 - 1);
        }

        if desc.kind != ParamKind::Float {
            write!(f, "{}", value as i64)?;
        } else {
            let magnitude = value.abs();
            if magnitude >= 1000.0 || value == (value as i64) as f32 {
                write!(f, "{:.0}", value)?;
            } else if magnitude >= 100.0 {
                write!(f, "{:.1}", value)?;
            } else if magnitude >= 1.0 {
                write!(f, "{:.2}", value)?;
            } else {
                write!(f, "{:.3}", value)?;
            }
        }
        f.write_str(desc.unit.suffix())
    }
}
