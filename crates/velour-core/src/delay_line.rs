//! Fixed-capacity delay memory with stereo routing.
//!
//! [`DelayBuffer`] is a power-of-two circular buffer that remembers how many
//! samples were written since the last clear (its *age*), so reads that reach
//! further back than the history return silence instead of stale memory.
//! [`StereoDelayLine`] pairs two buffers and implements the [`MixMode`]
//! routings used by tempo delays.
//!
//! Memory is reserved once at construction with `try_reserve_exact`, so an
//! allocation failure is reported to the caller instead of aborting, and
//! nothing on the processing path allocates.
//!
//! ```rust
//! use velour_core::DelayBuffer;
//!
//! let mut line = DelayBuffer::try_new(1024).unwrap();
//! line.write(1.0);
//! line.write(0.0);
//! assert_eq!(line.read(2), 1.0);
//! assert_eq!(line.read(3), 0.0); // older than the history
//! ```

use alloc::collections::TryReserveError;
use alloc::vec::Vec;

use crate::math::{flush_denormal, lerp};

/// Circular sample buffer with age tracking.
///
/// # Invariants
///
/// - `buffer.len()` is a power of two and `mask == buffer.len() - 1`
/// - `cursor < buffer.len()`
/// - `age <= buffer.len()`
#[derive(Debug, Clone)]
pub struct DelayBuffer {
    buffer: Vec<f32>,
    mask: usize,
    cursor: usize,
    age: usize,
}

impl DelayBuffer {
    /// Allocates a zeroed buffer of at least `capacity` samples.
    ///
    /// The capacity is rounded up to a power of two (minimum 2).
    pub fn try_new(capacity: usize) -> Result<Self, TryReserveError> {
        let size = capacity.max(2).next_power_of_two();
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size)?;
        buffer.resize(size, 0.0);
        Ok(Self {
            buffer,
            mask: size - 1,
            cursor: 0,
            age: 0,
        })
    }

    /// Stores a sample at the cursor and advances it.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.cursor] = sample;
        self.cursor = (self.cursor + 1) & self.mask;
        if self.age < self.buffer.len() {
            self.age += 1;
        }
    }

    /// Returns the sample written `delay` writes ago.
    ///
    /// `delay` is masked into the buffer. A masked delay of zero, or one
    /// reaching past the written history, reads as silence.
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let delay = delay & self.mask;
        if delay == 0 || delay > self.age {
            return 0.0;
        }
        self.buffer[self.cursor.wrapping_sub(delay) & self.mask]
    }

    /// Zeroes the memory and forgets the history.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.cursor = 0;
        self.age = 0;
    }

    /// Number of valid samples written, capped at the capacity.
    #[inline]
    pub fn age(&self) -> usize {
        self.age
    }

    /// Capacity in samples (a power of two).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Longest delay that [`read`](Self::read) can return.
    #[inline]
    pub fn max_delay(&self) -> usize {
        self.mask
    }
}

/// Routing of a stereo delay's taps and feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixMode {
    /// Each channel echoes and feeds back into itself.
    #[default]
    Stereo,
    /// Each channel's echo is read from the other channel's line, so
    /// repeats alternate sides.
    PingPong,
    /// The left line drives both taps: left echoes after the left time,
    /// right echoes a right time later, and the cycle repeats.
    LeftToRight,
    /// Mirror of [`MixMode::LeftToRight`] driven by the right line.
    RightToLeft,
}

/// Display labels in index order.
pub const MIX_MODE_LABELS: [&str; 4] = ["Stereo", "Ping-Pong", "L then R", "R then L"];

impl MixMode {
    /// All modes in index order.
    pub const ALL: [MixMode; 4] = [
        MixMode::Stereo,
        MixMode::PingPong,
        MixMode::LeftToRight,
        MixMode::RightToLeft,
    ];

    /// Maps an index to a mode; anything out of range falls back to [`MixMode::Stereo`].
    pub fn from_index(index: i32) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        MIX_MODE_LABELS[self as usize]
    }
}

/// Tap positions in samples for both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelayTaps {
    /// Left tap distance.
    pub left: usize,
    /// Right tap distance.
    pub right: usize,
}

/// One routed sample frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DelayFrame {
    /// Echo signal per channel, before wet gain.
    pub wet: [f32; 2],
    /// Signal to write into each line.
    pub feed: [f32; 2],
}

/// Two delay buffers of equal capacity.
#[derive(Debug, Clone)]
pub struct StereoDelayLine {
    lines: [DelayBuffer; 2],
}

impl StereoDelayLine {
    /// Allocates both lines with at least `capacity` samples each.
    pub fn try_new(capacity: usize) -> Result<Self, TryReserveError> {
        Ok(Self {
            lines: [DelayBuffer::try_new(capacity)?, DelayBuffer::try_new(capacity)?],
        })
    }

    /// Writes one sample to a channel's line. Unknown channels are ignored.
    #[inline]
    pub fn write(&mut self, channel: usize, sample: f32) {
        if let Some(line) = self.lines.get_mut(channel) {
            line.write(sample);
        }
    }

    /// Reads a channel's line `delay` samples back. Unknown channels read silence.
    #[inline]
    pub fn read(&self, channel: usize, delay: usize) -> f32 {
        self.lines.get(channel).map_or(0.0, |line| line.read(delay))
    }

    /// Computes the echo and feedback signals for one frame.
    ///
    /// Reads happen before this frame is written, so a tap of `n` samples
    /// returns what was pushed `n` frames ago. Call [`push`](Self::push)
    /// with the returned feed afterwards.
    #[inline]
    pub fn route(
        &self,
        mode: MixMode,
        input: [f32; 2],
        taps: DelayTaps,
        feedback: [f32; 2],
    ) -> DelayFrame {
        let [left, right] = &self.lines;
        match mode {
            MixMode::Stereo | MixMode::PingPong => {
                let (src_l, src_r) = if mode == MixMode::PingPong {
                    (right, left)
                } else {
                    (left, right)
                };
                let tap_l = flush_denormal(src_l.read(taps.left));
                let tap_r = flush_denormal(src_r.read(taps.right));
                DelayFrame {
                    wet: [tap_l, tap_r],
                    feed: [input[0] + tap_l * feedback[0], input[1] + tap_r * feedback[1]],
                }
            }
            MixMode::LeftToRight | MixMode::RightToLeft => {
                let cycle = taps.left + taps.right;
                let (src, near_l, near_r) = if mode == MixMode::LeftToRight {
                    (left, taps.left, cycle)
                } else {
                    (right, cycle, taps.right)
                };
                let tap_l = flush_denormal(src.read(near_l));
                let tap_r = flush_denormal(src.read(near_r));
                DelayFrame {
                    wet: [tap_l, tap_r],
                    feed: [input[0] + tap_r * feedback[0], input[1] + tap_l * feedback[1]],
                }
            }
        }
    }

    /// Writes one frame of feed signal into both lines.
    #[inline]
    pub fn push(&mut self, feed: [f32; 2]) {
        let [left, right] = &mut self.lines;
        left.write(feed[0]);
        right.write(feed[1]);
    }

    /// Clears both lines.
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }

    /// History length shared by both lines.
    #[inline]
    pub fn age(&self) -> usize {
        self.lines[0].age()
    }

    /// Longest usable tap distance.
    #[inline]
    pub fn max_delay(&self) -> usize {
        self.lines[0].max_delay()
    }
}

/// Cross-fades the wet pair by `chmix` and adds the scaled dry input.
///
/// `chmix = (1 - width) / 2`: width 1 keeps channels apart, width 0 sums to
/// mono, width -1 swaps them.
#[inline]
pub fn stereo_mix(dry_in: [f32; 2], wet: [f32; 2], dry: f32, chmix: f32) -> [f32; 2] {
    [
        dry_in[0] * dry + lerp(wet[0], wet[1], chmix),
        dry_in[1] * dry + lerp(wet[1], wet[0], chmix),
    ]
}

/// Tempo-synced delay length: `round(60 * sample_rate / (bpm * subdivision) * time)`.
///
/// Non-positive tempo or subdivision yields zero.
pub fn tempo_delay_samples(bpm: f32, subdivision: f32, time: f32, sample_rate: f32) -> usize {
    if bpm <= 0.0 || subdivision <= 0.0 || time <= 0.0 {
        return 0;
    }
    let unit = 60.0 * sample_rate / (bpm * subdivision);
    (unit * time + 0.5) as usize
}
