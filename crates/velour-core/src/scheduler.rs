//! Periodic recompute scheduling.
//!
//! Recomputing filter coefficients every sample is too expensive, and once
//! per host block is too coarse to follow a moving parameter. A
//! [`BlockScheduler`] hands out sub-block lengths that never cross a period
//! boundary, so derived state is refreshed at most once per period with a
//! worst-case latency of one period.
//!
//! ```rust
//! use velour_core::BlockScheduler;
//!
//! let mut timer = BlockScheduler::for_sample_rate(48000, 1.0);
//! assert_eq!(timer.period(), 48);
//!
//! assert_eq!(timer.get(32), 32);
//! assert_eq!(timer.get(32), 16); // clipped at the boundary
//! assert!(timer.elapsed());
//! timer.restart();
//! assert_eq!(timer.generation(), 1);
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

/// Default recompute interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: f32 = 1.0;

/// Tick source bounding sub-block lengths by a fixed period.
#[derive(Debug, Clone)]
pub struct BlockScheduler {
    period: usize,
    remaining: usize,
    generation: u32,
}

impl BlockScheduler {
    /// Creates a scheduler with the given period in samples (at least 1).
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            remaining: period,
            generation: 0,
        }
    }

    /// Creates a scheduler whose period is `ceil(sample_rate * interval_ms / 1000)`.
    pub fn for_sample_rate(sample_rate: u32, interval_ms: f32) -> Self {
        Self::new(period_for(sample_rate, interval_ms))
    }

    /// Returns `min(requested, remaining)` and consumes that budget.
    #[inline]
    pub fn get(&mut self, requested: usize) -> usize {
        let n = requested.min(self.remaining);
        self.remaining -= n;
        n
    }

    /// Returns `true` once the period budget is exhausted.
    ///
    /// Stays true until [`restart`](Self::restart) is called.
    #[inline]
    pub fn elapsed(&self) -> bool {
        self.remaining == 0
    }

    /// Refills the period after a recompute and bumps the generation.
    #[inline]
    pub fn restart(&mut self) {
        self.remaining = self.period;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Refills the period without counting a generation.
    pub fn start(&mut self) {
        self.remaining = self.period;
    }

    /// Forces a boundary at the next check.
    pub fn signal(&mut self) {
        self.remaining = 0;
    }

    /// Changes the period; the current period restarts.
    pub fn set_period(&mut self, period: usize) {
        self.period = period.max(1);
        self.remaining = self.period;
    }

    /// Period in samples.
    #[inline]
    pub fn period(&self) -> usize {
        self.period
    }

    /// Samples left in the current period.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Number of completed recompute boundaries.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Computes `ceil(sample_rate * interval_ms / 1000)`, at least 1.
pub fn period_for(sample_rate: u32, interval_ms: f32) -> usize {
    let exact = sample_rate as f32 * interval_ms / 1000.0;
    let whole = exact as usize;
    let period = if (whole as f32) < exact { whole + 1 } else { whole };
    period.max(1)
}

/// Generation counter shared with observer threads.
///
/// Uses relaxed ordering: readers may lag by up to one scheduler period,
/// which only delays a redraw or a cache refresh.
#[derive(Debug, Default)]
pub struct GenerationTag(AtomicU32);

impl GenerationTag {
    /// Creates a tag holding `generation`.
    pub const fn new(generation: u32) -> Self {
        Self(AtomicU32::new(generation))
    }

    /// Publishes a new generation.
    #[inline]
    pub fn publish(&self, generation: u32) {
        self.0.store(generation, Ordering::Relaxed);
    }

    /// Reads the most recently published generation.
    #[inline]
    pub fn load(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}
