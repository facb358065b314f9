//! Producer liveness inferred from tick progression.
//!
//! A producer that exits does not clear the segment: the last frame stays
//! mapped with plausible contents. The only reliable signal is whether the
//! tick keeps moving between polls.
//!
//! # Algorithm
//!
//! ```text
//! tick == last tick  ->  stale_cycles += 1
//! tick != last tick  ->  stale_cycles  = 0, last tick = tick
//! connected          <=> stale_cycles < threshold
//! ```
//!
//! There is no previous tick before the first observation, so the first
//! observation counts as movement and reads as connected. Leftover bytes from
//! a dead session go offline after `threshold` polls like any other stall.

/// Consecutive unchanged polls after which the producer counts as gone.
pub const DEFAULT_STALE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone)]
pub struct Liveness {
    last_tick: Option<u32>,
    stale_cycles: u32,
    threshold: u32,
}

impl Liveness {
    pub fn new(threshold: u32) -> Self {
        Self {
            last_tick: None,
            stale_cycles: 0,
            threshold,
        }
    }

    /// Feed the tick from one poll and return whether the producer is live.
    #[inline]
    pub fn observe(&mut self, tick: u32) -> bool {
        match self.last_tick {
            Some(last) if last == tick => {
                self.stale_cycles = self.stale_cycles.saturating_add(1);
            }
            _ => self.stale_cycles = 0,
        }
        self.last_tick = Some(tick);
        self.is_connected()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.stale_cycles < self.threshold
    }

    pub fn stale_cycles(&self) -> u32 {
        self.stale_cycles
    }

    /// Forget the last tick, as after reopening the segment.
    pub fn reset(&mut self) {
        *self = Self::new(self.threshold);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_THRESHOLD)
    }
}
