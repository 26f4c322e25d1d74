//! Tick timing for the Granule scheduler
//!
//! Measures the wall-clock time between ticks and hands it to systems as a
//! `Duration`. Drivers that pace ticks themselves can feed explicit deltas.

use std::time::{Duration, Instant};

/// Tracks elapsed time between scheduler ticks
#[derive(Debug, Clone)]
pub struct TickClock {
    /// Upper bound applied to every delta (prevents a stalled driver from
    /// handing systems one enormous step)
    pub max_delta: Option<Duration>,
    /// Baseline for the next elapsed-time measurement
    last_tick: Instant,
    /// Delta handed out by the most recent tick (clamped)
    delta: Duration,
    /// Sum of all deltas handed out so far
    total: Duration,
    /// Number of ticks recorded
    tick_count: u64,
}

impl Default for TickClock {
    fn default() -> Self {
        Self {
            max_delta: None,
            last_tick: Instant::now(),
            delta: Duration::ZERO,
            total: Duration::ZERO,
            tick_count: 0,
        }
    }
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock that clamps every delta to `max_delta`
    pub fn with_max_delta(max_delta: Duration) -> Self {
        Self {
            max_delta: Some(max_delta),
            ..Default::default()
        }
    }

    /// Measure the time since the previous tick and make now the new baseline
    pub fn tick(&mut self) -> Duration {
        self.tick_at(Instant::now())
    }

    /// Like [`TickClock::tick`], with the current instant supplied by the caller
    pub fn tick_at(&mut self, now: Instant) -> Duration {
        let raw = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.record(raw)
    }

    /// Record a tick with an externally chosen elapsed time
    pub fn advance(&mut self, raw: Duration) -> Duration {
        self.last_tick = Instant::now();
        self.record(raw)
    }

    fn record(&mut self, raw: Duration) -> Duration {
        let delta = match self.max_delta {
            Some(max) => raw.min(max),
            None => raw,
        };
        self.delta = delta;
        self.total += delta;
        self.tick_count += 1;
        delta
    }

    /// Delta of the most recent tick
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Total simulated time across all ticks
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Number of ticks recorded so far
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
