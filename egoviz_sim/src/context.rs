//! Virtual clock and seeded randomness for headless playback runs.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Fixed-rate virtual clock.
///
/// Time only moves when the harness ticks it, so a run with the same
/// configuration always sees the same sequence of deltas.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Master seed for this run
    seed: u64,

    /// Host ticks per second
    tick_rate_hz: u32,

    /// Current virtual time (nanoseconds since run start)
    time_ns: u64,

    tick_count: u64,
}

impl SimClock {
    /// Creates a clock at t = 0. A tick rate of 0 is treated as 1 Hz.
    pub fn new(seed: u64, tick_rate_hz: u32) -> Self {
        Self {
            seed,
            tick_rate_hz: tick_rate_hz.max(1),
            time_ns: 0,
            tick_count: 0,
        }
    }

    /// Seconds per host tick.
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// Advances by one host tick and returns the delta in seconds.
    pub fn tick(&mut self) -> f64 {
        let dt = self.dt();
        self.advance(Duration::from_secs_f64(dt));
        self.tick_count += 1;
        dt
    }

    /// Advances virtual time by the given duration.
    pub fn advance(&mut self, duration: Duration) {
        self.time_ns += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns)
    }

    pub fn time_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derives an independent RNG stream from the master seed.
    pub fn derive_rng(&self, stream: u64) -> ChaCha8Rng {
        let combined_seed = self.seed.wrapping_mul(0x517cc1b727220a95) ^ stream;
        ChaCha8Rng::seed_from_u64(combined_seed)
    }
}
