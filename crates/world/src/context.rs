//! Per-tick clock view handed to systems.

use std::time::Instant;

use crate::Tick;

/// Read-only snapshot of the clock for the tick being executed.
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    /// Current tick number (starts at 1).
    pub tick: Tick,
    /// Fixed timestep in seconds.
    pub dt: f64,
    /// Simulated time elapsed, `tick * dt`.
    pub elapsed: f64,
    /// Wall-clock instant at which this tick started. Used for timeouts only,
    /// never for simulation decisions.
    pub started_at: Instant,
}

impl TickContext {
    pub fn new(tick: Tick, dt: f64) -> Self {
        Self {
            tick,
            dt,
            elapsed: tick.0 as f64 * dt,
            started_at: Instant::now(),
        }
    }
}
