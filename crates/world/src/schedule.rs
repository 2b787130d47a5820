//! Tick-callable systems and the fixed-timestep schedule that drives them.

use crate::{Tick, TickContext};

/// A unit of per-tick work.
///
/// Systems run sequentially on the simulation thread in registration order and
/// must not block.
pub trait System<W> {
    /// Short label used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn run(&mut self, world: &mut W, ctx: &TickContext);
}

impl<W, F> System<W> for F
where
    F: FnMut(&mut W, &TickContext),
{
    fn run(&mut self, world: &mut W, ctx: &TickContext) {
        self(world, ctx)
    }
}

/// Ordered list of systems plus a fixed-timestep clock.
pub struct Schedule<W> {
    systems: Vec<Box<dyn System<W>>>,
    tick: Tick,
    dt: f64,
}

impl<W> Schedule<W> {
    pub fn new(dt: f64) -> Self {
        Self {
            systems: Vec::new(),
            tick: Tick::ZERO,
            dt,
        }
    }

    /// Appends a system. Systems run in the order they were added.
    pub fn add_system(&mut self, system: impl System<W> + 'static) -> &mut Self {
        self.systems.push(Box::new(system));
        self
    }

    /// The last tick executed, `Tick::ZERO` before the first step.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Moves the clock to `tick` without running anything (snapshot restore).
    pub fn reset(&mut self, tick: Tick) {
        self.tick = tick;
    }

    /// Advances the clock by one tick and runs every system once.
    pub fn step(&mut self, world: &mut W) -> TickContext {
        self.tick = self.tick + 1;
        let ctx = TickContext::new(self.tick, self.dt);
        for system in &mut self.systems {
            tracing::trace!(tick = %ctx.tick, system = system.name(), "running system");
            system.run(world, &ctx);
        }
        ctx
    }

    pub fn run(&mut self, world: &mut W, ticks: u64) {
        for _ in 0..ticks {
            self.step(world);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn systems_run_in_registration_order() {
        let mut log: Vec<(u64, &'static str)> = Vec::new();
        let mut schedule = Schedule::new(0.1);
        schedule
            .add_system(|w: &mut Vec<(u64, &'static str)>, ctx: &TickContext| {
                w.push((ctx.tick.0, "first"))
            })
            .add_system(|w: &mut Vec<(u64, &'static str)>, ctx: &TickContext| {
                w.push((ctx.tick.0, "second"))
            });

        schedule.run(&mut log, 2);

        assert_eq!(
            log,
            vec![(1, "first"), (1, "second"), (2, "first"), (2, "second")]
        );
        assert_eq!(schedule.tick(), Tick(2));
    }

    #[test]
    fn context_tracks_elapsed_time() {
        let mut schedule: Schedule<()> = Schedule::new(0.5);
        schedule.reset(Tick(3));
        let ctx = schedule.step(&mut ());
        assert_eq!(ctx.tick, Tick(4));
        assert!((ctx.elapsed - 2.0).abs() < f64::EPSILON);
    }
}
