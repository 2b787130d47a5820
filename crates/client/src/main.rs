//! Decision engine demo binary.
//!
//! Composition root that assembles:
//! 1. A [`ComponentWorld`] with a handful of soldiers
//! 2. The strategic query system backed by the offline commander
//! 3. Behavior tree and utility systems reading the shared blackboards
//!
//! # Environment
//!
//! - `RUST_LOG` - log filter (default: `info`)
//! - `LLM_*` - scheduler limits, see [`SchedulerConfig::from_env`]
//! - `SIM_TICKS` - ticks to run (default: 200)
//! - `SIM_TICK_MS` - wall-clock pacing per tick in milliseconds (default: 10)
//! - `SIM_SOLDIERS` - squad size (default: 4)
//! - `SIM_MOCK_LATENCY_MS` - simulated commander latency (default: 25)

mod scenario;

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use behavior_tree::{Blackboard, TreeSystem, UtilityState, UtilitySystem};
use sim_world::{ComponentWorld, Schedule, World};
use strategy_runtime::{ErrorEvent, MockClient, QuerySystem, ResponseEvent, SchedulerConfig};

use scenario::Vitals;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 1. Load configuration from environment
    let config = SchedulerConfig::from_env();
    config.validate().context("invalid scheduler configuration")?;
    let ticks: u64 = env_or("SIM_TICKS", 200);
    let pacing = Duration::from_millis(env_or("SIM_TICK_MS", 10));
    let soldiers: u32 = env_or("SIM_SOLDIERS", 4);
    let latency = Duration::from_millis(env_or("SIM_MOCK_LATENCY_MS", 25));

    tracing::info!(?config, ticks, soldiers, "starting simulation");

    // 2. Registries
    let decisions = scenario::decisions().context("soldier tree failed validation")?;
    let strategy = scenario::strategy();
    {
        let mut reg = strategy.borrow_mut();
        reg.register_client(MockClient::with_responder(scenario::commander).latency(latency));
        reg.on_response(|e: &ResponseEvent| {
            tracing::info!(entity = %e.entity, tick = %e.tick, latency = ?e.latency, "orders received");
        });
        reg.on_error(|e: &ErrorEvent| {
            if !e.kind.is_transient() {
                tracing::error!(entity = %e.entity, kind = %e.kind, "configuration problem");
            }
        });
    }

    // 3. World and schedule
    let mut world = ComponentWorld::new();
    let squad = scenario::populate(&mut world, soldiers).context("failed to populate world")?;

    let query = QuerySystem::new(Rc::clone(&strategy), config)
        .context("failed to start query system")?;
    let metrics = query.metrics();

    let mut schedule = Schedule::new(pacing.as_secs_f64());
    schedule
        .add_system(query)
        .add_system(TreeSystem::new(Rc::clone(&decisions)).on_status(|_, ctx, e, status| {
            tracing::debug!(entity = %e, tick = %ctx.tick, status = status.as_str(), "tree finished");
        }))
        .add_system(UtilitySystem::new(Rc::clone(&decisions)).on_select(
            |_, ctx, e, stance, score| {
                tracing::debug!(entity = %e, tick = %ctx.tick, %stance, score, "stance chosen");
            },
        ));

    // 4. Run
    for _ in 0..ticks {
        schedule.step(&mut world);
        thread::sleep(pacing);
    }

    for e in squad {
        let hp = world.get::<Vitals>(e).map_or(0, |v| v.hp);
        let goal = world
            .get::<Blackboard>(e)
            .and_then(|bb| bb.strategy())
            .and_then(|s| s.get("goal"))
            .and_then(|g| g.as_str())
            .unwrap_or("none")
            .to_owned();
        let stance = world
            .get::<UtilityState>(e)
            .map(|u| u.selected_action.clone())
            .unwrap_or_default();
        tracing::info!(entity = %e, hp, %goal, %stance, "final state");
    }

    // Dropping the schedule shuts the query system down.
    drop(schedule);
    let snapshot = metrics.snapshot();
    tracing::info!(
        dispatched = snapshot.dispatched,
        succeeded = snapshot.succeeded,
        failed = snapshot.failed,
        timed_out = snapshot.timed_out,
        orphaned = snapshot.orphaned,
        avg_latency = ?snapshot.avg_latency,
        "simulation finished"
    );

    Ok(())
}
