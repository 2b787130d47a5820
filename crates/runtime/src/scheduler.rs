//! The query system: harvest, deadline check and dispatch, once per tick.
//!
//! # Workflow
//!
//! 1. **Harvest** every in-flight query whose worker has finished and apply
//!    the result to the entity's blackboard through its parser
//! 2. **Expire** queries older than the configured timeout. The worker keeps
//!    running; its eventual result is dropped
//! 3. **Dispatch** eligible agents by `(priority desc, entity asc)`, bounded by
//!    the per-tick and per-second limits
//!
//! Nothing here blocks. Every per-tick failure is reported to error observers
//! and never escapes [`System::run`].

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use behavior_tree::Blackboard;
use sim_world::{EntityId, System, Tick, TickContext, World};
use tracing::{debug, info, warn};

use crate::components::StrategicAgent;
use crate::config::SchedulerConfig;
use crate::error::{ErrorKind, ParseError, SchedulerError};
use crate::events::{DispatchEvent, ErrorEvent, ResponseEvent};
use crate::parsers::default_json_parser;
use crate::registry::{SharedStrategy, StrategicRegistry};
use crate::workers::{Completion, QueryMetrics, Reply, Ticket, WorkerPool};

const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Scheduler-owned record of one outstanding query. Never persisted.
struct InFlight {
    ticket: Ticket,
    submitted_at: Instant,
    submitted_tick: Tick,
}

/// Tick system driving strategic queries for every [`StrategicAgent`].
///
/// Register it before the tree and utility systems so that harvested
/// strategies are visible to them on the same tick.
pub struct QuerySystem<W> {
    registry: SharedStrategy<W>,
    config: SchedulerConfig,
    pool: WorkerPool,
    in_flight: BTreeMap<EntityId, InFlight>,
    /// Wall-clock instants of recent dispatches, oldest first.
    dispatch_times: VecDeque<Instant>,
    metrics: Arc<QueryMetrics>,
    shut_down: bool,
}

impl<W> QuerySystem<W> {
    pub fn new(registry: SharedStrategy<W>, config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        let metrics = Arc::new(QueryMetrics::new());
        let pool = WorkerPool::new(config.thread_pool_size, Arc::clone(&metrics))?;

        Ok(Self {
            registry,
            config,
            pool,
            in_flight: BTreeMap::new(),
            dispatch_times: VecDeque::new(),
            metrics,
            shut_down: false,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Returns a clone of the metrics Arc for external querying.
    pub fn metrics(&self) -> Arc<QueryMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of queries currently tracked.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, entity: EntityId) -> bool {
        self.in_flight.contains_key(&entity)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Drops every in-flight query and stops the pool without waiting.
    ///
    /// Later calls to `run` do nothing. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let abandoned = self.abandon_all();
        self.pool.shutdown();
        info!(abandoned, "query system shut down");
    }

    fn abandon_all(&mut self) -> usize {
        let records = std::mem::take(&mut self.in_flight);
        let count = records.len();
        for record in records.into_values() {
            record.ticket.abandon();
        }
        count
    }

    /// Records a failure against the agent and reports it.
    fn fail(
        &self,
        world: &mut W,
        registry: &StrategicRegistry<W>,
        tick: Tick,
        entity: EntityId,
        kind: ErrorKind,
        message: String,
    ) where
        W: World,
    {
        match kind {
            ErrorKind::Timeout => self.metrics.record_timeout(),
            _ => self.metrics.record_failure(),
        }

        if let Some(agent) = world.get_mut::<StrategicAgent>(entity)
            && agent.mark_failed(tick)
        {
            warn!(
                %entity,
                errors = agent.consecutive_errors,
                until = %agent.cooldown_until,
                "agent entered cooldown"
            );
        }

        registry.notify_error(&ErrorEvent {
            entity,
            kind,
            message,
            tick,
        });
    }
}

impl<W: World> QuerySystem<W> {
    /// Forgets all in-flight queries and clears `pending` on every agent.
    ///
    /// Call after loading a snapshot into `world`; outstanding work from
    /// before the save cannot be recovered.
    pub fn reset_after_restore(&mut self, world: &mut W) {
        let abandoned = self.abandon_all();
        for entity in world.entities_with::<StrategicAgent>() {
            if let Some(agent) = world.get_mut::<StrategicAgent>(entity) {
                agent.pending = false;
            }
        }
        info!(abandoned, "query state reset after restore");
    }

    fn harvest(&mut self, world: &mut W, ctx: &TickContext, registry: &StrategicRegistry<W>) {
        let mut finished = Vec::new();
        for (&entity, record) in &mut self.in_flight {
            match record.ticket.poll() {
                Completion::Waiting => {}
                Completion::Done(reply) => finished.push((entity, Some(reply))),
                Completion::Lost => finished.push((entity, None)),
            }
        }

        for (entity, reply) in finished {
            if let Some(record) = self.in_flight.remove(&entity) {
                self.complete(world, ctx, registry, entity, &record, reply);
            }
        }
    }

    fn complete(
        &self,
        world: &mut W,
        ctx: &TickContext,
        registry: &StrategicRegistry<W>,
        entity: EntityId,
        record: &InFlight,
        reply: Option<Reply>,
    ) {
        let Some(parser) = world.get::<StrategicAgent>(entity).map(|a| a.parser.clone()) else {
            debug!(%entity, "agent removed while query was in flight");
            return;
        };
        let Some(mut scratch) = world.get::<Blackboard>(entity).cloned() else {
            debug!(%entity, "blackboard removed while query was in flight");
            if let Some(agent) = world.get_mut::<StrategicAgent>(entity) {
                agent.pending = false;
            }
            return;
        };

        let tick = ctx.tick;
        let Some(reply) = reply else {
            let message = "worker ended without a result".to_owned();
            return self.fail(world, registry, tick, entity, ErrorKind::WorkerLost, message);
        };

        let latency = reply.finished_at.saturating_duration_since(record.submitted_at);
        let response = match reply.result {
            Ok(response) => response,
            Err(e) => {
                return self.fail(world, registry, tick, entity, ErrorKind::QueryError, e.to_string());
            }
        };

        // A result that arrives after its deadline is still a timeout.
        if latency > self.config.query_timeout {
            let message = format!(
                "query completed after {latency:?}, timeout is {:?}",
                self.config.query_timeout
            );
            return self.fail(world, registry, tick, entity, ErrorKind::Timeout, message);
        }

        // Parse into a copy so a rejected response leaves the blackboard untouched.
        let parsed = if parser.is_empty() {
            default_json_parser(&response, &mut scratch)
        } else {
            match registry.parser(&parser) {
                Some(parse) => parse(&response, &mut scratch),
                None => Err(ParseError::Rejected(format!("parser '{parser}' is not registered"))),
            }
        };
        if let Err(e) = parsed {
            return self.fail(world, registry, tick, entity, ErrorKind::ParseError, e.to_string());
        }

        if let Some(blackboard) = world.get_mut::<Blackboard>(entity) {
            *blackboard = scratch;
        }
        if let Some(agent) = world.get_mut::<StrategicAgent>(entity) {
            agent.mark_succeeded();
        }
        self.metrics.record_success(latency);

        debug!(
            %entity,
            ?latency,
            submitted = %record.submitted_tick,
            %tick,
            "strategy updated"
        );
        registry.notify_response(&ResponseEvent {
            entity,
            latency,
            response_chars: response.chars().count(),
            tick,
        });
    }

    fn expire(&mut self, world: &mut W, ctx: &TickContext, registry: &StrategicRegistry<W>) {
        let timeout = self.config.query_timeout;
        let now = Instant::now();
        let expired: Vec<EntityId> = self
            .in_flight
            .iter()
            .filter(|(_, record)| now.saturating_duration_since(record.submitted_at) > timeout)
            .map(|(&entity, _)| entity)
            .collect();

        for entity in expired {
            let Some(record) = self.in_flight.remove(&entity) else {
                continue;
            };
            let orphaned = record.ticket.abandon();
            debug!(%entity, orphaned, submitted = %record.submitted_tick, "query abandoned");

            let message = format!("query timed out after {timeout:?}");
            self.fail(world, registry, ctx.tick, entity, ErrorKind::Timeout, message);
        }
    }

    fn dispatch(&mut self, world: &mut W, ctx: &TickContext, registry: &StrategicRegistry<W>) {
        let tick = ctx.tick;
        let agents = world.entities_with::<StrategicAgent>();

        let Some(client) = registry.client().cloned() else {
            if let Some(&entity) = agents.first() {
                registry.notify_error(&ErrorEvent {
                    entity,
                    kind: ErrorKind::NoClient,
                    message: "no client registered".to_owned(),
                    tick,
                });
            }
            return;
        };

        let now = Instant::now();
        while self
            .dispatch_times
            .front()
            .is_some_and(|&at| now.saturating_duration_since(at) >= RATE_WINDOW)
        {
            self.dispatch_times.pop_front();
        }

        let mut eligible: Vec<(i32, EntityId)> = agents
            .into_iter()
            .filter_map(|entity| {
                let agent = world.get::<StrategicAgent>(entity)?;
                agent.is_eligible(tick).then_some((agent.priority, entity))
            })
            .collect();
        eligible.sort_by_key(|&(priority, entity)| (Reverse(priority), entity));

        let mut dispatched = 0;
        for (_, entity) in eligible {
            if dispatched >= self.config.max_queries_per_tick
                || self.dispatch_times.len() >= self.config.max_queries_per_second
            {
                break;
            }

            let Some(agent) = world.get::<StrategicAgent>(entity) else {
                continue;
            };
            let missing = registry.missing_definitions(agent);
            if !missing.is_empty() {
                registry.notify_error(&ErrorEvent {
                    entity,
                    kind: ErrorKind::MissingDefinition,
                    message: format!("missing {}", missing.join(", ")),
                    tick,
                });
                continue;
            }
            if !world.has::<Blackboard>(entity) {
                continue;
            }
            let Some(prompt) = registry.assemble_prompt(world, entity, agent) else {
                continue;
            };

            let prompt_chars = prompt.len();
            let submitted_at = Instant::now();
            let Some(ticket) = self.pool.submit(Arc::clone(&client), prompt) else {
                return;
            };
            self.in_flight.insert(
                entity,
                InFlight {
                    ticket,
                    submitted_at,
                    submitted_tick: tick,
                },
            );
            self.dispatch_times.push_back(submitted_at);
            if let Some(agent) = world.get_mut::<StrategicAgent>(entity) {
                agent.mark_dispatched(tick);
            }
            self.metrics.record_dispatch();
            dispatched += 1;

            debug!(%entity, %tick, prompt_chars, "query dispatched");
            registry.notify_query(&DispatchEvent {
                entity,
                prompt_chars,
                tick,
            });
        }
    }
}

impl<W: World> System<W> for QuerySystem<W> {
    fn name(&self) -> &str {
        "strategy_query"
    }

    fn run(&mut self, world: &mut W, ctx: &TickContext) {
        if self.shut_down {
            return;
        }

        let shared = Rc::clone(&self.registry);
        let registry = shared.borrow();
        self.harvest(world, ctx, &registry);
        self.expire(world, ctx, &registry);
        self.dispatch(world, ctx, &registry);
    }
}

impl<W> Drop for QuerySystem<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
