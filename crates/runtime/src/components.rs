//! Per-entity strategic state.

use serde::{Deserialize, Serialize};
use sim_world::Tick;

/// Marks an entity as strategically driven and tracks its query lifecycle.
///
/// The record is fully serializable, but a query in flight cannot survive a
/// save. Hosts restoring a snapshot must call [`StrategicAgent::restored`]
/// (or [`QuerySystem::reset_after_restore`](crate::QuerySystem::reset_after_restore)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicAgent {
    pub role: String,
    pub personality: String,
    /// Name of the context builder producing the user message.
    pub context: String,
    /// Response parser name; empty selects the built-in JSON parser.
    #[serde(default)]
    pub parser: String,
    /// Minimum ticks between two dispatches.
    pub query_interval: u64,
    /// Higher values are dispatched first when rate limited.
    pub priority: i32,
    pub last_query_tick: Tick,
    pub pending: bool,
    pub consecutive_errors: u32,
    /// Consecutive failures that trigger a cooldown.
    pub max_retries: u32,
    pub cooldown_ticks: u64,
    pub cooldown_until: Tick,
}

impl StrategicAgent {
    pub fn new(
        role: impl Into<String>,
        personality: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            personality: personality.into(),
            context: context.into(),
            parser: String::new(),
            query_interval: 100,
            priority: 0,
            last_query_tick: Tick::ZERO,
            pending: false,
            consecutive_errors: 0,
            max_retries: 3,
            cooldown_ticks: 200,
            cooldown_until: Tick::ZERO,
        }
    }

    pub fn with_parser(mut self, parser: impl Into<String>) -> Self {
        self.parser = parser.into();
        self
    }

    pub fn with_interval(mut self, query_interval: u64) -> Self {
        self.query_interval = query_interval;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_retry_policy(mut self, max_retries: u32, cooldown_ticks: u64) -> Self {
        self.max_retries = max_retries;
        self.cooldown_ticks = cooldown_ticks;
        self
    }

    /// Clears `pending`, which never survives a restore.
    pub fn restored(mut self) -> Self {
        self.pending = false;
        self
    }

    /// Idle, outside cooldown and due for another query at `tick`.
    pub fn is_eligible(&self, tick: Tick) -> bool {
        !self.pending
            && self.cooldown_until <= tick
            && tick.since(self.last_query_tick) >= self.query_interval
    }

    pub fn in_cooldown(&self, tick: Tick) -> bool {
        self.cooldown_until > tick
    }

    pub(crate) fn mark_dispatched(&mut self, tick: Tick) {
        self.pending = true;
        self.last_query_tick = tick;
    }

    pub(crate) fn mark_succeeded(&mut self) {
        self.pending = false;
        self.consecutive_errors = 0;
    }

    /// Counts a transient failure. Returns `true` if it started a cooldown.
    pub(crate) fn mark_failed(&mut self, tick: Tick) -> bool {
        self.pending = false;
        self.consecutive_errors += 1;
        if self.consecutive_errors >= self.max_retries {
            self.cooldown_until = tick + self.cooldown_ticks;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> StrategicAgent {
        StrategicAgent::new("scout", "cautious", "surroundings").with_interval(10)
    }

    #[test]
    fn eligibility_follows_interval_pending_and_cooldown() {
        let mut a = agent();
        assert!(!a.is_eligible(Tick(9)));
        assert!(a.is_eligible(Tick(10)));

        a.mark_dispatched(Tick(10));
        assert!(!a.is_eligible(Tick(30)));

        a.mark_succeeded();
        assert!(a.is_eligible(Tick(20)));

        a.cooldown_until = Tick(50);
        assert!(a.in_cooldown(Tick(49)));
        assert!(!a.is_eligible(Tick(49)));
        assert!(a.is_eligible(Tick(50)));
    }

    #[test]
    fn cooldown_starts_at_max_retries() {
        let mut a = agent().with_retry_policy(3, 40);
        assert!(!a.mark_failed(Tick(5)));
        assert!(!a.mark_failed(Tick(6)));
        assert!(a.mark_failed(Tick(7)));
        assert_eq!(a.cooldown_until, Tick(47));

        a.mark_succeeded();
        assert_eq!(a.consecutive_errors, 0);
        assert_eq!(a.cooldown_until, Tick(47));
    }

    #[test]
    fn restored_clears_pending_only() {
        let mut a = agent();
        a.mark_dispatched(Tick(12));
        a.consecutive_errors = 2;

        let bytes = bincode::serialize(&a).unwrap();
        let back: StrategicAgent = bincode::deserialize(&bytes).unwrap();
        assert!(back.pending);

        let back = back.restored();
        assert!(!back.pending);
        assert_eq!(back.last_query_tick, Tick(12));
        assert_eq!(back.consecutive_errors, 2);
    }
}
