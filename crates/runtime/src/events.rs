//! Events delivered to strategic-layer observers.
//!
//! Observers receive these by reference on the simulation thread, right after
//! the step that produced them.
use std::time::Duration;

use sim_world::{EntityId, Tick};

use crate::error::ErrorKind;

/// A query was handed to the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEvent {
    pub entity: EntityId,
    /// System prompt plus user message, in characters.
    pub prompt_chars: usize,
    pub tick: Tick,
}

/// A response was harvested and accepted by its parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEvent {
    pub entity: EntityId,
    /// Wall-clock time from dispatch to completion of the client call.
    pub latency: Duration,
    pub response_chars: usize,
    pub tick: Tick,
}

/// Something went wrong for one entity during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub entity: EntityId,
    pub kind: ErrorKind,
    pub message: String,
    pub tick: Tick,
}
