//! Strategic layer for the decision engine.
//!
//! Entities carrying a [`StrategicAgent`] periodically ask an external
//! reasoning service for a high-level strategy. The answer lands in the
//! entity's [`Blackboard`](behavior_tree::Blackboard), where behavior trees
//! and utility considerations read it on later ticks.
//!
//! Modules are organized by responsibility:
//! - [`registry`] holds prompt fragments, context builders, parsers and the client
//! - [`scheduler`] hosts [`QuerySystem`], the per-tick dispatch/harvest loop
//! - [`workers`] runs blocking client calls off the simulation thread
//! - [`client`] and [`mock`] define the client boundary and a test double
//! - [`config`], [`error`] and [`events`] carry the ambient types
pub mod client;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod mock;
pub mod parsers;
pub mod registry;
pub mod scheduler;
pub mod workers;

pub use client::LlmClient;
pub use components::StrategicAgent;
pub use config::SchedulerConfig;
pub use error::{ConfigError, ErrorKind, ParseError, QueryError, SchedulerError};
pub use events::{DispatchEvent, ErrorEvent, ResponseEvent};
pub use mock::MockClient;
pub use parsers::{default_json_parser, strip_code_fences};
pub use registry::{Prompt, SharedStrategy, StrategicRegistry};
pub use scheduler::QuerySystem;
pub use workers::{MetricsSnapshot, QueryMetrics, WorkerPool};
