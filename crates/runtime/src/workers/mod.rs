//! Worker pool and metrics backing the query system.
//!
//! The pool executes blocking client calls off the simulation thread; the
//! metrics are shared with it so abandoned calls stay visible.

mod metrics;
mod pool;

pub use metrics::{MetricsSnapshot, QueryMetrics};
pub use pool::WorkerPool;
pub(crate) use pool::{Completion, Reply, Ticket};
