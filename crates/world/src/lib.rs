//! Simulation host boundary for the decision engine.
//!
//! The decision crates never own entity storage or the clock. They consume
//! the small surface defined here:
//!
//! - [`EntityId`] and [`Tick`]: identity and discrete time
//! - [`TickContext`]: per-tick view of the clock handed to every system
//! - [`World`]: liveness, typed component access and iteration by type
//! - [`System`] and [`Schedule`]: tick-callable units run in registration order
//!
//! [`ComponentWorld`] is a plain in-memory [`World`] suitable for tests and
//! small hosts.

pub mod context;
pub mod entity;
pub mod schedule;
pub mod world;

pub use context::TickContext;
pub use entity::{EntityId, Tick};
pub use schedule::{Schedule, System};
pub use world::{ComponentWorld, World, WorldError};
