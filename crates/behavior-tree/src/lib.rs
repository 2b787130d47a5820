//! Resumable behavior trees and utility scoring for tick-driven simulations.
//!
//! This crate is the tactical half of a per-entity decision engine. It runs on
//! the simulation thread, once per tick, and never blocks.
//!
//! - **Flat trees**: nodes reference children by id; a [`TreeDef`] is
//!   validated once when it is defined and is immutable afterwards
//! - **Cross-tick resumption**: a `Running` leaf is remembered on the entity's
//!   [`TreeState`] and the next tick resumes at it instead of re-deriving
//!   earlier siblings
//! - **Utility selection**: multiplicative, clamped consideration scores with
//!   first-listed-wins tie-breaking
//! - **Named callbacks**: actions, conditions and considerations live in a
//!   [`DecisionRegistry`] that is never serialized
//!
//! # Architecture
//!
//! - [`Node`] and [`TreeDef`]: the tree data model
//! - [`evaluate`]: one tree, one entity, one tick
//! - [`TreeSystem`] and [`UtilitySystem`]: tick systems over a
//!   [`World`](sim_world::World)
//! - [`Blackboard`]: the per-entity knowledge store read by callbacks

pub mod builder;
pub mod components;
pub mod composite;
pub mod curves;
pub mod decorator;
pub mod error;
pub mod evaluator;
pub mod node;
pub mod registry;
pub mod status;
pub mod systems;
pub mod tree;
pub mod utility;

// Re-export core types for ergonomic API
pub use components::{Blackboard, TreeState, UtilityState};
pub use error::TreeError;
pub use evaluator::{Evaluation, evaluate};
pub use node::{FailPolicy, Node, ParallelPolicy};
pub use registry::{DecisionRegistry, SharedDecisions};
pub use status::Status;
pub use systems::{TreeSystem, UtilitySystem};
pub use tree::TreeDef;
pub use utility::Selection;
