//! Flat, id-addressed node definitions.
//!
//! Nodes never own their children. Composites and decorators name children
//! by id, and a [`TreeDef`](crate::TreeDef) holds every node in one map. This
//! keeps definitions cheap to compare, hash and serialize.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Completion policy of a [`Node::Parallel`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParallelPolicy {
    /// Success only when every child succeeded this tick; any failure fails.
    #[default]
    RequireAll,
    /// Success when any child succeeded; failure only when all failed.
    RequireOne,
}

/// What a [`Node::Repeater`] does when its child fails.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailPolicy {
    /// Propagate the failure and reset the count.
    #[default]
    Fail,
    /// Count the failed iteration and keep repeating.
    Restart,
}

/// One behavior tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Leaf: calls a registered action callback.
    Action { id: String, action: String },
    /// Leaf: calls a registered predicate.
    Condition { id: String, condition: String },
    /// All children must succeed; fails on the first failure.
    Sequence { id: String, children: Vec<String> },
    /// First child that succeeds wins.
    Selector { id: String, children: Vec<String> },
    /// Ticks every child every tick.
    Parallel {
        id: String,
        children: Vec<String>,
        #[serde(default)]
        policy: ParallelPolicy,
    },
    /// Scores action children through the utility registry and runs the best.
    UtilitySelector { id: String, children: Vec<String> },
    /// Swaps Success and Failure.
    Inverter { id: String, child: String },
    /// Re-runs its child up to `max_count` times per activation.
    Repeater {
        id: String,
        child: String,
        max_count: u32,
        #[serde(default)]
        fail_policy: FailPolicy,
    },
    /// Forces a terminal result to Success.
    Succeeder { id: String, child: String },
    /// Forces a terminal result to Failure.
    AlwaysFail { id: String, child: String },
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Action { id, .. }
            | Node::Condition { id, .. }
            | Node::Sequence { id, .. }
            | Node::Selector { id, .. }
            | Node::Parallel { id, .. }
            | Node::UtilitySelector { id, .. }
            | Node::Inverter { id, .. }
            | Node::Repeater { id, .. }
            | Node::Succeeder { id, .. }
            | Node::AlwaysFail { id, .. } => id,
        }
    }

    /// Child ids in evaluation order. Empty for leaves.
    pub fn children(&self) -> &[String] {
        match self {
            Node::Action { .. } | Node::Condition { .. } => &[],
            Node::Sequence { children, .. }
            | Node::Selector { children, .. }
            | Node::Parallel { children, .. }
            | Node::UtilitySelector { children, .. } => children,
            Node::Inverter { child, .. }
            | Node::Repeater { child, .. }
            | Node::Succeeder { child, .. }
            | Node::AlwaysFail { child, .. } => std::slice::from_ref(child),
        }
    }

    /// Label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Action { .. } => "action",
            Node::Condition { .. } => "condition",
            Node::Sequence { .. } => "sequence",
            Node::Selector { .. } => "selector",
            Node::Parallel { .. } => "parallel",
            Node::UtilitySelector { .. } => "utility_selector",
            Node::Inverter { .. } => "inverter",
            Node::Repeater { .. } => "repeater",
            Node::Succeeder { .. } => "succeeder",
            Node::AlwaysFail { .. } => "always_fail",
        }
    }
}
