//! Builder utilities for ergonomic node construction.
//!
//! This module provides helper functions to reduce boilerplate when writing
//! tree definitions. Instead of spelling out
//! `Node::Sequence { id: "root".into(), children: vec![...] }`, you can write
//! `sequence("root", ["a", "b"])`.

use crate::node::{FailPolicy, Node, ParallelPolicy};

fn ids<I, S>(children: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    children.into_iter().map(Into::into).collect()
}

/// Creates an action leaf bound to the action callback `name`.
#[inline]
pub fn action(id: impl Into<String>, name: impl Into<String>) -> Node {
    Node::Action {
        id: id.into(),
        action: name.into(),
    }
}

/// Creates a condition leaf bound to the predicate `name`.
#[inline]
pub fn condition(id: impl Into<String>, name: impl Into<String>) -> Node {
    Node::Condition {
        id: id.into(),
        condition: name.into(),
    }
}

/// Creates a sequence node.
#[inline]
pub fn sequence<I, S>(id: impl Into<String>, children: I) -> Node
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Node::Sequence {
        id: id.into(),
        children: ids(children),
    }
}

/// Creates a selector node.
#[inline]
pub fn selector<I, S>(id: impl Into<String>, children: I) -> Node
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Node::Selector {
        id: id.into(),
        children: ids(children),
    }
}

/// Creates a parallel node with the given completion policy.
#[inline]
pub fn parallel<I, S>(id: impl Into<String>, children: I, policy: ParallelPolicy) -> Node
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Node::Parallel {
        id: id.into(),
        children: ids(children),
        policy,
    }
}

/// Creates a utility selector over action children.
#[inline]
pub fn utility_selector<I, S>(id: impl Into<String>, children: I) -> Node
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Node::UtilitySelector {
        id: id.into(),
        children: ids(children),
    }
}

/// Creates an inverter node.
#[inline]
pub fn inverter(id: impl Into<String>, child: impl Into<String>) -> Node {
    Node::Inverter {
        id: id.into(),
        child: child.into(),
    }
}

/// Creates a repeater node.
#[inline]
pub fn repeater(
    id: impl Into<String>,
    child: impl Into<String>,
    max_count: u32,
    fail_policy: FailPolicy,
) -> Node {
    Node::Repeater {
        id: id.into(),
        child: child.into(),
        max_count,
        fail_policy,
    }
}

/// Creates a succeeder node.
#[inline]
pub fn succeeder(id: impl Into<String>, child: impl Into<String>) -> Node {
    Node::Succeeder {
        id: id.into(),
        child: child.into(),
    }
}

/// Creates an always-fail node.
#[inline]
pub fn always_fail(id: impl Into<String>, child: impl Into<String>) -> Node {
    Node::AlwaysFail {
        id: id.into(),
        child: child.into(),
    }
}
