//! Per-entity components owned by the host world.
//!
//! All three are plain serializable records. They are the only part of the
//! decision layer that belongs in a save file; registries are rebuilt by the
//! host after a restore.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Status;

/// Assigns a behavior tree to an entity and carries its resumption state.
///
/// Mutated only by [`TreeSystem`](crate::TreeSystem).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeState {
    pub tree_name: String,
    /// Id of the node that reported `Running` last tick, empty when the
    /// previous evaluation was terminal.
    #[serde(default)]
    pub running_node: String,
    /// Terminal or running status of the last evaluation, `None` before the
    /// first tick.
    #[serde(default)]
    pub last_status: Option<Status>,
    /// Completed iterations of repeaters that are still in progress.
    #[serde(default)]
    pub repeat_counts: BTreeMap<String, u32>,
}

impl TreeState {
    pub fn new(tree_name: impl Into<String>) -> Self {
        Self {
            tree_name: tree_name.into(),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        !self.running_node.is_empty()
    }
}

/// Assigns a utility selector to an entity and records its last choice.
///
/// Mutated only by [`UtilitySystem`](crate::UtilitySystem).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilityState {
    pub selector_name: String,
    #[serde(default)]
    pub selected_action: String,
    #[serde(default)]
    pub score: f64,
}

impl UtilityState {
    pub fn new(selector_name: impl Into<String>) -> Self {
        Self {
            selector_name: selector_name.into(),
            ..Self::default()
        }
    }
}

/// Per-entity knowledge store shared between the strategic and tactical
/// layers.
///
/// The map is schema-free. By convention the strategic layer writes under
/// [`Blackboard::STRATEGY_KEY`]; every other key belongs to the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blackboard {
    pub data: Map<String, Value>,
}

impl Blackboard {
    /// Reserved top-level key written by the strategic layer.
    pub const STRATEGY_KEY: &'static str = "strategy";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// The strategy object, if one has been written.
    pub fn strategy(&self) -> Option<&Map<String, Value>> {
        self.data.get(Self::STRATEGY_KEY)?.as_object()
    }

    /// The strategy object, created empty when absent or not an object.
    pub fn strategy_mut(&mut self) -> &mut Map<String, Value> {
        let slot = self
            .data
            .entry(Self::STRATEGY_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(map) => map,
            _ => unreachable!("strategy slot was just made an object"),
        }
    }
}
