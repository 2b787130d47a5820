//! Decision registry: trees, leaf callbacks and utility definitions by name.
//!
//! The registry is a pure lookup table. Every `define_*`/`register_*` call is
//! last-write-wins by name. It is never serialized; hosts repopulate it after
//! restoring a snapshot and before ticking again.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use sim_world::{EntityId, TickContext};

use crate::error::Result;
use crate::tree::TreeDef;
use crate::Status;

/// Action callback: may mutate the world and may report `Running`.
pub type ActionFn<W> = Box<dyn Fn(&mut W, &TickContext, EntityId) -> Status>;

/// Condition callback: a pure state query, never time-aware.
pub type ConditionFn<W> = Box<dyn Fn(&W, EntityId) -> bool>;

/// Consideration callback: a desirability in `[0, 1]` (clamped on use).
pub type ConsiderationFn<W> = Box<dyn Fn(&W, EntityId) -> f64>;

/// Registry handle shared by the tree and utility systems and the host.
pub type SharedDecisions<W> = Rc<RefCell<DecisionRegistry<W>>>;

/// Central registry for behavior trees and utility AI.
pub struct DecisionRegistry<W> {
    trees: HashMap<String, TreeDef>,
    actions: HashMap<String, ActionFn<W>>,
    conditions: HashMap<String, ConditionFn<W>>,
    considerations: HashMap<String, ConsiderationFn<W>>,
    /// utility action name -> consideration names
    utility_actions: HashMap<String, Vec<String>>,
    /// selector name -> utility action names, in tie-break order
    utility_selectors: HashMap<String, Vec<String>>,
}

impl<W> Default for DecisionRegistry<W> {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
            actions: HashMap::new(),
            conditions: HashMap::new(),
            considerations: HashMap::new(),
            utility_actions: HashMap::new(),
            utility_selectors: HashMap::new(),
        }
    }
}

impl<W> DecisionRegistry<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the registry for sharing between systems and the host.
    pub fn into_shared(self) -> SharedDecisions<W> {
        Rc::new(RefCell::new(self))
    }

    // --- Trees ---

    /// Registers an already validated tree.
    pub fn define_tree(&mut self, name: impl Into<String>, tree: TreeDef) {
        let name = name.into();
        tracing::debug!(tree = %name, nodes = tree.nodes().len(), "tree defined");
        self.trees.insert(name, tree);
    }

    /// Validates `nodes` and registers the resulting tree.
    ///
    /// Malformed graphs are rejected here, never at tick time.
    pub fn define_tree_from_nodes(
        &mut self,
        name: impl Into<String>,
        root: impl Into<String>,
        nodes: impl IntoIterator<Item = crate::Node>,
    ) -> Result<()> {
        let tree = TreeDef::from_nodes(root, nodes)?;
        self.define_tree(name, tree);
        Ok(())
    }

    pub fn tree(&self, name: &str) -> Option<&TreeDef> {
        self.trees.get(name)
    }

    // --- Leaf callbacks ---

    pub fn register_action<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut W, &TickContext, EntityId) -> Status + 'static,
    {
        self.actions.insert(name.into(), Box::new(f));
    }

    pub fn action(&self, name: &str) -> Option<&ActionFn<W>> {
        self.actions.get(name)
    }

    pub fn register_condition<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&W, EntityId) -> bool + 'static,
    {
        self.conditions.insert(name.into(), Box::new(f));
    }

    pub fn condition(&self, name: &str) -> Option<&ConditionFn<W>> {
        self.conditions.get(name)
    }

    pub fn register_consideration<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&W, EntityId) -> f64 + 'static,
    {
        self.considerations.insert(name.into(), Box::new(f));
    }

    pub fn consideration(&self, name: &str) -> Option<&ConsiderationFn<W>> {
        self.considerations.get(name)
    }

    // --- Utility definitions ---

    /// Defines a utility action as an ordered list of consideration names.
    pub fn define_utility_action<I, S>(&mut self, name: impl Into<String>, considerations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.utility_actions
            .insert(name.into(), considerations.into_iter().map(Into::into).collect());
    }

    pub fn utility_action(&self, name: &str) -> Option<&[String]> {
        self.utility_actions.get(name).map(Vec::as_slice)
    }

    /// Defines a utility selector as an ordered list of utility action names.
    /// Order matters: ties resolve to the earlier action.
    pub fn define_utility_selector<I, S>(&mut self, name: impl Into<String>, actions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.utility_selectors
            .insert(name.into(), actions.into_iter().map(Into::into).collect());
    }

    pub fn utility_selector(&self, name: &str) -> Option<&[String]> {
        self.utility_selectors.get(name).map(Vec::as_slice)
    }
}
