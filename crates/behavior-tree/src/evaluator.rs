//! Tree traversal for one entity and one tick.
//!
//! Evaluation is a pure function of the tree definition, the entity's
//! [`TreeState`] and whatever the leaf callbacks observe in the world. The
//! caller writes the returned [`Evaluation`] back onto the entity.
//!
//! # Resumption
//!
//! When the previous tick ended `Running`, `TreeState::running_node` names the
//! node that reported it. Its ancestors form the *running path*. A `Sequence`
//! or `Selector` on that path skips straight to the child on the path instead
//! of re-deriving earlier siblings; a `UtilitySelector` on the path continues
//! its running child without rescoring. `Parallel` always ticks every child.
//!
//! Repeater counts survive only while their repeater keeps being ticked; a
//! repeater skipped for a whole tick belongs to an abandoned branch and its
//! count is dropped.

use std::collections::{BTreeMap, HashSet};

use sim_world::{EntityId, TickContext};

use crate::components::TreeState;
use crate::node::Node;
use crate::registry::DecisionRegistry;
use crate::tree::TreeDef;
use crate::Status;

/// Status of a node plus the id of the node that is running beneath it, if any.
pub(crate) type Outcome<'t> = (Status, Option<&'t str>);

/// Result of evaluating a tree for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub status: Status,
    /// Empty unless `status` is `Running`.
    pub running_node: String,
    pub repeat_counts: BTreeMap<String, u32>,
}

impl TreeState {
    /// Stores the outcome of an evaluation as this entity's new runtime state.
    pub fn apply(&mut self, evaluation: Evaluation) {
        self.running_node = evaluation.running_node;
        self.last_status = Some(evaluation.status);
        self.repeat_counts = evaluation.repeat_counts;
    }
}

/// Evaluates `tree` for `entity`, resuming from `state`.
pub fn evaluate<W>(
    tree: &TreeDef,
    registry: &DecisionRegistry<W>,
    state: &TreeState,
    world: &mut W,
    ctx: &TickContext,
    entity: EntityId,
) -> Evaluation {
    let mut evaluator = Evaluator {
        tree,
        registry,
        running_path: tree.path_to(&state.running_node),
        repeat_counts: state.repeat_counts.clone(),
        ticked_repeaters: HashSet::new(),
        world,
        ctx,
        entity,
    };

    let (status, running) = evaluator.eval(tree.root());
    let running_node = match (status, running) {
        (Status::Running, Some(id)) => id.to_owned(),
        _ => String::new(),
    };

    let Evaluator {
        mut repeat_counts,
        ticked_repeaters,
        ..
    } = evaluator;
    repeat_counts.retain(|id, _| ticked_repeaters.contains(id.as_str()));

    Evaluation {
        status,
        running_node,
        repeat_counts,
    }
}

pub(crate) struct Evaluator<'t, 'w, W> {
    pub(crate) tree: &'t TreeDef,
    pub(crate) registry: &'t DecisionRegistry<W>,
    /// Running node of the previous tick and all of its ancestors.
    pub(crate) running_path: HashSet<&'t str>,
    pub(crate) repeat_counts: BTreeMap<String, u32>,
    pub(crate) ticked_repeaters: HashSet<&'t str>,
    pub(crate) world: &'w mut W,
    pub(crate) ctx: &'w TickContext,
    pub(crate) entity: EntityId,
}

impl<'t, W> Evaluator<'t, '_, W> {
    pub(crate) fn eval(&mut self, id: &'t str) -> Outcome<'t> {
        let Some(node) = self.tree.node(id) else {
            // Unreachable for validated trees.
            return (Status::Failure, None);
        };

        let outcome = match node {
            Node::Action { id, action } => self.eval_action(id, action),
            Node::Condition { condition, .. } => self.eval_condition(condition),
            Node::Sequence { id, children } => self.eval_sequence(id, children),
            Node::Selector { id, children } => self.eval_selector(id, children),
            Node::Parallel {
                children, policy, ..
            } => self.eval_parallel(children, *policy),
            Node::UtilitySelector { id, children } => self.eval_utility_selector(id, children),
            Node::Inverter { child, .. } => self.eval_inverter(child),
            Node::Repeater {
                id,
                child,
                max_count,
                fail_policy,
            } => self.eval_repeater(id, child, *max_count, *fail_policy),
            Node::Succeeder { child, .. } => self.eval_succeeder(child),
            Node::AlwaysFail { child, .. } => self.eval_always_fail(child),
        };

        tracing::trace!(
            entity = %self.entity,
            node = id,
            kind = node.kind(),
            status = outcome.0.as_str(),
            "node evaluated"
        );
        outcome
    }

    #[inline]
    pub(crate) fn on_running_path(&self, id: &str) -> bool {
        self.running_path.contains(id)
    }

    fn eval_action(&mut self, id: &'t str, action: &str) -> Outcome<'t> {
        let Some(callback) = self.registry.action(action) else {
            tracing::debug!(entity = %self.entity, action, "action not registered");
            return (Status::Failure, None);
        };
        match callback(&mut *self.world, self.ctx, self.entity) {
            Status::Running => (Status::Running, Some(id)),
            status => (status, None),
        }
    }

    fn eval_condition(&mut self, condition: &str) -> Outcome<'t> {
        let Some(predicate) = self.registry.condition(condition) else {
            tracing::debug!(entity = %self.entity, condition, "condition not registered");
            return (Status::Failure, None);
        };
        (Status::from(predicate(&*self.world, self.entity)), None)
    }
}
