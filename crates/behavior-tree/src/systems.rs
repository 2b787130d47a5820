//! Tick systems that drive trees and utility selectors over a [`World`].
//!
//! Both systems iterate entities in ascending id order. The shared registry is
//! borrowed immutably for the whole run, so callbacks must not try to
//! re-register anything while a tick is in progress.

use sim_world::{EntityId, System, TickContext, World};

use crate::components::{TreeState, UtilityState};
use crate::evaluator::evaluate;
use crate::registry::SharedDecisions;
use crate::Status;

/// Called after a tree evaluation ends `Success` or `Failure`.
pub type StatusObserver<W> = Box<dyn FnMut(&mut W, &TickContext, EntityId, Status)>;

/// Called after a non-empty utility selection with the action and its score.
pub type SelectObserver<W> = Box<dyn FnMut(&mut W, &TickContext, EntityId, &str, f64)>;

/// Evaluates the assigned behavior tree of every entity carrying a
/// [`TreeState`].
pub struct TreeSystem<W> {
    registry: SharedDecisions<W>,
    on_status: Option<StatusObserver<W>>,
}

impl<W> TreeSystem<W> {
    pub fn new(registry: SharedDecisions<W>) -> Self {
        Self {
            registry,
            on_status: None,
        }
    }

    pub fn on_status<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut W, &TickContext, EntityId, Status) + 'static,
    {
        self.on_status = Some(Box::new(f));
        self
    }
}

impl<W: World> System<W> for TreeSystem<W> {
    fn name(&self) -> &str {
        "behavior_tree"
    }

    fn run(&mut self, world: &mut W, ctx: &TickContext) {
        let registry = self.registry.borrow();

        for entity in world.entities_with::<TreeState>() {
            let Some(state) = world.get::<TreeState>(entity).cloned() else {
                continue;
            };
            let Some(tree) = registry.tree(&state.tree_name) else {
                continue;
            };

            let evaluation = evaluate(tree, &registry, &state, world, ctx, entity);
            let status = evaluation.status;

            // An action may have removed the assignment or the entity itself.
            let Some(slot) = world.get_mut::<TreeState>(entity) else {
                continue;
            };
            slot.apply(evaluation);

            if status.is_terminal()
                && let Some(on_status) = self.on_status.as_mut()
            {
                on_status(world, ctx, entity, status);
            }
        }
    }
}

/// Runs the assigned utility selector of every entity carrying a
/// [`UtilityState`] and records the choice.
pub struct UtilitySystem<W> {
    registry: SharedDecisions<W>,
    on_select: Option<SelectObserver<W>>,
}

impl<W> UtilitySystem<W> {
    pub fn new(registry: SharedDecisions<W>) -> Self {
        Self {
            registry,
            on_select: None,
        }
    }

    pub fn on_select<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut W, &TickContext, EntityId, &str, f64) + 'static,
    {
        self.on_select = Some(Box::new(f));
        self
    }
}

impl<W: World> System<W> for UtilitySystem<W> {
    fn name(&self) -> &str {
        "utility"
    }

    fn run(&mut self, world: &mut W, ctx: &TickContext) {
        let registry = self.registry.borrow();

        for entity in world.entities_with::<UtilityState>() {
            let Some(selector) = world
                .get::<UtilityState>(entity)
                .map(|state| state.selector_name.clone())
            else {
                continue;
            };

            let selection = registry.select_action(&selector, world, entity);
            if let Some(state) = world.get_mut::<UtilityState>(entity) {
                state.selected_action.clone_from(&selection.action);
                state.score = selection.score;
            }

            if !selection.is_none()
                && let Some(on_select) = self.on_select.as_mut()
            {
                on_select(world, ctx, entity, &selection.action, selection.score);
            }
        }
    }
}
