//! Utility scoring and selection.
//!
//! A utility action is an ordered list of consideration names. Its score is the
//! product of every consideration clamped to `[0, 1]`, so any single zero acts
//! as a hard requirement and short-circuits the rest.
//!
//! # Determinism
//!
//! Selection walks the selector's action list in definition order and only
//! replaces the current best on a strictly greater score. Equal scores always
//! resolve to the earlier action.

use sim_world::EntityId;

use crate::curves;
use crate::registry::DecisionRegistry;

/// Outcome of running a utility selector for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub action: String,
    pub score: f64,
}

impl Selection {
    /// Returned for unknown selectors and empty action lists.
    pub fn none() -> Self {
        Self {
            action: String::new(),
            score: 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.action.is_empty()
    }
}

impl<W> DecisionRegistry<W> {
    /// Multiplicative score of the utility action `name` for `entity`.
    ///
    /// Unknown actions, actions without considerations and actions that name
    /// an unregistered consideration all score zero.
    pub fn score_action(&self, name: &str, world: &W, entity: EntityId) -> f64 {
        let Some(considerations) = self.utility_action(name) else {
            return 0.0;
        };
        if considerations.is_empty() {
            return 0.0;
        }

        let mut score = 1.0;
        for consideration in considerations {
            let Some(f) = self.consideration(consideration) else {
                tracing::debug!(%entity, action = name, consideration, "consideration not registered");
                return 0.0;
            };
            score *= curves::unit(f(world, entity));
            if score == 0.0 {
                return 0.0;
            }
        }
        score
    }

    /// Picks the best action of `selector` for `entity`.
    pub fn select_action(&self, selector: &str, world: &W, entity: EntityId) -> Selection {
        let Some(actions) = self.utility_selector(selector) else {
            return Selection::none();
        };

        let mut best = Selection::none();
        let mut best_score = -1.0;
        for action in actions {
            let score = self.score_action(action, world, entity);
            tracing::trace!(%entity, selector, action = action.as_str(), score, "action scored");

            // In case of tie, first action wins (stable ordering)
            if score > best_score {
                best_score = score;
                best = Selection {
                    action: action.clone(),
                    score,
                };
            }
        }

        tracing::debug!(%entity, selector, action = %best.action, score = best.score, "utility selection");
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Considerations read their value straight out of the world.
    struct Values(Vec<f64>);

    fn registry() -> DecisionRegistry<Values> {
        let mut reg = DecisionRegistry::new();
        for i in 0..4 {
            reg.register_consideration(format!("c{i}"), move |w: &Values, _| w.0[i]);
        }
        reg
    }

    #[test]
    fn zero_consideration_scores_exactly_zero() {
        let mut reg = registry();
        reg.define_utility_action("act", ["c0", "c1", "c2"]);
        let world = Values(vec![1.0, 0.0, 1.0, 0.0]);

        assert_eq!(reg.score_action("act", &world, EntityId(0)), 0.0);
    }

    #[test]
    fn scores_are_clamped_products() {
        let mut reg = registry();
        reg.define_utility_action("act", ["c0", "c1", "c2"]);
        let world = Values(vec![0.5, 3.0, 0.5, 0.0]);

        assert_eq!(reg.score_action("act", &world, EntityId(0)), 0.25);

        let world = Values(vec![0.5, -1.0, 0.5, 0.0]);
        assert_eq!(reg.score_action("act", &world, EntityId(0)), 0.0);
    }

    #[test]
    fn nan_consideration_scores_zero() {
        let mut reg = registry();
        reg.define_utility_action("bad", ["c0", "c1"]);
        reg.define_utility_action("good", ["c2"]);
        reg.define_utility_selector("pick", ["bad", "good"]);
        let world = Values(vec![f64::NAN, 1.0, 0.3, 0.0]);

        assert_eq!(reg.score_action("bad", &world, EntityId(0)), 0.0);
        let selection = reg.select_action("pick", &world, EntityId(0));
        assert_eq!(selection.action, "good");
        assert_eq!(selection.score, 0.3);
    }

    #[test]
    fn missing_definitions_score_zero() {
        let mut reg = registry();
        reg.define_utility_action("empty", Vec::<String>::new());
        reg.define_utility_action("broken", ["c0", "nope"]);
        let world = Values(vec![1.0; 4]);

        assert_eq!(reg.score_action("unknown", &world, EntityId(0)), 0.0);
        assert_eq!(reg.score_action("empty", &world, EntityId(0)), 0.0);
        assert_eq!(reg.score_action("broken", &world, EntityId(0)), 0.0);
    }

    #[test]
    fn ties_resolve_to_first_listed() {
        let mut reg = registry();
        reg.define_utility_action("first", ["c0"]);
        reg.define_utility_action("second", ["c1"]);
        reg.define_utility_action("third", ["c2"]);
        reg.define_utility_selector("pick", ["first", "second", "third"]);

        let world = Values(vec![0.4, 0.8, 0.8, 0.0]);
        let selection = reg.select_action("pick", &world, EntityId(0));
        assert_eq!(selection.action, "second");
        assert_eq!(selection.score, 0.8);
    }

    #[test]
    fn all_zero_selects_first_action() {
        let mut reg = registry();
        reg.define_utility_action("a", ["c3"]);
        reg.define_utility_action("b", ["c3"]);
        reg.define_utility_selector("pick", ["a", "b"]);

        let selection = reg.select_action("pick", &Values(vec![0.0; 4]), EntityId(0));
        assert_eq!(selection.action, "a");
        assert_eq!(selection.score, 0.0);
    }

    #[test]
    fn unknown_or_empty_selector_selects_nothing() {
        let mut reg = registry();
        reg.define_utility_selector("empty", Vec::<String>::new());
        let world = Values(vec![1.0; 4]);

        assert!(reg.select_action("missing", &world, EntityId(0)).is_none());
        assert_eq!(reg.select_action("empty", &world, EntityId(0)), Selection::none());
    }
}
