//! Composite node rules.
//!
//! Composite nodes control the execution flow of multiple children:
//! `Sequence` (AND), `Selector` (OR), `Parallel` (tick everything, then apply
//! a policy) and `UtilitySelector` (score, then run the best child).

use crate::evaluator::{Evaluator, Outcome};
use crate::node::{Node, ParallelPolicy};
use crate::Status;

impl<'t, W> Evaluator<'t, '_, W> {
    /// Left to right; stops at the first child that does not succeed.
    ///
    /// When resuming, children before the one on the running path are skipped
    /// and their previous results are not re-derived.
    pub(crate) fn eval_sequence(&mut self, id: &'t str, children: &'t [String]) -> Outcome<'t> {
        let mut resume = self.on_running_path(id);
        for child in children {
            if resume && !self.on_running_path(child) {
                continue;
            }
            resume = false;
            let (status, running) = self.eval(child);
            if status != Status::Success {
                return (status, running);
            }
        }
        (Status::Success, None)
    }

    /// Left to right; stops at the first child that does not fail.
    pub(crate) fn eval_selector(&mut self, id: &'t str, children: &'t [String]) -> Outcome<'t> {
        let mut resume = self.on_running_path(id);
        for child in children {
            if resume && !self.on_running_path(child) {
                continue;
            }
            resume = false;
            let (status, running) = self.eval(child);
            if status != Status::Failure {
                return (status, running);
            }
        }
        (Status::Failure, None)
    }

    /// Ticks every child, every tick, regardless of the running path.
    pub(crate) fn eval_parallel(
        &mut self,
        children: &'t [String],
        policy: ParallelPolicy,
    ) -> Outcome<'t> {
        let mut successes = 0;
        let mut failures = 0;
        let mut last_running = None;

        for child in children {
            match self.eval(child) {
                (Status::Success, _) => successes += 1,
                (Status::Failure, _) => failures += 1,
                (Status::Running, running) => last_running = running,
            }
        }

        let total = children.len();
        match policy {
            ParallelPolicy::RequireAll => {
                if failures > 0 {
                    (Status::Failure, None)
                } else if successes == total {
                    (Status::Success, None)
                } else {
                    (Status::Running, last_running)
                }
            }
            ParallelPolicy::RequireOne => {
                if successes > 0 {
                    (Status::Success, None)
                } else if failures == total {
                    (Status::Failure, None)
                } else {
                    (Status::Running, last_running)
                }
            }
        }
    }

    /// Scores action children through the registry and runs only the best.
    ///
    /// A running child on the running path continues without rescoring.
    /// Non-action children score zero. Ties go to the earlier child.
    pub(crate) fn eval_utility_selector(
        &mut self,
        id: &'t str,
        children: &'t [String],
    ) -> Outcome<'t> {
        if children.is_empty() {
            return (Status::Failure, None);
        }

        if self.on_running_path(id)
            && let Some(child) = children.iter().find(|c| self.on_running_path(c))
        {
            return self.eval(child);
        }

        let mut best: Option<(&'t str, f64)> = None;
        for child in children {
            let score = match self.tree.node(child) {
                Some(Node::Action { action, .. }) => {
                    self.registry.score_action(action, &*self.world, self.entity)
                }
                _ => 0.0,
            };
            tracing::trace!(entity = %self.entity, child = child.as_str(), score, "utility child scored");
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((child, score));
            }
        }

        match best {
            Some((child, _)) => self.eval(child),
            None => (Status::Failure, None),
        }
    }
}
