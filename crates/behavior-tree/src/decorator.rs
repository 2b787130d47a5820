//! Decorator node rules.
//!
//! Decorators wrap a single child and reshape its result. `Running` always
//! passes through so that multi-tick children keep their place in the tree.

use crate::evaluator::{Evaluator, Outcome};
use crate::node::FailPolicy;
use crate::Status;

impl<'t, W> Evaluator<'t, '_, W> {
    /// Success and Failure swapped.
    pub(crate) fn eval_inverter(&mut self, child: &'t str) -> Outcome<'t> {
        let (status, running) = self.eval(child);
        match status {
            Status::Running => (Status::Running, running),
            terminal => (terminal.invert(), None),
        }
    }

    /// Runs the child once per tick until it has completed `max_count` times.
    ///
    /// A non-final iteration reports `Running` with the repeater itself as the
    /// running node, so the next tick resumes here.
    pub(crate) fn eval_repeater(
        &mut self,
        id: &'t str,
        child: &'t str,
        max_count: u32,
        fail_policy: FailPolicy,
    ) -> Outcome<'t> {
        self.ticked_repeaters.insert(id);
        let count = self.repeat_counts.get(id).copied().unwrap_or(0);

        let (status, running) = self.eval(child);
        match (status, fail_policy) {
            (Status::Running, _) => return (Status::Running, running),
            (Status::Failure, FailPolicy::Fail) => {
                self.repeat_counts.remove(id);
                return (Status::Failure, None);
            }
            _ => {}
        }

        let count = count + 1;
        if count >= max_count {
            self.repeat_counts.remove(id);
            (Status::Success, None)
        } else {
            self.repeat_counts.insert(id.to_owned(), count);
            (Status::Running, Some(id))
        }
    }

    pub(crate) fn eval_succeeder(&mut self, child: &'t str) -> Outcome<'t> {
        match self.eval(child) {
            (Status::Running, running) => (Status::Running, running),
            _ => (Status::Success, None),
        }
    }

    pub(crate) fn eval_always_fail(&mut self, child: &'t str) -> Outcome<'t> {
        match self.eval(child) {
            (Status::Running, running) => (Status::Running, running),
            _ => (Status::Failure, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use sim_world::{EntityId, Tick, TickContext};

    use crate::builder::{action, always_fail, inverter, repeater, sequence, succeeder};
    use crate::components::TreeState;
    use crate::evaluator::evaluate;
    use crate::node::FailPolicy;
    use crate::registry::DecisionRegistry;
    use crate::tree::TreeDef;
    use crate::Status;

    struct TestContext {
        value: i32,
        result: Status,
    }

    impl TestContext {
        fn returning(result: Status) -> Self {
            Self { value: 0, result }
        }
    }

    fn registry() -> DecisionRegistry<TestContext> {
        let mut reg = DecisionRegistry::new();
        reg.register_action("work", |ctx: &mut TestContext, _, _| {
            ctx.value += 1;
            ctx.result
        });
        reg.register_action("other", |ctx: &mut TestContext, _, _| {
            ctx.value += 100;
            Status::Success
        });
        reg
    }

    fn step(tree: &TreeDef, state: &mut TreeState, ctx: &mut TestContext, n: u64) -> Status {
        let reg = registry();
        let eval = evaluate(
            tree,
            &reg,
            state,
            ctx,
            &TickContext::new(Tick(n), 1.0),
            EntityId(0),
        );
        let status = eval.status;
        state.apply(eval);
        status
    }

    fn wrapped(decorator: crate::Node) -> TreeDef {
        TreeDef::from_nodes("root", [decorator, action("leaf", "work")]).unwrap()
    }

    #[test]
    fn inverter_swaps_terminal_results() {
        let tree = wrapped(inverter("root", "leaf"));
        let mut state = TreeState::new("t");

        let mut ctx = TestContext::returning(Status::Success);
        assert_eq!(step(&tree, &mut state, &mut ctx, 1), Status::Failure);

        let mut ctx = TestContext::returning(Status::Failure);
        assert_eq!(step(&tree, &mut state, &mut ctx, 2), Status::Success);
    }

    #[test]
    fn decorators_pass_running_through() {
        for decorator in [
            inverter("root", "leaf"),
            succeeder("root", "leaf"),
            always_fail("root", "leaf"),
        ] {
            let tree = wrapped(decorator);
            let mut state = TreeState::new("t");
            let mut ctx = TestContext::returning(Status::Running);

            assert_eq!(step(&tree, &mut state, &mut ctx, 1), Status::Running);
            assert_eq!(state.running_node, "leaf");
        }
    }

    #[test]
    fn succeeder_and_always_fail_force_results() {
        let mut state = TreeState::new("t");
        let mut ctx = TestContext::returning(Status::Failure);
        assert_eq!(
            step(&wrapped(succeeder("root", "leaf")), &mut state, &mut ctx, 1),
            Status::Success
        );

        let mut ctx = TestContext::returning(Status::Success);
        assert_eq!(
            step(&wrapped(always_fail("root", "leaf")), &mut state, &mut ctx, 1),
            Status::Failure
        );
        assert_eq!(ctx.value, 1); // Child still executed
    }

    #[test]
    fn repeater_counts_one_iteration_per_tick() {
        let tree = wrapped(repeater("root", "leaf", 3, FailPolicy::Fail));
        let mut state = TreeState::new("t");
        let mut ctx = TestContext::returning(Status::Success);

        assert_eq!(step(&tree, &mut state, &mut ctx, 1), Status::Running);
        assert_eq!(state.running_node, "root");
        assert_eq!(state.repeat_counts.get("root"), Some(&1));

        assert_eq!(step(&tree, &mut state, &mut ctx, 2), Status::Running);
        assert_eq!(step(&tree, &mut state, &mut ctx, 3), Status::Success);

        assert_eq!(ctx.value, 3);
        assert!(state.repeat_counts.is_empty());
        assert!(state.running_node.is_empty());
    }

    #[test]
    fn repeater_fail_policy_propagates_failure() {
        let tree = wrapped(repeater("root", "leaf", 3, FailPolicy::Fail));
        let mut state = TreeState::new("t");
        let mut ctx = TestContext::returning(Status::Success);

        step(&tree, &mut state, &mut ctx, 1);
        ctx.result = Status::Failure;

        assert_eq!(step(&tree, &mut state, &mut ctx, 2), Status::Failure);
        assert!(state.repeat_counts.is_empty());
    }

    #[test]
    fn repeater_restart_policy_counts_failures() {
        let tree = wrapped(repeater("root", "leaf", 2, FailPolicy::Restart));
        let mut state = TreeState::new("t");
        let mut ctx = TestContext::returning(Status::Failure);

        assert_eq!(step(&tree, &mut state, &mut ctx, 1), Status::Running);
        assert_eq!(step(&tree, &mut state, &mut ctx, 2), Status::Success);
    }

    #[test]
    fn abandoned_repeater_count_is_cleared() {
        struct Gate {
            open: bool,
        }

        // The parallel keeps re-entering `guarded` from scratch because the
        // remembered running node is `watch`. Once the gate closes, the
        // repeater is never reached and its count must not linger.
        let tree = TreeDef::from_nodes(
            "root",
            [
                crate::builder::parallel(
                    "root",
                    ["guarded", "watch"],
                    crate::node::ParallelPolicy::RequireOne,
                ),
                sequence("guarded", ["gate", "loop"]),
                crate::builder::condition("gate", "gate_open"),
                repeater("loop", "leaf", 5, FailPolicy::Fail),
                action("leaf", "work"),
                action("watch", "watch"),
            ],
        )
        .unwrap();

        let mut reg = DecisionRegistry::new();
        reg.register_condition("gate_open", |g: &Gate, _| g.open);
        reg.register_action("work", |_: &mut Gate, _, _| Status::Success);
        reg.register_action("watch", |_: &mut Gate, _, _| Status::Running);

        let mut world = Gate { open: true };
        let mut state = TreeState::new("t");
        let tick = |state: &mut TreeState, world: &mut Gate, n: u64| {
            let ctx = TickContext::new(Tick(n), 1.0);
            let eval = evaluate(&tree, &reg, state, world, &ctx, EntityId(0));
            state.apply(eval);
        };

        tick(&mut state, &mut world, 1);
        assert_eq!(state.running_node, "watch");
        assert_eq!(state.repeat_counts.get("loop"), Some(&1));

        tick(&mut state, &mut world, 2);
        assert_eq!(state.repeat_counts.get("loop"), Some(&2));

        world.open = false;
        tick(&mut state, &mut world, 3);
        assert_eq!(state.last_status, Some(Status::Running));
        assert!(state.repeat_counts.is_empty());
    }
}
