//! Strategic responses reach behavior trees and utility scoring through the
//! blackboard on the tick they are harvested.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use behavior_tree::builder::{action, condition, selector, sequence};
use behavior_tree::{
    Blackboard, DecisionRegistry, SharedDecisions, Status, TreeState, TreeSystem, UtilityState,
    UtilitySystem,
};
use sim_world::{ComponentWorld, EntityId, Schedule, Tick, World};
use strategy_runtime::{
    MockClient, QuerySystem, ResponseEvent, SchedulerConfig, StrategicAgent, StrategicRegistry,
};

fn aggression(w: &ComponentWorld, e: EntityId) -> f64 {
    w.get::<Blackboard>(e)
        .and_then(Blackboard::strategy)
        .and_then(|s| s.get("aggression"))
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

fn decisions(log: &Rc<RefCell<Vec<(Tick, &'static str)>>>) -> SharedDecisions<ComponentWorld> {
    let mut reg = DecisionRegistry::new();
    reg.define_tree_from_nodes(
        "soldier",
        "root",
        [
            selector("root", ["assault", "idle"]),
            sequence("assault", ["ordered", "charge"]),
            condition("ordered", "attack_ordered"),
            action("charge", "charge"),
            action("idle", "idle"),
        ],
    )
    .unwrap();

    reg.register_condition("attack_ordered", |w: &ComponentWorld, e| {
        w.get::<Blackboard>(e)
            .and_then(Blackboard::strategy)
            .and_then(|s| s.get("goal"))
            .is_some_and(|g| g == "attack")
    });
    for name in ["charge", "idle"] {
        let log = Rc::clone(log);
        reg.register_action(name, move |_: &mut ComponentWorld, ctx, _| {
            log.borrow_mut().push((ctx.tick, name));
            Status::Success
        });
    }

    reg.register_consideration("aggression", aggression);
    reg.register_consideration("calm", |w: &ComponentWorld, e| 1.0 - aggression(w, e));
    reg.define_utility_action("fight", ["aggression"]);
    reg.define_utility_action("rest", ["calm"]);
    reg.define_utility_selector("stance", ["fight", "rest"]);
    reg.into_shared()
}

#[test]
fn harvested_strategy_drives_tree_and_utility_on_the_same_tick() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let decisions = decisions(&log);

    let mut strategy = StrategicRegistry::new();
    strategy.define_role("soldier", "You lead one soldier.");
    strategy.define_personality("eager", "You like to attack.");
    strategy.define_context("orders", |_: &ComponentWorld, _| "awaiting orders".to_owned());
    strategy.register_client(MockClient::with_responder(|_, _| {
        r#"{"goal": "attack", "aggression": 0.8}"#.to_owned()
    }));
    let harvested = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&harvested);
    strategy.on_response(move |e: &ResponseEvent| *sink.borrow_mut() = Some(e.tick));
    let strategy = strategy.into_shared();

    let config = SchedulerConfig {
        max_queries_per_second: 1_000,
        ..SchedulerConfig::default()
    };
    let mut schedule = Schedule::new(0.1);
    schedule
        .add_system(QuerySystem::new(strategy, config).unwrap())
        .add_system(TreeSystem::new(Rc::clone(&decisions)))
        .add_system(UtilitySystem::new(Rc::clone(&decisions)));
    schedule.reset(Tick(999));

    let mut world = ComponentWorld::new();
    let e = world.spawn();
    world
        .attach(e, StrategicAgent::new("soldier", "eager", "orders").with_interval(1_000))
        .unwrap();
    world.attach(e, Blackboard::new()).unwrap();
    world.attach(e, TreeState::new("soldier")).unwrap();
    world.attach(e, UtilityState::new("stance")).unwrap();

    schedule.step(&mut world);
    assert_eq!(*log.borrow(), vec![(Tick(1000), "idle")]);
    assert_eq!(world.get::<UtilityState>(e).unwrap().selected_action, "rest");

    let deadline = Instant::now() + Duration::from_secs(5);
    while harvested.borrow().is_none() {
        assert!(Instant::now() < deadline, "no response harvested");
        thread::sleep(Duration::from_millis(2));
        schedule.step(&mut world);
    }

    let tick = harvested.borrow().unwrap();
    assert_eq!(log.borrow().last(), Some(&(tick, "charge")));

    let stance = world.get::<UtilityState>(e).unwrap();
    assert_eq!(stance.selected_action, "fight");
    assert!((stance.score - 0.8).abs() < 1e-9);
}
