//! A small squad skirmish used by the demo binary.
//!
//! Each soldier asks the strategic layer for orders, acts on them through a
//! behavior tree and picks a stance with a utility selector.

use behavior_tree::builder::{action, condition, repeater, selector, sequence};
use behavior_tree::{
    Blackboard, DecisionRegistry, FailPolicy, SharedDecisions, Status, TreeError, TreeState,
    UtilityState, curves,
};
use sim_world::{ComponentWorld, EntityId, World, WorldError};
use strategy_runtime::{SharedStrategy, StrategicAgent, StrategicRegistry};

/// Soldier vitals. Not part of the decision engine.
#[derive(Debug, Clone, Copy)]
pub struct Vitals {
    pub hp: u32,
    pub max_hp: u32,
}

impl Vitals {
    fn health(&self) -> f64 {
        f64::from(self.hp) / f64::from(self.max_hp.max(1))
    }
}

fn vitals(w: &ComponentWorld, e: EntityId) -> Option<Vitals> {
    w.get::<Vitals>(e).copied()
}

fn order(w: &ComponentWorld, e: EntityId) -> Option<String> {
    w.get::<Blackboard>(e)?
        .strategy()?
        .get("goal")?
        .as_str()
        .map(str::to_owned)
}

fn aggression(w: &ComponentWorld, e: EntityId) -> f64 {
    w.get::<Blackboard>(e)
        .and_then(Blackboard::strategy)
        .and_then(|s| s.get("aggression"))
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

pub fn decisions() -> Result<SharedDecisions<ComponentWorld>, TreeError> {
    let mut reg = DecisionRegistry::new();
    reg.define_tree_from_nodes(
        "soldier",
        "root",
        [
            selector("root", ["assault", "regroup", "patrol"]),
            sequence("assault", ["attack_ordered", "charge"]),
            condition("attack_ordered", "attack_ordered"),
            action("charge", "charge"),
            sequence("regroup", ["retreat_ordered", "fall_back"]),
            condition("retreat_ordered", "retreat_ordered"),
            action("fall_back", "fall_back"),
            repeater("patrol", "step", 3, FailPolicy::Fail),
            action("step", "step"),
        ],
    )?;

    reg.register_condition("attack_ordered", |w: &ComponentWorld, e| {
        order(w, e).as_deref() == Some("attack")
    });
    reg.register_condition("retreat_ordered", |w: &ComponentWorld, e| {
        order(w, e).as_deref() == Some("retreat")
    });
    reg.register_action("charge", |w: &mut ComponentWorld, _, e| {
        match w.get_mut::<Vitals>(e) {
            Some(v) if v.hp > 0 => {
                v.hp -= 1;
                Status::Success
            }
            _ => Status::Failure,
        }
    });
    reg.register_action("fall_back", |w: &mut ComponentWorld, _, e| {
        match w.get_mut::<Vitals>(e) {
            Some(v) => {
                v.hp = (v.hp + 2).min(v.max_hp);
                Status::Success
            }
            None => Status::Failure,
        }
    });
    reg.register_action("step", |_: &mut ComponentWorld, _, _| Status::Success);

    reg.register_consideration("aggression", aggression);
    reg.register_consideration("healthy", |w: &ComponentWorld, e| {
        vitals(w, e).map_or(0.0, |v| curves::logistic(v.health(), 10.0, 0.4))
    });
    reg.register_consideration("wounded", |w: &ComponentWorld, e| {
        vitals(w, e).map_or(1.0, |v| curves::inverse(v.health(), 2.0))
    });
    reg.define_utility_action("fight", ["aggression", "healthy"]);
    reg.define_utility_action("take_cover", ["wounded"]);
    reg.define_utility_selector("stance", ["fight", "take_cover"]);

    Ok(reg.into_shared())
}

/// Registry with the commander prompts. The client is registered by the caller.
pub fn strategy() -> SharedStrategy<ComponentWorld> {
    let mut reg = StrategicRegistry::new();
    reg.define_role(
        "squad_leader",
        "You direct one soldier. Reply with a JSON object holding \"goal\" \
         (\"attack\" or \"retreat\") and \"aggression\" between 0 and 1.",
    );
    reg.define_personality("veteran", "You are calm and protect your people.");
    reg.define_personality("hothead", "You push forward whenever you can.");
    reg.define_context("vitals", |w: &ComponentWorld, e| match vitals(w, e) {
        Some(v) => format!("soldier {} hp={}/{}", e.0, v.hp, v.max_hp),
        None => format!("soldier {} status unknown", e.0),
    });
    reg.into_shared()
}

/// Offline stand-in for the commander: retreat when below half health.
pub fn commander(_system: &str, user: &str) -> String {
    let health = user
        .split_once("hp=")
        .and_then(|(_, rest)| rest.split_once('/'))
        .and_then(|(hp, max)| Some((hp.parse::<f64>().ok()?, max.parse::<f64>().ok()?)))
        .map_or(1.0, |(hp, max)| hp / max.max(1.0));

    if health < 0.5 {
        r#"{"goal": "retreat", "aggression": 0.1}"#.to_owned()
    } else {
        format!("```json\n{{\"goal\": \"attack\", \"aggression\": {health:.2}}}\n```")
    }
}

/// Spawns `count` soldiers with alternating personalities.
pub fn populate(world: &mut ComponentWorld, count: u32) -> Result<Vec<EntityId>, WorldError> {
    let mut soldiers = Vec::new();
    for i in 0..count {
        let e = world.spawn();
        let personality = if i % 2 == 0 { "veteran" } else { "hothead" };
        let agent = StrategicAgent::new("squad_leader", personality, "vitals")
            .with_interval(20)
            .with_priority(i32::try_from(count - i).unwrap_or(0));

        world.attach(e, agent)?;
        world.attach(e, Blackboard::new())?;
        world.attach(e, TreeState::new("soldier"))?;
        world.attach(e, UtilityState::new("stance"))?;
        world.attach(e, Vitals { hp: 10, max_hp: 10 })?;
        soldiers.push(e);
    }
    Ok(soldiers)
}
