//! Strategic registry: prompt fragments, context builders, parsers, the
//! client handle and observers.
//!
//! Like the decision registry, this is a by-name lookup table owned by the
//! host and never serialized. Definitions are last-write-wins.

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use behavior_tree::Blackboard;
use sim_world::EntityId;

use crate::client::LlmClient;
use crate::components::StrategicAgent;
use crate::error::ParseError;
use crate::events::{DispatchEvent, ErrorEvent, ResponseEvent};

/// Builds the user message for one entity.
pub type ContextFn<W> = Box<dyn Fn(&W, EntityId) -> String>;

/// Applies a raw response to an entity's blackboard.
pub type ParserFn = Box<dyn Fn(&str, &mut Blackboard) -> Result<(), ParseError>>;

pub type Observer<E> = Box<dyn Fn(&E)>;

/// Registry handle shared by the query system and the host.
pub type SharedStrategy<W> = Rc<RefCell<StrategicRegistry<W>>>;

/// Separator between the role and personality fragments of a system prompt.
pub const PROMPT_SEPARATOR: &str = "\n\n";

/// An assembled prompt ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Size in characters, as reported to dispatch observers.
    pub fn len(&self) -> usize {
        self.system.chars().count() + self.user.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.user.is_empty()
    }
}

pub struct StrategicRegistry<W> {
    roles: HashMap<String, String>,
    personalities: HashMap<String, String>,
    contexts: HashMap<String, ContextFn<W>>,
    parsers: HashMap<String, ParserFn>,
    client: Option<Arc<dyn LlmClient>>,
    on_query: Vec<Observer<DispatchEvent>>,
    on_response: Vec<Observer<ResponseEvent>>,
    on_error: Vec<Observer<ErrorEvent>>,
}

impl<W> Default for StrategicRegistry<W> {
    fn default() -> Self {
        Self {
            roles: HashMap::new(),
            personalities: HashMap::new(),
            contexts: HashMap::new(),
            parsers: HashMap::new(),
            client: None,
            on_query: Vec::new(),
            on_response: Vec::new(),
            on_error: Vec::new(),
        }
    }
}

impl<W> StrategicRegistry<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedStrategy<W> {
        Rc::new(RefCell::new(self))
    }

    // --- Definitions ---

    pub fn define_role(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.roles.insert(name.into(), text.into());
    }

    pub fn define_personality(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.personalities.insert(name.into(), text.into());
    }

    pub fn define_context<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&W, EntityId) -> String + 'static,
    {
        self.contexts.insert(name.into(), Box::new(f));
    }

    pub fn define_parser<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&str, &mut Blackboard) -> Result<(), ParseError> + 'static,
    {
        self.parsers.insert(name.into(), Box::new(f));
    }

    /// Sets (or replaces) the client used for every later dispatch.
    pub fn register_client(&mut self, client: impl LlmClient + 'static) {
        self.client = Some(Arc::new(client));
    }

    pub fn clear_client(&mut self) {
        self.client = None;
    }

    // --- Lookups ---

    pub fn role(&self, name: &str) -> Option<&str> {
        self.roles.get(name).map(String::as_str)
    }

    pub fn personality(&self, name: &str) -> Option<&str> {
        self.personalities.get(name).map(String::as_str)
    }

    pub fn context(&self, name: &str) -> Option<&ContextFn<W>> {
        self.contexts.get(name)
    }

    pub fn parser(&self, name: &str) -> Option<&ParserFn> {
        self.parsers.get(name)
    }

    pub fn client(&self) -> Option<&Arc<dyn LlmClient>> {
        self.client.as_ref()
    }

    /// Definition names referenced by `agent` that do not resolve, formatted
    /// for an error message. Empty when the agent is fully defined.
    pub fn missing_definitions(&self, agent: &StrategicAgent) -> Vec<String> {
        let mut missing = Vec::new();
        if self.role(&agent.role).is_none() {
            missing.push(format!("role '{}'", agent.role));
        }
        if self.personality(&agent.personality).is_none() {
            missing.push(format!("personality '{}'", agent.personality));
        }
        if self.context(&agent.context).is_none() {
            missing.push(format!("context '{}'", agent.context));
        }
        if !agent.parser.is_empty() && self.parser(&agent.parser).is_none() {
            missing.push(format!("parser '{}'", agent.parser));
        }
        missing
    }

    /// Builds the prompt for `agent`, or `None` if a fragment is missing.
    pub fn assemble_prompt(&self, world: &W, entity: EntityId, agent: &StrategicAgent) -> Option<Prompt> {
        let role = self.role(&agent.role)?;
        let personality = self.personality(&agent.personality)?;
        let context = self.context(&agent.context)?;

        Some(Prompt {
            system: format!("{role}{PROMPT_SEPARATOR}{personality}"),
            user: context(world, entity),
        })
    }

    // --- Observers ---

    /// Fires after each dispatch. Observers run in registration order.
    pub fn on_query<F>(&mut self, f: F)
    where
        F: Fn(&DispatchEvent) + 'static,
    {
        self.on_query.push(Box::new(f));
    }

    /// Fires after each successfully parsed response.
    pub fn on_response<F>(&mut self, f: F)
    where
        F: Fn(&ResponseEvent) + 'static,
    {
        self.on_response.push(Box::new(f));
    }

    /// Fires on every per-tick failure, transient or not.
    pub fn on_error<F>(&mut self, f: F)
    where
        F: Fn(&ErrorEvent) + 'static,
    {
        self.on_error.push(Box::new(f));
    }

    pub(crate) fn notify_query(&self, event: &DispatchEvent) {
        notify("on_query", &self.on_query, event);
    }

    pub(crate) fn notify_response(&self, event: &ResponseEvent) {
        notify("on_response", &self.on_response, event);
    }

    pub(crate) fn notify_error(&self, event: &ErrorEvent) {
        tracing::warn!(
            entity = %event.entity,
            kind = %event.kind,
            tick = %event.tick,
            "{}",
            event.message
        );
        notify("on_error", &self.on_error, event);
    }
}

/// Runs every observer in order. A panicking observer is logged and skipped.
fn notify<E>(label: &str, observers: &[Observer<E>], event: &E) {
    for observer in observers {
        if panic::catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
            tracing::error!(observer = label, "observer panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use sim_world::Tick;

    use super::*;
    use crate::error::ErrorKind;

    fn registry() -> StrategicRegistry<()> {
        let mut reg = StrategicRegistry::new();
        reg.define_role("scout", "You scout.");
        reg.define_personality("bold", "You are bold.");
        reg.define_context("here", |_: &(), e| format!("entity {}", e.0));
        reg
    }

    #[test]
    fn assembles_role_and_personality_into_system_prompt() {
        let reg = registry();
        let agent = StrategicAgent::new("scout", "bold", "here");

        let prompt = reg.assemble_prompt(&(), EntityId(4), &agent).unwrap();
        assert_eq!(prompt.system, "You scout.\n\nYou are bold.");
        assert_eq!(prompt.user, "entity 4");
        assert_eq!(prompt.len(), 25 + 8);
    }

    #[test]
    fn reports_every_missing_name() {
        let reg = registry();
        let agent = StrategicAgent::new("scout", "shy", "nowhere").with_parser("yaml");

        assert_eq!(
            reg.missing_definitions(&agent),
            ["personality 'shy'", "context 'nowhere'", "parser 'yaml'"]
        );
        assert!(reg.assemble_prompt(&(), EntityId(0), &agent).is_none());

        let ok = StrategicAgent::new("scout", "bold", "here");
        assert!(reg.missing_definitions(&ok).is_empty());
    }

    #[test]
    fn panicking_observer_does_not_stop_the_rest() {
        let mut reg = registry();
        let seen = Rc::new(RefCell::new(Vec::new()));

        reg.on_error(|_| panic!("observer bug"));
        let sink = Rc::clone(&seen);
        reg.on_error(move |e: &ErrorEvent| sink.borrow_mut().push(e.kind));

        reg.notify_error(&ErrorEvent {
            entity: EntityId(1),
            kind: ErrorKind::NoClient,
            message: "no client registered".into(),
            tick: Tick(1),
        });

        assert_eq!(*seen.borrow(), vec![ErrorKind::NoClient]);
    }
}
