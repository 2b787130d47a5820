//! Typed per-entity component storage.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

use crate::EntityId;

/// Errors raised by component mutation on the host.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("entity {0} is not alive")]
    DeadEntity(EntityId),
}

/// Entity storage as seen by the decision systems.
///
/// Components are arbitrary `'static` values keyed by their type. Iteration
/// order of [`World::entities_with`] must be ascending by id so that systems
/// iterating it stay deterministic.
pub trait World {
    /// Returns `true` if the entity exists and has not been despawned.
    fn alive(&self, entity: EntityId) -> bool;

    fn get<C: Any>(&self, entity: EntityId) -> Option<&C>;

    fn get_mut<C: Any>(&mut self, entity: EntityId) -> Option<&mut C>;

    fn has<C: Any>(&self, entity: EntityId) -> bool {
        self.get::<C>(entity).is_some()
    }

    /// Attaches (or replaces) a component on a live entity.
    fn attach<C: Any>(&mut self, entity: EntityId, component: C) -> Result<(), WorldError>;

    /// Removes a component, returning it if it was present.
    fn detach<C: Any>(&mut self, entity: EntityId) -> Option<C>;

    /// All live entities carrying a `C` component, ascending by id.
    fn entities_with<C: Any>(&self) -> Vec<EntityId>;
}

/// Straightforward in-memory [`World`]: one ordered map per component type.
#[derive(Default)]
pub struct ComponentWorld {
    next_id: u32,
    alive: BTreeSet<EntityId>,
    stores: HashMap<TypeId, BTreeMap<EntityId, Box<dyn Any>>>,
}

impl ComponentWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh entity. Ids are never reused.
    pub fn spawn(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.alive.insert(id);
        id
    }

    /// Removes an entity and every component attached to it.
    pub fn despawn(&mut self, entity: EntityId) {
        if self.alive.remove(&entity) {
            for store in self.stores.values_mut() {
                store.remove(&entity);
            }
            tracing::debug!(%entity, "despawned");
        }
    }

    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }
}

impl World for ComponentWorld {
    fn alive(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }

    fn get<C: Any>(&self, entity: EntityId) -> Option<&C> {
        self.stores
            .get(&TypeId::of::<C>())?
            .get(&entity)?
            .downcast_ref::<C>()
    }

    fn get_mut<C: Any>(&mut self, entity: EntityId) -> Option<&mut C> {
        self.stores
            .get_mut(&TypeId::of::<C>())?
            .get_mut(&entity)?
            .downcast_mut::<C>()
    }

    fn attach<C: Any>(&mut self, entity: EntityId, component: C) -> Result<(), WorldError> {
        if !self.alive(entity) {
            return Err(WorldError::DeadEntity(entity));
        }
        self.stores
            .entry(TypeId::of::<C>())
            .or_default()
            .insert(entity, Box::new(component));
        Ok(())
    }

    fn detach<C: Any>(&mut self, entity: EntityId) -> Option<C> {
        let boxed = self.stores.get_mut(&TypeId::of::<C>())?.remove(&entity)?;
        boxed.downcast::<C>().ok().map(|c| *c)
    }

    fn entities_with<C: Any>(&self) -> Vec<EntityId> {
        self.stores
            .get(&TypeId::of::<C>())
            .map(|store| store.keys().copied().collect())
            .unwrap_or_default()
    }
}
