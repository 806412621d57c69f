//! Lifecycle state machine
//!
//! Every entity moves forward through
//! `Created -> Initialized -> Registered -> Realized -> Finalized`. Each
//! transition runs the ones before it, is a no-op the second time, and adds an
//! `IsAtLeast*` marker tag the first time the state is reached so that rules
//! can key on "at least realized" directly.
//!
//! `register` and `realize` bring the parent (see
//! [`ParentComponent`](crate::ParentComponent)) to the same state first. The
//! transient `Registering`/`Realizing` tags stop a re-entrant call from
//! walking the same entity twice, but the re-entrant call still adds the
//! `IsAtLeast*` marker, so a nested `realize` returns with the entity marked
//! and the outer call only advances the stored state. The transient tags stay
//! on the entity afterwards so the walk can be inspected.

use crate::{ancestry, Entity, ModelResult, Tag, World};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelState {
    Created,
    Initialized,
    Registered,
    Realized,
    Finalized,
}

define_component!(ModelState, "ModelState");

impl ModelState {
    pub fn is_at_least(self, state: ModelState) -> bool {
        self >= state
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IsAtLeastCreated;
define_tag!(IsAtLeastCreated, "IsAtLeastCreated");

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IsAtLeastInitialized;
define_tag!(IsAtLeastInitialized, "IsAtLeastInitialized");

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IsAtLeastRegistered;
define_tag!(IsAtLeastRegistered, "IsAtLeastRegistered");

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IsAtLeastRealized;
define_tag!(IsAtLeastRealized, "IsAtLeastRealized");

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IsAtLeastFinalized;
define_tag!(IsAtLeastFinalized, "IsAtLeastFinalized");

/// Set while an entity's registration (and its parent's) is in progress.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registering;
define_tag!(Registering, "Registering");

/// Set while an entity's realization (and its parent's) is in progress.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Realizing;
define_tag!(Realizing, "Realizing");

pub fn create(world: &mut World, entity: Entity) -> ModelResult<Entity> {
    if world.has_component::<IsAtLeastCreated>(entity) {
        return Ok(entity);
    }
    if !world.has_component::<ModelState>(entity) {
        world.add_component(entity, ModelState::Created)?;
    }
    mark::<IsAtLeastCreated>(world, entity)?;
    Ok(entity)
}

pub fn initialize(world: &mut World, entity: Entity) -> ModelResult<Entity> {
    if world.has_component::<IsAtLeastInitialized>(entity) {
        return Ok(entity);
    }
    create(world, entity)?;
    advance(world, entity, ModelState::Initialized)?;
    mark::<IsAtLeastInitialized>(world, entity)?;
    Ok(entity)
}

pub fn register(world: &mut World, entity: Entity) -> ModelResult<Entity> {
    if world.has_component::<IsAtLeastRegistered>(entity) {
        return Ok(entity);
    }
    initialize(world, entity)?;
    // An outer call may already be registering this entity.
    if get_state(world, entity) < ModelState::Registered
        && !world.has_component::<Registering>(entity)
    {
        mark::<Registering>(world, entity)?;
        if let Some(parent) = ancestry::parent_of(world, entity) {
            register(world, parent)?;
        }
        advance(world, entity, ModelState::Registered)?;
    }
    mark::<IsAtLeastRegistered>(world, entity)?;
    Ok(entity)
}

/// Alias of [`register`].
pub fn discover(world: &mut World, entity: Entity) -> ModelResult<Entity> {
    register(world, entity)
}

pub fn realize(world: &mut World, entity: Entity) -> ModelResult<Entity> {
    if world.has_component::<IsAtLeastRealized>(entity) {
        return Ok(entity);
    }
    register(world, entity)?;
    if get_state(world, entity) < ModelState::Realized
        && !world.has_component::<Realizing>(entity)
    {
        mark::<Realizing>(world, entity)?;
        // Parent first, so its realized rules never run after the child's.
        if let Some(parent) = ancestry::parent_of(world, entity) {
            realize(world, parent)?;
        }
        advance(world, entity, ModelState::Realized)?;
    }
    mark::<IsAtLeastRealized>(world, entity)?;
    Ok(entity)
}

/// Finalize `entity`. The parent is realized, never finalized.
pub fn finalize(world: &mut World, entity: Entity) -> ModelResult<Entity> {
    if world.has_component::<IsAtLeastFinalized>(entity) {
        return Ok(entity);
    }
    realize(world, entity)?;
    advance(world, entity, ModelState::Finalized)?;
    mark::<IsAtLeastFinalized>(world, entity)?;
    Ok(entity)
}

/// Current state; a fresh entity is implicitly `Created`.
pub fn get_state(world: &World, entity: Entity) -> ModelState {
    world
        .find_component::<ModelState>(entity)
        .copied()
        .unwrap_or(ModelState::Created)
}

pub fn is_at_least(world: &World, entity: Entity, state: ModelState) -> bool {
    get_state(world, entity).is_at_least(state)
}

fn advance(world: &mut World, entity: Entity, state: ModelState) -> ModelResult<()> {
    if get_state(world, entity) < state {
        debug!(%entity, ?state, "lifecycle transition");
        world.add_component(entity, state)?;
    }
    Ok(())
}

fn mark<T: Tag>(world: &mut World, entity: Entity) -> ModelResult<()> {
    if !world.has_component::<T>(entity) {
        world.add_tag::<T>(entity)?;
    }
    Ok(())
}
