// world.rs - Entity store with synchronous rule dispatch

use crate::rule_registry::RuleRegistry;
use crate::{
    ancestry, states, tag, try_component_type, Bits, Component, ComponentType, ComponentValue,
    Entity, EntityId, ModelError, ModelResult, ModelSettings, ModelState, ModelTag, Rule,
    RuleHandle, RuleInfo, Tag, Trigger,
};
use keel_metrics::{metrics, Counter, RuleProfiler};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Default)]
struct EntityRecord {
    components: BTreeMap<ComponentType, ComponentValue>,
    present: Bits,
    fired: Bits,
}

/// Owns every entity and its components, plus the configured rules.
///
/// Every successful write runs the rules it satisfies before returning.
/// Rules may write further components re-entrantly; those writes dispatch
/// depth-first.
pub struct World {
    next_entity_id: EntityId,
    entities: BTreeMap<Entity, EntityRecord>,
    rules: RuleRegistry,
    settings: ModelSettings,
    dispatch_depth: usize,
    counter: Counter,
    profiler: RuleProfiler,
}

/// Serializable snapshot of an entity for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDescription {
    pub entity: Entity,
    pub state: ModelState,
    pub components: Vec<&'static str>,
}

impl World {
    /// Create an empty world with default settings.
    ///
    /// The ancestry resolver rule is installed up front.
    pub fn new() -> Self {
        Self::with_settings(ModelSettings::default())
    }

    /// # Panics
    ///
    /// If the ancestry resolver cannot be installed, which a fresh registry
    /// never refuses. Use [`World::try_with_settings`] to get the error.
    pub fn with_settings(settings: ModelSettings) -> Self {
        Self::try_with_settings(settings).expect("fresh world rejected the ancestry resolver")
    }

    /// Create a world and install the ancestry resolver rule.
    pub fn try_with_settings(settings: ModelSettings) -> ModelResult<Self> {
        let mut world = Self {
            next_entity_id: 1,
            entities: BTreeMap::new(),
            rules: RuleRegistry::new(),
            settings,
            dispatch_depth: 0,
            counter: Counter::new(),
            profiler: RuleProfiler::new(),
        };
        world.configure(ancestry::resolve_ancestors_rule())?;
        Ok(world)
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Create an entity with no components.
    pub fn new_entity(&mut self) -> Entity {
        let entity = Entity::new(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.insert(entity, EntityRecord::default());
        trace!(%entity, "created entity");
        entity
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys().copied()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Attach `value`, replacing any previous value of the same type.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> ModelResult<()> {
        let ty = try_component_type::<T>()?;
        self.write(entity, ty, Arc::new(value))
    }

    /// Replace a value the entity already carries.
    pub fn set_component<T: Component>(&mut self, entity: Entity, value: T) -> ModelResult<()> {
        let ty = try_component_type::<T>()?;
        if !self.contains(entity) {
            return Err(ModelError::UnknownEntity(entity));
        }
        if !self.has_type(entity, ty) {
            return Err(ModelError::MissingComponent {
                entity,
                component: ty.name(),
            });
        }
        self.write(entity, ty, Arc::new(value))
    }

    /// Attach the singleton for tag `T`.
    pub fn add_tag<T: Tag>(&mut self, entity: Entity) -> ModelResult<()> {
        self.add_model_tag(entity, &tag::<T>())
    }

    pub fn add_model_tag(&mut self, entity: Entity, tag: &ModelTag) -> ModelResult<()> {
        self.write(entity, tag.component_type(), tag.value())
    }

    /// Attach an already type-erased value.
    pub fn add_dyn(
        &mut self,
        entity: Entity,
        ty: ComponentType,
        value: ComponentValue,
    ) -> ModelResult<()> {
        if !ty.accepts(&value) {
            return Err(ModelError::ComponentTypeMismatch {
                component: ty.name(),
                expected: ty.info().rust_type,
            });
        }
        self.write(entity, ty, value)
    }

    /// Detach the `T` value, if any.
    ///
    /// Removing an input re-arms the fire-once rules that depend on it.
    /// Removal itself does not dispatch.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<Arc<T>> {
        let ty = try_component_type::<T>().ok()?;
        self.remove_type(entity, ty)?.downcast::<T>().ok()
    }

    pub fn remove_type(&mut self, entity: Entity, ty: ComponentType) -> Option<ComponentValue> {
        let record = self.entities.get_mut(&entity)?;
        let value = record.components.remove(&ty)?;
        record.present.clear(ty.index());
        for handle in self.rules.triggered_by(ty) {
            record.fired.clear(handle.index() as usize);
        }
        trace!(%entity, component = ty.name(), "component removed");
        Some(value)
    }

    fn write(&mut self, entity: Entity, ty: ComponentType, value: ComponentValue) -> ModelResult<()> {
        let record = self
            .entities
            .get_mut(&entity)
            .ok_or(ModelError::UnknownEntity(entity))?;
        let replaced = record.components.insert(ty, value).is_some();
        record.present.set(ty.index());
        trace!(%entity, component = ty.name(), replaced, "component written");
        metrics! {
            self.counter.increment("components.written", 1);
        }
        self.dispatch(entity, ty)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn find_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        let ty = try_component_type::<T>().ok()?;
        self.entities
            .get(&entity)?
            .components
            .get(&ty)?
            .downcast_ref::<T>()
    }

    /// Shared handle to the stored `T` value.
    pub fn find_arc<T: Component>(&self, entity: Entity) -> Option<Arc<T>> {
        let ty = try_component_type::<T>().ok()?;
        Arc::clone(self.find_dyn(entity, ty)?).downcast::<T>().ok()
    }

    pub fn find_dyn(&self, entity: Entity, ty: ComponentType) -> Option<&ComponentValue> {
        self.entities.get(&entity)?.components.get(&ty)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        try_component_type::<T>().is_ok_and(|ty| self.has_type(entity, ty))
    }

    pub fn has_type(&self, entity: Entity, ty: ComponentType) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|record| record.present.contains(ty.index()))
    }

    /// Component types on `entity` in catalog id order.
    pub fn component_types(&self, entity: Entity) -> Vec<ComponentType> {
        self.entities
            .get(&entity)
            .map(|record| record.components.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        match try_component_type::<T>() {
            Ok(ty) => self.entities_with_all(&[ty]),
            Err(_) => Vec::new(),
        }
    }

    /// Entities carrying every listed type, in creation order.
    pub fn entities_with_all(&self, types: &[ComponentType]) -> Vec<Entity> {
        let mask: Bits = types.iter().map(|ty| ty.index()).collect();
        self.entities
            .iter()
            .filter(|(_, record)| record.present.contains_all(&mask))
            .map(|(entity, _)| *entity)
            .collect()
    }

    pub fn query<F>(&self, predicate: F) -> Vec<Entity>
    where
        F: Fn(&World, Entity) -> bool,
    {
        self.entities()
            .filter(|entity| predicate(self, *entity))
            .collect()
    }

    pub fn describe(&self, entity: Entity) -> Option<EntityDescription> {
        let record = self.entities.get(&entity)?;
        Some(EntityDescription {
            entity,
            state: states::get_state(self, entity),
            components: record.components.keys().map(|ty| ty.name()).collect(),
        })
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    /// Register `rule` and replay it against every existing entity.
    pub fn configure(&mut self, rule: Rule) -> ModelResult<RuleHandle> {
        let parts = rule.into_parts()?;
        let name = parts.name.clone();
        let handle = self.rules.register(parts)?;
        debug!(rule = %name, %handle, "configured rule");

        let existing: Vec<Entity> = self.entities.keys().copied().collect();
        for entity in existing {
            self.fire(entity, handle)?;
        }
        Ok(handle)
    }

    pub fn rules(&self) -> Vec<RuleInfo> {
        self.rules.iter().map(|rule| rule.info()).collect()
    }

    pub fn rule_handle(&self, name: &str) -> Option<RuleHandle> {
        self.rules.lookup(name)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Whether `handle` has fired for `entity` and was not re-armed since.
    pub fn has_fired(&self, entity: Entity, handle: RuleHandle) -> bool {
        self.entities
            .get(&entity)
            .is_some_and(|record| record.fired.contains(handle.index() as usize))
    }

    pub fn counters(&self) -> &Counter {
        &self.counter
    }

    pub fn profiler(&self) -> &RuleProfiler {
        &self.profiler
    }

    fn dispatch(&mut self, entity: Entity, ty: ComponentType) -> ModelResult<()> {
        // Callbacks may configure new rules, so work from a snapshot.
        let candidates = self.rules.triggered_by(ty).to_vec();
        for handle in candidates {
            self.fire(entity, handle)?;
        }
        Ok(())
    }

    fn fire(&mut self, entity: Entity, handle: RuleHandle) -> ModelResult<bool> {
        let (Some(rule), Some(record)) = (self.rules.get(handle), self.entities.get_mut(&entity))
        else {
            return Ok(false);
        };

        let slot = handle.index() as usize;
        if !record.present.contains_all(&rule.mask) {
            return Ok(false);
        }
        if rule.trigger == Trigger::Once && record.fired.contains(slot) {
            return Ok(false);
        }
        let Some(values) = rule
            .inputs
            .iter()
            .map(|input| record.components.get(input).cloned())
            .collect::<Option<Vec<ComponentValue>>>()
        else {
            return Ok(false);
        };

        // Marked before the callback so re-entrant writes cannot fire it again.
        record.fired.set(slot);
        let action = Arc::clone(&rule.action);
        let name = rule.name.clone();

        let limit = self.settings.max_dispatch_depth;
        if self.dispatch_depth >= limit {
            warn!(rule = %name, %entity, limit, "rule dispatch nested too deeply");
            return Err(ModelError::DispatchDepthExceeded {
                rule: name,
                entity,
                limit,
            });
        }

        if self.settings.trace_dispatch {
            debug!(rule = %name, %entity, depth = self.dispatch_depth, "firing rule");
        } else {
            trace!(rule = %name, %entity, depth = self.dispatch_depth, "firing rule");
        }
        metrics! {
            self.counter.increment("rules.fired", 1);
        }

        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();
        self.dispatch_depth += 1;
        let result = action(self, entity, values.as_slice());
        self.dispatch_depth -= 1;
        #[cfg(feature = "metrics")]
        self.profiler.record(&name, started.elapsed());

        result.map_err(|source| ModelError::RuleFailed {
            rule: name,
            entity,
            source: Box::new(source),
        })?;
        Ok(true)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("rules", &self.rules.len())
            .field("settings", &self.settings)
            .finish()
    }
}
