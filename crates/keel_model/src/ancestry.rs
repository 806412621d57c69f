//! Ancestry resolver
//!
//! A [`ParentComponent`] is a back-reference: it never keeps the parent alive
//! and the world owns both ends. Attaching one triggers the built-in
//! `resolve-ancestors` rule, which walks the chain to the root and caches the
//! result as an [`AncestorsComponent`].

use crate::{Entity, ModelError, ModelResult, Rule, World};

pub const RESOLVE_ANCESTORS_RULE: &str = "resolve-ancestors";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentComponent(Entity);

define_component!(ParentComponent, "ParentComponent");

impl ParentComponent {
    pub fn of(parent: Entity) -> Self {
        Self(parent)
    }

    pub fn entity(&self) -> Entity {
        self.0
    }
}

/// Transitive parents, closest first, without duplicates. Never contains the
/// entity itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ancestors {
    entities: Vec<Entity>,
}

impl Ancestors {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve (or read the cached) ancestors of `entity`.
    pub fn of(world: &mut World, entity: Entity) -> ModelResult<Self> {
        resolve_ancestors(world, entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn closest(&self) -> Option<Entity> {
        self.entities.first().copied()
    }

    pub fn root(&self) -> Option<Entity> {
        self.entities.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorsComponent(Ancestors);

define_component!(AncestorsComponent, "AncestorsComponent");

impl AncestorsComponent {
    pub fn get(&self) -> &Ancestors {
        &self.0
    }
}

pub fn parent_of(world: &World, entity: Entity) -> Option<Entity> {
    world
        .find_component::<ParentComponent>(entity)
        .map(ParentComponent::entity)
}

/// Iterator over the live parent chain, closest first.
///
/// Stops early if the chain loops back on itself.
pub fn parents(world: &World, entity: Entity) -> Parents<'_> {
    Parents {
        world,
        origin: entity,
        current: entity,
        seen: Vec::new(),
    }
}

pub struct Parents<'w> {
    world: &'w World,
    origin: Entity,
    current: Entity,
    seen: Vec<Entity>,
}

impl Iterator for Parents<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let parent = parent_of(self.world, self.current)?;
        if parent == self.origin || self.seen.contains(&parent) {
            return None;
        }
        self.seen.push(parent);
        self.current = parent;
        Some(parent)
    }
}

/// Return the cached ancestors of `entity`, computing and caching them on
/// first use.
///
/// A root (no [`ParentComponent`]) answers an empty set and caches nothing,
/// so a parent attached later still resolves.
pub fn resolve_ancestors(world: &mut World, entity: Entity) -> ModelResult<Ancestors> {
    if let Some(cached) = world.find_component::<AncestorsComponent>(entity) {
        return Ok(cached.get().clone());
    }
    if !world.contains(entity) {
        return Err(ModelError::UnknownEntity(entity));
    }
    if parent_of(world, entity).is_none() {
        return Ok(Ancestors::empty());
    }

    let ancestors = walk(world, entity)?;
    world.add_component(entity, AncestorsComponent(ancestors.clone()))?;
    Ok(ancestors)
}

fn walk(world: &World, entity: Entity) -> ModelResult<Ancestors> {
    let mut entities = Vec::new();
    let mut current = entity;
    while let Some(parent) = parent_of(world, current) {
        if parent == entity || entities.contains(&parent) {
            return Err(ModelError::AncestryCycle {
                entity,
                repeated: parent,
            });
        }
        entities.push(parent);
        current = parent;
    }
    Ok(Ancestors { entities })
}

pub(crate) fn resolve_ancestors_rule() -> Rule {
    Rule::of1(RESOLVE_ANCESTORS_RULE, |world, entity, _: &ParentComponent| {
        resolve_ancestors(world, entity).map(|_| ())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(world: &mut World, length: usize) -> Vec<Entity> {
        let mut entities: Vec<Entity> = Vec::new();
        for _ in 0..length {
            let entity = world.new_entity();
            if let Some(&parent) = entities.last() {
                world.add_component(entity, ParentComponent::of(parent)).unwrap();
            }
            entities.push(entity);
        }
        entities
    }

    #[test]
    fn ancestors_are_closest_first() {
        let mut world = World::new();
        let entities = chain(&mut world, 4);
        let (root, g, p, e) = (entities[0], entities[1], entities[2], entities[3]);

        let ancestors = Ancestors::of(&mut world, e).unwrap();
        assert_eq!(ancestors.iter().collect::<Vec<_>>(), vec![p, g, root]);
        assert!(ancestors.contains(p));
        assert!(!ancestors.contains(e));
        assert_eq!(ancestors.closest(), Some(p));
        assert_eq!(ancestors.root(), Some(root));
        assert_eq!(parents(&world, e).collect::<Vec<_>>(), vec![p, g, root]);
    }

    #[test]
    fn attaching_a_parent_caches_ancestors() {
        let mut world = World::new();
        let entities = chain(&mut world, 3);
        let cached = world
            .find_component::<AncestorsComponent>(entities[2])
            .unwrap();
        assert_eq!(cached.get().len(), 2);

        let handle = world.rule_handle(RESOLVE_ANCESTORS_RULE).unwrap();
        assert!(world.has_fired(entities[2], handle));
        assert!(world.find_component::<AncestorsComponent>(entities[0]).is_none());
    }

    #[test]
    fn cached_result_is_not_recomputed() {
        let mut world = World::new();
        let entities = chain(&mut world, 2);
        let stranger = world.new_entity();

        world.remove_component::<ParentComponent>(entities[1]);
        world
            .add_component(entities[1], ParentComponent::of(stranger))
            .unwrap();

        let ancestors = resolve_ancestors(&mut world, entities[1]).unwrap();
        assert_eq!(ancestors.iter().collect::<Vec<_>>(), vec![entities[0]]);
        assert_eq!(parents(&world, entities[1]).collect::<Vec<_>>(), vec![stranger]);
    }

    #[test]
    fn querying_a_root_does_not_pin_an_empty_set() {
        let mut world = World::new();
        let parent = world.new_entity();
        let child = world.new_entity();

        assert!(resolve_ancestors(&mut world, child).unwrap().is_empty());
        assert!(world.find_component::<AncestorsComponent>(child).is_none());

        world.add_component(child, ParentComponent::of(parent)).unwrap();
        let ancestors = resolve_ancestors(&mut world, child).unwrap();
        assert_eq!(ancestors.iter().collect::<Vec<_>>(), vec![parent]);
        assert!(world
            .find_component::<AncestorsComponent>(child)
            .unwrap()
            .get()
            .contains(parent));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut world = World::new();
        let a = world.new_entity();
        let b = world.new_entity();
        world.add_component(b, ParentComponent::of(a)).unwrap();

        let error = world.add_component(a, ParentComponent::of(b)).unwrap_err();
        assert!(matches!(
            error.root_cause(),
            ModelError::AncestryCycle { entity, .. } if *entity == a
        ));
        assert_eq!(parents(&world, a).collect::<Vec<_>>(), vec![b]);
    }
}
