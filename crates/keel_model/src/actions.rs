//! Model actions
//!
//! An action entity pairs a [`ModelSpecComponent`] (which entities it wants)
//! with a [`ModelActionComponent`] (what to do with each of them). Entities
//! tagged [`ConfigurableTag`] carry an [`ActionSelectorComponent`] that the
//! installed rules keep in step with the entity's own handle, its parent, its
//! cached ancestors and its lifecycle state.
//!
//! An action runs at most once per matching entity, whether the action or the
//! match arrives first. Executions are recorded in the target's
//! [`ExecutedActionComponent`] before the callback runs, so an action that
//! writes to its own target cannot trigger itself again.

use crate::ancestry::AncestorsComponent;
use crate::states::ModelState;
use crate::{Entity, ModelResult, ParentComponent, Rule, World};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Entities that actions may target.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurableTag;
define_tag!(ConfigurableTag, "ConfigurableTag");

/// Entities that describe an action.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModelActionTag;
define_tag!(ModelActionTag, "ModelActionTag");

/// What an action spec can see of a configurable entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSelector {
    entity: Option<Entity>,
    parent: Option<Entity>,
    ancestors: Vec<Entity>,
    state: Option<ModelState>,
}

impl ActionSelector {
    pub fn entity(&self) -> Option<Entity> {
        self.entity
    }

    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Closest first, as cached by the ancestry resolver.
    pub fn ancestors(&self) -> &[Entity] {
        &self.ancestors
    }

    pub fn state(&self) -> Option<ModelState> {
        self.state
    }

    pub fn is_descendant_of(&self, entity: Entity) -> bool {
        self.ancestors.contains(&entity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSelectorComponent(ActionSelector);

define_component!(ActionSelectorComponent, "ActionSelectorComponent");

impl ActionSelectorComponent {
    pub fn get(&self) -> &ActionSelector {
        &self.0
    }
}

type Predicate = Arc<dyn Fn(&ActionSelector) -> bool + Send + Sync>;

/// A predicate over [`ActionSelector`]s.
#[derive(Clone)]
pub struct ModelSpec {
    description: String,
    predicate: Predicate,
}

impl ModelSpec {
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ActionSelector) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Matches exactly `entity`.
    pub fn entity(entity: Entity) -> Self {
        Self::new(format!("entity {entity}"), move |selector| {
            selector.entity() == Some(entity)
        })
    }

    /// Matches the direct children of `parent`.
    pub fn child_of(parent: Entity) -> Self {
        Self::new(format!("child of {parent}"), move |selector| {
            selector.parent() == Some(parent)
        })
    }

    /// Matches every entity below `ancestor`.
    pub fn descendant_of(ancestor: Entity) -> Self {
        Self::new(format!("descendant of {ancestor}"), move |selector| {
            selector.is_descendant_of(ancestor)
        })
    }

    pub fn at_least(state: ModelState) -> Self {
        Self::new(format!("at least {state:?}"), move |selector| {
            selector.state().is_some_and(|current| current.is_at_least(state))
        })
    }

    pub fn and(self, other: ModelSpec) -> Self {
        let description = format!("{} and {}", self.description, other.description);
        Self::new(description, move |selector| {
            (self.predicate)(selector) && (other.predicate)(selector)
        })
    }

    pub fn is_satisfied_by(&self, selector: &ActionSelector) -> bool {
        (self.predicate)(selector)
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelSpec").field(&self.description).finish()
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

#[derive(Debug, Clone)]
pub struct ModelSpecComponent(ModelSpec);

define_component!(ModelSpecComponent, "ModelSpecComponent");

impl ModelSpecComponent {
    pub fn of(spec: ModelSpec) -> Self {
        Self(spec)
    }

    pub fn get(&self) -> &ModelSpec {
        &self.0
    }
}

type ActionCallback = Arc<dyn Fn(&mut World, Entity) -> ModelResult<()> + Send + Sync>;

#[derive(Clone)]
pub struct ModelActionComponent(ActionCallback);

define_component!(ModelActionComponent, "ModelActionComponent");

impl ModelActionComponent {
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&mut World, Entity) -> ModelResult<()> + Send + Sync + 'static,
    {
        Self(Arc::new(action))
    }
}

impl fmt::Debug for ModelActionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModelActionComponent(..)")
    }
}

/// Action entities already run against the entity carrying this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutedActionComponent(BTreeSet<Entity>);

define_component!(ExecutedActionComponent, "ExecutedActionComponent");

impl ExecutedActionComponent {
    pub fn contains(&self, action: Entity) -> bool {
        self.0.contains(&action)
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Create an action entity. It runs right away against every configurable
/// entity it already matches.
pub fn register_action<F>(world: &mut World, spec: ModelSpec, action: F) -> ModelResult<Entity>
where
    F: Fn(&mut World, Entity) -> ModelResult<()> + Send + Sync + 'static,
{
    let entity = world.new_entity();
    debug!(%entity, %spec, "registering model action");
    world.add_tag::<ModelActionTag>(entity)?;
    world.add_component(entity, ModelSpecComponent::of(spec))?;
    world.add_component(entity, ModelActionComponent::new(action))?;
    Ok(entity)
}

/// Install the selector and action rules.
pub fn install(world: &mut World) -> ModelResult<()> {
    world.configure(Rule::of1(
        "update-selector-for-self",
        |world, entity, _: &ConfigurableTag| {
            update_selector(world, entity, |selector| selector.entity = Some(entity))
        },
    ))?;
    world.configure(
        Rule::of2(
            "update-selector-for-parent",
            |world, entity, _: &ConfigurableTag, parent: &ParentComponent| {
                let parent = parent.entity();
                update_selector(world, entity, |selector| selector.parent = Some(parent))
            },
        )
        .on_change(),
    )?;
    world.configure(
        Rule::of2(
            "update-selector-for-ancestors",
            |world, entity, _: &ConfigurableTag, ancestors: &AncestorsComponent| {
                let ancestors: Vec<Entity> = ancestors.get().iter().collect();
                update_selector(world, entity, |selector| selector.ancestors = ancestors)
            },
        )
        .on_change(),
    )?;
    world.configure(
        Rule::of2(
            "update-selector-for-state",
            |world, entity, _: &ConfigurableTag, state: &ModelState| {
                let state = *state;
                update_selector(world, entity, |selector| selector.state = Some(state))
            },
        )
        .on_change(),
    )?;

    world.configure(
        Rule::of1(
            "run-matching-actions",
            |world, entity, selector: &ActionSelectorComponent| {
                for action in world.entities_with::<ModelActionTag>() {
                    let matches = world
                        .find_component::<ModelSpecComponent>(action)
                        .is_some_and(|spec| spec.get().is_satisfied_by(selector.get()));
                    if matches {
                        execute(world, action, entity)?;
                    }
                }
                Ok(())
            },
        )
        .on_change(),
    )?;
    world.configure(Rule::of3(
        "run-new-action",
        |world, action, _: &ModelActionTag, spec: &ModelSpecComponent, _: &ModelActionComponent| {
            for entity in world.entities_with::<ConfigurableTag>() {
                let matches = world
                    .find_component::<ActionSelectorComponent>(entity)
                    .is_some_and(|selector| spec.get().is_satisfied_by(selector.get()));
                if matches {
                    execute(world, action, entity)?;
                }
            }
            Ok(())
        },
    ))?;
    Ok(())
}

fn update_selector<F>(world: &mut World, entity: Entity, update: F) -> ModelResult<()>
where
    F: FnOnce(&mut ActionSelector),
{
    let current = world.find_component::<ActionSelectorComponent>(entity);
    let mut selector = current.map(|c| c.get().clone()).unwrap_or_default();
    update(&mut selector);
    if current.is_some_and(|c| c.get() == &selector) {
        return Ok(());
    }
    world.add_component(entity, ActionSelectorComponent(selector))
}

fn execute(world: &mut World, action: Entity, target: Entity) -> ModelResult<()> {
    let mut executed = world
        .find_component::<ExecutedActionComponent>(target)
        .cloned()
        .unwrap_or_default();
    if !executed.0.insert(action) {
        return Ok(());
    }
    let Some(callback) = world
        .find_component::<ModelActionComponent>(action)
        .map(|component| Arc::clone(&component.0))
    else {
        return Ok(());
    };

    world.add_component(target, executed)?;
    debug!(%action, %target, "running model action");
    callback(world, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states;
    use parking_lot::Mutex;

    fn configurable(world: &mut World, parent: Option<Entity>) -> Entity {
        let entity = world.new_entity();
        if let Some(parent) = parent {
            world
                .add_component(entity, ParentComponent::of(parent))
                .unwrap();
        }
        world.add_tag::<ConfigurableTag>(entity).unwrap();
        entity
    }

    fn recorder(world: &mut World, spec: ModelSpec) -> (Entity, Arc<Mutex<Vec<Entity>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let action = register_action(world, spec, move |_, entity| {
            sink.lock().push(entity);
            Ok(())
        })
        .unwrap();
        (action, log)
    }

    #[test]
    fn selector_tracks_parent_ancestors_and_state() {
        let mut world = World::new();
        install(&mut world).unwrap();
        let root = configurable(&mut world, None);
        let middle = configurable(&mut world, Some(root));
        let leaf = configurable(&mut world, Some(middle));
        states::realize(&mut world, leaf).unwrap();

        let selector = world
            .find_component::<ActionSelectorComponent>(leaf)
            .unwrap()
            .get();
        assert_eq!(selector.entity(), Some(leaf));
        assert_eq!(selector.parent(), Some(middle));
        assert_eq!(selector.ancestors(), &[middle, root]);
        assert_eq!(selector.state(), Some(ModelState::Realized));

        let root_selector = world
            .find_component::<ActionSelectorComponent>(root)
            .unwrap()
            .get();
        assert_eq!(root_selector.parent(), None);
        assert!(root_selector.ancestors().is_empty());
    }

    #[test]
    fn new_action_runs_against_existing_matches() {
        let mut world = World::new();
        install(&mut world).unwrap();
        let parent = configurable(&mut world, None);
        let first = configurable(&mut world, Some(parent));
        let second = configurable(&mut world, Some(parent));
        let grandchild = configurable(&mut world, Some(first));

        let (action, log) = recorder(&mut world, ModelSpec::child_of(parent));
        assert_eq!(*log.lock(), vec![first, second]);
        assert!(world
            .find_component::<ExecutedActionComponent>(first)
            .unwrap()
            .contains(action));
        assert!(world
            .find_component::<ExecutedActionComponent>(grandchild)
            .is_none());
    }

    #[test]
    fn action_runs_once_when_an_entity_starts_matching() {
        let mut world = World::new();
        install(&mut world).unwrap();
        let parent = configurable(&mut world, None);
        let (_, log) = recorder(
            &mut world,
            ModelSpec::descendant_of(parent).and(ModelSpec::at_least(ModelState::Realized)),
        );

        let child = configurable(&mut world, Some(parent));
        assert!(log.lock().is_empty());

        states::realize(&mut world, child).unwrap();
        states::finalize(&mut world, child).unwrap();
        assert_eq!(*log.lock(), vec![child]);
    }

    #[test]
    fn action_writing_to_its_target_does_not_run_again() {
        let mut world = World::new();
        install(&mut world).unwrap();
        let runs = Arc::new(Mutex::new(0));
        let counter = runs.clone();
        let target = configurable(&mut world, None);
        register_action(&mut world, ModelSpec::entity(target), move |world, entity| {
            *counter.lock() += 1;
            states::finalize(world, entity).map(|_| ())
        })
        .unwrap();

        assert_eq!(*runs.lock(), 1);
        assert_eq!(states::get_state(&world, target), ModelState::Finalized);
    }

    #[test]
    fn entities_without_the_tag_are_ignored() {
        let mut world = World::new();
        install(&mut world).unwrap();
        let parent = world.new_entity();
        let plain = world.new_entity();
        world.add_component(plain, ParentComponent::of(parent)).unwrap();

        let (_, log) = recorder(&mut world, ModelSpec::child_of(parent));
        assert!(log.lock().is_empty());
        assert!(world.find_component::<ActionSelectorComponent>(plain).is_none());
    }

    #[test]
    fn failing_actions_abort_the_write() {
        let mut world = World::new();
        install(&mut world).unwrap();
        let target = configurable(&mut world, None);

        let error = register_action(&mut world, ModelSpec::entity(target), |_, _| {
            Err(crate::ModelError::custom("refused"))
        })
        .unwrap_err();
        assert_eq!(error.rule_trail(), vec!["run-new-action"]);
    }
}
