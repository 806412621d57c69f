//! Element names, qualifying names and display names.
//!
//! A qualifying name joins the names along an entity's parent chain, farthest
//! ancestor first, in lower camel case: an entity named `ruba` under `bopu`
//! under `robo` under `zite` qualifies as `ziteRoboBopuRuba`. Ancestors
//! tagged [`ExcludeFromQualifyingNameTag`] or without a name are skipped.

use crate::states::IsAtLeastRealized;
use crate::{ancestry, AncestorsComponent, Entity, ModelResult, ParentComponent, Rule, World};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementName(String);

impl ElementName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNameComponent(ElementName);

define_component!(ElementNameComponent, "ElementNameComponent");

impl ElementNameComponent {
    pub fn of(name: impl Into<String>) -> Self {
        Self(ElementName::new(name))
    }

    pub fn get(&self) -> &ElementName {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullyQualifiedNameComponent(String);

define_component!(FullyQualifiedNameComponent, "FullyQualifiedNameComponent");

impl FullyQualifiedNameComponent {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNameComponent(String);

define_component!(DisplayNameComponent, "DisplayNameComponent");

impl DisplayNameComponent {
    pub fn of(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Leaves the entity's name out of its descendants' qualifying names.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExcludeFromQualifyingNameTag;
define_tag!(ExcludeFromQualifyingNameTag, "ExcludeFromQualifyingNameTag");

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IsModelProperty;
define_tag!(IsModelProperty, "IsModelProperty");

/// Qualifying name of `entity`, or `None` when it has no element name.
///
/// Reads the cached [`AncestorsComponent`] so the name agrees with the ancestry
/// every other rule sees; the live parent chain is only walked when nothing is
/// cached yet.
pub fn qualifying_name(world: &World, entity: Entity) -> Option<String> {
    let own = world.find_component::<ElementNameComponent>(entity)?;

    let ancestors: Vec<Entity> = match world.find_component::<AncestorsComponent>(entity) {
        Some(cached) => cached.get().iter().collect(),
        None => ancestry::parents(world, entity).collect(),
    };
    let mut segments: Vec<&str> = ancestors
        .into_iter()
        .filter(|ancestor| !world.has_component::<ExcludeFromQualifyingNameTag>(*ancestor))
        .filter_map(|ancestor| world.find_component::<ElementNameComponent>(ancestor))
        .map(ElementNameComponent::as_str)
        .collect();
    segments.reverse();
    segments.push(own.as_str());

    Some(camel_join(&segments))
}

fn camel_join(segments: &[&str]) -> String {
    let mut joined = String::new();
    for segment in segments {
        if joined.is_empty() {
            joined.push_str(segment);
        } else {
            let mut chars = segment.chars();
            if let Some(first) = chars.next() {
                joined.extend(first.to_uppercase());
                joined.push_str(chars.as_str());
            }
        }
    }
    joined
}

fn quote(value: &str) -> String {
    format!("'{value}'")
}

fn property_display_name(parent: Option<&str>, name: Option<&str>) -> String {
    let mut display = String::new();
    if let Some(parent) = parent {
        display.push_str(parent);
        display.push(' ');
    }
    display.push_str("property");
    if let Some(name) = name {
        display.push(' ');
        display.push_str(&quote(name));
    }
    display
}

fn parent_display_name(world: &World, parent: Entity) -> String {
    match world.find_component::<DisplayNameComponent>(parent) {
        Some(display) => display.as_str().to_string(),
        None => match world.find_component::<ElementNameComponent>(parent) {
            Some(name) => format!("entity {}", quote(name.as_str())),
            None => "entity".to_string(),
        },
    }
}

fn set_display_name(world: &mut World, entity: Entity, display: String) -> ModelResult<()> {
    world.add_component(entity, DisplayNameComponent(display))
}

/// Install the naming rules.
///
/// Property display names are recomputed as more of their inputs arrive; the
/// rule with the most inputs is registered last so it wins.
pub fn install(world: &mut World) -> ModelResult<()> {
    world.configure(Rule::of2(
        "qualifying-name",
        |world, entity, _: &IsAtLeastRealized, _: &ElementNameComponent| {
            match qualifying_name(world, entity) {
                Some(name) => world.add_component(entity, FullyQualifiedNameComponent(name)),
                None => Ok(()),
            }
        },
    ))?;

    world.configure(Rule::of1(
        "property-display-name",
        |world, entity, _: &IsModelProperty| {
            set_display_name(world, entity, property_display_name(None, None))
        },
    ))?;
    world.configure(Rule::of2(
        "named-property-display-name",
        |world, entity, _: &IsModelProperty, name: &ElementNameComponent| {
            set_display_name(world, entity, property_display_name(None, Some(name.as_str())))
        },
    ))?;
    world.configure(Rule::of2(
        "nested-property-display-name",
        |world, entity, _: &IsModelProperty, parent: &ParentComponent| {
            let parent = parent_display_name(world, parent.entity());
            set_display_name(world, entity, property_display_name(Some(&parent), None))
        },
    ))?;
    world.configure(Rule::of3(
        "named-nested-property-display-name",
        |world, entity, _: &IsModelProperty, name: &ElementNameComponent, parent: &ParentComponent| {
            let parent = parent_display_name(world, parent.entity());
            set_display_name(
                world,
                entity,
                property_display_name(Some(&parent), Some(name.as_str())),
            )
        },
    ))?;
    Ok(())
}
