//! Keel Runtime
//!
//! Boots logging, loads model settings, builds a small project graph and
//! prints what the rules derived for it.
//!
//! Settings come from the JSON file named by the first argument or by
//! `KEEL_SETTINGS`; defaults apply otherwise. Log verbosity follows
//! `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use keel_model::actions::{self, ConfigurableTag, ModelSpec};
use keel_model::names::{
    self, ElementNameComponent, ExcludeFromQualifyingNameTag, FullyQualifiedNameComponent,
    IsModelProperty,
};
use keel_model::states::{self, IsAtLeastRealized};
use keel_model::{
    append_to_buffer, Entity, ModelBuffer, ModelSettings, ModelState, ParentComponent, Rule, World,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build qualifiers recorded on each variant, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Qualifier(String);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Keel v{}", keel_model::VERSION);
    let settings = load_settings()?;
    tracing::info!(?settings, "settings loaded");

    let mut world = World::with_settings(settings);
    names::install(&mut world).context("failed to install naming rules")?;
    actions::install(&mut world).context("failed to install action rules")?;
    world.configure(Rule::of2(
        "log-realized",
        |_, entity, _: &IsAtLeastRealized, name: &FullyQualifiedNameComponent| {
            tracing::info!(%entity, name = name.as_str(), "realized");
            Ok(())
        },
    ))?;

    let graph = seed(&mut world)?;
    if let Some(&component) = graph.get(1) {
        let spec =
            ModelSpec::descendant_of(component).and(ModelSpec::at_least(ModelState::Realized));
        actions::register_action(&mut world, spec, |world, entity| {
            let name = world
                .find_component::<ElementNameComponent>(entity)
                .map(ElementNameComponent::as_str);
            tracing::info!(%entity, ?name, "configuring element");
            Ok(())
        })?;
    }
    for entity in &graph {
        states::realize(&mut world, *entity)
            .with_context(|| format!("failed to realize entity {entity}"))?;
    }
    if let Some(root) = graph.first() {
        states::finalize(&mut world, *root)?;
    }

    for entity in world.entities() {
        if let Some(description) = world.describe(entity) {
            println!("{}", serde_json::to_string(&description)?);
        }
        if let Some(qualifiers) = world.find_component::<ModelBuffer<Qualifier>>(entity) {
            let joined: Vec<&str> = qualifiers.iter().map(|q| q.0.as_str()).collect();
            tracing::info!(%entity, qualifiers = ?joined, "variant qualifiers");
        }
    }

    for (name, count) in world.counters().iter() {
        tracing::info!(name, count, "counter");
    }
    for (rule, total, invocations) in world.profiler().iter() {
        tracing::debug!(rule, ?total, invocations, "rule timing");
    }

    Ok(())
}

fn load_settings() -> Result<ModelSettings> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("KEEL_SETTINGS").ok())
        .map(PathBuf::from);

    let Some(path) = path else {
        return Ok(ModelSettings::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse settings in {}", path.display()))
}

/// Project -> component -> variants and a property. Returns entities in
/// creation order, root first.
fn seed(world: &mut World) -> Result<Vec<Entity>> {
    let project = named(world, "app", None)?;
    world.add_tag::<ExcludeFromQualifyingNameTag>(project)?;

    let main = named(world, "main", Some(project))?;
    let sources = named(world, "sources", Some(main))?;
    world.add_tag::<IsModelProperty>(sources)?;

    let mut graph = vec![project, main, sources];
    for (variant, qualifiers) in [("debug", ["debug", "x86-64"]), ("release", ["release", "x86-64"])] {
        let entity = named(world, variant, Some(main))?;
        for qualifier in qualifiers {
            append_to_buffer(world, entity, Qualifier(qualifier.to_string()))?;
        }
        graph.push(entity);
    }
    Ok(graph)
}

fn named(world: &mut World, name: &str, parent: Option<Entity>) -> Result<Entity> {
    let entity = world.new_entity();
    world.add_component(entity, ElementNameComponent::of(name))?;
    if let Some(parent) = parent {
        world.add_component(entity, ParentComponent::of(parent))?;
    }
    world.add_tag::<ConfigurableTag>(entity)?;
    states::create(world, entity)?;
    Ok(entity)
}
