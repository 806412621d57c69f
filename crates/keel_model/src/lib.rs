//! Keel Model
//!
//! An entity-component object model with a lazy lifecycle and reactive rules:
//! - Component type catalog and tag singletons
//! - Entity store with synchronous, depth-first rule dispatch
//! - Lifecycle state machine (`Created` through `Finalized`)
//! - Ancestry resolution, ordered buffers and qualifying names
//! - Model actions that run once per matching entity

#[macro_use]
mod component;

mod ancestry;
mod bits;
mod buffer;
mod entity;
mod error;
mod rule;
mod rule_handle;
mod rule_registration_error;
mod rule_registry;
mod settings;
mod tag;
mod world;

pub mod actions;
pub mod names;
pub mod states;

pub use ancestry::{
    parent_of, parents, resolve_ancestors, Ancestors, AncestorsComponent, ParentComponent, Parents,
    RESOLVE_ANCESTORS_RULE,
};
pub use bits::Bits;
pub use buffer::{append_to_buffer, ModelBuffer};
pub use component::{
    component_type, component_type_named, registered_types, try_component_type, Component,
    ComponentKind, ComponentType, ComponentTypeId, ComponentTypeInfo, ComponentValue,
};
pub use entity::{Entity, EntityId};
pub use error::{ModelError, ModelResult};
pub use rule::{Rule, RuleInfo, Trigger};
pub use rule_handle::RuleHandle;
pub use rule_registration_error::RuleRegistrationError;
pub use settings::ModelSettings;
pub use states::ModelState;
pub use tag::{tag, ModelTag, Tag};
pub use world::{EntityDescription, World};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
