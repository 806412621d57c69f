// component.rs - Process-wide component type catalog
//
// Component types are identified by u32 catalog ids handed out on first use.
// The catalog is never torn down; a ComponentType obtained once stays valid
// and identical for the rest of the process.

use crate::{ModelError, ModelResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub type ComponentTypeId = u32;

/// Shared, immutable component value as stored on an entity.
pub type ComponentValue = Arc<dyn Any + Send + Sync>;

/// Whether a component type carries data or is a pure marker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentKind {
    Value,
    Tag,
}

/// Data that can be attached to an entity.
///
/// Use [`define_component!`](crate::define_component) or
/// [`define_tag!`](crate::define_tag) rather than implementing this by hand.
pub trait Component: Any + Send + Sync {
    const KIND: ComponentKind = ComponentKind::Value;

    /// Catalog name. Two Rust types must never share one.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Catalog entry for one component type.
#[derive(Debug)]
pub struct ComponentTypeInfo {
    pub id: ComponentTypeId,
    pub name: &'static str,
    pub rust_type: &'static str,
    pub kind: ComponentKind,
    type_id: TypeId,
}

/// Handle to a catalog entry. Equal handles always point at the same entry.
#[derive(Copy, Clone)]
pub struct ComponentType(&'static ComponentTypeInfo);

impl ComponentType {
    #[inline]
    pub fn id(self) -> ComponentTypeId {
        self.0.id
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.0.name
    }

    #[inline]
    pub fn kind(self) -> ComponentKind {
        self.0.kind
    }

    #[inline]
    pub fn is_tag(self) -> bool {
        self.0.kind == ComponentKind::Tag
    }

    pub fn info(self) -> &'static ComponentTypeInfo {
        self.0
    }

    /// True when `value` holds the Rust type this handle was issued for.
    pub fn accepts(self, value: &ComponentValue) -> bool {
        (**value).type_id() == self.0.type_id
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0.id as usize
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for ComponentType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.name, self.0.id)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name)
    }
}

struct Catalog {
    by_type: DashMap<TypeId, ComponentType>,
    // name -> (owning TypeId, owning Rust type name)
    by_name: DashMap<&'static str, (TypeId, &'static str)>,
    next_id: AtomicU32,
}

static CATALOG: Lazy<Catalog> = Lazy::new(|| Catalog {
    by_type: DashMap::new(),
    by_name: DashMap::new(),
    next_id: AtomicU32::new(0),
});

/// Look up (registering on first use) the component type for `T`.
///
/// # Panics
/// Panics when another Rust type already registered the same name. That is a
/// programming error; use [`try_component_type`] to handle it as a value.
pub fn component_type<T: Component>() -> ComponentType {
    match try_component_type::<T>() {
        Ok(ty) => ty,
        Err(error) => panic!("{error}"),
    }
}

/// Look up (registering on first use) the component type for `T`.
pub fn try_component_type<T: Component>() -> ModelResult<ComponentType> {
    let type_id = TypeId::of::<T>();
    if let Some(existing) = CATALOG.by_type.get(&type_id) {
        return Ok(*existing);
    }

    let name = T::type_name();
    let rust_type = std::any::type_name::<T>();
    match CATALOG.by_name.entry(name) {
        Entry::Occupied(claimed) => {
            let (owner, owner_name) = *claimed.get();
            if owner != type_id {
                return Err(ModelError::ComponentNameCollision {
                    name,
                    existing: owner_name,
                    requested: rust_type,
                });
            }
        }
        Entry::Vacant(slot) => {
            slot.insert((type_id, rust_type));
        }
    }

    let ty = *CATALOG
        .by_type
        .entry(type_id)
        .or_insert_with(|| {
            let id = CATALOG.next_id.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(id, name, "registered component type");
            ComponentType(Box::leak(Box::new(ComponentTypeInfo {
                id,
                name,
                rust_type,
                kind: T::KIND,
                type_id,
            })))
        })
        .value();
    Ok(ty)
}

/// Look up a registered component type by catalog name.
pub fn component_type_named(name: &str) -> Option<ComponentType> {
    let type_id = CATALOG.by_name.get(name).map(|claimed| claimed.0)?;
    CATALOG.by_type.get(&type_id).map(|ty| *ty)
}

/// Every registered component type, in id order.
pub fn registered_types() -> Vec<ComponentType> {
    let mut types: Vec<ComponentType> = CATALOG.by_type.iter().map(|ty| *ty).collect();
    types.sort();
    types
}

/// Implement [`Component`] for a data-carrying type.
///
/// # Example
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct ElementNameComponent(String);
///
/// define_component!(ElementNameComponent, "ElementName");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty) => {
        impl $crate::Component for $ty {}
    };
    ($ty:ty, $name:expr) => {
        impl $crate::Component for $ty {
            fn type_name() -> &'static str {
                $name
            }
        }
    };
}

/// Implement [`Component`] and [`Tag`](crate::Tag) for a zero-sized marker.
///
/// The type must implement `Default`.
#[macro_export]
macro_rules! define_tag {
    ($ty:ty, $name:expr) => {
        impl $crate::Component for $ty {
            const KIND: $crate::ComponentKind = $crate::ComponentKind::Tag;

            fn type_name() -> &'static str {
                $name
            }
        }

        impl $crate::Tag for $ty {}
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Weight(u32);
    define_component!(Weight, "test.Weight");

    struct Impostor;
    define_component!(Impostor, "test.Weight");

    #[derive(Debug, Default)]
    struct Marker;
    define_tag!(Marker, "test.Marker");

    #[test]
    fn lookups_return_the_same_identity() {
        let first = component_type::<Weight>();
        let second = component_type::<Weight>();
        assert_eq!(first, second);
        assert!(std::ptr::eq(first.info(), second.info()));
        assert_eq!(first.name(), "test.Weight");
        assert_eq!(first.kind(), ComponentKind::Value);
        assert_eq!(component_type_named("test.Weight"), Some(first));
    }

    #[test]
    fn name_collision_is_an_error() {
        let _ = component_type::<Weight>();
        let error = try_component_type::<Impostor>().unwrap_err();
        assert!(matches!(
            error,
            ModelError::ComponentNameCollision { name: "test.Weight", .. }
        ));
    }

    #[test]
    #[should_panic(expected = "test.Weight")]
    fn name_collision_fails_fast() {
        let _ = component_type::<Weight>();
        let _ = component_type::<Impostor>();
    }

    #[test]
    fn tags_are_flagged() {
        let ty = component_type::<Marker>();
        assert!(ty.is_tag());
        assert!(registered_types().contains(&ty));
    }

    #[test]
    fn accepts_checks_the_stored_type() {
        let ty = component_type::<Weight>();
        let good: ComponentValue = Arc::new(Weight(3));
        let bad: ComponentValue = Arc::new(7u8);
        assert!(ty.accepts(&good));
        assert!(!ty.accepts(&bad));
    }
}
