//! Tag registry
//!
//! A tag is a component type without payload. Every entity carrying tag `T`
//! stores the same process-wide singleton, so `tag::<T>() == tag::<T>()` holds
//! by identity on every thread.

use crate::{component_type, Component, ComponentType, ComponentValue};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Marker component. Implemented by [`define_tag!`](crate::define_tag).
pub trait Tag: Component + Default {}

/// Cached tag singleton.
#[derive(Clone)]
pub struct ModelTag {
    ty: ComponentType,
    value: ComponentValue,
}

impl ModelTag {
    pub fn component_type(&self) -> ComponentType {
        self.ty
    }

    pub fn name(&self) -> &'static str {
        self.ty.name()
    }

    pub fn is<T: Tag>(&self) -> bool {
        self.value.is::<T>()
    }

    pub(crate) fn value(&self) -> ComponentValue {
        Arc::clone(&self.value)
    }
}

impl PartialEq for ModelTag {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl Eq for ModelTag {}

impl fmt::Debug for ModelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag({})", self.ty.name())
    }
}

static TAGS: Lazy<DashMap<TypeId, ModelTag>> = Lazy::new(DashMap::new);

/// Return the singleton for tag `T`, creating it on first use.
pub fn tag<T: Tag>() -> ModelTag {
    let ty = component_type::<T>();
    TAGS.entry(TypeId::of::<T>())
        .or_insert_with(|| ModelTag {
            ty,
            value: Arc::new(T::default()),
        })
        .value()
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Debug, Default)]
    struct Sealed;
    define_tag!(Sealed, "test.Sealed");

    #[derive(Debug, Default)]
    struct Opened;
    define_tag!(Opened, "test.Opened");

    #[test]
    fn same_tag_is_identical() {
        assert_eq!(tag::<Sealed>(), tag::<Sealed>());
        assert_ne!(tag::<Sealed>(), tag::<Opened>());
        assert!(tag::<Sealed>().is::<Sealed>());
        assert_eq!(tag::<Sealed>().name(), "test.Sealed");
        assert!(tag::<Sealed>().component_type().is_tag());
    }

    #[test]
    fn concurrent_callers_share_one_singleton() {
        let handles: Vec<_> = (0..8).map(|_| thread::spawn(tag::<Opened>)).collect();
        let tags: Vec<ModelTag> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        assert!(tags.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
