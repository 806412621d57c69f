//! Ordered buffer component
//!
//! An immutable, insertion-ordered sequence stored as one component value.
//! Appending yields a new buffer; the stored value only changes when the new
//! buffer is written back.

use crate::{Component, Entity, ModelResult, World};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ModelBuffer<E> {
    elements: Vec<E>,
}

impl<E: Clone + PartialEq + Send + Sync + 'static> Component for ModelBuffer<E> {}

impl<E> ModelBuffer<E> {
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn of(elements: impl IntoIterator<Item = E>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.elements.iter()
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.elements.get(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn as_slice(&self) -> &[E] {
        &self.elements
    }

    pub fn element_type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }
}

impl<E: Clone> ModelBuffer<E> {
    /// Copy of this buffer with `element` at the end.
    #[must_use]
    pub fn appended(&self, element: E) -> Self {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend_from_slice(&self.elements);
        elements.push(element);
        Self { elements }
    }
}

impl<E> Default for ModelBuffer<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a, E> IntoIterator for &'a ModelBuffer<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<E: fmt::Debug> fmt::Debug for ModelBuffer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelBuffer<{}>", std::any::type_name::<E>())?;
        f.debug_list().entries(&self.elements).finish()
    }
}

/// Append `element` to the entity's `ModelBuffer<E>` (starting from an empty
/// buffer) and write the result back, dispatching rules on the buffer type.
pub fn append_to_buffer<E>(world: &mut World, entity: Entity, element: E) -> ModelResult<()>
where
    E: Clone + PartialEq + Send + Sync + 'static,
{
    let next = match world.find_component::<ModelBuffer<E>>(entity) {
        Some(current) => current.appended(element),
        None => ModelBuffer::of([element]),
    };
    world.add_component(entity, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{component_type, Rule};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn appended_leaves_the_receiver_alone() {
        let buffer = ModelBuffer::of(["a"]);
        let longer = buffer.appended("b");

        assert_eq!(buffer.as_slice(), ["a"]);
        assert_eq!(longer.as_slice(), ["a", "b"]);
        assert_ne!(buffer, longer);
        assert_eq!(longer.get(1), Some(&"b"));
        assert!(ModelBuffer::<&str>::empty().is_empty());
    }

    #[test]
    fn element_types_get_distinct_component_types() {
        let strings = component_type::<ModelBuffer<String>>();
        let numbers = component_type::<ModelBuffer<u32>>();
        assert_ne!(strings, numbers);
        assert_eq!(ModelBuffer::<u32>::empty().element_type_name(), "u32");
    }

    #[test]
    fn append_writes_a_new_value_back() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut world = World::new();
        let observed = Arc::clone(&seen);
        world
            .configure(
                Rule::of1("observe-qualifiers", move |_, _, buffer: &ModelBuffer<String>| {
                    observed.lock().push(buffer.len());
                    Ok(())
                })
                .on_change(),
            )
            .unwrap();
        let e = world.new_entity();

        append_to_buffer(&mut world, e, "debug".to_string()).unwrap();
        let before = world.find_arc::<ModelBuffer<String>>(e).unwrap();
        append_to_buffer(&mut world, e, "x86".to_string()).unwrap();

        assert_eq!(before.len(), 1);
        let after = world.find_component::<ModelBuffer<String>>(e).unwrap();
        assert_eq!(after.iter().cloned().collect::<Vec<_>>(), vec!["debug", "x86"]);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }
}
