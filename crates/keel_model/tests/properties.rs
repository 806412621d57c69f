//! Property tests for lifecycle, rules, ancestry and buffers

use keel_model::states::{self, ModelState};
use keel_model::{define_component, Ancestors, Entity, ModelBuffer, ParentComponent, Rule, World};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Left(u8);
define_component!(Left, "property.Left");

#[derive(Debug, Clone, PartialEq)]
struct Right(u8);
define_component!(Right, "property.Right");

#[derive(Debug, Clone, PartialEq)]
struct Noise(u8);
define_component!(Noise, "property.Noise");

fn transition(world: &mut World, entity: Entity, op: u8) {
    let result = match op % 5 {
        0 => states::create(world, entity),
        1 => states::initialize(world, entity),
        2 => states::register(world, entity),
        3 => states::realize(world, entity),
        _ => states::finalize(world, entity),
    };
    result.unwrap();
}

fn parented_pair(world: &mut World) -> (Entity, Entity) {
    let parent = world.new_entity();
    let child = world.new_entity();
    world.add_component(child, ParentComponent::of(parent)).unwrap();
    (parent, child)
}

fn snapshot(world: &World, entity: Entity) -> (ModelState, Vec<&'static str>) {
    let types = world.component_types(entity).into_iter().map(|ty| ty.name()).collect();
    (states::get_state(world, entity), types)
}

proptest! {
    #[test]
    fn transitions_are_idempotent(ops in prop::collection::vec(0u8..5, 1..8)) {
        let mut once = World::new();
        let (once_parent, once_child) = parented_pair(&mut once);
        let mut twice = World::new();
        let (twice_parent, twice_child) = parented_pair(&mut twice);

        for op in &ops {
            transition(&mut once, once_child, *op);
            transition(&mut twice, twice_child, *op);
            transition(&mut twice, twice_child, *op);
        }

        prop_assert_eq!(snapshot(&once, once_child), snapshot(&twice, twice_child));
        prop_assert_eq!(snapshot(&once, once_parent), snapshot(&twice, twice_parent));
    }

    #[test]
    fn state_is_monotonic(ops in prop::collection::vec(0u8..5, 1..12)) {
        let mut world = World::new();
        let (_, child) = parented_pair(&mut world);
        let mut previous = states::get_state(&world, child);

        for op in ops {
            transition(&mut world, child, op);
            let current = states::get_state(&world, child);
            prop_assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn realizing_realizes_every_ancestor(length in 1usize..7, pick in any::<prop::sample::Index>()) {
        let mut world = World::new();
        let mut chain: Vec<Entity> = Vec::new();
        for _ in 0..length {
            let entity = world.new_entity();
            if let Some(&parent) = chain.last() {
                world.add_component(entity, ParentComponent::of(parent)).unwrap();
            }
            chain.push(entity);
        }
        let target = chain[pick.index(length)];

        states::realize(&mut world, target).unwrap();

        let ancestors = Ancestors::of(&mut world, target).unwrap();
        prop_assert!(!ancestors.contains(target));
        for ancestor in ancestors.iter() {
            prop_assert!(states::is_at_least(&world, ancestor, ModelState::Realized));
        }
    }

    #[test]
    fn rule_fires_once_regardless_of_order(
        left_first in any::<bool>(),
        noise in prop::collection::vec(any::<u8>(), 0..4),
    ) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut world = World::new();
        world
            .configure(Rule::of2("pair", move |_, _, _: &Left, _: &Right| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        let e = world.new_entity();
        if left_first {
            world.add_component(e, Left(1)).unwrap();
            world.add_component(e, Right(2)).unwrap();
        } else {
            world.add_component(e, Right(2)).unwrap();
            world.add_component(e, Left(1)).unwrap();
        }
        for value in noise {
            world.add_component(e, Noise(value)).unwrap();
        }

        prop_assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn appended_never_mutates_the_receiver(
        elements in prop::collection::vec(any::<i32>(), 0..16),
        extra in any::<i32>(),
    ) {
        let buffer = ModelBuffer::of(elements.clone());
        let longer = buffer.appended(extra);

        prop_assert_eq!(buffer.as_slice(), elements.as_slice());
        prop_assert_ne!(&longer, &buffer);
        prop_assert_eq!(longer.len(), elements.len() + 1);
        prop_assert_eq!(longer.get(elements.len()), Some(&extra));
    }
}
