//! Entity handle
//!
//! Entities are lightweight handles (8 bytes) into the [`World`](crate::World)
//! that issued them. A handle owns nothing: the world owns every entity's
//! components, and ids are never reused while the world lives.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type EntityId = u64;

/// Entity handle.
///
/// Ids are issued in increasing order, so comparing two handles from the same
/// world compares their creation order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(EntityId);

impl Entity {
    pub(crate) const fn new(id: EntityId) -> Self {
        Self(id)
    }

    #[inline]
    pub fn id(self) -> EntityId {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
