//! Entity identifiers.
//!
//! An [`EntityId`] is an opaque 128-bit random token with no inherent data.
//! An entity exists only as a key in the [`Index`](crate::Index).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique entity identifier.
///
/// Entities are pure identifiers — they carry no data of their own. Components
/// are attached to entities to give them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// The null / invalid entity sentinel (the nil UUID).
    pub const INVALID: EntityId = EntityId(Uuid::nil());

    /// Generate a fresh random entity id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, e.g. one read back from persisted data.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns `true` if this is not [`EntityId::INVALID`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_nil()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}
