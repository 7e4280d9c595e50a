//! Index error types.
//!
//! Only malformed input is an error. Looking up something that is not there
//! yields `None`, `false`, an empty `Vec`, or a no-op.

use crate::component::{ComponentId, ComponentTypeId};
use crate::entity::EntityId;

/// Errors returned by [`Index`](crate::Index) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// The nil entity id was passed where a real entity is required.
    #[error("invalid entity id: the nil id cannot own components")]
    InvalidEntity,

    /// Two distinct component types hash to the same type tag.
    #[error("type tag {tag} is already used by '{existing}', cannot attach '{incoming}'")]
    TypeTagCollision {
        tag: ComponentTypeId,
        existing: &'static str,
        incoming: &'static str,
    },

    /// The component is owned by entities of a different index.
    #[error("{component} is already attached through another index")]
    ComponentOwnedElsewhere { component: ComponentId },

    /// The entity already holds another component of this type and the index
    /// is configured with [`ReplacePolicy::Reject`](crate::ReplacePolicy::Reject).
    #[error("{entity} already has a component of type {tag}")]
    ComponentAlreadyAttached {
        entity: EntityId,
        tag: ComponentTypeId,
    },

    /// The type index and the entity index disagree. Only reported by
    /// [`Index::verify`](crate::Index::verify).
    #[error("index invariant violated: {0}")]
    InvariantViolation(String),
}
