//! Core [`Component`] trait and the identifiers the index is keyed by.
//!
//! Every piece of data attached to an entity must implement [`Component`].
//! The trait requires `Send + Sync + 'static` so a single component instance
//! can be shared between entities that are touched from different threads.
//!
//! ## Type tags
//!
//! [`ComponentTypeId`] is derived from the component's **string name** using
//! the FNV-1a 64-bit hash algorithm. It is computed from the type alone, never
//! from an instance, so the index can be queried by type before any component
//! of that type exists.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stable identifier for a component's declared type, derived from its
/// string name using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ComponentTypeId`] for a type name.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentTypeId`] for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        T::component_type_id()
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentType({:#018x})", self.0)
    }
}

/// Identity of a single component instance.
///
/// Assigned once when a [`Shared`](crate::Shared) handle is created and never
/// changed. Two handles are the same component iff their ids match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(Uuid);

impl ComponentId {
    /// Generate a fresh random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Component({})", self.0)
    }
}

/// The core component trait.
///
/// The type tag is fixed by the implementing type: a value's runtime contents
/// never change which bucket of the index it lands in.
///
/// # Examples
///
/// ```rust
/// use engine_component::{Component, ComponentTypeId};
///
/// #[derive(Debug, Clone)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
///
/// assert_eq!(Health::component_type_id(), ComponentTypeId::from_name("Health"));
/// ```
pub trait Component: Send + Sync + 'static {
    /// A human-readable name for this component type.
    fn type_name() -> &'static str;

    /// Returns the [`ComponentTypeId`] for this component.
    ///
    /// The default implementation hashes [`Component::type_name()`] with
    /// FNV-1a 64-bit.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[test]
    fn test_component_type_id_is_stable() {
        assert_eq!(Health::component_type_id(), Health::component_type_id());
    }

    #[test]
    fn test_component_type_id_matches_from_name() {
        let from_trait = Health::component_type_id();
        let from_name = ComponentTypeId::from_name("Health");
        assert_eq!(from_trait, from_name);
        assert_eq!(ComponentTypeId::of::<Health>(), from_name);
    }

    #[test]
    fn test_component_type_id_differs_between_types() {
        struct Velocity;
        impl Component for Velocity {
            fn type_name() -> &'static str {
                "Velocity"
            }
        }

        assert_ne!(Health::component_type_id(), Velocity::component_type_id());
    }

    #[test]
    fn test_fnv1a_known_vector() {
        // FNV-1a of the empty string is the offset basis itself.
        assert_eq!(
            ComponentTypeId::from_name(""),
            ComponentTypeId(0xcbf2_9ce4_8422_2325)
        );
        // "a" -> 0xaf63dc4c8601ec8c
        assert_eq!(
            ComponentTypeId::from_name("a"),
            ComponentTypeId(0xaf63_dc4c_8601_ec8c)
        );
    }

    #[test]
    fn test_from_name_usable_in_const_context() {
        const TAG: ComponentTypeId = ComponentTypeId::from_name("Health");
        assert_eq!(TAG, Health::component_type_id());
    }

    #[test]
    fn test_component_ids_are_unique() {
        let a = ComponentId::new();
        let b = ComponentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_ids_serialization_roundtrip() {
        let id = ComponentId::new();
        let bytes = rmp_serde::to_vec(&id).unwrap();
        let restored: ComponentId = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(id, restored);

        let tag = Health::component_type_id();
        let bytes = rmp_serde::to_vec(&tag).unwrap();
        let restored: ComponentTypeId = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(tag, restored);
    }
}
