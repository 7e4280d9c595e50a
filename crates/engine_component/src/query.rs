//! Multi-type intersection over the type index.
//!
//! Entities are never scanned: each requested type contributes the union of
//! the owner sets of its live components, and those unions are intersected.
//! An entity owns at most one component per type, so the unions never hold
//! duplicates.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::component::{ComponentId, ComponentTypeId};
use crate::entity::EntityId;
use crate::shared::AnyComponent;

/// Live components per type, keyed by instance id.
pub(crate) type TypeBuckets = HashMap<ComponentTypeId, IndexMap<ComponentId, AnyComponent>>;

/// Union of the owner sets of every live component of type `tag`, or `None`
/// if no component of that type is live.
pub(crate) fn owners_of_type(by_type: &TypeBuckets, tag: ComponentTypeId) -> Option<HashSet<EntityId>> {
    let bucket = by_type.get(&tag)?;
    let mut owners = HashSet::new();
    for component in bucket.values() {
        component.collect_owners_into(&mut owners);
    }
    Some(owners)
}

/// Entities owning a component of every type in `tags`.
///
/// An empty tag list matches nothing. A tag with no live components
/// short-circuits the whole query to empty.
pub(crate) fn entities_with_all(by_type: &TypeBuckets, tags: &[ComponentTypeId]) -> Vec<EntityId> {
    let Some((first, rest)) = tags.split_first() else {
        return Vec::new();
    };

    let Some(mut result) = owners_of_type(by_type, *first) else {
        return Vec::new();
    };

    for tag in rest {
        let Some(owners) = owners_of_type(by_type, *tag) else {
            return Vec::new();
        };
        result.retain(|entity| owners.contains(entity));
        if result.is_empty() {
            break;
        }
    }

    result.into_iter().collect()
}
