//! The entity-component index.
//!
//! The [`Index`] keeps two maps in step:
//!
//! - the **type index**: component type → live component instances of that
//!   type, keyed by [`ComponentId`](crate::ComponentId) so attaching and
//!   releasing never scan the bucket;
//! - the **entity index**: entity → (component type → the one component of
//!   that type the entity holds).
//!
//! For every entity `e` and type `t`, the entity index maps `e, t` to `c` iff
//! `c` is in the type index under `t` and `e` is one of `c`'s owners. Both
//! maps sit behind a single mutex, and every public method holds it for its
//! whole body, so no caller can observe the maps out of step.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::component::{Component, ComponentTypeId};
use crate::config::{IndexConfig, ReplacePolicy};
use crate::entity::EntityId;
use crate::error::IndexError;
use crate::query::{self, TypeBuckets};
use crate::shared::{AnyComponent, Shared};

/// Source of per-index keys used to bind components to the index that owns
/// them.
static NEXT_INDEX_KEY: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Default)]
struct IndexState {
    by_type: TypeBuckets,
    by_entity: HashMap<EntityId, HashMap<ComponentTypeId, AnyComponent>>,
    /// Rust type behind every tag ever attached, kept after the bucket drains
    /// so a colliding type cannot slip in later. Reset only by `clear`.
    types: HashMap<ComponentTypeId, (TypeId, &'static str)>,
}

impl IndexState {
    /// Unbind every indexed component from this index. Leaves the maps as
    /// they are.
    fn release_all(&mut self) {
        for component in self.by_type.values().flat_map(|bucket| bucket.values()) {
            component.clear_owners();
        }
    }

    /// Drop `entity` from `component`'s owners and, if that was the last
    /// owner, from the type index. Does not touch the entity index.
    fn release(&mut self, entity: EntityId, tag: ComponentTypeId, component: &AnyComponent) {
        if component.remove_owner(entity) > 0 {
            return;
        }
        if let Some(bucket) = self.by_type.get_mut(&tag) {
            bucket.swap_remove(&component.id());
            if bucket.is_empty() {
                self.by_type.remove(&tag);
            }
        }
        debug!(component = %component.id(), ty = component.type_name(), "component released");
    }
}

/// Stores components attached to entities and answers type queries.
///
/// `Index` is `Send + Sync`; share it between threads with an `Arc`.
/// Dropping it releases every component it still holds, so surviving handles
/// can be attached to another index.
///
/// # Examples
///
/// ```rust
/// use engine_component::{Component, Index, Shared};
///
/// struct Health(u32);
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
///
/// let index = Index::new();
/// let player = index.create_entity();
/// let health = Shared::new(Health(100));
/// index.add_component(player, &health).unwrap();
///
/// assert_eq!(index.get::<Health>(player), Some(health));
/// assert_eq!(index.entities_with::<Health>(), vec![player]);
/// ```
#[derive(Debug)]
pub struct Index {
    key: u64,
    config: IndexConfig,
    state: Mutex<IndexState>,
}

impl Index {
    /// Create an empty index with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Create an empty index with the given configuration.
    #[must_use]
    pub fn with_config(config: IndexConfig) -> Self {
        let state = IndexState {
            by_type: HashMap::new(),
            by_entity: HashMap::with_capacity(config.entity_capacity),
            types: HashMap::new(),
        };
        Self {
            key: NEXT_INDEX_KEY.fetch_add(1, Ordering::Relaxed),
            config,
            state: Mutex::new(state),
        }
    }

    /// The configuration this index was built with.
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    // -- Entity lifecycle --

    /// Register a fresh entity with no components.
    pub fn create_entity(&self) -> EntityId {
        let entity = EntityId::new();
        self.state.lock().by_entity.insert(entity, HashMap::new());
        debug!(%entity, "entity created");
        entity
    }

    /// Detach every component from `entity` and forget it.
    ///
    /// Components left without owners drop out of the type index. Unknown ids
    /// are ignored, so calling this twice is harmless.
    pub fn destroy_entity(&self, entity: EntityId) {
        let mut state = self.state.lock();
        let Some(components) = state.by_entity.remove(&entity) else {
            trace!(%entity, "destroy of unknown entity ignored");
            return;
        };
        let count = components.len();
        for (tag, component) in components {
            state.release(entity, tag, &component);
        }
        debug!(%entity, components = count, "entity destroyed");
    }

    /// Returns `true` if `entity` is registered.
    #[must_use]
    pub fn entity_exists(&self, entity: EntityId) -> bool {
        self.state.lock().by_entity.contains_key(&entity)
    }

    /// Snapshot of every registered entity, in no particular order.
    #[must_use]
    pub fn get_all_entities(&self) -> Vec<EntityId> {
        self.state.lock().by_entity.keys().copied().collect()
    }

    /// Number of registered entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.state.lock().by_entity.len()
    }

    /// Type tags of the components `entity` holds. Empty for unknown entities.
    #[must_use]
    pub fn entity_components(&self, entity: EntityId) -> Vec<ComponentTypeId> {
        self.state
            .lock()
            .by_entity
            .get(&entity)
            .map(|components| components.keys().copied().collect())
            .unwrap_or_default()
    }

    // -- Component operations --

    /// Attach `component` to `entity`.
    ///
    /// The entity is registered if it is not already. Attaching the same
    /// instance to several entities shares it: it appears once in the type
    /// index and lists every entity as an owner. If the entity already holds a
    /// different component of the same type, the configured
    /// [`ReplacePolicy`] decides what happens.
    ///
    /// # Errors
    ///
    /// - [`IndexError::InvalidEntity`] if `entity` is [`EntityId::INVALID`].
    /// - [`IndexError::TypeTagCollision`] if another Rust type has used this
    ///   component's type tag in this index since the last [`Index::clear`].
    /// - [`IndexError::ComponentOwnedElsewhere`] if the component is attached
    ///   through a different index.
    /// - [`IndexError::ComponentAlreadyAttached`] under
    ///   [`ReplacePolicy::Reject`].
    ///
    /// On error nothing is changed.
    pub fn add_component(
        &self,
        entity: EntityId,
        component: impl Into<AnyComponent>,
    ) -> Result<(), IndexError> {
        let component = component.into();
        if !entity.is_valid() {
            return Err(IndexError::InvalidEntity);
        }
        let tag = component.type_tag();

        let mut state = self.state.lock();

        if let Some(&(rust_type, existing)) = state.types.get(&tag)
            && rust_type != component.rust_type()
        {
            return Err(IndexError::TypeTagCollision {
                tag,
                existing,
                incoming: component.type_name(),
            });
        }

        let previous = state
            .by_entity
            .get(&entity)
            .and_then(|components| components.get(&tag))
            .cloned();
        match &previous {
            Some(prev) if *prev == component => {
                trace!(%entity, component = %component.id(), "component already attached");
                return Ok(());
            }
            Some(_) if self.config.replace_policy == ReplacePolicy::Reject => {
                return Err(IndexError::ComponentAlreadyAttached { entity, tag });
            }
            _ => {}
        }

        if component.add_owner(self.key, entity).is_err() {
            return Err(IndexError::ComponentOwnedElsewhere {
                component: component.id(),
            });
        }

        if let Some(prev) = previous {
            debug!(%entity, old = %prev.id(), new = %component.id(), "replacing component");
            state.release(entity, tag, &prev);
        }

        state
            .types
            .entry(tag)
            .or_insert_with(|| (component.rust_type(), component.type_name()));
        state
            .by_type
            .entry(tag)
            .or_default()
            .entry(component.id())
            .or_insert_with(|| component.clone());

        debug!(%entity, component = %component.id(), ty = component.type_name(), "component attached");
        state
            .by_entity
            .entry(entity)
            .or_insert_with(|| {
                debug!(%entity, "entity registered on first attachment");
                HashMap::new()
            })
            .insert(tag, component);
        Ok(())
    }

    /// Detach the component of type `tag` from `entity`.
    ///
    /// If no other entity owns it, it leaves the type index. Does nothing if
    /// the entity is unknown or has no such component.
    pub fn remove_component(&self, entity: EntityId, tag: ComponentTypeId) {
        let mut state = self.state.lock();
        let Some(component) = state
            .by_entity
            .get_mut(&entity)
            .and_then(|components| components.remove(&tag))
        else {
            trace!(%entity, %tag, "nothing to remove");
            return;
        };
        debug!(%entity, component = %component.id(), ty = component.type_name(), "component detached");
        state.release(entity, tag, &component);
    }

    /// Returns `true` if `entity` holds a component of type `tag`.
    #[must_use]
    pub fn contains_component(&self, entity: EntityId, tag: ComponentTypeId) -> bool {
        self.state
            .lock()
            .by_entity
            .get(&entity)
            .is_some_and(|components| components.contains_key(&tag))
    }

    /// The component of type `tag` held by `entity`, if any.
    #[must_use]
    pub fn get_component(&self, entity: EntityId, tag: ComponentTypeId) -> Option<AnyComponent> {
        self.state
            .lock()
            .by_entity
            .get(&entity)
            .and_then(|components| components.get(&tag))
            .cloned()
    }

    /// Snapshot of every live component of type `tag`, in attachment order
    /// except that releasing one moves the most recently attached into its
    /// place.
    #[must_use]
    pub fn get_all_components(&self, tag: ComponentTypeId) -> Vec<AnyComponent> {
        self.state
            .lock()
            .by_type
            .get(&tag)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live component instances of type `tag`.
    #[must_use]
    pub fn component_count(&self, tag: ComponentTypeId) -> usize {
        self.state.lock().by_type.get(&tag).map_or(0, |bucket| bucket.len())
    }

    /// Entities holding a component of every type in `tags`, in no particular
    /// order and without duplicates.
    ///
    /// An empty `tags` matches nothing.
    #[must_use]
    pub fn get_all_entities_with_component(&self, tags: &[ComponentTypeId]) -> Vec<EntityId> {
        let state = self.state.lock();
        query::entities_with_all(&state.by_type, tags)
    }

    /// Drop every entity and component.
    ///
    /// Components still referenced elsewhere lose their owners and can be
    /// attached again, here or to another index. Type tags are forgotten too.
    /// Payloads are left alone.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.release_all();
        state.by_type.clear();
        state.by_entity.clear();
        state.types.clear();
        debug!("index cleared");
    }

    // -- Typed helpers --

    /// Typed form of [`Index::get_component`].
    #[must_use]
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<Shared<T>> {
        self.get_component(entity, T::component_type_id())
            .and_then(|component| component.downcast())
    }

    /// Typed form of [`Index::contains_component`].
    #[must_use]
    pub fn contains<T: Component>(&self, entity: EntityId) -> bool {
        self.contains_component(entity, T::component_type_id())
    }

    /// Typed form of [`Index::remove_component`].
    pub fn remove<T: Component>(&self, entity: EntityId) {
        self.remove_component(entity, T::component_type_id());
    }

    /// Typed form of [`Index::get_all_components`].
    #[must_use]
    pub fn components<T: Component>(&self) -> Vec<Shared<T>> {
        self.get_all_components(T::component_type_id())
            .iter()
            .filter_map(AnyComponent::downcast)
            .collect()
    }

    /// Entities holding a component of type `T`.
    #[must_use]
    pub fn entities_with<T: Component>(&self) -> Vec<EntityId> {
        self.get_all_entities_with_component(&[T::component_type_id()])
    }

    // -- Consistency --

    /// Check that the type index and the entity index agree.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvariantViolation`] describing the first
    /// disagreement found.
    pub fn verify(&self) -> Result<(), IndexError> {
        let state = self.state.lock();
        let violation = |msg: String| -> Result<(), IndexError> { Err(IndexError::InvariantViolation(msg)) };

        for (tag, bucket) in &state.by_type {
            if bucket.is_empty() {
                return violation(format!("empty bucket kept for {tag}"));
            }
            let Some(&(rust_type, _)) = state.types.get(tag) else {
                return violation(format!("{tag} indexed but never registered"));
            };
            for (id, component) in bucket {
                if *id != component.id() {
                    return violation(format!("{} keyed as {id}", component.id()));
                }
                if component.type_tag() != *tag {
                    return violation(format!("{} filed under {tag}", component.id()));
                }
                if component.rust_type() != rust_type {
                    return violation(format!("{} has a different type than {tag}", component.id()));
                }
                let owners = component.owners();
                if owners.is_empty() {
                    return violation(format!("{} indexed without owners", component.id()));
                }
                if component.bound_index() != Some(self.key) {
                    return violation(format!("{} bound to another index", component.id()));
                }
                for owner in owners {
                    let held = state.by_entity.get(&owner).and_then(|c| c.get(tag));
                    if held != Some(component) {
                        return violation(format!(
                            "{owner} owns {} but the entity index disagrees",
                            component.id()
                        ));
                    }
                }
            }
        }

        for (entity, components) in &state.by_entity {
            for (tag, component) in components {
                if component.type_tag() != *tag {
                    return violation(format!("{entity} holds {} under {tag}", component.id()));
                }
                if !component.is_owned_by(*entity) {
                    return violation(format!("{entity} holds {} without owning it", component.id()));
                }
                let indexed = state
                    .by_type
                    .get(tag)
                    .and_then(|bucket| bucket.get(&component.id()))
                    .is_some_and(|indexed| indexed == component);
                if !indexed {
                    return violation(format!("{} held by {entity} but not indexed", component.id()));
                }
            }
        }

        Ok(())
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        self.state.get_mut().release_all();
    }
}
