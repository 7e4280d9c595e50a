//! Shareable component handles.
//!
//! A [`Shared<T>`] is one component instance: a fixed [`ComponentId`], the
//! set of entities that currently reference it, and the payload. Cloning the
//! handle never clones the payload, so the same instance can be attached to
//! several entities at once.
//!
//! [`AnyComponent`] is the type-erased form the [`Index`](crate::Index)
//! stores. It can be turned back into a typed handle with
//! [`AnyComponent::downcast`].
//!
//! The owner set doubles as the reference count. It is only mutated by the
//! index, while the index lock is held; everyone else gets read-only
//! snapshots. A component with owners is bound to the index those owners
//! live in and cannot be attached through a different one until it is
//! released.

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::component::{Component, ComponentId, ComponentTypeId};
use crate::entity::EntityId;

/// Owner bookkeeping for one component instance.
#[derive(Debug, Default)]
pub(crate) struct Owners {
    /// Key of the index the owners belong to. `None` while unowned.
    index: Option<u64>,
    entities: HashSet<EntityId>,
}

/// Object-safe view over a [`Slot<T>`] for any `T`.
pub(crate) trait ComponentCell: Send + Sync + 'static {
    fn id(&self) -> ComponentId;
    fn type_tag(&self) -> ComponentTypeId;
    fn type_name(&self) -> &'static str;
    fn rust_type(&self) -> TypeId;
    fn owners(&self) -> &RwLock<Owners>;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

struct Slot<T> {
    id: ComponentId,
    owners: RwLock<Owners>,
    value: RwLock<T>,
}

impl<T: Component> ComponentCell for Slot<T> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn type_tag(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn rust_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn owners(&self) -> &RwLock<Owners> {
        &self.owners
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A typed, shareable component instance.
///
/// Equality and hashing use [`Shared::id`] only: two separately created
/// handles holding identical payloads are different components.
pub struct Shared<T> {
    slot: Arc<Slot<T>>,
}

impl<T: Component> Shared<T> {
    /// Wrap `value` in a new component instance with a fresh identity and no
    /// owners.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(Slot {
                id: ComponentId::new(),
                owners: RwLock::new(Owners::default()),
                value: RwLock::new(value),
            }),
        }
    }

    /// The instance identity.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.slot.id
    }

    /// The type tag of `T`.
    #[must_use]
    pub fn type_tag(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    /// Snapshot of the entities currently referencing this instance.
    #[must_use]
    pub fn owners(&self) -> HashSet<EntityId> {
        self.slot.owners.read().entities.clone()
    }

    /// Number of entities currently referencing this instance.
    #[must_use]
    pub fn owner_count(&self) -> usize {
        self.slot.owners.read().entities.len()
    }

    /// Returns `true` if `entity` currently references this instance.
    #[must_use]
    pub fn is_owned_by(&self, entity: EntityId) -> bool {
        self.slot.owners.read().entities.contains(&entity)
    }

    /// Lock the payload for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.slot.value.read()
    }

    /// Lock the payload for writing. The index never takes this lock, so
    /// coordinating concurrent writers is up to the caller.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.slot.value.write()
    }

    /// Type-erase this handle. Equivalent to `AnyComponent::from(self.clone())`.
    #[must_use]
    pub fn erase(&self) -> AnyComponent {
        AnyComponent::from(self)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot.id == other.slot.id
    }
}

impl<T> Eq for Shared<T> {}

impl<T> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.slot.id.hash(state);
    }
}

impl<T: Component> std::fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("type", &T::type_name())
            .field("id", &self.slot.id)
            .field("owners", &self.slot.owners.read().entities.len())
            .finish()
    }
}

/// A type-erased component handle, as stored by the index.
#[derive(Clone)]
pub struct AnyComponent {
    cell: Arc<dyn ComponentCell>,
}

impl AnyComponent {
    /// The instance identity.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.cell.id()
    }

    /// The declared type tag of the wrapped component.
    #[must_use]
    pub fn type_tag(&self) -> ComponentTypeId {
        self.cell.type_tag()
    }

    /// The declared type name of the wrapped component.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.cell.type_name()
    }

    /// Snapshot of the entities currently referencing this instance.
    #[must_use]
    pub fn owners(&self) -> HashSet<EntityId> {
        self.cell.owners().read().entities.clone()
    }

    /// Number of entities currently referencing this instance.
    #[must_use]
    pub fn owner_count(&self) -> usize {
        self.cell.owners().read().entities.len()
    }

    /// Returns `true` if `entity` currently references this instance.
    #[must_use]
    pub fn is_owned_by(&self, entity: EntityId) -> bool {
        self.cell.owners().read().entities.contains(&entity)
    }

    /// Recover the typed handle. Returns `None` if `T` is not the type this
    /// component was created as.
    #[must_use]
    pub fn downcast<T: Component>(&self) -> Option<Shared<T>> {
        Arc::clone(&self.cell)
            .into_any()
            .downcast::<Slot<T>>()
            .ok()
            .map(|slot| Shared { slot })
    }

    pub(crate) fn rust_type(&self) -> TypeId {
        self.cell.rust_type()
    }

    /// Key of the index currently holding this component, if it has owners.
    pub(crate) fn bound_index(&self) -> Option<u64> {
        self.cell.owners().read().index
    }

    /// Record `entity` as an owner inside the index identified by `index`.
    /// Returns `Ok(false)` if it already was one, and `Err(home)` without
    /// touching anything if the component is owned through index `home`.
    pub(crate) fn add_owner(&self, index: u64, entity: EntityId) -> Result<bool, u64> {
        let mut owners = self.cell.owners().write();
        match owners.index {
            Some(home) if home != index => Err(home),
            _ => {
                owners.index = Some(index);
                Ok(owners.entities.insert(entity))
            }
        }
    }

    /// Drop `entity` from the owner set and return how many owners remain.
    /// The last removal unbinds the component from its index.
    pub(crate) fn remove_owner(&self, entity: EntityId) -> usize {
        let mut owners = self.cell.owners().write();
        owners.entities.remove(&entity);
        if owners.entities.is_empty() {
            owners.index = None;
        }
        owners.entities.len()
    }

    pub(crate) fn clear_owners(&self) {
        let mut owners = self.cell.owners().write();
        owners.entities.clear();
        owners.index = None;
    }

    /// Extend `out` with the current owner ids.
    pub(crate) fn collect_owners_into(&self, out: &mut HashSet<EntityId>) {
        out.extend(self.cell.owners().read().entities.iter().copied());
    }
}

impl<T: Component> From<Shared<T>> for AnyComponent {
    fn from(shared: Shared<T>) -> Self {
        Self { cell: shared.slot }
    }
}

impl<T: Component> From<&Shared<T>> for AnyComponent {
    fn from(shared: &Shared<T>) -> Self {
        Self {
            cell: Arc::clone(&shared.slot) as Arc<dyn ComponentCell>,
        }
    }
}

impl PartialEq for AnyComponent {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for AnyComponent {}

impl Hash for AnyComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for AnyComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyComponent")
            .field("type", &self.type_name())
            .field("id", &self.id())
            .field("owners", &self.owner_count())
            .finish()
    }
}
