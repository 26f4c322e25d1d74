use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::component::{Component, ComponentKind, ComponentMask};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(0);

/// Unique entity identifier. Issued in increasing order and never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Create an id from its raw value (mainly for testing).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct StoredComponent {
    value: Box<dyn Any + Send + Sync>,
    /// The component's own kind first, then the broader kinds it satisfies.
    kinds: Vec<ComponentKind>,
}

/// An identifier plus the components it owns, at most one per type.
pub struct Entity {
    id: EntityId,
    components: HashMap<TypeId, StoredComponent>,
}

impl Entity {
    /// Create an empty entity with a fresh id.
    pub fn new() -> Self {
        Self {
            id: EntityId::next(),
            components: HashMap::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Builder form of [`Entity::insert`].
    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.insert(component);
        self
    }

    /// Attach a component, returning the one it replaced.
    pub fn insert<T: Component>(&mut self, component: T) -> Option<T> {
        let mut kinds = vec![ComponentKind::of::<T>()];
        kinds.extend(T::satisfies());
        let previous = self.components.insert(
            TypeId::of::<T>(),
            StoredComponent {
                value: Box::new(component),
                kinds,
            },
        );
        previous.and_then(|stored| stored.value.downcast().ok()).map(|b| *b)
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components
            .get(&TypeId::of::<T>())
            .and_then(|stored| stored.value.downcast_ref())
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .get_mut(&TypeId::of::<T>())
            .and_then(|stored| stored.value.downcast_mut())
    }

    /// Detach a component, returning it if it was present.
    pub fn remove<T: Component>(&mut self) -> Option<T> {
        self.components
            .remove(&TypeId::of::<T>())
            .and_then(|stored| stored.value.downcast().ok())
            .map(|b| *b)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<T>())
    }

    /// Every kind satisfied by the owned components.
    pub fn kinds(&self) -> impl Iterator<Item = &ComponentKind> {
        self.components.values().flat_map(|stored| stored.kinds.iter())
    }

    /// Number of components owned.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self
            .components
            .values()
            .map(|stored| stored.kinds[0].short_name())
            .collect();
        kinds.sort_unstable();
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("components", &kinds)
            .finish()
    }
}

/// A registered entity paired with its cached component mask.
#[derive(Debug)]
pub struct EntityData {
    pub(crate) entity: Entity,
    pub(crate) mask: ComponentMask,
}

impl EntityData {
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    /// The mask computed at the last registration. Component changes made
    /// since then are not reflected until the entity is registered again.
    pub fn mask(&self) -> ComponentMask {
        self.mask
    }
}

/// Registered entities in registration order, with O(1) lookup by id.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: Vec<EntityData>,
    slots: HashMap<EntityId, usize>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity to the iteration order. Entities are moved in, so an
    /// id can never be registered twice.
    pub(crate) fn push(&mut self, entity: Entity, mask: ComponentMask) {
        debug_assert!(!self.slots.contains_key(&entity.id));
        self.slots.insert(entity.id, self.entries.len());
        self.entries.push(EntityData { entity, mask });
    }

    pub(crate) fn set_mask(&mut self, id: EntityId, mask: ComponentMask) -> bool {
        match self.slots.get(&id) {
            Some(&slot) => {
                self.entries[slot].mask = mask;
                true
            }
            None => false,
        }
    }

    /// Remove an entity, keeping the relative order of the others.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.remove(&id)?;
        let removed = self.entries.remove(slot);
        for data in &self.entries[slot..] {
            if let Some(s) = self.slots.get_mut(&data.entity.id) {
                *s -= 1;
            }
        }
        Some(removed.entity)
    }

    pub(crate) fn data_at(&self, slot: usize) -> &EntityData {
        &self.entries[slot]
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = *self.slots.get(&id)?;
        Some(&self.entries[slot].entity)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = *self.slots.get(&id)?;
        Some(&mut self.entries[slot].entity)
    }

    /// Shortcut for `get(id)?.get::<T>()`.
    pub fn component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.get(id)?.get::<T>()
    }

    /// Shortcut for `get_mut(id)?.get_mut::<T>()`.
    pub fn component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.get_mut(id)?.get_mut::<T>()
    }

    pub fn mask(&self, id: EntityId) -> Option<ComponentMask> {
        let slot = *self.slots.get(&id)?;
        Some(self.entries[slot].mask)
    }

    /// All registered entities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityData> {
        self.entries.iter()
    }

    /// Entities whose cached mask matches `required`, in registration order.
    pub fn matching(&self, required: ComponentMask) -> impl Iterator<Item = &Entity> {
        self.entries
            .iter()
            .filter(move |data| data.mask.matches(required))
            .map(|data| &data.entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
