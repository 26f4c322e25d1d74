use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use crate::error::EcsError;
use crate::universe::UniverseView;

/// Upcast helper so boxed trait objects can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A singleton owned by the universe rather than by an entity. Resources take
/// part in the tick lifecycle through the two hooks and are reachable from
/// systems by type.
pub trait Resource: AsAny + Send {
    /// Runs before any system, in registration order.
    fn before_tick(&mut self, _universe: &UniverseView<'_>) {}

    /// Runs after every system, in registration order.
    fn after_tick(&mut self, _universe: &UniverseView<'_>) {}
}

/// Registration-ordered storage for resources with lookup by type.
#[derive(Default)]
pub struct Resources {
    entries: Vec<Box<dyn Resource>>,
    by_type: HashMap<TypeId, usize>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Each concrete type may be registered once.
    pub fn insert<R: Resource>(&mut self, resource: R) -> Result<(), EcsError> {
        let type_id = TypeId::of::<R>();
        if self.by_type.contains_key(&type_id) {
            return Err(EcsError::DuplicateResource(type_name::<R>()));
        }
        self.by_type.insert(type_id, self.entries.len());
        self.entries.push(Box::new(resource));
        Ok(())
    }

    /// Get an immutable reference to a resource.
    pub fn get<R: Resource>(&self) -> Option<&R> {
        let slot = *self.by_type.get(&TypeId::of::<R>())?;
        (*self.entries[slot]).as_any().downcast_ref()
    }

    /// Get a mutable reference to a resource.
    pub fn get_mut<R: Resource>(&mut self) -> Option<&mut R> {
        let slot = *self.by_type.get(&TypeId::of::<R>())?;
        (*self.entries[slot]).as_any_mut().downcast_mut()
    }

    /// Check whether a resource of this type exists.
    pub fn contains<R: Resource>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<R>())
    }

    pub(crate) fn before_tick(&mut self, universe: &UniverseView<'_>) {
        for resource in &mut self.entries {
            resource.before_tick(universe);
        }
    }

    pub(crate) fn after_tick(&mut self, universe: &UniverseView<'_>) {
        for resource in &mut self.entries {
            resource.after_tick(universe);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);
    impl Resource for Counter {}

    struct Gravity(f32);
    impl Resource for Gravity {}

    #[test]
    fn insert_and_get() {
        let mut res = Resources::new();
        res.insert(Counter(42)).unwrap();
        res.insert(Gravity(9.8)).unwrap();
        assert_eq!(res.get::<Counter>().map(|c| c.0), Some(42));
        assert_eq!(res.get::<Gravity>().map(|g| g.0), Some(9.8));
        assert_eq!(res.len(), 2);
    }

    #[test]
    fn duplicate_rejected() {
        let mut res = Resources::new();
        res.insert(Counter(1)).unwrap();
        let err = res.insert(Counter(2)).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateResource(_)));
        assert_eq!(res.get::<Counter>().map(|c| c.0), Some(1));
    }

    #[test]
    fn mutate() {
        let mut res = Resources::new();
        res.insert(Counter(0)).unwrap();
        res.get_mut::<Counter>().unwrap().0 += 4;
        assert_eq!(res.get::<Counter>().unwrap().0, 4);
    }

    #[test]
    fn missing_resource() {
        let res = Resources::new();
        assert!(res.get::<Counter>().is_none());
        assert!(!res.contains::<Counter>());
    }
}
