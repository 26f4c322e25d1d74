use std::any::{type_name, TypeId};
use std::time::Duration;

use crate::component::{Component, ComponentKind, ComponentMask};
use crate::entity::{EntityId, EntityRegistry};
use crate::error::EcsError;
use crate::resource::{Resource, Resources};

/// Everything a system may touch while it runs: the registered entities and
/// the resources. Fields are public so a system can borrow both at once.
pub struct TickContext<'a> {
    pub entities: &'a mut EntityRegistry,
    pub resources: &'a mut Resources,
}

impl TickContext<'_> {
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.entities.component::<T>(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entities.component_mut::<T>(entity)
    }

    pub fn resource<R: Resource>(&self) -> Option<&R> {
        self.resources.get::<R>()
    }

    pub fn resource_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.resources.get_mut::<R>()
    }
}

/// Logic that runs once per tick over every entity owning the required kinds.
pub trait System: Send + 'static {
    /// Kinds an entity must own (all of them) to be updated by this system.
    fn required(&self) -> Vec<ComponentKind>;

    fn before_tick(&mut self, _ctx: &mut TickContext<'_>) {}

    /// Update a single matching entity. `delta` is the time since the previous tick.
    fn update(&mut self, entity: EntityId, delta: Duration, ctx: &mut TickContext<'_>);

    fn after_tick(&mut self, _ctx: &mut TickContext<'_>) {}

    /// Whether the schedule accepts at most one system of this concrete type.
    fn unique(&self) -> bool {
        true
    }
}

/// A system built from a closure; see [`system_fn`].
pub struct FnSystem<F> {
    required: Vec<ComponentKind>,
    update: F,
}

/// Wrap a closure as a system requiring `required`.
///
/// Closure systems are never rejected as duplicates, so one factory may build
/// several of them with different requirements.
pub fn system_fn<F>(required: Vec<ComponentKind>, update: F) -> FnSystem<F>
where
    F: FnMut(EntityId, Duration, &mut TickContext<'_>) + Send + 'static,
{
    FnSystem { required, update }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(EntityId, Duration, &mut TickContext<'_>) + Send + 'static,
{
    fn required(&self) -> Vec<ComponentKind> {
        self.required.clone()
    }

    fn update(&mut self, entity: EntityId, delta: Duration, ctx: &mut TickContext<'_>) {
        (self.update)(entity, delta, ctx);
    }

    fn unique(&self) -> bool {
        false
    }
}

pub(crate) struct SystemEntry {
    pub(crate) system: Box<dyn System>,
    pub(crate) required: ComponentMask,
    pub(crate) name: &'static str,
    type_id: TypeId,
}

/// Systems in execution order, each with its compiled requirement mask.
#[derive(Default)]
pub struct SystemSchedule {
    entries: Vec<SystemEntry>,
}

impl SystemSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system. Each concrete system type may be scheduled once unless
    /// the system opts out through [`System::unique`].
    pub fn add_system<S: System>(
        &mut self,
        system: S,
        required: ComponentMask,
    ) -> Result<(), EcsError> {
        let type_id = TypeId::of::<S>();
        let name = type_name::<S>();
        if system.unique() && self.entries.iter().any(|entry| entry.type_id == type_id) {
            return Err(EcsError::DuplicateSystem(name));
        }
        self.entries.push(SystemEntry {
            system: Box::new(system),
            required,
            name,
            type_id,
        });
        Ok(())
    }

    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = &mut SystemEntry> {
        self.entries.iter_mut()
    }

    /// Names and requirement masks in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ComponentMask)> + '_ {
        self.entries.iter().map(|entry| (entry.name, entry.required))
    }

    /// Number of systems in the schedule.
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

    struct Gravity;
    impl System for Gravity {
        fn required(&self) -> Vec<ComponentKind> {
            Vec::new()
        }

        fn update(&mut self, _entity: EntityId, _delta: Duration, _ctx: &mut TickContext<'_>) {}
    }

    #[test]
    fn schedule_ordering() {
        let mut schedule = SystemSchedule::new();
        schedule.add_system(Gravity, ComponentMask::bit(0)).unwrap();
        schedule
            .add_system(system_fn(Vec::new(), |_, _, _| {}), ComponentMask::bit(1))
            .unwrap();

        let masks: Vec<_> = schedule.iter().map(|(_, mask)| mask.bits()).collect();
        assert_eq!(masks, vec![0b01, 0b10]);
        assert!(schedule.iter().next().unwrap().0.ends_with("Gravity"));
    }

    #[test]
    fn duplicate_system_type_rejected() {
        let mut schedule = SystemSchedule::new();
        schedule.add_system(Gravity, ComponentMask::EMPTY).unwrap();
        let err = schedule.add_system(Gravity, ComponentMask::EMPTY).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateSystem(_)));
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn distinct_closures_are_distinct_systems() {
        let mut schedule = SystemSchedule::new();
        schedule
            .add_system(system_fn(Vec::new(), |_, _, _| {}), ComponentMask::EMPTY)
            .unwrap();
        schedule
            .add_system(system_fn(Vec::new(), |_, _, _| {}), ComponentMask::EMPTY)
            .unwrap();
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn one_factory_builds_several_closure_systems() {
        struct Marker;
        fn make(required: Vec<ComponentKind>) -> impl System {
            system_fn(required, |_, _, _| {})
        }

        let mut schedule = SystemSchedule::new();
        schedule
            .add_system(make(vec![ComponentKind::of::<Gravity>()]), ComponentMask::bit(0))
            .unwrap();
        schedule
            .add_system(make(vec![ComponentKind::of::<Marker>()]), ComponentMask::bit(1))
            .unwrap();
        let masks: Vec<_> = schedule.iter().map(|(_, mask)| mask.bits()).collect();
        assert_eq!(masks, vec![0b01, 0b10]);
    }
}
