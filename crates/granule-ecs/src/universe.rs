use std::time::Duration;

use granule_core::TickClock;
use tracing::{debug, trace, warn};

use crate::component::{Component, ComponentKind, ComponentKinds, ComponentMask};
use crate::entity::{Entity, EntityId, EntityRegistry};
use crate::error::EcsError;
use crate::resource::{Resource, Resources};
use crate::system::{System, SystemSchedule, TickContext};

/// Read-only handle given to resource hooks, e.g. to rebuild derived indices
/// from the live entity list.
pub struct UniverseView<'a> {
    kinds: &'a ComponentKinds,
    entities: &'a EntityRegistry,
}

impl<'a> UniverseView<'a> {
    pub fn kinds(&self) -> &'a ComponentKinds {
        self.kinds
    }

    pub fn entities(&self) -> &'a EntityRegistry {
        self.entities
    }

    /// Flag of a registered component kind.
    pub fn mask_of<T: 'static>(&self) -> Option<ComponentMask> {
        self.kinds.mask_of::<T>()
    }

    /// Entities whose cached mask holds every bit of `required`.
    pub fn matching(&self, required: ComponentMask) -> impl Iterator<Item = &'a Entity> {
        self.entities.matching(required)
    }
}

/// The scheduler. Owns the kind table, the registered entities, the systems
/// and the resources, and drives ticks.
///
/// One tick runs, in order: every resource's `before_tick`; then for each
/// system `before_tick`, `update` for each matching entity in registration
/// order, `after_tick`; then every resource's `after_tick`.
pub struct Universe {
    kinds: ComponentKinds,
    entities: EntityRegistry,
    systems: SystemSchedule,
    resources: Resources,
    clock: TickClock,
}

impl Universe {
    pub fn new() -> Self {
        Self::with_clock(TickClock::new())
    }

    pub fn with_clock(clock: TickClock) -> Self {
        Self {
            kinds: ComponentKinds::new(),
            entities: EntityRegistry::new(),
            systems: SystemSchedule::new(),
            resources: Resources::new(),
            clock,
        }
    }

    // ---- Registration ----

    /// Register a component type, giving it the next free bit.
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentMask, EcsError> {
        self.register_kind(ComponentKind::of::<T>())
    }

    /// Register a kind that is not itself a component, such as a marker that
    /// several component types satisfy.
    pub fn register_kind(&mut self, kind: ComponentKind) -> Result<ComponentMask, EcsError> {
        let flag = self.kinds.register(kind)?;
        debug!("Registered component kind {} as {:?}", kind.short_name(), flag);
        Ok(flag)
    }

    /// Compile the system's requirements and append it to the execution order.
    pub fn register_system<S: System>(&mut self, system: S) -> Result<ComponentMask, EcsError> {
        let required_kinds = system.required();
        let required = self.kinds.compile(&required_kinds);
        let name = std::any::type_name::<S>();
        for kind in self.kinds.unknown(&required_kinds) {
            warn!(
                "System {} requires unregistered component kind {}; it contributes no bits",
                name,
                kind.name()
            );
        }
        if required.is_empty() {
            warn!("System {} has an empty requirement mask and will never run", name);
        }
        self.systems.add_system(system, required)?;
        debug!("Registered system {} requiring {:?}", name, required);
        Ok(required)
    }

    pub fn register_resource<R: Resource>(&mut self, resource: R) -> Result<(), EcsError> {
        self.resources.insert(resource)?;
        debug!("Registered resource {}", std::any::type_name::<R>());
        Ok(())
    }

    /// Hand an entity to the universe, appending it to the iteration order and
    /// caching its component mask.
    pub fn register_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        let mask = self.kinds.compile_entity(&entity);
        self.entities.push(entity, mask);
        trace!("Registered entity {} with {:?}", id, mask);
        id
    }

    /// Re-register a known entity: recompute its cached mask in place after its
    /// components were changed through [`Universe::entity_mut`]. Its position in
    /// the iteration order is kept.
    pub fn refresh_entity(&mut self, id: EntityId) -> Result<ComponentMask, EcsError> {
        let entity = self.entities.get(id).ok_or(EcsError::UnknownEntity(id))?;
        let mask = self.kinds.compile_entity(entity);
        self.entities.set_mask(id, mask);
        Ok(mask)
    }

    /// Unregister an entity, handing it back.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    // ---- Access ----

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable access to a registered entity. Adding or removing components
    /// here leaves the cached mask stale until [`Universe::refresh_entity`].
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn entity_mask(&self, id: EntityId) -> Option<ComponentMask> {
        self.entities.mask(id)
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn kinds(&self) -> &ComponentKinds {
        &self.kinds
    }

    /// Flag of a registered component type.
    pub fn component_flag<T: Component>(&self) -> Option<ComponentMask> {
        self.kinds.mask_of::<T>()
    }

    pub fn systems(&self) -> &SystemSchedule {
        &self.systems
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn resource<R: Resource>(&self) -> Option<&R> {
        self.resources.get::<R>()
    }

    pub fn resource_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.resources.get_mut::<R>()
    }

    pub fn view(&self) -> UniverseView<'_> {
        UniverseView {
            kinds: &self.kinds,
            entities: &self.entities,
        }
    }

    // ---- Ticking ----

    /// Run one tick, passing systems the wall-clock time since the previous one.
    pub fn tick(&mut self) {
        let delta = self.clock.tick();
        self.run_tick(delta);
    }

    /// Run one tick with a caller-chosen elapsed time.
    pub fn advance(&mut self, delta: Duration) {
        let delta = self.clock.advance(delta);
        self.run_tick(delta);
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }

    /// Elapsed time handed to systems on the most recent tick.
    pub fn last_delta(&self) -> Duration {
        self.clock.delta()
    }

    fn run_tick(&mut self, delta: Duration) {
        let view = UniverseView {
            kinds: &self.kinds,
            entities: &self.entities,
        };
        self.resources.before_tick(&view);

        for entry in self.systems.entries_mut() {
            let mut ctx = TickContext {
                entities: &mut self.entities,
                resources: &mut self.resources,
            };
            entry.system.before_tick(&mut ctx);

            let mut updated = 0usize;
            for slot in 0..ctx.entities.len() {
                let data = ctx.entities.data_at(slot);
                if data.mask().matches(entry.required) {
                    let id = data.id();
                    entry.system.update(id, delta, &mut ctx);
                    updated += 1;
                }
            }

            entry.system.after_tick(&mut ctx);
            trace!("System {} updated {} entities", entry.name, updated);
        }

        let view = UniverseView {
            kinds: &self.kinds,
            entities: &self.entities,
        };
        self.resources.after_tick(&view);
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}
