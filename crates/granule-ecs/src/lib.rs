//! Granule ECS - Entity Component System
//!
//! A small ECS built around a component kind table: every registered kind owns
//! one bit of a [`ComponentMask`], systems declare the kinds they require, and
//! the [`Universe`] runs each system over the entities whose cached mask holds
//! all of those bits.

mod component;
mod entity;
mod error;
mod resource;
mod system;
mod universe;

pub use component::{Component, ComponentKind, ComponentKinds, ComponentMask, MAX_COMPONENT_KINDS};
pub use entity::{Entity, EntityData, EntityId, EntityRegistry};
pub use error::EcsError;
pub use resource::{AsAny, Resource, Resources};
pub use system::{system_fn, FnSystem, System, SystemSchedule, TickContext};
pub use universe::{Universe, UniverseView};
