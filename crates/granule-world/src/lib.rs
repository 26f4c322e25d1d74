//! Granule World - Spatial indices and the falling-sand simulation
//!
//! Provides the dense occupancy grid, the coarse spatial hash, the sand/water
//! movement rules, and the systems that drive them through a [`Universe`].
//!
//! [`Universe`]: granule_ecs::Universe

pub mod components;
pub mod grid;
pub mod setup;
pub mod spatial_hash;
pub mod species;
pub mod systems;

pub use components::{Position, Species, Velocity};
pub use grid::{CellContent, DenseGrid};
pub use setup::{build_universe, populate};
pub use spatial_hash::{SpatialHash, SpatialIndex};
pub use species::{Material, Step};
pub use systems::{Boundary, CellularAutomaton, Motion};
