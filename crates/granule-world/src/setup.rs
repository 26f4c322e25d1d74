//! Wiring a universe for the sand simulation

use granule_core::SimConfig;
use granule_ecs::{EcsError, Entity, Universe};
use rand::Rng;
use tracing::info;

use crate::components::{Position, Species, Velocity};
use crate::grid::DenseGrid;
use crate::spatial_hash::SpatialIndex;
use crate::species::Material;
use crate::systems::{Boundary, CellularAutomaton, Motion};

/// Fraction of the population spread over the full world height
const FULL_HEIGHT_SHARE: f32 = 0.9;

/// Register the simulation's component kinds, systems and resources.
///
/// Systems run as: cellular automaton, motion, boundary clamp.
pub fn build_universe(config: &SimConfig) -> Result<Universe, EcsError> {
    let mut universe = Universe::new();

    universe.register_component::<Position>()?;
    universe.register_component::<Species>()?;
    universe.register_component::<Velocity>()?;

    universe.register_system(CellularAutomaton::new(config.seed))?;
    universe.register_system(Motion)?;
    universe.register_system(Boundary::from_config(&config.world))?;

    universe.register_resource(DenseGrid::from_config(&config.world))?;
    universe.register_resource(SpatialIndex::from_config(&config.world))?;

    info!(
        "Universe ready: {}x{} world, {} kinds, {} systems",
        config.world.width,
        config.world.height,
        universe.kinds().len(),
        universe.system_count()
    );
    Ok(universe)
}

/// Spawn the configured population in a column near the left of the world.
///
/// Most particles are scattered over the full height; the rest start in the
/// upper third. Returns the number of entities registered.
pub fn populate<R: Rng + ?Sized>(universe: &mut Universe, config: &SimConfig, rng: &mut R) -> usize {
    let population = &config.population;
    let height = config.world.height as f32;
    let max_y = (height - 1.0).max(0.0);
    let full_height_count = (population.entity_count as f32 * FULL_HEIGHT_SHARE) as usize;

    for i in 0..population.entity_count {
        let x = population.column_x + (population.column_width * rng.gen::<f32>()).round();
        let span = if i < full_height_count { height } else { height / 3.0 };
        let y = (span * rng.gen::<f32>()).round().min(max_y);

        let material = if rng.gen::<f32>() < population.sand_ratio {
            Material::Sand
        } else {
            Material::Water
        };

        universe.register_entity(
            Entity::new()
                .with(Position::new(x, y))
                .with(Species::new(material, rng)),
        );
    }

    info!("Spawned {} particles", population.entity_count);
    population.entity_count
}
