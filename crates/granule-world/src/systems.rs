//! Systems driving the falling-sand simulation

use std::time::Duration;

use glam::Vec2;
use granule_core::config::WorldConfig;
use granule_ecs::{ComponentKind, EntityId, System, TickContext};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{trace, warn};

use crate::components::{Position, Species, Velocity};
use crate::grid::{CellContent, DenseGrid};
use crate::species::Step;

/// Moves sand and water one cell per tick according to their material rules.
///
/// Moves are written into the [`DenseGrid`] resource as they happen, so
/// entities later in the same pass see the updated occupancy.
pub struct CellularAutomaton {
    rng: StdRng,
    missing_grid: bool,
}

impl CellularAutomaton {
    /// Seeded tie-breaking for reproducible runs, or entropy when `seed` is `None`
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            missing_grid: false,
        }
    }
}

impl System for CellularAutomaton {
    fn required(&self) -> Vec<ComponentKind> {
        vec![ComponentKind::of::<Position>(), ComponentKind::of::<Species>()]
    }

    fn before_tick(&mut self, ctx: &mut TickContext<'_>) {
        let missing = ctx.resource::<DenseGrid>().is_none();
        if missing && !self.missing_grid {
            warn!("No DenseGrid resource registered; particles will not move");
        }
        self.missing_grid = missing;
    }

    fn update(&mut self, entity: EntityId, _delta: Duration, ctx: &mut TickContext<'_>) {
        let (Some(pos), Some(species)) = (
            ctx.get::<Position>(entity).copied(),
            ctx.get::<Species>(entity).copied(),
        ) else {
            return;
        };
        let Some(grid) = ctx.resources.get_mut::<DenseGrid>() else {
            return;
        };

        let at = pos.cell();
        // Off-grid, or lost its cell to a later entity during the rebuild.
        if grid.get_cell(at) != CellContent::Occupied(entity) {
            trace!("Entity {} does not own cell {}; skipping", entity, at);
            return;
        }

        let entities = &*ctx.entities;
        let step = species.material.step(
            at,
            grid,
            |other| {
                entities
                    .component::<Species>(other)
                    .map(|s| s.material.density())
            },
            &mut self.rng,
        );

        let (to, displaced) = match step {
            Step::Stay => return,
            Step::MoveTo(to) => (to, None),
            Step::Displace { to, occupant } => (to, Some(occupant)),
        };
        grid.swap(at, to);

        if let Some(pos) = ctx.entities.component_mut::<Position>(entity) {
            *pos = Position::from_cell(to);
        }
        if let Some(occupant) = displaced {
            if let Some(pos) = ctx.entities.component_mut::<Position>(occupant) {
                *pos = Position::from_cell(at);
            }
        }
    }
}

/// Keeps every positioned entity inside `[0, width-1] x [0, height-1]`
pub struct Boundary {
    max: Vec2,
}

impl Boundary {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            max: Vec2::new(
                width.saturating_sub(1) as f32,
                height.saturating_sub(1) as f32,
            ),
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.width, config.height)
    }
}

impl System for Boundary {
    fn required(&self) -> Vec<ComponentKind> {
        vec![ComponentKind::of::<Position>()]
    }

    fn update(&mut self, entity: EntityId, _delta: Duration, ctx: &mut TickContext<'_>) {
        if let Some(pos) = ctx.get_mut::<Position>(entity) {
            pos.0 = pos.0.clamp(Vec2::ZERO, self.max);
        }
    }
}

/// Integrates velocity into position
pub struct Motion;

impl System for Motion {
    fn required(&self) -> Vec<ComponentKind> {
        vec![ComponentKind::of::<Position>(), ComponentKind::of::<Velocity>()]
    }

    fn update(&mut self, entity: EntityId, delta: Duration, ctx: &mut TickContext<'_>) {
        let Some(vel) = ctx.get::<Velocity>(entity).copied() else {
            return;
        };
        if let Some(pos) = ctx.get_mut::<Position>(entity) {
            pos.0 += vel.0 * delta.as_secs_f32();
        }
    }
}
