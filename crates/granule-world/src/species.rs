//! Movement rules for the simulated materials
//!
//! Each rule reads the grid as it is at the moment of the call, which may
//! already include moves made by entities updated earlier in the same tick.

use glam::IVec2;
use granule_core::Color;
use granule_ecs::EntityId;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{CellContent, DenseGrid};

/// Closed set of particle materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    /// Granular: falls, sinks through lighter materials, piles up diagonally
    Sand,
    /// Fluid: falls, slides diagonally, then spreads sideways
    Water,
}

/// Outcome of one movement rule evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Stay,
    /// Move into an empty cell
    MoveTo(IVec2),
    /// Trade places with the occupant of `to`
    Displace { to: IVec2, occupant: EntityId },
}

impl Material {
    /// Shades a sand grain may be drawn with (0xRRGGBB)
    pub const SAND_PALETTE: [u32; 4] = [0xF4A460, 0xE1A95F, 0xC2B280, 0xC19A6B];

    /// Relative density; a heavier material sinks through a lighter one
    pub fn density(&self) -> u8 {
        match self {
            Material::Sand => 2,
            Material::Water => 1,
        }
    }

    /// Representative color of the material
    pub fn color(&self) -> Color {
        match self {
            Material::Sand => Color::from_hex(Self::SAND_PALETTE[0]),
            Material::Water => Color::BLUE,
        }
    }

    /// Display color for a new particle, varying the shade where the material has several
    pub fn pick_color<R: Rng + ?Sized>(&self, rng: &mut R) -> Color {
        match self {
            Material::Sand => Color::from_hex(Self::SAND_PALETTE[rng.gen_range(0..4)]),
            Material::Water => self.color(),
        }
    }

    /// Decide where a particle at `at` moves this tick.
    ///
    /// `density_of` reports the material density of another entity, or `None`
    /// for entities without a species (which are never displaced).
    pub fn step<R, D>(&self, at: IVec2, grid: &DenseGrid, density_of: D, rng: &mut R) -> Step
    where
        R: Rng + ?Sized,
        D: Fn(EntityId) -> Option<u8>,
    {
        match self {
            Material::Sand => self.granular_step(at, grid, density_of, rng),
            Material::Water => fluid_step(at, grid, rng),
        }
    }

    fn granular_step<R, D>(&self, at: IVec2, grid: &DenseGrid, density_of: D, rng: &mut R) -> Step
    where
        R: Rng + ?Sized,
        D: Fn(EntityId) -> Option<u8>,
    {
        let below = at + IVec2::Y;
        match grid.get_cell(below) {
            CellContent::Empty => return Step::MoveTo(below),
            CellContent::Occupied(occupant)
                if density_of(occupant).is_some_and(|d| d < self.density()) =>
            {
                return Step::Displace { to: below, occupant };
            }
            _ => {}
        }

        first_free(at, grid, diagonals(coin(rng))).map_or(Step::Stay, Step::MoveTo)
    }
}

fn fluid_step<R: Rng + ?Sized>(at: IVec2, grid: &DenseGrid, rng: &mut R) -> Step {
    let below = at + IVec2::Y;
    if grid.get_cell(below).is_empty() {
        return Step::MoveTo(below);
    }

    first_free(at, grid, diagonals(coin(rng)))
        .or_else(|| first_free(at, grid, laterals(coin(rng))))
        .map_or(Step::Stay, Step::MoveTo)
}

/// -1 or +1 with equal probability: which side to try first
fn coin<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    if rng.gen_bool(0.5) {
        1
    } else {
        -1
    }
}

fn diagonals(first: i32) -> [IVec2; 2] {
    [IVec2::new(first, 1), IVec2::new(-first, 1)]
}

fn laterals(first: i32) -> [IVec2; 2] {
    [IVec2::new(first, 0), IVec2::new(-first, 0)]
}

fn first_free(at: IVec2, grid: &DenseGrid, offsets: [IVec2; 2]) -> Option<IVec2> {
    offsets
        .into_iter()
        .map(|offset| at + offset)
        .find(|target| grid.get_cell(*target).is_empty())
}
