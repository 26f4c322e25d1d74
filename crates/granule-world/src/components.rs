//! Components attached to simulated particles

use glam::{IVec2, Vec2};
use granule_core::Color;
use granule_ecs::Component;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::species::Material;

/// Location in grid units. The occupied cell is the rounded position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    /// Position at the center of a grid cell
    pub fn from_cell(cell: IVec2) -> Self {
        Self(cell.as_vec2())
    }

    /// The grid cell this position falls in
    pub fn cell(&self) -> IVec2 {
        self.0.round().as_ivec2()
    }
}

impl Component for Position {}

/// Linear velocity in grid units per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

impl Component for Velocity {}

/// What a particle is made of, plus the color it is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub material: Material,
    pub color: Color,
}

impl Species {
    /// A sand grain with a shade picked at random from the sand palette
    pub fn sand<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            material: Material::Sand,
            color: Material::Sand.pick_color(rng),
        }
    }

    pub fn water() -> Self {
        Self {
            material: Material::Water,
            color: Color::BLUE,
        }
    }

    pub fn new<R: Rng + ?Sized>(material: Material, rng: &mut R) -> Self {
        match material {
            Material::Sand => Self::sand(rng),
            Material::Water => Self::water(),
        }
    }
}

impl Component for Species {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_position_cell_rounds() {
        assert_eq!(Position::new(4.6, 2.4).cell(), IVec2::new(5, 2));
        assert_eq!(Position::new(-0.4, 0.5).cell(), IVec2::new(0, 1));
        assert_eq!(Position::from_cell(IVec2::new(3, 9)), Position::new(3.0, 9.0));
    }

    #[test]
    fn test_sand_color_from_palette() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..32 {
            let sand = Species::sand(&mut rng);
            assert_eq!(sand.material, Material::Sand);
            assert!(Material::SAND_PALETTE.contains(&sand.color.to_hex()));
        }
        assert_eq!(Species::water().color.to_hex(), 0x0000FF);
    }
}
