//! Dense occupancy grid
//!
//! A fixed `width x height` array mapping each integer cell to at most one
//! entity. Rebuilt from entity positions at the start of every tick, then
//! kept current during the tick by the movement rules swapping cells.

use glam::IVec2;
use granule_core::config::WorldConfig;
use granule_ecs::{Entity, EntityId, Resource, UniverseView};
use tracing::warn;

use crate::components::Position;

/// What a grid lookup found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellContent {
    Empty,
    Occupied(EntityId),
    /// Outside the grid. Behaves like an impassable wall.
    Boundary,
}

impl CellContent {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Empty)
    }

    /// Occupied or outside the grid
    pub fn is_blocked(&self) -> bool {
        !self.is_empty()
    }

    pub fn entity(&self) -> Option<EntityId> {
        match self {
            CellContent::Occupied(id) => Some(*id),
            _ => None,
        }
    }
}

/// Fixed-size cell array, row-major with stride `width`
#[derive(Debug, Clone)]
pub struct DenseGrid {
    width: i32,
    height: i32,
    cells: Vec<Option<EntityId>>,
}

impl DenseGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let width = i32::try_from(width).unwrap_or(i32::MAX);
        let height = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.width, config.height)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether `cell` lies inside `[0, width) x [0, height)`
    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    /// Linear index of an in-bounds cell. Every access goes through here.
    fn index(&self, cell: IVec2) -> usize {
        debug_assert!(self.contains(cell), "cell {cell} outside {}x{}", self.width, self.height);
        (cell.y * self.width + cell.x) as usize
    }

    /// Occupant of `cell`, or [`CellContent::Boundary`] when it lies outside the grid
    pub fn get_cell(&self, cell: IVec2) -> CellContent {
        if !self.contains(cell) {
            return CellContent::Boundary;
        }
        match self.cells[self.index(cell)] {
            Some(id) => CellContent::Occupied(id),
            None => CellContent::Empty,
        }
    }

    /// Exchange the occupants of two cells. Both must be inside the grid.
    ///
    /// # Panics
    /// Panics if either cell is out of bounds.
    pub fn swap(&mut self, a: IVec2, b: IVec2) {
        assert!(
            self.contains(a) && self.contains(b),
            "swap {a} <-> {b} outside {}x{} grid",
            self.width,
            self.height
        );
        let (ia, ib) = (self.index(a), self.index(b));
        self.cells.swap(ia, ib);
    }

    /// Put `entity` at `cell`, overwriting any occupant. Returns `false` if the
    /// cell is outside the grid.
    pub fn place(&mut self, entity: EntityId, cell: IVec2) -> bool {
        if !self.contains(cell) {
            return false;
        }
        let idx = self.index(cell);
        self.cells[idx] = Some(entity);
        true
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Clear the grid and place every entity carrying a [`Position`] at its
    /// rounded cell. When two entities share a cell the later one wins.
    /// Returns the number of entities skipped for lying outside the grid.
    pub fn rebuild<'a>(&mut self, entities: impl IntoIterator<Item = &'a Entity>) -> usize {
        self.clear();
        let mut skipped = 0;
        for entity in entities {
            let Some(pos) = entity.get::<Position>() else {
                continue;
            };
            if !self.place(entity.id(), pos.cell()) {
                skipped += 1;
            }
        }
        skipped
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Contents of every cell in `[x-range, x+range) x [y-range, y+range)`,
    /// column by column. Cells outside the grid are reported as boundary.
    pub fn neighborhood(&self, center: IVec2, range: i32) -> Vec<CellContent> {
        let mut found = Vec::with_capacity((2 * range.max(0)).pow(2) as usize);
        for x in center.x - range..center.x + range {
            for y in center.y - range..center.y + range {
                found.push(self.get_cell(IVec2::new(x, y)));
            }
        }
        found
    }
}

impl Resource for DenseGrid {
    fn before_tick(&mut self, universe: &UniverseView<'_>) {
        let Some(flag) = universe.mask_of::<Position>() else {
            self.clear();
            return;
        };
        let skipped = self.rebuild(universe.matching(flag));
        if skipped > 0 {
            warn!("{} positioned entities lie outside the grid", skipped);
        }
    }
}
