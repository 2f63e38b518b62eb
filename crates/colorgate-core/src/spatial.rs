//! Bidirectional mapping between grid positions and world positions.

use crate::fixed::{Fixed64, checked_div_64, round_to_i32};
use crate::geometry::{GridOffset, GridPosition, WorldPosition};

/// Maps integer grid cells to continuous world coordinates and back.
///
/// Cell `(x, y)` is centered on world `(x * spacing, 0, y * spacing)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialIndex {
    width: u32,
    height: u32,
    spacing: Fixed64,
}

impl SpatialIndex {
    /// Callers validate `spacing > 0` and non-zero dimensions beforehand
    /// (see `BoardConfig::validate`).
    pub fn new(width: u32, height: u32, spacing: Fixed64) -> Self {
        Self {
            width,
            height,
            spacing,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn spacing(&self) -> Fixed64 {
        self.spacing
    }

    /// World position of a cell center. Total: ring and out-of-range cells
    /// map just as well, saturating at the edge of the fixed-point range.
    pub fn grid_to_world(&self, pos: GridPosition) -> WorldPosition {
        WorldPosition::new(self.to_world(pos.x), Fixed64::ZERO, self.to_world(pos.y))
    }

    /// World displacement of a cell offset.
    pub fn offset_to_world(&self, offset: GridOffset) -> WorldPosition {
        WorldPosition::new(
            self.to_world(offset.dx),
            Fixed64::ZERO,
            self.to_world(offset.dy),
        )
    }

    /// Nearest cell to a world position, without clamping. Coordinates too
    /// far out to index saturate toward `i32::MIN`/`i32::MAX`.
    pub fn world_to_grid_unclamped(&self, world: WorldPosition) -> GridPosition {
        GridPosition::new(self.to_cell(world.x), self.to_cell(world.z))
    }

    fn to_world(&self, cells: i32) -> Fixed64 {
        Fixed64::from_num(cells).saturating_mul(self.spacing)
    }

    fn to_cell(&self, world: Fixed64) -> i32 {
        let cells = checked_div_64(world, self.spacing).unwrap_or(if world.is_negative() {
            Fixed64::MIN
        } else {
            Fixed64::MAX
        });
        round_to_i32(cells)
    }

    /// Nearest in-bounds cell to a world position. Positions outside the
    /// grid resolve to the closest border cell; this never fails.
    pub fn world_to_grid(&self, world: WorldPosition) -> GridPosition {
        self.clamp(self.world_to_grid_unclamped(world))
    }

    /// Clamp a grid position into `[0, width) x [0, height)`.
    pub fn clamp(&self, pos: GridPosition) -> GridPosition {
        GridPosition::new(
            pos.x.clamp(0, self.width as i32 - 1),
            pos.y.clamp(0, self.height as i32 - 1),
        )
    }

    /// Clamp an anchor so every cell of the footprint stays in bounds. When
    /// the footprint is wider than the grid the plain clamp wins.
    pub fn clamp_footprint(&self, anchor: GridPosition, offsets: &[GridOffset]) -> GridPosition {
        let min_dx = offsets.iter().map(|o| o.dx).min().unwrap_or(0);
        let max_dx = offsets.iter().map(|o| o.dx).max().unwrap_or(0);
        let min_dy = offsets.iter().map(|o| o.dy).min().unwrap_or(0);
        let max_dy = offsets.iter().map(|o| o.dy).max().unwrap_or(0);

        let lo_x = -min_dx;
        let hi_x = self.width as i32 - 1 - max_dx;
        let lo_y = -min_dy;
        let hi_y = self.height as i32 - 1 - max_dy;

        if lo_x > hi_x || lo_y > hi_y {
            return self.clamp(anchor);
        }
        GridPosition::new(anchor.x.clamp(lo_x, hi_x), anchor.y.clamp(lo_y, hi_y))
    }

    /// Whether the position lies inside the grid.
    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as i64) < self.width as i64 && (pos.y as i64) < self.height as i64
    }

    /// Whether the position lies on the one-cell border ring around the
    /// grid (corners included).
    pub fn is_ring(&self, pos: GridPosition) -> bool {
        let w = self.width as i32;
        let h = self.height as i32;
        let in_extent = pos.x >= -1 && pos.x <= w && pos.y >= -1 && pos.y <= h;
        in_extent && !self.contains(pos)
    }

    /// Every ring cell, row by row.
    pub fn ring(&self) -> impl Iterator<Item = GridPosition> + '_ {
        let w = self.width as i32;
        let h = self.height as i32;
        (-1..=h)
            .flat_map(move |y| (-1..=w).map(move |x| GridPosition::new(x, y)))
            .filter(|pos| self.is_ring(*pos))
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major storage index for an in-bounds position.
    pub fn index_of(&self, pos: GridPosition) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }
}
