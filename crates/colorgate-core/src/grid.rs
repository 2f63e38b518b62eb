//! Occupancy grid: per-cell occupied flag and color, recomputed on demand
//! from the registered items, plus the active item registry that signals
//! level completion.

use crate::geometry::GridPosition;
use crate::id::{Color, ItemId};
use crate::item::Item;
use crate::spatial::SpatialIndex;
use slotmap::SlotMap;
use tracing::{debug, warn};

/// Errors from strict grid access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("position ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

/// State of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub position: GridPosition,
    pub occupied: bool,
    pub color: Option<Color>,
}

impl Cell {
    pub fn free(position: GridPosition) -> Self {
        Self {
            position,
            occupied: false,
            color: None,
        }
    }
}

/// Result of removing an item from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The last active item was removed.
    LevelComplete,
    NotRegistered,
}

#[derive(Debug, Clone, Default)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    /// Row-major: index `y * width + x`.
    cells: Vec<Cell>,
    /// Active items, in registration order.
    registry: Vec<ItemId>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let mut grid = Self::default();
        grid.initialize(width, height);
        grid
    }

    /// Allocate `width * height` free cells and clear the registry.
    pub fn initialize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.reserve(width as usize * height as usize);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                self.cells.push(Cell::free(GridPosition::new(x, y)));
            }
        }
        self.registry.clear();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, pos: GridPosition) -> Option<usize> {
        let in_bounds = pos.x >= 0
            && pos.y >= 0
            && (pos.x as u32) < self.width
            && (pos.y as u32) < self.height;
        in_bounds.then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    fn out_of_bounds(&self, pos: GridPosition) -> GridError {
        GridError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Strict cell access.
    pub fn cell(&self, pos: GridPosition) -> Result<&Cell, GridError> {
        self.index(pos)
            .map(|i| &self.cells[i])
            .ok_or_else(|| self.out_of_bounds(pos))
    }

    /// Advisory cell access: out-of-range positions read as free cells.
    pub fn peek(&self, pos: GridPosition) -> Cell {
        self.index(pos)
            .map(|i| self.cells[i])
            .unwrap_or_else(|| Cell::free(pos))
    }

    pub fn is_occupied(&self, pos: GridPosition) -> bool {
        self.peek(pos).occupied
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.occupied).count()
    }

    /// Reset every cell, then mark the cells under each registered active
    /// item. Stale registry entries are skipped.
    pub fn recompute(&mut self, items: &SlotMap<ItemId, Item>, spatial: &SpatialIndex) {
        for cell in &mut self.cells {
            cell.occupied = false;
            cell.color = None;
        }

        for &id in &self.registry {
            let Some(item) = items.get(id) else {
                debug!(?id, "registered item no longer exists; skipped");
                continue;
            };
            if !item.is_active() {
                continue;
            }
            for pos in item.occupied_cells(spatial) {
                let Some(i) = self.index(pos) else {
                    continue;
                };
                let cell = &mut self.cells[i];
                if cell.occupied {
                    warn!(?id, x = pos.x, y = pos.y, "cell already occupied");
                }
                cell.occupied = true;
                cell.color = Some(item.color);
            }
        }
    }

    /// Register an active item. Registering twice is a no-op.
    pub fn add_item(&mut self, id: ItemId) {
        if !self.registry.contains(&id) {
            self.registry.push(id);
        }
    }

    pub fn remove_item(&mut self, id: ItemId) -> RemoveOutcome {
        let Some(i) = self.registry.iter().position(|&r| r == id) else {
            return RemoveOutcome::NotRegistered;
        };
        self.registry.remove(i);
        if self.registry.is_empty() {
            RemoveOutcome::LevelComplete
        } else {
            RemoveOutcome::Removed
        }
    }

    pub fn is_registered(&self, id: ItemId) -> bool {
        self.registry.contains(&id)
    }

    pub fn registered(&self) -> &[ItemId] {
        &self.registry
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed64;
    use crate::geometry::WorldPosition;
    use crate::item::{ItemSize, ItemState};

    fn spatial() -> SpatialIndex {
        SpatialIndex::new(4, 3, Fixed64::ONE)
    }

    fn spawn(
        items: &mut SlotMap<ItemId, Item>,
        grid: &mut OccupancyGrid,
        x: i32,
        y: i32,
        size: ItemSize,
        color: u16,
    ) -> ItemId {
        let pos = spatial().grid_to_world(GridPosition::new(x, y));
        let id = items.insert(Item::new(Color(color), size, pos));
        grid.add_item(id);
        id
    }

    #[test]
    fn initialize_allocates_free_cells() {
        let grid = OccupancyGrid::new(4, 3);
        assert_eq!(grid.cells().len(), 12);
        assert_eq!(grid.occupied_count(), 0);
        assert_eq!(grid.cell(GridPosition::new(3, 2)).unwrap().position, GridPosition::new(3, 2));
        assert_eq!(grid.active_count(), 0);
    }

    #[test]
    fn strict_access_rejects_out_of_bounds() {
        let grid = OccupancyGrid::new(4, 3);
        assert_eq!(
            grid.cell(GridPosition::new(4, 0)),
            Err(GridError::OutOfBounds {
                x: 4,
                y: 0,
                width: 4,
                height: 3
            })
        );
        assert!(grid.cell(GridPosition::new(0, -1)).is_err());
    }

    #[test]
    fn peek_returns_free_default() {
        let grid = OccupancyGrid::new(4, 3);
        let cell = grid.peek(GridPosition::new(-5, 9));
        assert!(!cell.occupied);
        assert_eq!(cell.color, None);
        assert_eq!(cell.position, GridPosition::new(-5, 9));
    }

    #[test]
    fn recompute_marks_every_part() {
        let mut items = SlotMap::with_key();
        let mut grid = OccupancyGrid::new(4, 3);
        spawn(&mut items, &mut grid, 1, 0, ItemSize::ThreeByTwo, 2);
        grid.recompute(&items, &spatial());

        for (x, y) in [(1, 0), (2, 0), (0, 0), (1, 1)] {
            let cell = grid.cell(GridPosition::new(x, y)).unwrap();
            assert!(cell.occupied, "({x}, {y})");
            assert_eq!(cell.color, Some(Color(2)));
        }
        assert_eq!(grid.occupied_count(), 4);
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut items = SlotMap::with_key();
        let mut grid = OccupancyGrid::new(4, 3);
        spawn(&mut items, &mut grid, 0, 0, ItemSize::OneByOne, 1);
        spawn(&mut items, &mut grid, 2, 1, ItemSize::TwoByTwo, 3);
        grid.recompute(&items, &spatial());
        let first = grid.cells().to_vec();
        grid.recompute(&items, &spatial());
        assert_eq!(grid.cells(), first.as_slice());
    }

    #[test]
    fn recompute_skips_stale_and_retiring_items() {
        let mut items = SlotMap::with_key();
        let mut grid = OccupancyGrid::new(4, 3);
        let gone = spawn(&mut items, &mut grid, 0, 0, ItemSize::OneByOne, 1);
        let retiring = spawn(&mut items, &mut grid, 3, 2, ItemSize::OneByOne, 1);
        items.remove(gone);
        items[retiring].state = ItemState::Retiring;
        grid.recompute(&items, &spatial());
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn recompute_follows_moved_items() {
        let mut items = SlotMap::with_key();
        let mut grid = OccupancyGrid::new(4, 3);
        let id = spawn(&mut items, &mut grid, 0, 0, ItemSize::OneByOne, 1);
        grid.recompute(&items, &spatial());
        items[id].position = WorldPosition::from_f64(2.0, 0.0, 1.0);
        grid.recompute(&items, &spatial());
        assert!(!grid.is_occupied(GridPosition::new(0, 0)));
        assert!(grid.is_occupied(GridPosition::new(2, 1)));
    }

    #[test]
    fn removing_last_item_completes_level() {
        let mut items = SlotMap::with_key();
        let mut grid = OccupancyGrid::new(4, 3);
        let a = spawn(&mut items, &mut grid, 0, 0, ItemSize::OneByOne, 1);
        let b = spawn(&mut items, &mut grid, 1, 0, ItemSize::OneByOne, 1);
        grid.add_item(a);
        assert_eq!(grid.active_count(), 2);

        assert_eq!(grid.remove_item(a), RemoveOutcome::Removed);
        assert_eq!(grid.remove_item(a), RemoveOutcome::NotRegistered);
        assert_eq!(grid.remove_item(b), RemoveOutcome::LevelComplete);
        assert_eq!(grid.active_count(), 0);
    }
}
