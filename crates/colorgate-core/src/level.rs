//! Level description consumed once when a board is loaded: painted item
//! cells and trigger placements.

use crate::geometry::{Direction, GridPosition};
use crate::grid::GridError;
use crate::id::Color;
use crate::item::ItemSize;
use crate::trigger::TriggerKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Errors from building or validating level data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },
    #[error("expected {expected} cells, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
    #[error("trigger at ({x}, {y}) has no color")]
    MissingTriggerColor { x: i32, y: i32 },
    #[error("trigger cell ({x}, {y}) lies outside the border ring")]
    TriggerOutsideRing { x: i32, y: i32 },
    #[error("trigger at ({x}, {y}) is off the border and needs an explicit exit")]
    MissingExit { x: i32, y: i32 },
    #[error("trigger cell ({x}, {y}) overlaps another trigger")]
    TriggerOverlap { x: i32, y: i32 },
    #[error("cell ({x}, {y}) is already occupied")]
    CellOccupied { x: i32, y: i32 },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Authoring data for one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellData {
    pub occupied: bool,
    pub color: Option<Color>,
    pub size: Option<ItemSize>,
    /// Anchor cell of the item covering this cell.
    pub anchor: GridPosition,
}

/// An exit trigger as authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPlacement {
    pub position: GridPosition,
    pub kind: TriggerKind,
    pub color: Option<Color>,
    /// Defaults to the kind's size limit.
    pub max_size: Option<ItemSize>,
    /// Defaults to the ring side the trigger sits on.
    pub exit: Option<Direction>,
}

impl TriggerPlacement {
    pub fn new(position: GridPosition, kind: TriggerKind, color: Color) -> Self {
        Self {
            position,
            kind,
            color: Some(color),
            max_size: None,
            exit: None,
        }
    }

    pub fn with_max_size(mut self, size: ItemSize) -> Self {
        self.max_size = Some(size);
        self
    }

    pub fn with_exit(mut self, exit: Direction) -> Self {
        self.exit = Some(exit);
        self
    }

    pub fn max_size(&self) -> ItemSize {
        self.max_size.unwrap_or_else(|| self.kind.default_max_size())
    }
}

/// Exit direction implied by a ring position: the side of the grid the
/// cell sits on. Corners resolve to the column side.
pub fn ring_exit(pos: GridPosition, width: u32, height: u32) -> Option<Direction> {
    if pos.x == -1 {
        Some(Direction::West)
    } else if pos.x == width as i32 {
        Some(Direction::East)
    } else if pos.y == -1 {
        Some(Direction::South)
    } else if pos.y == height as i32 {
        Some(Direction::North)
    } else {
        None
    }
}

/// An item footprint found in the cell data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemAnchor {
    pub anchor: GridPosition,
    pub size: ItemSize,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelData {
    pub width: u32,
    pub height: u32,
    /// Row-major: index `y * width + x`.
    pub cells: Vec<CellData>,
    pub triggers: BTreeMap<GridPosition, TriggerPlacement>,
}

impl LevelData {
    pub fn new(width: u32, height: u32) -> Result<Self, LevelError> {
        if width == 0 || height == 0 {
            return Err(LevelError::ZeroDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![CellData::default(); width as usize * height as usize],
            triggers: BTreeMap::new(),
        })
    }

    /// Check dimensions and cell storage, e.g. after deserializing.
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.width == 0 || self.height == 0 {
            return Err(LevelError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize;
        if self.cells.len() != expected {
            return Err(LevelError::CellCountMismatch {
                expected,
                actual: self.cells.len(),
            });
        }
        Ok(())
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

    pub fn contains(&self, pos: GridPosition) -> bool {
        self.index(pos).is_some()
    }

    /// Strict cell access.
    pub fn cell(&self, pos: GridPosition) -> Result<&CellData, GridError> {
        self.index(pos)
            .and_then(|i| self.cells.get(i))
            .ok_or_else(|| self.out_of_bounds(pos))
    }

    /// Lenient cell access: out-of-range positions read as empty cells.
    pub fn peek(&self, pos: GridPosition) -> CellData {
        self.index(pos)
            .and_then(|i| self.cells.get(i))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_cell(&mut self, pos: GridPosition, data: CellData) -> Result<(), GridError> {
        let err = self.out_of_bounds(pos);
        let slot = self
            .index(pos)
            .and_then(|i| self.cells.get_mut(i))
            .ok_or(err)?;
        *slot = data;
        Ok(())
    }

    /// Paint an item footprint. Every cell must be in bounds and free;
    /// nothing is written otherwise.
    pub fn paint_item(
        &mut self,
        anchor: GridPosition,
        size: ItemSize,
        color: Color,
    ) -> Result<(), LevelError> {
        for pos in size.cells(anchor) {
            if self.cell(pos)?.occupied {
                return Err(LevelError::CellOccupied { x: pos.x, y: pos.y });
            }
        }
        for pos in size.cells(anchor) {
            self.set_cell(
                pos,
                CellData {
                    occupied: true,
                    color: Some(color),
                    size: Some(size),
                    anchor,
                },
            )?;
        }
        Ok(())
    }

    fn in_ring_extent(&self, pos: GridPosition) -> bool {
        pos.x >= -1 && pos.y >= -1 && pos.x <= self.width as i32 && pos.y <= self.height as i32
    }

    fn is_ring(&self, pos: GridPosition) -> bool {
        self.in_ring_extent(pos) && !self.contains(pos)
    }

    /// Cells covered by every placed trigger.
    pub fn trigger_cells(&self) -> impl Iterator<Item = GridPosition> + '_ {
        self.triggers
            .values()
            .flat_map(|t| t.kind.cells(t.position, self.width))
    }

    /// Add a trigger. Rejected placements leave the level unchanged.
    pub fn place_trigger(&mut self, placement: TriggerPlacement) -> Result<(), LevelError> {
        let pos = placement.position;
        if placement.color.is_none() {
            return Err(LevelError::MissingTriggerColor { x: pos.x, y: pos.y });
        }
        let cells = placement.kind.cells(pos, self.width);
        if let Some(c) = cells.iter().find(|c| !self.in_ring_extent(**c)) {
            return Err(LevelError::TriggerOutsideRing { x: c.x, y: c.y });
        }
        if placement.exit.is_none() && !self.is_ring(pos) {
            return Err(LevelError::MissingExit { x: pos.x, y: pos.y });
        }
        let taken: Vec<GridPosition> = self.trigger_cells().collect();
        if let Some(c) = cells.iter().find(|c| taken.contains(c)) {
            return Err(LevelError::TriggerOverlap { x: c.x, y: c.y });
        }
        self.triggers.insert(pos, placement);
        Ok(())
    }

    /// Trigger anchored exactly at `pos`.
    pub fn trigger_at(&self, pos: GridPosition) -> Option<&TriggerPlacement> {
        self.triggers.get(&pos)
    }

    /// The configured exit, or the one implied by the ring side.
    pub fn exit_for(&self, placement: &TriggerPlacement) -> Option<Direction> {
        placement
            .exit
            .or_else(|| ring_exit(placement.position, self.width, self.height))
    }

    /// Every well-formed item footprint, in row-major anchor order.
    ///
    /// A footprint is well formed when each of its cells is occupied with the
    /// anchor's color and points back at the anchor. Malformed footprints are
    /// logged and skipped.
    pub fn item_anchors(&self) -> Vec<ItemAnchor> {
        let mut anchors = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = GridPosition::new(x, y);
                let cell = self.peek(pos);
                if !cell.occupied || cell.anchor != pos {
                    continue;
                }
                let (Some(color), Some(size)) = (cell.color, cell.size) else {
                    warn!(x, y, "anchor cell without color or size; skipped");
                    continue;
                };
                let intact = size.cells(pos).all(|p| {
                    let c = self.peek(p);
                    self.contains(p) && c.occupied && c.color == Some(color) && c.anchor == pos
                });
                if !intact {
                    warn!(x, y, ?size, "malformed item footprint; skipped");
                    continue;
                }
                anchors.push(ItemAnchor {
                    anchor: pos,
                    size,
                    color,
                });
            }
        }
        anchors
    }
}
