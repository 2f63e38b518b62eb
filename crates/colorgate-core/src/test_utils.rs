//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::board::Board;
use crate::config::BoardConfig;
use crate::fixed::Fixed64;
use crate::geometry::{GridPosition, Ray};
use crate::id::{Color, ItemId, TriggerId};
use crate::item::ItemSize;
use crate::level::{LevelData, TriggerPlacement};
use crate::trigger::TriggerKind;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Colors
// ===========================================================================

pub fn red() -> Color {
    Color(0)
}
pub fn blue() -> Color {
    Color(1)
}
pub fn green() -> Color {
    Color(2)
}

// ===========================================================================
// Input
// ===========================================================================

/// A pointer ray straight down onto plane point `(x, z)`.
pub fn ray_at(x: f64, z: f64) -> Ray {
    Ray::straight_down(fixed(x), fixed(z))
}

/// One second: with the default move speed an item reaches its target in
/// a single step.
pub fn full_step() -> Fixed64 {
    Fixed64::ONE
}

// ===========================================================================
// Level builders
// ===========================================================================

/// Small fluent builder over [`LevelData`] for tests. Panics on invalid
/// placements.
pub struct LevelBuilder {
    level: LevelData,
}

impl LevelBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            level: LevelData::new(width, height).expect("non-zero dimensions"),
        }
    }

    pub fn item(mut self, x: i32, y: i32, size: ItemSize, color: Color) -> Self {
        self.level
            .paint_item(GridPosition::new(x, y), size, color)
            .expect("item fits");
        self
    }

    pub fn trigger(self, x: i32, y: i32, kind: TriggerKind, color: Color) -> Self {
        self.placement(TriggerPlacement::new(GridPosition::new(x, y), kind, color))
    }

    pub fn placement(mut self, placement: TriggerPlacement) -> Self {
        self.level.place_trigger(placement).expect("valid trigger");
        self
    }

    pub fn build(self) -> LevelData {
        self.level
    }

    pub fn board(self) -> Board {
        Board::load(&self.level, BoardConfig::default()).expect("board loads")
    }
}

// ===========================================================================
// Board lookups
// ===========================================================================

/// The active item whose anchor sits on `(x, y)`.
pub fn item_at(board: &Board, x: i32, y: i32) -> ItemId {
    let pos = GridPosition::new(x, y);
    board
        .items()
        .find(|(_, item)| item.is_active() && item.anchor_cell(board.spatial()) == pos)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("no item anchored at ({x}, {y})"))
}

/// The trigger covering `(x, y)`.
pub fn trigger_at(board: &Board, x: i32, y: i32) -> TriggerId {
    board
        .trigger_at(GridPosition::new(x, y))
        .unwrap_or_else(|| panic!("no trigger at ({x}, {y})"))
}

/// Drag `item` from its current position along the straight pointer path
/// `(x, z)` pairs, one full step each, then release.
pub fn drag_through(board: &mut Board, item: ItemId, path: &[(f64, f64)]) {
    let start = board.item(item).expect("item exists").position;
    board
        .begin_drag(item, Ray::straight_down(start.x, start.z))
        .expect("drag starts");
    for &(x, z) in path {
        board
            .continue_drag(ray_at(x, z), full_step())
            .expect("drag continues");
    }
    board.end_drag();
}
