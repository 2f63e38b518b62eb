//! Items: multi-cell colored blocks built from rigid unit-cell parts.

use crate::geometry::{GridOffset, GridPosition, WorldPosition};
use crate::id::Color;
use crate::spatial::SpatialIndex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Size classes
// ---------------------------------------------------------------------------

const ONE_BY_ONE: [GridOffset; 1] = [GridOffset::new(0, 0)];

const TWO_BY_TWO: [GridOffset; 3] = [
    GridOffset::new(0, 0),
    GridOffset::new(-1, 0),
    GridOffset::new(0, 1),
];

const THREE_BY_TWO: [GridOffset; 4] = [
    GridOffset::new(0, 0),
    GridOffset::new(1, 0),
    GridOffset::new(-1, 0),
    GridOffset::new(0, 1),
];

const THREE_BY_THREE: [GridOffset; 5] = [
    GridOffset::new(0, 0),
    GridOffset::new(1, 0),
    GridOffset::new(-1, 0),
    GridOffset::new(0, 1),
    GridOffset::new(0, -1),
];

/// Size class of an item. Each class has a fixed part pattern relative to
/// the anchor cell; the ordinal orders classes for trigger size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemSize {
    /// Single cell.
    OneByOne,
    /// Anchor, left, up.
    TwoByTwo,
    /// Anchor, right, left, up.
    ThreeByTwo,
    /// Plus shape: anchor, right, left, up, down.
    ThreeByThree,
}

impl ItemSize {
    pub fn all() -> [ItemSize; 4] {
        [
            ItemSize::OneByOne,
            ItemSize::TwoByTwo,
            ItemSize::ThreeByTwo,
            ItemSize::ThreeByThree,
        ]
    }

    /// Part offsets relative to the anchor cell. The anchor is always first.
    pub fn offsets(&self) -> &'static [GridOffset] {
        match self {
            ItemSize::OneByOne => &ONE_BY_ONE,
            ItemSize::TwoByTwo => &TWO_BY_TWO,
            ItemSize::ThreeByTwo => &THREE_BY_TWO,
            ItemSize::ThreeByThree => &THREE_BY_THREE,
        }
    }

    pub fn part_count(&self) -> usize {
        self.offsets().len()
    }

    /// 1-based ordinal used for "fits through this trigger" comparisons.
    pub fn ordinal(&self) -> u8 {
        match self {
            ItemSize::OneByOne => 1,
            ItemSize::TwoByTwo => 2,
            ItemSize::ThreeByTwo => 3,
            ItemSize::ThreeByThree => 4,
        }
    }

    /// Cells covered when anchored at `anchor`.
    pub fn cells(&self, anchor: GridPosition) -> impl Iterator<Item = GridPosition> + '_ {
        self.offsets().iter().map(move |&o| anchor.offset(o))
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// One rigid unit-cell component of an item. Its local offset is fixed at
/// spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPart {
    pub offset: GridOffset,
}

/// Lifecycle state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemState {
    /// On the board: collides, occupies cells, can be dragged.
    #[default]
    Active,
    /// Left through a trigger. Colliders are disabled and the item no longer
    /// occupies cells; it stays readable until despawned.
    Retiring,
}

/// A draggable block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub color: Color,
    pub size: ItemSize,
    pub parts: Vec<ItemPart>,
    /// World position of the anchor part.
    pub position: WorldPosition,
    pub selectable: bool,
    pub state: ItemState,
}

impl Item {
    /// Create an active item whose parts follow the size class pattern.
    pub fn new(color: Color, size: ItemSize, position: WorldPosition) -> Self {
        Self {
            color,
            size,
            parts: size
                .offsets()
                .iter()
                .map(|&offset| ItemPart { offset })
                .collect(),
            position,
            selectable: true,
            state: ItemState::Active,
        }
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn is_active(&self) -> bool {
        self.state == ItemState::Active
    }

    /// Whether the item's colliders take part in probes and overlap tests.
    pub fn colliders_enabled(&self) -> bool {
        self.is_active()
    }

    /// World position of a part at the item's current position.
    pub fn part_position(&self, part: &ItemPart, spatial: &SpatialIndex) -> WorldPosition {
        self.position + spatial.offset_to_world(part.offset)
    }

    /// World positions of every part, in part order.
    pub fn part_positions<'a>(
        &'a self,
        spatial: &'a SpatialIndex,
    ) -> impl Iterator<Item = WorldPosition> + 'a {
        self.parts.iter().map(move |p| self.part_position(p, spatial))
    }

    /// Grid cells under every part (clamped into the grid).
    pub fn occupied_cells<'a>(
        &'a self,
        spatial: &'a SpatialIndex,
    ) -> impl Iterator<Item = GridPosition> + 'a {
        self.part_positions(spatial).map(|w| spatial.world_to_grid(w))
    }

    /// Grid cell of the anchor part (clamped).
    pub fn anchor_cell(&self, spatial: &SpatialIndex) -> GridPosition {
        spatial.world_to_grid(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed64;

    #[test]
    fn size_part_counts() {
        assert_eq!(ItemSize::OneByOne.part_count(), 1);
        assert_eq!(ItemSize::TwoByTwo.part_count(), 3);
        assert_eq!(ItemSize::ThreeByTwo.part_count(), 4);
        assert_eq!(ItemSize::ThreeByThree.part_count(), 5);
    }

    #[test]
    fn anchor_is_first_offset() {
        for size in ItemSize::all() {
            assert_eq!(size.offsets()[0], GridOffset::new(0, 0));
        }
    }

    #[test]
    fn ordinals_follow_declaration_order() {
        let ordinals: Vec<u8> = ItemSize::all().iter().map(|s| s.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4]);
        assert!(ItemSize::TwoByTwo < ItemSize::ThreeByThree);
    }

    #[test]
    fn cells_of_plus_shape() {
        let cells: Vec<_> = ItemSize::ThreeByThree
            .cells(GridPosition::new(2, 2))
            .collect();
        assert_eq!(cells.len(), 5);
        for expected in [(2, 2), (3, 2), (1, 2), (2, 3), (2, 1)] {
            assert!(cells.contains(&GridPosition::new(expected.0, expected.1)));
        }
    }

    #[test]
    fn part_positions_follow_the_anchor() {
        let spatial = SpatialIndex::new(6, 6, Fixed64::from_num(2));
        let item = Item::new(
            Color(1),
            ItemSize::TwoByTwo,
            WorldPosition::from_f64(4.0, 0.25, 2.0),
        );
        let parts: Vec<_> = item.part_positions(&spatial).collect();
        assert_eq!(parts[0], WorldPosition::from_f64(4.0, 0.25, 2.0));
        assert_eq!(parts[1], WorldPosition::from_f64(2.0, 0.25, 2.0));
        assert_eq!(parts[2], WorldPosition::from_f64(4.0, 0.25, 4.0));

        let cells: Vec<_> = item.occupied_cells(&spatial).collect();
        assert_eq!(
            cells,
            vec![
                GridPosition::new(2, 1),
                GridPosition::new(1, 1),
                GridPosition::new(2, 2)
            ]
        );
    }

    #[test]
    fn retiring_items_have_no_colliders() {
        let mut item = Item::new(Color(0), ItemSize::OneByOne, WorldPosition::ZERO);
        assert!(item.colliders_enabled());
        item.state = ItemState::Retiring;
        assert!(!item.colliders_enabled());
    }
}
