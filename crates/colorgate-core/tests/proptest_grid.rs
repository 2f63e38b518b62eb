//! Property-based tests for grid mapping, occupancy, and containment
//! counting.
//!
//! Uses proptest to generate random grids, item layouts, and part
//! enter/exit sequences, then verify the structural invariants hold.

use colorgate_core::fixed::Fixed64;
use colorgate_core::geometry::{GridPosition, WorldPosition};
use colorgate_core::grid::OccupancyGrid;
use colorgate_core::id::{Color, ItemId};
use colorgate_core::item::{Item, ItemSize, ItemState};
use colorgate_core::spatial::SpatialIndex;
use colorgate_core::test_utils::*;
use colorgate_core::trigger::{Containment, ContainmentTracker};
use proptest::prelude::*;
use slotmap::SlotMap;
use std::collections::BTreeSet;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_spacing() -> impl Strategy<Value = Fixed64> {
    prop_oneof![Just(0.5), Just(1.0), Just(1.5), Just(2.0), Just(2.25)].prop_map(fixed)
}

/// Any representable coordinate, weighted toward the extremes and the
/// neighbourhood of the grid.
fn arb_coordinate() -> impl Strategy<Value = Fixed64> {
    prop_oneof![
        any::<i64>().prop_map(Fixed64::from_bits),
        Just(Fixed64::MAX),
        Just(Fixed64::MIN),
        (-1000.0..1000.0f64).prop_map(fixed),
    ]
}

fn arb_size() -> impl Strategy<Value = ItemSize> {
    prop_oneof![
        Just(ItemSize::OneByOne),
        Just(ItemSize::TwoByTwo),
        Just(ItemSize::ThreeByTwo),
        Just(ItemSize::ThreeByThree),
    ]
}

/// A grid with a cell inside it.
fn arb_grid_and_cell() -> impl Strategy<Value = (u32, u32, i32, i32)> {
    (1..16u32, 1..16u32).prop_flat_map(|(w, h)| (Just(w), Just(h), 0..w as i32, 0..h as i32))
}

/// Items as (anchor x, anchor y, size, retiring) on a 6x6 board. Anchors may
/// fall off the grid; they are clamped so the footprint fits.
fn arb_layout() -> impl Strategy<Value = Vec<(i32, i32, ItemSize, bool)>> {
    proptest::collection::vec((-2..8i32, -2..8i32, arb_size(), any::<bool>()), 0..12)
}

#[derive(Debug, Clone, Copy)]
enum PartOp {
    Enter,
    Exit,
}

fn arb_part_ops() -> impl Strategy<Value = Vec<PartOp>> {
    proptest::collection::vec(
        prop_oneof![Just(PartOp::Enter), Just(PartOp::Exit)],
        0..40,
    )
}

fn build_items(
    layout: &[(i32, i32, ItemSize, bool)],
    spatial: &SpatialIndex,
) -> (SlotMap<ItemId, Item>, OccupancyGrid) {
    let mut items = SlotMap::with_key();
    let mut grid = OccupancyGrid::new(spatial.width(), spatial.height());
    for (i, &(x, y, size, retiring)) in layout.iter().enumerate() {
        let anchor = spatial.clamp_footprint(GridPosition::new(x, y), size.offsets());
        let mut item = Item::new(Color(i as u16 % 3), size, spatial.grid_to_world(anchor));
        if retiring {
            item.state = ItemState::Retiring;
        }
        let id = items.insert(item);
        grid.add_item(id);
    }
    (items, grid)
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// world_to_grid(grid_to_world(p)) == p for every in-bounds cell.
    #[test]
    fn grid_world_round_trip(
        (w, h, x, y) in arb_grid_and_cell(),
        spacing in arb_spacing(),
    ) {
        let spatial = SpatialIndex::new(w, h, spacing);
        let pos = GridPosition::new(x, y);
        prop_assert_eq!(spatial.world_to_grid(spatial.grid_to_world(pos)), pos);
    }

    /// Any world position maps to a cell inside the grid.
    #[test]
    fn world_to_grid_always_in_bounds(
        w in 1..16u32,
        h in 1..16u32,
        x in arb_coordinate(),
        z in arb_coordinate(),
        spacing in arb_spacing(),
    ) {
        let spatial = SpatialIndex::new(w, h, spacing);
        let cell = spatial.world_to_grid(WorldPosition::new(x, Fixed64::ZERO, z));
        prop_assert!(spatial.contains(cell), "{cell:?} outside {w}x{h}");
    }

    /// A clamped footprint fits whenever the grid is big enough for it.
    #[test]
    fn clamped_footprint_fits(
        w in 3..12u32,
        h in 3..12u32,
        x in -10..20i32,
        y in -10..20i32,
        size in arb_size(),
    ) {
        let spatial = SpatialIndex::new(w, h, Fixed64::ONE);
        let anchor = spatial.clamp_footprint(GridPosition::new(x, y), size.offsets());
        for cell in size.cells(anchor) {
            prop_assert!(spatial.contains(cell), "{cell:?} outside {w}x{h}");
        }
        // Already-fitting anchors are left alone.
        prop_assert_eq!(spatial.clamp_footprint(anchor, size.offsets()), anchor);
    }

    /// Occupied cells are exactly the union of active items' cells, and a
    /// second recompute changes nothing.
    #[test]
    fn recompute_matches_active_union(layout in arb_layout()) {
        let spatial = SpatialIndex::new(6, 6, Fixed64::ONE);
        let (items, mut grid) = build_items(&layout, &spatial);

        grid.recompute(&items, &spatial);
        let expected: BTreeSet<GridPosition> = items
            .values()
            .filter(|item| item.is_active())
            .flat_map(|item| item.occupied_cells(&spatial).collect::<Vec<_>>())
            .collect();
        let occupied: BTreeSet<GridPosition> = grid
            .cells()
            .iter()
            .filter(|c| c.occupied)
            .map(|c| c.position)
            .collect();
        prop_assert_eq!(&occupied, &expected);

        let before = grid.cells().to_vec();
        grid.recompute(&items, &spatial);
        prop_assert_eq!(grid.cells(), &before[..]);
    }

    /// The tracker agrees with a saturating counter model: entries past the
    /// part total are ignored, exits never go below zero, and the state is
    /// derived from the count.
    #[test]
    fn tracker_matches_counter_model(parts in 1..=4usize, ops in arb_part_ops()) {
        let mut keys: SlotMap<ItemId, ()> = SlotMap::with_key();
        let item = keys.insert(());
        let mut tracker = ContainmentTracker::new();
        let mut count = 0usize;

        for op in ops {
            let update = match op {
                PartOp::Enter => {
                    let update = tracker.part_entered(item, parts);
                    let ignored = count == parts;
                    if !ignored {
                        count += 1;
                    }
                    prop_assert_eq!(update.reevaluate, !ignored && count == parts);
                    update
                }
                PartOp::Exit => {
                    let update = tracker.part_exited(item);
                    let tracked = count > 0;
                    count = count.saturating_sub(1);
                    prop_assert_eq!(update.reevaluate, tracked);
                    update
                }
            };

            let expected = match count {
                0 => Containment::NotTracked,
                c if c == parts => Containment::Full,
                c => Containment::Partial(c),
            };
            prop_assert_eq!(update.after, expected);
            prop_assert_eq!(tracker.state(item), expected);
            prop_assert_eq!(tracker.count(item), count);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// However an item is dragged around an empty board, release leaves it
    /// on a cell with its whole footprint inside the grid.
    #[test]
    fn release_lands_inside_grid(
        size in arb_size(),
        path in proptest::collection::vec((-3.0..8.0f64, -3.0..8.0f64), 1..8),
    ) {
        let mut board = LevelBuilder::new(5, 5).item(2, 2, size, red()).board();
        let item = item_at(&board, 2, 2);

        drag_through(&mut board, item, &path);

        let spatial = *board.spatial();
        let dragged = board.item(item).expect("item remains");
        let anchor = dragged.anchor_cell(&spatial);
        prop_assert_eq!(spatial.grid_to_world(anchor).with_y(dragged.position.y), dragged.position);
        for cell in size.cells(anchor) {
            prop_assert!(spatial.contains(cell));
            prop_assert!(board.occupancy().is_occupied(cell));
        }
        prop_assert_eq!(board.occupancy().occupied_count(), size.part_count());
    }
}
