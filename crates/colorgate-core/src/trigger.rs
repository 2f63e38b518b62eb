//! Exit triggers and per-trigger containment tracking.
//!
//! A trigger covers one to three cells, usually on the border ring. Items
//! are counted part by part as they overlap the trigger volume; an item is
//! eligible to leave only once every one of its parts is inside.

use crate::fixed::Fixed64;
use crate::geometry::{Direction, GridOffset, GridPosition, Rect};
use crate::id::{Color, ItemId};
use crate::item::{Item, ItemSize};
use crate::spatial::SpatialIndex;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use tracing::warn;

// ---------------------------------------------------------------------------
// Trigger kinds
// ---------------------------------------------------------------------------

/// How many border cells a trigger spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    One,
    Two,
    Three,
}

const SINGLE: [GridOffset; 1] = [GridOffset::new(0, 0)];
const COLUMN_TWO: [GridOffset; 2] = [GridOffset::new(0, 0), GridOffset::new(0, 1)];
const COLUMN_THREE: [GridOffset; 3] = [
    GridOffset::new(0, -1),
    GridOffset::new(0, 0),
    GridOffset::new(0, 1),
];
const ROW_TWO: [GridOffset; 2] = [GridOffset::new(0, 0), GridOffset::new(1, 0)];
const ROW_THREE: [GridOffset; 3] = [
    GridOffset::new(-1, 0),
    GridOffset::new(0, 0),
    GridOffset::new(1, 0),
];

impl TriggerKind {
    pub fn cell_count(&self) -> usize {
        match self {
            TriggerKind::One => 1,
            TriggerKind::Two => 2,
            TriggerKind::Three => 3,
        }
    }

    /// Largest item size accepted when a placement does not say otherwise.
    pub fn default_max_size(&self) -> ItemSize {
        match self {
            TriggerKind::One => ItemSize::OneByOne,
            TriggerKind::Two => ItemSize::TwoByTwo,
            TriggerKind::Three => ItemSize::ThreeByTwo,
        }
    }

    /// Cell offsets from the anchor. Triggers on a column border (left or
    /// right of the grid) extend along y, all others along x.
    pub fn offsets(&self, along_column: bool) -> &'static [GridOffset] {
        match (self, along_column) {
            (TriggerKind::One, _) => &SINGLE,
            (TriggerKind::Two, true) => &COLUMN_TWO,
            (TriggerKind::Three, true) => &COLUMN_THREE,
            (TriggerKind::Two, false) => &ROW_TWO,
            (TriggerKind::Three, false) => &ROW_THREE,
        }
    }

    /// Cells covered by a trigger of this kind anchored at `anchor` on a
    /// grid `width` cells wide.
    pub fn cells(&self, anchor: GridPosition, width: u32) -> Vec<GridPosition> {
        let along_column = anchor.x < 0 || anchor.x >= width as i32;
        self.offsets(along_column)
            .iter()
            .map(|&o| anchor.offset(o))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Containment tracking
// ---------------------------------------------------------------------------

/// How much of an item a trigger currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Containment {
    #[default]
    NotTracked,
    /// Some but not all parts are inside.
    Partial(usize),
    Full,
}

/// Result of a containment signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainmentUpdate {
    pub before: Containment,
    pub after: Containment,
    /// Whether the trigger should re-evaluate its tracked items.
    pub reevaluate: bool,
}

impl ContainmentUpdate {
    fn unchanged(state: Containment) -> Self {
        Self {
            before: state,
            after: state,
            reevaluate: false,
        }
    }

    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tracked {
    count: usize,
    parts: usize,
}

/// Per-trigger part counters plus a whole-item presence set.
#[derive(Debug, Clone, Default)]
pub struct ContainmentTracker {
    counts: SecondaryMap<ItemId, Tracked>,
    present: SecondaryMap<ItemId, ()>,
}

impl ContainmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, item: ItemId) -> Containment {
        match self.counts.get(item) {
            Some(t) if t.count >= t.parts => Containment::Full,
            Some(t) => Containment::Partial(t.count),
            None => Containment::NotTracked,
        }
    }

    /// Parts of `item` currently inside (zero when untracked).
    pub fn count(&self, item: ItemId) -> usize {
        self.counts.get(item).map(|t| t.count).unwrap_or(0)
    }

    pub fn is_present(&self, item: ItemId) -> bool {
        self.present.contains_key(item)
    }

    /// Items with at least one part inside.
    pub fn tracked(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.counts.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.present.is_empty()
    }

    /// One part of a `parts`-part item entered. Reaching the total requests
    /// a re-evaluation.
    pub fn part_entered(&mut self, item: ItemId, parts: usize) -> ContainmentUpdate {
        let before = self.state(item);
        match self.counts.get_mut(item) {
            Some(t) if t.count >= t.parts => {
                warn!(?item, parts = t.parts, "part entered past item total; ignored");
                return ContainmentUpdate::unchanged(before);
            }
            Some(t) => t.count += 1,
            None => {
                self.counts.insert(item, Tracked { count: 1, parts });
            }
        }
        let after = self.state(item);
        ContainmentUpdate {
            before,
            after,
            reevaluate: after == Containment::Full,
        }
    }

    /// One part left. Any decrement requests a re-evaluation; the entry is
    /// dropped when its count reaches zero.
    pub fn part_exited(&mut self, item: ItemId) -> ContainmentUpdate {
        let before = self.state(item);
        let Some(t) = self.counts.get_mut(item) else {
            warn!(?item, "part exited for untracked item; ignored");
            return ContainmentUpdate::unchanged(before);
        };
        t.count = t.count.saturating_sub(1);
        if t.count == 0 {
            self.counts.remove(item);
        }
        ContainmentUpdate {
            before,
            after: self.state(item),
            reevaluate: true,
        }
    }

    /// Whole-item presence began. Only the transition requests a
    /// re-evaluation.
    pub fn item_entered(&mut self, item: ItemId) -> ContainmentUpdate {
        let state = self.state(item);
        let inserted = self.present.insert(item, ()).is_none();
        ContainmentUpdate {
            reevaluate: inserted,
            ..ContainmentUpdate::unchanged(state)
        }
    }

    pub fn item_exited(&mut self, item: ItemId) -> ContainmentUpdate {
        let state = self.state(item);
        let removed = self.present.remove(item).is_some();
        ContainmentUpdate {
            reevaluate: removed,
            ..ContainmentUpdate::unchanged(state)
        }
    }

    /// Drop every record of `item`.
    pub fn forget(&mut self, item: ItemId) {
        self.counts.remove(item);
        self.present.remove(item);
    }
}

// ---------------------------------------------------------------------------
// TriggerZone
// ---------------------------------------------------------------------------

/// A color-keyed exit volume.
#[derive(Debug, Clone)]
pub struct TriggerZone {
    pub color: Color,
    pub max_size: ItemSize,
    /// Direction an item leaves in; its exit path is checked along it.
    pub exit: Direction,
    pub kind: TriggerKind,
    pub anchor: GridPosition,
    pub cells: Vec<GridPosition>,
    pub bounds: Rect,
    tracker: ContainmentTracker,
}

impl TriggerZone {
    pub fn new(
        anchor: GridPosition,
        kind: TriggerKind,
        color: Color,
        max_size: ItemSize,
        exit: Direction,
        spatial: &SpatialIndex,
    ) -> Self {
        let cells = kind.cells(anchor, spatial.width());
        let half = spatial.spacing() / 2;
        let bounds = cells
            .iter()
            .map(|&c| {
                let w = spatial.grid_to_world(c);
                Rect::centered(w.x, w.z, half, half)
            })
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| Rect::centered(Fixed64::ZERO, Fixed64::ZERO, half, half));
        Self {
            color,
            max_size,
            exit,
            kind,
            anchor,
            cells,
            bounds,
            tracker: ContainmentTracker::new(),
        }
    }

    pub fn covers(&self, pos: GridPosition) -> bool {
        self.cells.contains(&pos)
    }

    /// Color match and size fit.
    pub fn accepts(&self, item: &Item) -> bool {
        item.color == self.color && item.size.ordinal() <= self.max_size.ordinal()
    }

    pub fn tracker(&self) -> &ContainmentTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ContainmentTracker {
        &mut self.tracker
    }
}
