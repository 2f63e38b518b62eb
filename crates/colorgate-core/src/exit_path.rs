//! Exit path checks: can an item leave in a given direction without another
//! item standing in the way?
//!
//! Each part casts an unbounded ray against triggers and items. The first
//! thing it meets decides that part's lane.

use crate::collision::{ColliderOwner, CollisionWorld, LayerMask};
use crate::fixed::Fixed64;
use crate::geometry::{Direction, WorldPosition};
use crate::id::ItemId;
use crate::item::Item;
use crate::spatial::SpatialIndex;

/// Outcome of an exit path check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Clear,
    /// The first blocking item found, in part order.
    Blocked(ItemId),
}

impl PathStatus {
    pub fn is_clear(&self) -> bool {
        matches!(self, PathStatus::Clear)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExitPathChecker;

impl ExitPathChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check the path from the item toward `target`, snapped to the dominant
    /// planar axis (ties pick Z).
    pub fn towards(
        &self,
        world: &CollisionWorld,
        item_id: ItemId,
        item: &Item,
        spatial: &SpatialIndex,
        target: WorldPosition,
    ) -> PathStatus {
        let delta = (target - item.position).with_y(Fixed64::ZERO);
        self.along(world, item_id, item, spatial, Direction::dominant(delta))
    }

    /// Check the path along an explicit direction.
    pub fn along(
        &self,
        world: &CollisionWorld,
        item_id: ItemId,
        item: &Item,
        spatial: &SpatialIndex,
        direction: Direction,
    ) -> PathStatus {
        for origin in item.part_positions(spatial) {
            if let PathStatus::Blocked(by) = Self::classify(world, item_id, origin, direction) {
                return PathStatus::Blocked(by);
            }
        }
        PathStatus::Clear
    }

    fn classify(
        world: &CollisionWorld,
        item_id: ItemId,
        origin: WorldPosition,
        direction: Direction,
    ) -> PathStatus {
        let mask = LayerMask::TRIGGER | LayerMask::ITEM;
        match world.raycast(origin, direction, None, mask, None) {
            Some(hit) => match hit.owner {
                ColliderOwner::ItemPart { item, .. } if item != item_id => {
                    PathStatus::Blocked(item)
                }
                _ => PathStatus::Clear,
            },
            None => PathStatus::Clear,
        }
    }
}
