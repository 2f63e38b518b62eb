//! Axis-aligned collision world: obstacle, item-part, and trigger colliders
//! on three layers, with planar ray casts and strict-overlap queries.
//!
//! The world is a flat snapshot. The board rebuilds it from its registries
//! whenever it needs to probe, so it never holds stale item positions.

use crate::fixed::Fixed64;
use crate::geometry::{Direction, Rect, WorldPosition};
use crate::id::{ItemId, TriggerId};
use std::ops::BitOr;

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// Bit set of collision layers a query is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    /// Static border walls.
    pub const OBSTACLE: LayerMask = LayerMask(1);
    /// Item part colliders.
    pub const ITEM: LayerMask = LayerMask(1 << 1);
    /// Exit trigger volumes.
    pub const TRIGGER: LayerMask = LayerMask(1 << 2);
    pub const ALL: LayerMask = LayerMask(0b111);

    /// True if every layer in `other` is also in `self`.
    pub fn contains(self, other: LayerMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;
    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Colliders
// ---------------------------------------------------------------------------

/// What a collider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderOwner {
    Obstacle,
    /// Part `part` (index into `Item::parts`) of an item.
    ItemPart { item: ItemId, part: usize },
    Trigger(TriggerId),
}

impl ColliderOwner {
    pub fn layer(&self) -> LayerMask {
        match self {
            ColliderOwner::Obstacle => LayerMask::OBSTACLE,
            ColliderOwner::ItemPart { .. } => LayerMask::ITEM,
            ColliderOwner::Trigger(_) => LayerMask::TRIGGER,
        }
    }

    /// The owning item, for part colliders.
    pub fn item(&self) -> Option<ItemId> {
        match self {
            ColliderOwner::ItemPart { item, .. } => Some(*item),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collider {
    pub bounds: Rect,
    pub owner: ColliderOwner,
}

/// Result of a ray cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RayHit {
    pub owner: ColliderOwner,
    /// Distance from the ray origin to the entry face.
    pub distance: Fixed64,
    /// Point on the entry face.
    pub point: WorldPosition,
}

// ---------------------------------------------------------------------------
// CollisionWorld
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    colliders: Vec<Collider>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            colliders: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, bounds: Rect, owner: ColliderOwner) {
        self.colliders.push(Collider { bounds, owner });
    }

    pub fn add_obstacle(&mut self, bounds: Rect) {
        self.add(bounds, ColliderOwner::Obstacle);
    }

    pub fn add_part(&mut self, item: ItemId, part: usize, bounds: Rect) {
        self.add(bounds, ColliderOwner::ItemPart { item, part });
    }

    pub fn add_trigger(&mut self, trigger: TriggerId, bounds: Rect) {
        self.add(bounds, ColliderOwner::Trigger(trigger));
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Cast an axis-aligned ray and return the nearest hit.
    ///
    /// - `max_distance`: hits further than this are ignored; `None` is
    ///   unbounded. A hit exactly at the limit counts.
    /// - `mask`: only colliders on these layers are considered.
    /// - `ignore`: part colliders of this item are skipped.
    ///
    /// Colliders containing the origin are skipped, as are rays that only
    /// graze an edge. Equal distances resolve to the collider added first.
    pub fn raycast(
        &self,
        origin: WorldPosition,
        direction: Direction,
        max_distance: Option<Fixed64>,
        mask: LayerMask,
        ignore: Option<ItemId>,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for collider in &self.colliders {
            if !mask.intersects(collider.owner.layer()) {
                continue;
            }
            if ignore.is_some() && collider.owner.item() == ignore {
                continue;
            }
            let Some(distance) = collider.bounds.ray_distance(origin, direction) else {
                continue;
            };
            if let Some(max) = max_distance
                && distance > max
            {
                continue;
            }
            if best.is_some_and(|b| b.distance <= distance) {
                continue;
            }
            best = Some(RayHit {
                owner: collider.owner,
                distance,
                point: advance(origin, direction, distance),
            });
        }
        best
    }

    /// Colliders on `mask` whose bounds strictly overlap `rect`.
    pub fn overlapping(&self, rect: Rect, mask: LayerMask) -> impl Iterator<Item = &Collider> {
        self.colliders
            .iter()
            .filter(move |c| mask.intersects(c.owner.layer()) && c.bounds.overlaps(&rect))
    }
}

fn advance(origin: WorldPosition, direction: Direction, distance: Fixed64) -> WorldPosition {
    match direction {
        Direction::North => WorldPosition::new(origin.x, origin.y, origin.z + distance),
        Direction::South => WorldPosition::new(origin.x, origin.y, origin.z - distance),
        Direction::East => WorldPosition::new(origin.x + distance, origin.y, origin.z),
        Direction::West => WorldPosition::new(origin.x - distance, origin.y, origin.z),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn f(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    fn cell(x: f64, z: f64) -> Rect {
        Rect::centered(f(x), f(z), f(0.5), f(0.5))
    }

    fn item_ids(n: usize) -> Vec<ItemId> {
        let mut sm = SlotMap::<ItemId, ()>::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    fn trigger_id() -> TriggerId {
        let mut sm = SlotMap::<TriggerId, ()>::with_key();
        sm.insert(())
    }

    #[test]
    fn layer_mask_combination() {
        let mask = LayerMask::OBSTACLE | LayerMask::ITEM;
        assert!(mask.contains(LayerMask::OBSTACLE));
        assert!(mask.contains(LayerMask::ITEM));
        assert!(!mask.contains(LayerMask::TRIGGER));
        assert!(LayerMask::ALL.contains(mask));
        assert!(!LayerMask::NONE.intersects(LayerMask::ALL));
    }

    #[test]
    fn raycast_returns_nearest() {
        let ids = item_ids(1);
        let mut world = CollisionWorld::new();
        world.add_obstacle(cell(4.0, 0.0));
        world.add_part(ids[0], 0, cell(2.0, 0.0));

        let hit = world
            .raycast(WorldPosition::ZERO, Direction::East, None, LayerMask::ALL, None)
            .unwrap();
        assert_eq!(hit.owner, ColliderOwner::ItemPart { item: ids[0], part: 0 });
        assert_eq!(hit.distance, f(1.5));
        assert_eq!(hit.point, WorldPosition::from_f64(1.5, 0.0, 0.0));
    }

    #[test]
    fn raycast_respects_mask_and_ignore() {
        let ids = item_ids(2);
        let mut world = CollisionWorld::new();
        world.add_part(ids[0], 0, cell(1.0, 0.0));
        world.add_part(ids[1], 0, cell(2.0, 0.0));
        world.add_obstacle(cell(3.0, 0.0));

        let hit = world
            .raycast(WorldPosition::ZERO, Direction::East, None, LayerMask::ALL, Some(ids[0]))
            .unwrap();
        assert_eq!(hit.owner.item(), Some(ids[1]));

        let hit = world
            .raycast(WorldPosition::ZERO, Direction::East, None, LayerMask::OBSTACLE, None)
            .unwrap();
        assert_eq!(hit.owner, ColliderOwner::Obstacle);
    }

    #[test]
    fn raycast_max_distance_is_inclusive() {
        let mut world = CollisionWorld::new();
        world.add_obstacle(cell(1.0, 0.0));
        let origin = WorldPosition::ZERO;
        assert!(
            world
                .raycast(origin, Direction::East, Some(f(0.5)), LayerMask::ALL, None)
                .is_some()
        );
        assert!(
            world
                .raycast(origin, Direction::East, Some(f(0.49)), LayerMask::ALL, None)
                .is_none()
        );
    }

    #[test]
    fn raycast_skips_collider_containing_origin() {
        let tid = trigger_id();
        let mut world = CollisionWorld::new();
        world.add_trigger(tid, cell(0.0, 0.0));
        assert!(
            world
                .raycast(WorldPosition::ZERO, Direction::West, None, LayerMask::ALL, None)
                .is_none()
        );
    }

    #[test]
    fn raycast_tie_goes_to_first_added() {
        let tid = trigger_id();
        let mut world = CollisionWorld::new();
        world.add_trigger(tid, cell(-1.0, 0.0));
        world.add_obstacle(cell(-1.0, 0.0));
        let hit = world
            .raycast(WorldPosition::ZERO, Direction::West, None, LayerMask::ALL, None)
            .unwrap();
        assert_eq!(hit.owner, ColliderOwner::Trigger(tid));
    }

    #[test]
    fn overlap_query_is_strict() {
        let tid = trigger_id();
        let mut world = CollisionWorld::new();
        world.add_trigger(tid, cell(-1.0, 0.0));
        world.add_obstacle(cell(-1.0, 1.0));

        let touching = cell(0.0, 0.0);
        assert_eq!(world.overlapping(touching, LayerMask::ALL).count(), 0);

        let inside = cell(-0.4, 0.0);
        let hits: Vec<_> = world.overlapping(inside, LayerMask::ALL).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].owner, ColliderOwner::Trigger(tid));

        assert_eq!(world.overlapping(inside, LayerMask::OBSTACLE).count(), 0);
    }
}
