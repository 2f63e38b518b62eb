//! Per-axis movement validation.
//!
//! A drag target is split into its X and Z components. Each component is
//! probed on its own, so an item blocked to the east can still slide north.
//! Every part casts three probes (center and two lanes offset across the
//! travel direction). A probe spans the whole step plus `probe_length`, and
//! the nearest hit caps how far the item may travel, so a long step cannot
//! jump over anything in its way.

use crate::collision::{CollisionWorld, LayerMask};
use crate::fixed::Fixed64;
use crate::geometry::{Axis, Direction, WorldPosition};
use crate::id::ItemId;
use crate::item::Item;
use crate::spatial::SpatialIndex;

/// Probe tuning, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementConfig {
    /// Axis deltas at or below this magnitude are not probed or applied.
    pub axis_epsilon: Fixed64,
    /// Clearance kept between a part center and anything it moves toward.
    pub probe_length: Fixed64,
    /// Lateral distance of the side probes from the part center.
    pub probe_offset: Fixed64,
    /// Report penetration depth as a corrective displacement.
    pub push_back: bool,
}

impl MovementConfig {
    /// Default tuning scaled to a cell spacing.
    pub fn for_spacing(spacing: Fixed64) -> Self {
        Self {
            axis_epsilon: Fixed64::from_num(0.01),
            probe_length: spacing / 2,
            probe_offset: spacing * Fixed64::from_num(0.45),
            push_back: true,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self::for_spacing(Fixed64::ONE)
    }
}

/// Which axes an item may move along this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisPermit {
    /// The whole X component is clear. When false the item may still close
    /// part of the gap; see [`MoveResolution::target`].
    pub x: bool,
    pub z: bool,
    /// Corrective displacement along X (zero when nothing penetrates).
    pub push_back_x: Fixed64,
    pub push_back_z: Fixed64,
}

impl AxisPermit {
    pub const FREE: AxisPermit = AxisPermit {
        x: true,
        z: true,
        push_back_x: Fixed64::ZERO,
        push_back_z: Fixed64::ZERO,
    };
}

impl Default for AxisPermit {
    fn default() -> Self {
        Self::FREE
    }
}

/// A validated move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResolution {
    pub permit: AxisPermit,
    /// Where the item is allowed to go. `y` is the item's current height.
    pub target: WorldPosition,
}

#[derive(Debug, Clone, Default)]
pub struct MovementValidator {
    config: MovementConfig,
}

#[derive(Debug, Clone, Copy)]
struct AxisProbe {
    allowed: bool,
    /// Signed distance the item may cover along the axis, excluding
    /// push-back.
    travel: Fixed64,
    push_back: Fixed64,
}

/// What a sweep needs to know about the moving item.
struct Subject<'a> {
    world: &'a CollisionWorld,
    id: ItemId,
    item: &'a Item,
    spatial: &'a SpatialIndex,
}

impl AxisProbe {
    const STILL: AxisProbe = AxisProbe {
        allowed: true,
        travel: Fixed64::ZERO,
        push_back: Fixed64::ZERO,
    };
}

impl MovementValidator {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Probe both axes of `delta` from the item's current part positions.
    pub fn check(
        &self,
        world: &CollisionWorld,
        item_id: ItemId,
        item: &Item,
        spatial: &SpatialIndex,
        delta: WorldPosition,
    ) -> AxisPermit {
        let subject = Subject {
            world,
            id: item_id,
            item,
            spatial,
        };
        let (x, z) = self.probe(&subject, delta);
        permit(x, z)
    }

    /// Check the move toward `target` and return the reachable position.
    /// Each axis advances as far as its probes allow, up to the full
    /// component, then push-back is added.
    pub fn resolve(
        &self,
        world: &CollisionWorld,
        item_id: ItemId,
        item: &Item,
        spatial: &SpatialIndex,
        target: WorldPosition,
    ) -> MoveResolution {
        let delta = target - item.position;
        let subject = Subject {
            world,
            id: item_id,
            item,
            spatial,
        };
        let (x, z) = self.probe(&subject, delta);

        let mut resolved = item.position;
        resolved.x += x.travel + x.push_back;
        resolved.z += z.travel + z.push_back;

        MoveResolution {
            permit: permit(x, z),
            target: resolved,
        }
    }

    fn probe(&self, subject: &Subject<'_>, delta: WorldPosition) -> (AxisProbe, AxisProbe) {
        let x = self.probe_axis(subject, Axis::X, delta.x, Fixed64::ZERO);
        let mut z = self.probe_axis(subject, Axis::Z, delta.z, Fixed64::ZERO);

        // Both axes clear on their own can still cut a corner: sweep Z again
        // from where the X travel ends.
        if x.travel != Fixed64::ZERO && z.travel != Fixed64::ZERO {
            let corner = self.probe_axis(subject, Axis::Z, delta.z, x.travel);
            if corner.travel.saturating_abs() < z.travel.saturating_abs() {
                z.allowed = false;
                z.travel = corner.travel;
            }
        }
        (x, z)
    }

    /// Sweep every lane of every part along `axis`. `shift` moves the lane
    /// origins along the perpendicular axis first.
    fn probe_axis(
        &self,
        subject: &Subject<'_>,
        axis: Axis,
        delta: Fixed64,
        shift: Fixed64,
    ) -> AxisProbe {
        let magnitude = delta.saturating_abs();
        if magnitude <= self.config.axis_epsilon {
            return AxisProbe::STILL;
        }

        let direction = Direction::along(axis, delta);
        let mask = LayerMask::OBSTACLE | LayerMask::ITEM;
        let lateral = self.config.probe_offset;
        let reach = magnitude.saturating_add(self.config.probe_length);
        let mut nearest: Option<Fixed64> = None;

        for center in subject.item.part_positions(subject.spatial) {
            let lanes = match axis {
                Axis::X => {
                    let z = center.z + shift;
                    [
                        WorldPosition::new(center.x, center.y, z),
                        WorldPosition::new(center.x, center.y, z + lateral),
                        WorldPosition::new(center.x, center.y, z - lateral),
                    ]
                }
                Axis::Z => {
                    let x = center.x + shift;
                    [
                        WorldPosition::new(x, center.y, center.z),
                        WorldPosition::new(x + lateral, center.y, center.z),
                        WorldPosition::new(x - lateral, center.y, center.z),
                    ]
                }
            };
            for origin in lanes {
                let hit = subject
                    .world
                    .raycast(origin, direction, Some(reach), mask, Some(subject.id));
                if let Some(hit) = hit {
                    nearest = Some(nearest.map_or(hit.distance, |n| n.min(hit.distance)));
                }
            }
        }

        let Some(nearest) = nearest else {
            return AxisProbe {
                allowed: true,
                travel: delta,
                push_back: Fixed64::ZERO,
            };
        };

        // Negative room means a probe already reaches into something.
        let room = nearest - self.config.probe_length;
        if room >= magnitude {
            return AxisProbe {
                allowed: true,
                travel: delta,
                push_back: Fixed64::ZERO,
            };
        }

        let travel = room.max(Fixed64::ZERO);
        let penetration = if self.config.push_back {
            (-room).max(Fixed64::ZERO)
        } else {
            Fixed64::ZERO
        };
        let (travel, push_back) = if direction.is_positive() {
            (travel, -penetration)
        } else {
            (-travel, penetration)
        };
        AxisProbe {
            allowed: false,
            travel,
            push_back,
        }
    }
}

fn permit(x: AxisProbe, z: AxisProbe) -> AxisPermit {
    AxisPermit {
        x: x.allowed,
        z: z.allowed,
        push_back_x: x.push_back,
        push_back_z: z.push_back,
    }
}
