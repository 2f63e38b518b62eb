//! Planar geometry shared by the board: grid positions, world positions,
//! cardinal directions, axis-aligned rectangles, and input rays.
//!
//! Grid `y` maps to world `z`. World `y` is the vertical axis and is held
//! constant while items slide.

use crate::fixed::{Fixed64, checked_div_64};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

// ---------------------------------------------------------------------------
// Grid space
// ---------------------------------------------------------------------------

/// A position on the 2D grid. Border cells use `-1` and `width`/`height`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The position shifted by an offset.
    pub fn offset(self, offset: GridOffset) -> Self {
        Self::new(self.x + offset.dx, self.y + offset.dy)
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &GridPosition) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

/// A cell offset relative to an anchor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridOffset {
    pub dx: i32,
    pub dy: i32,
}

impl GridOffset {
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

// ---------------------------------------------------------------------------
// World space
// ---------------------------------------------------------------------------

/// A continuous world position (or displacement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldPosition {
    pub x: Fixed64,
    pub y: Fixed64,
    pub z: Fixed64,
}

impl WorldPosition {
    pub const ZERO: WorldPosition = WorldPosition {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
        z: Fixed64::ZERO,
    };

    pub fn new(x: Fixed64, y: Fixed64, z: Fixed64) -> Self {
        Self { x, y, z }
    }

    /// Build from f64 components. Initialization and tests only.
    pub fn from_f64(x: f64, y: f64, z: f64) -> Self {
        Self::new(Fixed64::from_num(x), Fixed64::from_num(y), Fixed64::from_num(z))
    }

    /// Same position with the vertical component replaced.
    pub fn with_y(self, y: Fixed64) -> Self {
        Self { y, ..self }
    }

    /// Component along a planar axis.
    pub fn along(&self, axis: Axis) -> Fixed64 {
        match axis {
            Axis::X => self.x,
            Axis::Z => self.z,
        }
    }

    /// Linear interpolation toward `target` by factor `t` (expected 0..=1).
    pub fn lerp(self, target: WorldPosition, t: Fixed64) -> Self {
        self + (target - self) * t
    }
}

impl Add for WorldPosition {
    type Output = WorldPosition;
    fn add(self, rhs: WorldPosition) -> WorldPosition {
        WorldPosition::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for WorldPosition {
    type Output = WorldPosition;
    fn sub(self, rhs: WorldPosition) -> WorldPosition {
        WorldPosition::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<Fixed64> for WorldPosition {
    type Output = WorldPosition;
    fn mul(self, rhs: Fixed64) -> WorldPosition {
        WorldPosition::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for WorldPosition {
    type Output = WorldPosition;
    fn neg(self) -> WorldPosition {
        WorldPosition::new(-self.x, -self.y, -self.z)
    }
}

// ---------------------------------------------------------------------------
// Axes and directions
// ---------------------------------------------------------------------------

/// One of the two planar axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    /// The other planar axis.
    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::X => Axis::Z,
            Axis::Z => Axis::X,
        }
    }
}

/// Cardinal directions. North is +z (grid +y), East is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Grid offset for one step in this direction.
    pub fn offset(&self) -> GridOffset {
        match self {
            Direction::North => GridOffset::new(0, 1),
            Direction::East => GridOffset::new(1, 0),
            Direction::South => GridOffset::new(0, -1),
            Direction::West => GridOffset::new(-1, 0),
        }
    }

    /// The planar axis this direction travels along.
    pub fn axis(&self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::X,
            Direction::North | Direction::South => Axis::Z,
        }
    }

    /// Whether travel is toward increasing coordinates.
    pub fn is_positive(&self) -> bool {
        matches!(self, Direction::North | Direction::East)
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Direction along `axis` with the sign of `delta`. Zero counts as
    /// positive.
    pub fn along(axis: Axis, delta: Fixed64) -> Direction {
        match (axis, delta < Fixed64::ZERO) {
            (Axis::X, false) => Direction::East,
            (Axis::X, true) => Direction::West,
            (Axis::Z, false) => Direction::North,
            (Axis::Z, true) => Direction::South,
        }
    }

    /// Snap a planar displacement to its dominant axis. Ties (including a
    /// zero displacement) resolve to the Z axis.
    pub fn dominant(delta: WorldPosition) -> Direction {
        if delta.x.abs() > delta.z.abs() {
            Direction::along(Axis::X, delta.x)
        } else {
            Direction::along(Axis::Z, delta.z)
        }
    }
}

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// Axis-aligned planar bounds in world units (x and z).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min_x: Fixed64,
    pub max_x: Fixed64,
    pub min_z: Fixed64,
    pub max_z: Fixed64,
}

impl Rect {
    /// A rectangle centered on `(x, z)` with the given half extents.
    pub fn centered(x: Fixed64, z: Fixed64, half_x: Fixed64, half_z: Fixed64) -> Self {
        Self {
            min_x: x - half_x,
            max_x: x + half_x,
            min_z: z - half_z,
            max_z: z + half_z,
        }
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_z: self.min_z.min(other.min_z),
            max_z: self.max_z.max(other.max_z),
        }
    }

    /// True if the interiors overlap. Touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_z < other.max_z
            && other.min_z < self.max_z
    }

    fn bounds(&self, axis: Axis) -> (Fixed64, Fixed64) {
        match axis {
            Axis::X => (self.min_x, self.max_x),
            Axis::Z => (self.min_z, self.max_z),
        }
    }

    /// Distance along `direction` from `origin` to this rectangle's entry
    /// face. Returns `None` when the ray misses, runs along an edge, points
    /// away, or starts inside the rectangle.
    pub fn ray_distance(&self, origin: WorldPosition, direction: Direction) -> Option<Fixed64> {
        let axis = direction.axis();
        let (perp_min, perp_max) = self.bounds(axis.perpendicular());
        let perp = origin.along(axis.perpendicular());
        if perp <= perp_min || perp >= perp_max {
            return None;
        }

        let (min, max) = self.bounds(axis);
        let o = origin.along(axis);
        if direction.is_positive() {
            (o <= min).then(|| min - o)
        } else {
            (o >= max).then(|| o - max)
        }
    }
}

// ---------------------------------------------------------------------------
// Ray
// ---------------------------------------------------------------------------

/// An input ray (for example, a pointer ray from the camera).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ray {
    pub origin: WorldPosition,
    pub direction: WorldPosition,
}

impl Ray {
    pub fn new(origin: WorldPosition, direction: WorldPosition) -> Self {
        Self { origin, direction }
    }

    /// A ray pointing straight down onto the plane point `(x, z)`.
    pub fn straight_down(x: Fixed64, z: Fixed64) -> Self {
        Self {
            origin: WorldPosition::new(x, Fixed64::from_num(100), z),
            direction: WorldPosition::new(Fixed64::ZERO, -Fixed64::ONE, Fixed64::ZERO),
        }
    }

    /// Intersection with the horizontal plane at height `y`. `None` when the
    /// ray is parallel to the plane or the plane lies behind the origin.
    pub fn intersect_horizontal(&self, y: Fixed64) -> Option<WorldPosition> {
        let t = checked_div_64(y - self.origin.y, self.direction.y)?;
        if t < Fixed64::ZERO {
            return None;
        }
        let point = self.origin + self.direction * t;
        Some(point.with_y(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    fn unit_cell(x: f64, z: f64) -> Rect {
        Rect::centered(f(x), f(z), f(0.5), f(0.5))
    }

    #[test]
    fn direction_offsets_and_axes() {
        assert_eq!(Direction::North.offset(), GridOffset::new(0, 1));
        assert_eq!(Direction::West.offset(), GridOffset::new(-1, 0));
        assert_eq!(Direction::East.axis(), Axis::X);
        assert_eq!(Direction::South.axis(), Axis::Z);
        for dir in Direction::all() {
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn dominant_axis_snapping() {
        let d = WorldPosition::from_f64(-3.0, 7.0, 1.0);
        assert_eq!(Direction::dominant(d), Direction::West);

        let d = WorldPosition::from_f64(0.2, 0.0, -0.9);
        assert_eq!(Direction::dominant(d), Direction::South);

        // Ties go to Z.
        let d = WorldPosition::from_f64(1.0, 0.0, 1.0);
        assert_eq!(Direction::dominant(d), Direction::North);
    }

    #[test]
    fn rect_overlap_is_strict() {
        let a = unit_cell(0.0, 0.0);
        let touching = unit_cell(1.0, 0.0);
        let overlapping = unit_cell(0.9, 0.0);
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&overlapping));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn ray_distance_to_entry_face() {
        let target = unit_cell(2.0, 0.0);
        let origin = WorldPosition::from_f64(0.0, 0.0, 0.0);
        assert_eq!(target.ray_distance(origin, Direction::East), Some(f(1.5)));
        assert_eq!(target.ray_distance(origin, Direction::West), None);
        assert_eq!(target.ray_distance(origin, Direction::North), None);
    }

    #[test]
    fn ray_starting_inside_is_ignored() {
        let target = unit_cell(0.0, 0.0);
        let origin = WorldPosition::from_f64(0.1, 0.0, 0.0);
        assert_eq!(target.ray_distance(origin, Direction::East), None);
    }

    #[test]
    fn ray_grazing_an_edge_misses() {
        let target = unit_cell(2.0, 1.0);
        let origin = WorldPosition::from_f64(0.0, 0.0, 0.5);
        assert_eq!(target.ray_distance(origin, Direction::East), None);
        let origin = WorldPosition::from_f64(0.0, 0.0, 0.55);
        assert_eq!(target.ray_distance(origin, Direction::East), Some(f(1.5)));
    }

    #[test]
    fn ray_plane_intersection() {
        let ray = Ray::straight_down(f(1.25), f(-2.0));
        let hit = ray.intersect_horizontal(f(0.25)).unwrap();
        assert_eq!(hit, WorldPosition::from_f64(1.25, 0.25, -2.0));

        let flat = Ray::new(
            WorldPosition::from_f64(0.0, 1.0, 0.0),
            WorldPosition::from_f64(1.0, 0.0, 0.0),
        );
        assert!(flat.intersect_horizontal(f(0.0)).is_none());

        let upward = Ray::new(
            WorldPosition::from_f64(0.0, 1.0, 0.0),
            WorldPosition::from_f64(0.0, 1.0, 0.0),
        );
        assert!(upward.intersect_horizontal(f(0.0)).is_none());
    }

    #[test]
    fn lerp_halfway() {
        let a = WorldPosition::from_f64(0.0, 0.0, 0.0);
        let b = WorldPosition::from_f64(2.0, 0.0, -4.0);
        assert_eq!(a.lerp(b, f(0.5)), WorldPosition::from_f64(1.0, 0.0, -2.0));
        assert_eq!(a.lerp(b, Fixed64::ONE), b);
    }
}
