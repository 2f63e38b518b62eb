//! Colorgate Core -- grid occupancy and movement validation for a
//! color-block sliding puzzle.
//!
//! Items made of unit-cell parts slide across a grid and leave through
//! color-matched exit triggers on the border ring. This crate owns the
//! simulation state; rendering, animation, input capture, and UI are
//! collaborators that feed pointer rays in and listen to events.
//!
//! # Drag Pipeline
//!
//! 1. **Validate** -- [`movement::MovementValidator`] probes X and Z
//!    independently, so an item blocked on one axis still slides on the other.
//! 2. **Move** -- the allowed displacement is interpolated by `move_speed * dt`.
//! 3. **Track** -- each trigger counts how many of the item's parts are
//!    inside it ([`trigger::ContainmentTracker`]).
//! 4. **Evaluate** -- a color-matched, size-fit, fully contained item whose
//!    exit path is clear ([`exit_path::ExitPathChecker`]) retires.
//! 5. **Release** -- the item snaps to the nearest cell, occupancy is
//!    recomputed, and every trigger re-evaluates.
//!
//! ```rust,ignore
//! let mut board = Board::load(&level, BoardConfig::default())?;
//! board.begin_drag(item, ray)?;
//! board.continue_drag(next_ray, dt)?;
//! board.end_drag();
//! ```
//!
//! # Key Types
//!
//! - [`board::Board`] -- The simulation context that owns every registry.
//! - [`spatial::SpatialIndex`] -- Grid/world mapping with bounds clamping.
//! - [`grid::OccupancyGrid`] -- Per-cell occupancy and the active item registry.
//! - [`collision::CollisionWorld`] -- Layered axis-aligned ray casts.
//! - [`level::LevelData`] -- Level description consumed at load.
//! - [`event::EventBus`] -- Buffered events for rendering and progression.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod board;
pub mod collision;
pub mod config;
pub mod event;
pub mod exit_path;
pub mod fixed;
pub mod geometry;
pub mod grid;
pub mod id;
pub mod item;
pub mod level;
pub mod movement;
pub mod spatial;
pub mod trigger;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
