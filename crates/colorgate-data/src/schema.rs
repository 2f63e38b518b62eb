//! Serde data file structs for level definitions.
//!
//! These structs define the on-disk format for a level: grid dimensions, a
//! named color palette, item and trigger placements, and optional board
//! settings. They are deserialized from RON, JSON, or TOML files and then
//! resolved into core types by the loader.

use colorgate_core::geometry::Direction;
use colorgate_core::item::ItemSize;
use colorgate_core::trigger::TriggerKind;
use serde::Deserialize;

// ===========================================================================
// Level
// ===========================================================================

/// A whole level file.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelFile {
    pub width: u32,
    pub height: u32,
    /// Color names. A color's index in this list is its `Color` value.
    pub palette: Vec<String>,
    #[serde(default)]
    pub items: Vec<ItemEntry>,
    #[serde(default)]
    pub triggers: Vec<TriggerEntry>,
    #[serde(default)]
    pub settings: Option<SettingsData>,
}

/// An item placed at its anchor cell.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemEntry {
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_size")]
    pub size: ItemSize,
    pub color: String,
}

fn default_size() -> ItemSize {
    ItemSize::OneByOne
}

/// A trigger anchored on the border ring (or inside the grid with an
/// explicit exit).
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEntry {
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_kind")]
    pub kind: TriggerKind,
    pub color: String,
    /// Largest accepted item size; the kind's default when omitted.
    #[serde(default)]
    pub max_size: Option<ItemSize>,
    /// Exit direction; derived from the ring side when omitted.
    #[serde(default)]
    pub exit: Option<Direction>,
}

fn default_kind() -> TriggerKind {
    TriggerKind::One
}

// ===========================================================================
// Settings
// ===========================================================================

/// Board tuning overrides. Omitted fields keep the board defaults; lengths
/// other than `spacing` and `item_height` are fractions of one cell.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsData {
    #[serde(default)]
    pub spacing: Option<f64>,
    #[serde(default)]
    pub item_height: Option<f64>,
    #[serde(default)]
    pub move_speed: Option<f64>,
    #[serde(default)]
    pub axis_epsilon: Option<f64>,
    #[serde(default)]
    pub probe_length: Option<f64>,
    #[serde(default)]
    pub probe_offset: Option<f64>,
    #[serde(default)]
    pub part_half_extent: Option<f64>,
    #[serde(default)]
    pub push_back: Option<bool>,
    #[serde(default)]
    pub event_capacity: Option<usize>,
}

// ===========================================================================
// Tests
// ===========================================================================
