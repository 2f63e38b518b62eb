use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies an item (a draggable multi-cell block) on the board.
    pub struct ItemId;

    /// Identifies an exit trigger zone on the board.
    pub struct TriggerId;
}

/// A block color. The palette itself lives with the level data; the core
/// only compares colors for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Color(pub u16);
