//! Board tuning. Lengths other than `spacing` and `item_height` are
//! fractions of one cell and are scaled by `spacing` when used.

use crate::fixed::Fixed64;
use crate::movement::MovementConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    #[error("event capacity must be at least 1")]
    ZeroEventCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// World distance between neighbouring cell centers.
    pub spacing: Fixed64,
    /// World height items slide at.
    pub item_height: Fixed64,
    /// Interpolation rate toward the drag target, per second.
    pub move_speed: Fixed64,
    /// World units.
    pub axis_epsilon: Fixed64,
    pub probe_length: Fixed64,
    pub probe_offset: Fixed64,
    /// Half the side of an item part collider.
    pub part_half_extent: Fixed64,
    pub push_back: bool,
    /// Ring buffer capacity per event kind.
    pub event_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            spacing: Fixed64::ONE,
            item_height: Fixed64::from_num(0.25),
            move_speed: Fixed64::from_num(10),
            axis_epsilon: Fixed64::from_num(0.01),
            probe_length: Fixed64::from_num(0.5),
            probe_offset: Fixed64::from_num(0.45),
            part_half_extent: Fixed64::from_num(0.5),
            push_back: true,
            event_capacity: 1024,
        }
    }
}

impl BoardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("spacing", self.spacing),
            ("move_speed", self.move_speed),
            ("probe_length", self.probe_length),
            ("part_half_extent", self.part_half_extent),
        ];
        for (field, value) in positive {
            if value <= Fixed64::ZERO {
                return Err(ConfigError::NotPositive { field });
            }
        }
        let non_negative = [
            ("axis_epsilon", self.axis_epsilon),
            ("probe_offset", self.probe_offset),
        ];
        for (field, value) in non_negative {
            if value < Fixed64::ZERO {
                return Err(ConfigError::Negative { field });
            }
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        Ok(())
    }

    /// Probe settings in world units.
    pub fn movement(&self) -> MovementConfig {
        MovementConfig {
            axis_epsilon: self.axis_epsilon,
            probe_length: self.probe_length * self.spacing,
            probe_offset: self.probe_offset * self.spacing,
            push_back: self.push_back,
        }
    }

    /// Part collider half extent in world units.
    pub fn part_half_extent_world(&self) -> Fixed64 {
        self.part_half_extent * self.spacing
    }
}
