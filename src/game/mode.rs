//! Arena modes and their fixed rules

use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena width in world units
pub const ARENA_WIDTH: f32 = 600.0;
/// Arena height in world units
pub const ARENA_HEIGHT: f32 = 500.0;

/// Enemy side length (enemies are squares)
pub const ENEMY_SIZE: f32 = 30.0;
/// Slowest enemy fall speed, units per tick
pub const ENEMY_MIN_SPEED: f32 = 2.0;
/// Fastest enemy fall speed, units per tick
pub const ENEMY_MAX_SPEED: f32 = 5.0;

/// A named arena variant. Each mode has exactly one room.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Wide paddle hitbox
    #[default]
    Normal,
    /// Square body hitbox
    Advanced,
}

/// Per-mode player geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeRules {
    pub player_width: f32,
    pub player_height: f32,
    pub start_x: f32,
    pub start_y: f32,
}

impl Mode {
    /// Every mode, in registry order
    pub const ALL: [Mode; 2] = [Mode::Normal, Mode::Advanced];

    /// Resolve a client-supplied mode name. Unknown names fall back to the
    /// default mode instead of failing.
    pub fn from_name(name: &str) -> Self {
        match name {
            "normal" => Self::Normal,
            "advanced" => Self::Advanced,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Advanced => "advanced",
        }
    }

    pub fn rules(&self) -> ModeRules {
        match self {
            Self::Normal => ModeRules {
                player_width: 50.0,
                player_height: 10.0,
                start_x: 275.0,
                start_y: 460.0,
            },
            Self::Advanced => ModeRules {
                player_width: 30.0,
                player_height: 30.0,
                start_x: 285.0,
                start_y: 440.0,
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
