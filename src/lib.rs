//! Retro Rush - An endless lane-runner arcade game
//!
//! Core modules:
//! - `sim`: Simulation step (spawning, movement, collisions, scoring)
//! - `progression`: Upgrade tracks bought with banked coins
//! - `persistence`: LocalStorage save/load and offline earnings
//! - `platform`: Clock and animation-frame scheduling abstraction
//! - `game`: Loop controller owning run/pause/game-over transitions
//! - `view`: Read-only snapshots for rendering and menus
//! - `tuning`: Data-driven game balance

pub mod game;
pub mod persistence;
pub mod platform;
pub mod progression;
pub mod sim;
pub mod tuning;
pub mod view;

pub use game::{Game, GamePhase, InputEvent};
pub use progression::{Attribute, ProgressionRecord, Upgrade, Upgrades};
pub use tuning::{Tuning, TuningError};

/// Geometry and timing constants
pub mod consts {
    /// Frame duration the per-frame rates are expressed in (60 Hz)
    pub const FRAME_MS: f32 = 16.67;

    /// Player car size
    pub const PLAYER_WIDTH: f32 = 40.0;
    pub const PLAYER_HEIGHT: f32 = 60.0;
    /// Gap between the car and the bottom of the canvas
    pub const PLAYER_BOTTOM_MARGIN: f32 = 20.0;

    /// Obstacle box (square)
    pub const OBSTACLE_SIZE: f32 = 40.0;
    /// Coin box (square)
    pub const COIN_SIZE: f32 = 20.0;

    /// Score gained per ms at 1.0x speed
    pub const SCORE_RATE: f32 = 0.01;
    /// Road scroll per ms at 1.0x speed
    pub const ROAD_SCROLL_RATE: f32 = 0.1;
    /// Lane-divider dash period; the road offset wraps at this value
    pub const ROAD_TILE: f32 = 40.0;
}

/// Left edge of a road of `road_width` centered in a canvas of `canvas_width`
#[inline]
pub fn road_left_edge(canvas_width: f32, road_width: f32) -> f32 {
    (canvas_width - road_width) / 2.0
}
