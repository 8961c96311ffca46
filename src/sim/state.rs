//! Run state and core simulation types
//!
//! Everything a single run mutates lives in `SimContext`; the progression
//! record is owned by the loop controller and only read here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::consts::*;
use crate::progression::Upgrades;
use crate::road_left_edge;
use crate::tuning::Tuning;

/// Canvas and road geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
    pub road_width: f32,
    pub lane_count: u32,
}

impl Playfield {
    pub fn new(width: f32, height: f32, tuning: &Tuning) -> Self {
        Self {
            width,
            height,
            road_width: tuning.road_width,
            lane_count: tuning.lane_count.max(1),
        }
    }

    #[inline]
    pub fn road_left(&self) -> f32 {
        road_left_edge(self.width, self.road_width)
    }

    #[inline]
    pub fn lane_width(&self) -> f32 {
        self.road_width / self.lane_count as f32
    }

    /// Horizontal center of `lane`
    #[inline]
    pub fn lane_center_x(&self, lane: u32) -> f32 {
        self.road_left() + lane as f32 * self.lane_width() + self.lane_width() / 2.0
    }

    /// Center lane, where every run starts
    #[inline]
    pub fn center_lane(&self) -> u32 {
        self.lane_count / 2
    }
}

/// Scrolling world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Run time (ms)
    pub elapsed_ms: f32,
    /// Global speed multiplier; never decreases during a run
    pub speed: f32,
    /// Road dash offset in [0, ROAD_TILE)
    pub road_offset: f32,
    pub running: bool,
}

impl World {
    /// Fresh world for a run, starting speed scaled by the speed upgrade
    pub fn new(tuning: &Tuning, upgrades: &Upgrades) -> Self {
        Self {
            elapsed_ms: 0.0,
            speed: tuning.initial_player_speed * upgrades.speed.value,
            road_offset: 0.0,
            running: false,
        }
    }
}

/// The player's car
///
/// The lane is the only positional state; the box is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub lane: u32,
    pub width: f32,
    pub height: f32,
    /// Disables obstacle collisions (reserved for power-ups)
    pub invulnerable: bool,
}

impl Player {
    pub fn new(lane: u32) -> Self {
        Self {
            lane,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            invulnerable: false,
        }
    }

    /// Visual box in canvas space
    pub fn bounds(&self, field: &Playfield) -> Rect {
        Rect::new(
            field.lane_center_x(self.lane) - self.width / 2.0,
            field.height - self.height - PLAYER_BOTTOM_MARGIN,
            self.width,
            self.height,
        )
    }

    /// Move one lane left; returns false at the edge
    pub fn shift_left(&mut self) -> bool {
        if self.lane > 0 {
            self.lane -= 1;
            true
        } else {
            false
        }
    }

    /// Move one lane right; returns false at the edge
    pub fn shift_right(&mut self, lane_count: u32) -> bool {
        if self.lane + 1 < lane_count {
            self.lane += 1;
            true
        } else {
            false
        }
    }
}

/// An obstacle falling down the road
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub pos: Vec2,
    pub size: Vec2,
    /// Pixels per 60 Hz frame
    pub fall_speed: f32,
}

/// A coin falling down the road
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub pos: Vec2,
    pub size: Vec2,
    /// Pixels per 60 Hz frame
    pub fall_speed: f32,
}

/// Shared behavior of falling entities
pub trait Falling {
    fn pos(&self) -> Vec2;
    fn size(&self) -> Vec2;
    fn fall_speed(&self) -> f32;
    fn set_y(&mut self, y: f32);

    fn bounds(&self) -> Rect {
        Rect {
            pos: self.pos(),
            size: self.size(),
        }
    }

    /// Move down by `frames` 60 Hz frames' worth
    fn fall(&mut self, frames: f32) {
        let y = self.pos().y + self.fall_speed() * frames;
        self.set_y(y);
    }

    /// Past the bottom of the playfield
    fn is_off_screen(&self, field: &Playfield) -> bool {
        self.pos().y > field.height
    }
}

macro_rules! impl_falling {
    ($ty:ty) => {
        impl Falling for $ty {
            fn pos(&self) -> Vec2 {
                self.pos
            }
            fn size(&self) -> Vec2 {
                self.size
            }
            fn fall_speed(&self) -> f32 {
                self.fall_speed
            }
            fn set_y(&mut self, y: f32) {
                self.pos.y = y;
            }
        }
    };
}

impl_falling!(Obstacle);
impl_falling!(Coin);

/// Per-run tallies
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub score: f32,
    /// Fractional because pickups are scaled by the coin multiplier
    pub collected_coins: f32,
}

/// Everything one run mutates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimContext {
    pub field: Playfield,
    pub world: World,
    pub player: Player,
    /// Kept in spawn order
    pub obstacles: Vec<Obstacle>,
    /// Kept in spawn order
    pub coins: Vec<Coin>,
    pub session: SessionStats,
}

impl SimContext {
    pub fn new(field: Playfield, tuning: &Tuning, upgrades: &Upgrades) -> Self {
        Self {
            field,
            world: World::new(tuning, upgrades),
            player: Player::new(field.center_lane()),
            obstacles: Vec::new(),
            coins: Vec::new(),
            session: SessionStats::default(),
        }
    }

    /// Reset for a new run and mark it running
    pub fn reset(&mut self, tuning: &Tuning, upgrades: &Upgrades) {
        *self = Self::new(self.field, tuning, upgrades);
        self.world.running = true;
    }

    /// Current player box
    pub fn player_bounds(&self) -> Rect {
        self.player.bounds(&self.field)
    }

    /// Canvas resized: keep the lane, geometry follows
    pub fn resize(&mut self, width: f32, height: f32) {
        self.field.width = width;
        self.field.height = height;
    }
}
