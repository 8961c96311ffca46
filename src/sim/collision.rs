//! Axis-aligned box collision
//!
//! Obstacles are tested with hitboxes shrunk around their centers so a
//! graze that only touches the visual edge doesn't end the run. Coins use
//! the full visual boxes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box, `pos` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Box scaled by `tolerance` around its own center
    pub fn scaled(&self, tolerance: f32) -> Rect {
        let size = self.size * tolerance;
        Rect {
            pos: self.pos + (self.size - size) * 0.5,
            size,
        }
    }

    /// Strict overlap; boxes that only share an edge don't overlap
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.pos.x < other.pos.x + other.size.x
            && self.pos.x + self.size.x > other.pos.x
            && self.pos.y < other.pos.y + other.size.y
            && self.pos.y + self.size.y > other.pos.y
    }
}

/// Player vs obstacle, both hitboxes shrunk by `tolerance`
pub fn obstacle_hit(player: &Rect, obstacle: &Rect, tolerance: f32) -> bool {
    player.scaled(tolerance).overlaps(&obstacle.scaled(tolerance))
}

/// Player vs coin on the full visual boxes
pub fn coin_pickup(player: &Rect, coin: &Rect) -> bool {
    player.overlaps(coin)
}

/// Index of the first obstacle the player hits, if any
pub fn first_obstacle_hit<I>(player: &Rect, obstacles: I, tolerance: f32) -> Option<usize>
where
    I: IntoIterator<Item = Rect>,
{
    obstacles
        .into_iter()
        .position(|obstacle| obstacle_hit(player, &obstacle, tolerance))
}
