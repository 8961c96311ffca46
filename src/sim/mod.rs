//! Simulation module
//!
//! All gameplay logic lives here. This module must stay pure:
//! - Time comes in as a delta, never read from a clock
//! - Randomness comes from an injected RNG
//! - Entities are kept in spawn order
//! - No rendering or platform dependencies

pub mod collision;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{Rect, coin_pickup, first_obstacle_hit, obstacle_hit};
pub use spawn::{maybe_spawn_coin, maybe_spawn_obstacle, spawn_chance};
pub use state::{Coin, Falling, Obstacle, Player, Playfield, SessionStats, SimContext, World};
pub use tick::{StepOutcome, StepResult, advance, sanitize_dt};
