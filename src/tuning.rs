//! Data-driven game balance
//!
//! Every knob that shapes a run lives here so it can be overridden from JSON
//! without touching the simulation.

use serde::{Deserialize, Serialize};

/// Invalid balance data
#[derive(thiserror::Error, Debug)]
pub enum TuningError {
    /// JSON could not be parsed into a `Tuning`
    #[error("Tuning parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its allowed range
    #[error("Invalid tuning value for `{field}`: {reason}")]
    OutOfRange {
        field: &'static str,
        reason: &'static str,
    },
}

/// Game balance parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tuning {
    /// Road width in device pixels
    pub road_width: f32,
    /// Number of lanes on the road
    pub lane_count: u32,
    /// Base fall speed of obstacles and coins (pixels per 60 Hz frame)
    pub obstacle_speed: f32,
    /// Obstacle spawn chance per 60 Hz frame at 1.0x speed
    pub obstacle_spawn_rate: f32,
    /// Coin spawn chance per 60 Hz frame at 1.0x speed
    pub coin_spawn_rate: f32,
    /// Speed multiplier gained per millisecond (scaled by the speed upgrade)
    pub acceleration_rate: f32,
    /// Speed multiplier at run start (scaled by the speed upgrade)
    pub initial_player_speed: f32,
    /// Coins earned per offline minute (scaled by the coin multiplier)
    pub idle_earning_rate: f32,
    /// Obstacle hitbox scale relative to the visual box
    pub collision_tolerance: f32,
    /// Obstacles above this y block new obstacle spawns
    pub spawn_buffer: f32,
    /// Autosave period while running (ms)
    pub autosave_interval_ms: i64,
    /// Minimum absence before offline earnings are granted (ms)
    pub offline_threshold_ms: i64,
    /// Largest frame delta fed to the simulation (ms)
    pub max_frame_delta_ms: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            road_width: 250.0,
            lane_count: 3,
            obstacle_speed: 3.0,
            obstacle_spawn_rate: 0.01,
            coin_spawn_rate: 0.015,
            acceleration_rate: 0.00002,
            initial_player_speed: 0.7,
            idle_earning_rate: 1.0,
            collision_tolerance: 0.8,
            spawn_buffer: 100.0,
            autosave_interval_ms: 60_000,
            offline_threshold_ms: 60_000,
            max_frame_delta_ms: 250.0,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON override; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Check value ranges the simulation relies on
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.lane_count == 0 {
            return Err(TuningError::OutOfRange {
                field: "laneCount",
                reason: "must be at least 1",
            });
        }
        if !(self.collision_tolerance > 0.0 && self.collision_tolerance <= 1.0) {
            return Err(TuningError::OutOfRange {
                field: "collisionTolerance",
                reason: "must be in (0, 1]",
            });
        }
        if !(self.road_width > 0.0) {
            return Err(TuningError::OutOfRange {
                field: "roadWidth",
                reason: "must be positive",
            });
        }
        let rates = [
            ("obstacleSpeed", self.obstacle_speed),
            ("obstacleSpawnRate", self.obstacle_spawn_rate),
            ("coinSpawnRate", self.coin_spawn_rate),
            ("accelerationRate", self.acceleration_rate),
            ("initialPlayerSpeed", self.initial_player_speed),
            ("idleEarningRate", self.idle_earning_rate),
        ];
        for (field, value) in rates {
            if !(value >= 0.0) {
                return Err(TuningError::OutOfRange {
                    field,
                    reason: "must be non-negative",
                });
            }
        }
        if self.autosave_interval_ms < 0 {
            return Err(TuningError::OutOfRange {
                field: "autosaveIntervalMs",
                reason: "must be non-negative",
            });
        }
        if self.offline_threshold_ms < 0 {
            return Err(TuningError::OutOfRange {
                field: "offlineThresholdMs",
                reason: "must be non-negative",
            });
        }
        if !(self.max_frame_delta_ms > 0.0) {
            return Err(TuningError::OutOfRange {
                field: "maxFrameDeltaMs",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// Width of a single lane
    #[inline]
    pub fn lane_width(&self) -> f32 {
        self.road_width / self.lane_count as f32
    }
}
