//! Meta-progression: upgrades bought with banked coins
//!
//! Persisted to LocalStorage between sessions (see `persistence`).

use serde::{Deserialize, Serialize};

/// Starting price of every upgrade
pub const BASE_UPGRADE_COST: u64 = 100;
/// Value gained per level above 1
pub const VALUE_PER_LEVEL: f32 = 0.2;
/// Cost growth per purchase (floored)
pub const COST_GROWTH: f64 = 1.5;

/// Upgradeable attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    /// Scales the starting speed and the speed ramp
    Speed,
    /// Reserved for lane-change feel; tracked but not yet used by the sim
    Handling,
    /// Scales coin pickups and offline earnings
    CoinMultiplier,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [
        Attribute::Speed,
        Attribute::Handling,
        Attribute::CoinMultiplier,
    ];

    /// Key used in the persisted record
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Speed => "speed",
            Attribute::Handling => "handling",
            Attribute::CoinMultiplier => "coinMultiplier",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "speed" => Some(Attribute::Speed),
            "handling" => Some(Attribute::Handling),
            "coinMultiplier" | "coin" => Some(Attribute::CoinMultiplier),
            _ => None,
        }
    }
}

/// One upgrade track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Upgrade {
    pub level: u32,
    pub cost: u64,
    pub value: f32,
}

impl Default for Upgrade {
    fn default() -> Self {
        Self {
            level: 1,
            cost: BASE_UPGRADE_COST,
            value: 1.0,
        }
    }
}

impl Upgrade {
    /// Value granted at a given level
    #[inline]
    pub fn value_for_level(level: u32) -> f32 {
        1.0 + level.saturating_sub(1) as f32 * VALUE_PER_LEVEL
    }

    /// Apply one level: value follows the level, cost grows ×1.5 floored
    fn level_up(&mut self) {
        self.level = self.level.saturating_add(1);
        self.value = Self::value_for_level(self.level);
        self.cost = (self.cost as f64 * COST_GROWTH).floor() as u64;
    }
}

/// The three upgrade tracks
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrades {
    pub speed: Upgrade,
    pub handling: Upgrade,
    pub coin_multiplier: Upgrade,
}

impl Upgrades {
    pub fn get(&self, attribute: Attribute) -> &Upgrade {
        match attribute {
            Attribute::Speed => &self.speed,
            Attribute::Handling => &self.handling,
            Attribute::CoinMultiplier => &self.coin_multiplier,
        }
    }

    pub fn get_mut(&mut self, attribute: Attribute) -> &mut Upgrade {
        match attribute {
            Attribute::Speed => &mut self.speed,
            Attribute::Handling => &mut self.handling,
            Attribute::CoinMultiplier => &mut self.coin_multiplier,
        }
    }
}

/// Everything that survives between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionRecord {
    /// Banked coins
    pub total_coins: u64,
    pub upgrades: Upgrades,
    /// Unix timestamp (ms) of the last successful save
    #[serde(rename = "lastSaveTime")]
    pub last_save_ms: i64,
}

impl ProgressionRecord {
    /// Fresh record for a first-time player
    pub fn new(now_ms: i64) -> Self {
        Self {
            total_coins: 0,
            upgrades: Upgrades::default(),
            last_save_ms: now_ms,
        }
    }

    /// Whether the player can pay for the next level of `attribute`
    pub fn can_afford(&self, attribute: Attribute) -> bool {
        self.total_coins >= self.upgrades.get(attribute).cost
    }

    /// Buy one level of `attribute`
    ///
    /// Returns false and leaves the record untouched when the player cannot
    /// afford it. Levels are uncapped.
    pub fn purchase(&mut self, attribute: Attribute) -> bool {
        if !self.can_afford(attribute) {
            return false;
        }
        let upgrade = self.upgrades.get_mut(attribute);
        self.total_coins -= upgrade.cost;
        upgrade.level_up();
        log::debug!(
            "Purchased {} level {} (next cost {})",
            attribute.as_str(),
            upgrade.level,
            upgrade.cost
        );
        true
    }
}
