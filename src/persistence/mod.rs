//! Save/load of the progression record
//!
//! Features:
//! - JSON record under a single fixed key
//! - Lenient decoding: each malformed field falls back to its default
//! - Offline (idle) earnings computed from the last save time
//!
//! Writes are best-effort. A failed write is logged and the game carries on.

pub mod store;

pub use store::{KeyValueStore, MemoryStore, StoreError};

#[cfg(target_arch = "wasm32")]
pub use store::LocalStore;

use serde_json::Value;

use crate::progression::{Attribute, ProgressionRecord, Upgrade};
use crate::tuning::Tuning;

/// Storage key of the progression record
pub const STORAGE_KEY: &str = "retroRushData";

/// Milliseconds per offline-earnings minute
const MS_PER_MINUTE: f64 = 60_000.0;

/// Progression record persisted in a key-value store
pub struct ProgressStore<S: KeyValueStore> {
    store: S,
    key: &'static str,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            key: STORAGE_KEY,
        }
    }

    /// Stamp `record` with `now_ms` and write it
    ///
    /// The timestamp is updated even when the write fails so the autosave
    /// timer does not retry every frame.
    pub fn save(&mut self, record: &mut ProgressionRecord, now_ms: i64) -> Result<(), StoreError> {
        record.last_save_ms = now_ms;
        let json = serde_json::to_string(record)?;
        self.store.set(self.key, &json)?;
        log::info!("Progress saved ({} coins banked)", record.total_coins);
        Ok(())
    }

    /// Fire-and-forget save: failures are logged, never propagated
    pub fn save_or_log(&mut self, record: &mut ProgressionRecord, now_ms: i64) -> bool {
        match self.save(record, now_ms) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save progress: {e}");
                false
            }
        }
    }

    /// Read the stored record
    ///
    /// `None` when nothing has been saved yet (or storage is unreachable).
    /// A present but damaged record decodes leniently instead of failing.
    pub fn load(&self, now_ms: i64) -> Option<ProgressionRecord> {
        match self.store.get(self.key) {
            Ok(Some(json)) => {
                let record = decode_record(&json, now_ms);
                log::info!(
                    "Loaded progress: {} coins, speed lv {}, handling lv {}, coin lv {}",
                    record.total_coins,
                    record.upgrades.speed.level,
                    record.upgrades.handling.level,
                    record.upgrades.coin_multiplier.level
                );
                Some(record)
            }
            Ok(None) => {
                log::info!("No saved progress found, starting fresh");
                None
            }
            Err(e) => {
                log::warn!("Could not read saved progress: {e}");
                None
            }
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Decode a stored record, substituting defaults for anything unusable
pub fn decode_record(json: &str, now_ms: i64) -> ProgressionRecord {
    let mut record = ProgressionRecord::new(now_ms);

    let value: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Saved progress is corrupt ({e}), using defaults");
            return record;
        }
    };
    let Some(fields) = value.as_object() else {
        log::warn!("Saved progress is not an object, using defaults");
        return record;
    };

    // Legacy saves may hold fractional coin totals
    match fields.get("totalCoins").and_then(Value::as_f64) {
        Some(coins) if coins.is_finite() && coins >= 0.0 => {
            record.total_coins = coins.floor() as u64;
        }
        _ => log::warn!("Saved totalCoins missing or invalid, using 0"),
    }

    if let Some(upgrades) = fields.get("upgrades").and_then(Value::as_object) {
        for attribute in Attribute::ALL {
            match upgrades.get(attribute.as_str()).and_then(decode_upgrade) {
                Some(upgrade) => *record.upgrades.get_mut(attribute) = upgrade,
                None => log::warn!("Saved {} upgrade invalid, using default", attribute.as_str()),
            }
        }
    } else {
        log::warn!("Saved upgrades missing, using defaults");
    }

    if let Some(ts) = fields.get("lastSaveTime").and_then(Value::as_f64) {
        if ts.is_finite() {
            record.last_save_ms = ts as i64;
        }
    }

    record
}

fn decode_upgrade(value: &Value) -> Option<Upgrade> {
    let level = value.get("level")?.as_u64().filter(|level| *level >= 1)?;
    let level = u32::try_from(level).ok()?;
    let cost = value
        .get("cost")?
        .as_f64()
        .filter(|cost| cost.is_finite() && *cost >= 1.0)?;
    Some(Upgrade {
        level,
        cost: cost.floor() as u64,
        // Derived from level so stale or hand-edited values can't drift
        value: Upgrade::value_for_level(level),
    })
}

/// Coins earned while away
///
/// Zero until `offline_threshold_ms` has passed since the last save, then
/// `floor(minutes × idle_earning_rate × coin multiplier)`.
pub fn compute_offline_earnings(record: &ProgressionRecord, now_ms: i64, tuning: &Tuning) -> u64 {
    let elapsed = now_ms.saturating_sub(record.last_save_ms);
    if elapsed < tuning.offline_threshold_ms || elapsed <= 0 {
        return 0;
    }
    let minutes = elapsed as f64 / MS_PER_MINUTE;
    let earnings = minutes
        * tuning.idle_earning_rate as f64
        * record.upgrades.coin_multiplier.value as f64;
    earnings.floor().max(0.0) as u64
}
