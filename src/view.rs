//! Read-only snapshots handed to the presentation layer
//!
//! Nothing here mutates the game; renderers and DOM code draw from these.

use crate::GamePhase;
use crate::consts::ROAD_TILE;
use crate::progression::{Attribute, ProgressionRecord};
use crate::sim::{Coin, Falling, Obstacle, Playfield, Rect, SimContext};

/// Anything that can draw a frame (canvas 2D, test recorder)
pub trait Renderer {
    fn draw(&mut self, frame: &FrameView<'_>);
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub field: Playfield,
    /// Scroll phase of the lane dashes, in `[0, ROAD_TILE)`
    pub road_offset: f32,
    pub speed: f32,
    pub player: Rect,
    pub obstacles: &'a [Obstacle],
    pub coins: &'a [Coin],
    pub score: f32,
    pub collected_coins: f32,
    pub paused: bool,
}

impl<'a> FrameView<'a> {
    pub fn new(ctx: &'a SimContext, paused: bool) -> Self {
        Self {
            field: ctx.field,
            road_offset: ctx.world.road_offset,
            speed: ctx.world.speed,
            player: ctx.player_bounds(),
            obstacles: &ctx.obstacles,
            coins: &ctx.coins,
            score: ctx.session.score,
            collected_coins: ctx.session.collected_coins,
            paused,
        }
    }

    pub fn obstacle_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.obstacles.iter().map(|o| o.bounds())
    }

    pub fn coin_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.coins.iter().map(|c| c.bounds())
    }

    /// X of each lane divider (interior lane boundaries only)
    pub fn divider_xs(&self) -> impl Iterator<Item = f32> + '_ {
        let left = self.field.road_left();
        let lane_w = self.field.lane_width();
        (1..self.field.lane_count).map(move |i| left + lane_w * i as f32)
    }

    /// Y of the top of each divider dash, scrolled by the road offset
    pub fn dash_ys(&self) -> impl Iterator<Item = f32> + '_ {
        let height = self.field.height;
        (0..)
            .map(move |i| i as f32 * ROAD_TILE - self.road_offset)
            .take_while(move |y| *y < height)
    }

    pub fn hud(&self) -> Hud {
        Hud {
            score: format!("SCORE: {}", self.score.floor() as u64),
            coins: format!("COINS: {}", self.collected_coins.floor() as u64),
            speed: format!("SPEED: {:.1}x", self.speed),
        }
    }
}

/// In-run HUD text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hud {
    pub score: String,
    pub coins: String,
    pub speed: String,
}

/// Stats of a finished run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub score: f32,
    pub collected_coins: f32,
}

impl RunSummary {
    /// Whole coins added to the bank
    pub fn banked_coins(&self) -> u64 {
        if self.collected_coins.is_finite() && self.collected_coins > 0.0 {
            self.collected_coins.floor() as u64
        } else {
            0
        }
    }

    pub fn score_label(&self) -> String {
        format!("SCORE: {}", self.score.floor() as u64)
    }

    pub fn coins_label(&self) -> String {
        format!("COINS: {}", self.banked_coins())
    }
}

/// One row of the upgrade shop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeEntry {
    pub attribute: Attribute,
    pub level: u32,
    pub cost: u64,
    pub value: f32,
    pub affordable: bool,
}

impl UpgradeEntry {
    pub fn level_label(&self) -> String {
        format!("Level {}", self.level)
    }

    pub fn cost_label(&self) -> String {
        format!("{} COINS", self.cost)
    }
}

/// Menus and overlays
#[derive(Debug, Clone, PartialEq)]
pub struct MenuView {
    pub phase: GamePhase,
    pub total_coins: u64,
    /// In `Attribute::ALL` order
    pub upgrades: [UpgradeEntry; 3],
    pub last_run: Option<RunSummary>,
    /// Offline grant not yet dismissed
    pub offline_earnings: Option<u64>,
}

impl MenuView {
    pub fn new(
        phase: GamePhase,
        record: &ProgressionRecord,
        last_run: Option<RunSummary>,
        offline_earnings: Option<u64>,
    ) -> Self {
        let upgrades = Attribute::ALL.map(|attribute| {
            let upgrade = record.upgrades.get(attribute);
            UpgradeEntry {
                attribute,
                level: upgrade.level,
                cost: upgrade.cost,
                value: upgrade.value,
                affordable: record.can_afford(attribute),
            }
        });
        Self {
            phase,
            total_coins: record.total_coins,
            upgrades,
            last_run,
            offline_earnings,
        }
    }

    pub fn upgrade(&self, attribute: Attribute) -> &UpgradeEntry {
        let idx = Attribute::ALL
            .iter()
            .position(|a| *a == attribute)
            .unwrap_or(0);
        &self.upgrades[idx]
    }

    pub fn total_coins_label(&self) -> String {
        format!("TOTAL COINS: {}", self.total_coins)
    }

    pub fn offline_label(&self) -> Option<String> {
        self.offline_earnings
            .map(|n| format!("You earned {} coins while away!", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;
    use crate::progression::Upgrades;

    fn ctx() -> SimContext {
        let tuning = Tuning::default();
        let field = Playfield::new(400.0, 600.0, &tuning);
        SimContext::new(field, &tuning, &Upgrades::default())
    }

    #[test]
    fn test_hud_formatting() {
        let mut ctx = ctx();
        ctx.session.score = 123.9;
        ctx.session.collected_coins = 4.8;
        ctx.world.speed = 1.04;
        let hud = FrameView::new(&ctx, false).hud();
        assert_eq!(hud.score, "SCORE: 123");
        assert_eq!(hud.coins, "COINS: 4");
        assert_eq!(hud.speed, "SPEED: 1.0x");
    }

    #[test]
    fn test_three_lanes_have_two_dividers() {
        let ctx = ctx();
        let view = FrameView::new(&ctx, false);
        let xs: Vec<f32> = view.divider_xs().collect();
        assert_eq!(xs.len(), 2);
        let left = view.field.road_left();
        assert!((xs[0] - (left + view.field.lane_width())).abs() < 1e-4);
    }

    #[test]
    fn test_dashes_cover_canvas() {
        let mut ctx = ctx();
        ctx.world.road_offset = 15.0;
        let view = FrameView::new(&ctx, false);
        let ys: Vec<f32> = view.dash_ys().collect();
        assert!(ys[0] <= 0.0);
        assert!(*ys.last().unwrap() + ROAD_TILE >= 600.0);
    }

    #[test]
    fn test_menu_affordability() {
        let mut record = ProgressionRecord::new(0);
        record.total_coins = 120;
        record.purchase(Attribute::Speed);
        let menu = MenuView::new(GamePhase::Upgrades, &record, None, None);

        let speed = menu.upgrade(Attribute::Speed);
        assert_eq!(speed.level, 2);
        assert_eq!(speed.cost, 150);
        assert!(!speed.affordable);
        assert_eq!(menu.total_coins_label(), "TOTAL COINS: 20");
        assert_eq!(menu.upgrade(Attribute::Handling).level_label(), "Level 1");
        assert_eq!(menu.upgrade(Attribute::CoinMultiplier).cost_label(), "100 COINS");
    }

    #[test]
    fn test_run_summary_floors() {
        let run = RunSummary {
            score: 99.99,
            collected_coins: 7.5,
        };
        assert_eq!(run.banked_coins(), 7);
        assert_eq!(run.score_label(), "SCORE: 99");
        assert_eq!(run.coins_label(), "COINS: 7");
    }
}
