//! Variable-timestep simulation step
//!
//! Advances one run by the real elapsed frame time. Effects are applied in a
//! fixed order so a seeded RNG reproduces a run exactly.

use rand::Rng;

use super::collision::{coin_pickup, first_obstacle_hit};
use super::spawn::{maybe_spawn_coin, maybe_spawn_obstacle};
use super::state::{Falling, SimContext};
use crate::consts::*;
use crate::progression::ProgressionRecord;
use crate::tuning::Tuning;

/// Whether the run survives the step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    Crashed,
}

/// What happened during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub result: StepResult,
    /// Coins picked up this step (before the multiplier)
    pub coins_collected: u32,
    /// The autosave interval has elapsed; the caller should persist now
    pub autosave_due: bool,
}

impl StepOutcome {
    fn continued(coins_collected: u32, autosave_due: bool) -> Self {
        Self {
            result: StepResult::Continue,
            coins_collected,
            autosave_due,
        }
    }

    fn crashed() -> Self {
        Self {
            result: StepResult::Crashed,
            coins_collected: 0,
            autosave_due: false,
        }
    }
}

/// Negative, NaN or infinite deltas count as no time passing
#[inline]
pub fn sanitize_dt(dt_ms: f32) -> f32 {
    if dt_ms.is_finite() && dt_ms > 0.0 { dt_ms } else { 0.0 }
}

/// Advance the run by `dt_ms` milliseconds
///
/// `now_ms` is wall-clock epoch time, used only for the autosave check.
pub fn advance<R: Rng + ?Sized>(
    ctx: &mut SimContext,
    progression: &ProgressionRecord,
    tuning: &Tuning,
    rng: &mut R,
    dt_ms: f32,
    now_ms: i64,
) -> StepOutcome {
    let dt = sanitize_dt(dt_ms);
    let upgrades = &progression.upgrades;
    let world = &mut ctx.world;

    world.elapsed_ms += dt;

    // Score, then speed ramp (steeper with the speed upgrade)
    ctx.session.score += dt * SCORE_RATE * world.speed;
    world.speed += tuning.acceleration_rate * dt * upgrades.speed.value;

    world.road_offset += world.speed * dt * ROAD_SCROLL_RATE;
    if world.road_offset >= ROAD_TILE {
        world.road_offset = 0.0;
    }

    if let Some(obstacle) =
        maybe_spawn_obstacle(world, &ctx.obstacles, &ctx.field, tuning, rng, dt)
    {
        ctx.obstacles.push(obstacle);
    }
    if let Some(coin) = maybe_spawn_coin(world, &ctx.field, tuning, rng, dt) {
        ctx.coins.push(coin);
    }

    let frames = dt / FRAME_MS;
    let field = ctx.field;
    ctx.obstacles.retain_mut(|o| {
        o.fall(frames);
        !o.is_off_screen(&field)
    });
    ctx.coins.retain_mut(|c| {
        c.fall(frames);
        !c.is_off_screen(&field)
    });

    let player = ctx.player_bounds();

    if !ctx.player.invulnerable {
        let hit = first_obstacle_hit(
            &player,
            ctx.obstacles.iter().map(|o| o.bounds()),
            tuning.collision_tolerance,
        );
        if let Some(index) = hit {
            log::debug!("Crashed into obstacle {index} at score {:.0}", ctx.session.score);
            ctx.world.running = false;
            return StepOutcome::crashed();
        }
    }

    // Every overlapping coin is collected
    let before = ctx.coins.len();
    ctx.coins.retain(|c| !coin_pickup(&player, &c.bounds()));
    let coins_collected = (before - ctx.coins.len()) as u32;
    ctx.session.collected_coins += coins_collected as f32 * upgrades.coin_multiplier.value;

    let autosave_due = ctx.world.running
        && now_ms.saturating_sub(progression.last_save_ms) >= tuning.autosave_interval_ms;

    StepOutcome::continued(coins_collected, autosave_due)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::{Attribute, Upgrades};
    use crate::sim::spawn::test_rng::ConstRng;
    use crate::sim::state::{Coin, Obstacle, Playfield};
    use approx::assert_relative_eq;
    use glam::Vec2;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const NOW: i64 = 1_000_000;

    fn setup() -> (SimContext, ProgressionRecord, Tuning) {
        let tuning = Tuning::default();
        let progression = ProgressionRecord::new(NOW);
        let field = Playfield::new(400.0, 600.0, &tuning);
        let mut ctx = SimContext::new(field, &tuning, &progression.upgrades);
        ctx.reset(&tuning, &progression.upgrades);
        (ctx, progression, tuning)
    }

    /// Never spawns anything
    fn quiet() -> ConstRng {
        ConstRng(u32::MAX)
    }

    fn obstacle_on_player(ctx: &SimContext) -> Obstacle {
        let p = ctx.player_bounds();
        Obstacle {
            pos: Vec2::new(p.pos.x, p.pos.y + 10.0),
            size: Vec2::splat(OBSTACLE_SIZE),
            fall_speed: 0.0,
        }
    }

    #[test]
    fn test_score_and_speed_ramp() {
        let (mut ctx, progression, tuning) = setup();
        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), 100.0, NOW);
        assert_eq!(out.result, StepResult::Continue);
        // 100ms × 0.01 × 0.7
        assert_relative_eq!(ctx.session.score, 0.7, epsilon = 1e-5);
        assert_relative_eq!(ctx.world.speed, 0.7 + 0.00002 * 100.0, epsilon = 1e-6);
        assert_relative_eq!(ctx.world.elapsed_ms, 100.0);
    }

    #[test]
    fn test_speed_upgrade_steepens_ramp() {
        let (mut ctx, mut progression, tuning) = setup();
        progression.total_coins = 100;
        assert!(progression.purchase(Attribute::Speed));
        let start = ctx.world.speed;
        advance(&mut ctx, &progression, &tuning, &mut quiet(), 1000.0, NOW);
        assert_relative_eq!(ctx.world.speed - start, 0.00002 * 1000.0 * 1.2, epsilon = 1e-6);
    }

    #[test]
    fn test_road_offset_wraps() {
        let (mut ctx, progression, tuning) = setup();
        ctx.world.road_offset = 39.0;
        advance(&mut ctx, &progression, &tuning, &mut quiet(), 16.0, NOW);
        assert_eq!(ctx.world.road_offset, 0.0);
        advance(&mut ctx, &progression, &tuning, &mut quiet(), 16.0, NOW);
        assert!(ctx.world.road_offset > 0.0 && ctx.world.road_offset < ROAD_TILE);
    }

    #[test]
    fn test_bad_delta_has_no_effect() {
        let (mut ctx, progression, tuning) = setup();
        let before = (ctx.world, ctx.session);
        for dt in [-50.0, 0.0, f32::NAN, f32::NEG_INFINITY] {
            advance(&mut ctx, &progression, &tuning, &mut ConstRng(0), dt, NOW);
        }
        assert_eq!((ctx.world, ctx.session), before);
        // Zero-probability rolls never spawn
        assert!(ctx.obstacles.is_empty() && ctx.coins.is_empty());
    }

    #[test]
    fn test_entities_fall_and_leave() {
        let (mut ctx, progression, tuning) = setup();
        ctx.player.lane = 0;
        ctx.obstacles.push(Obstacle {
            pos: Vec2::new(ctx.field.lane_center_x(2) - 20.0, 300.0),
            size: Vec2::splat(OBSTACLE_SIZE),
            fall_speed: 3.0,
        });
        ctx.coins.push(Coin {
            pos: Vec2::new(ctx.field.lane_center_x(2) - 10.0, 599.0),
            size: Vec2::splat(COIN_SIZE),
            fall_speed: 3.0,
        });

        advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS * 2.0, NOW);
        assert_relative_eq!(ctx.obstacles[0].pos.y, 306.0, epsilon = 1e-3);
        assert!(ctx.coins.is_empty());
    }

    #[test]
    fn test_obstacle_crash_ends_run() {
        let (mut ctx, progression, tuning) = setup();
        let obstacle = obstacle_on_player(&ctx);
        ctx.obstacles.push(obstacle);

        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS, NOW);
        assert_eq!(out.result, StepResult::Crashed);
        assert!(!ctx.world.running);
    }

    #[test]
    fn test_crash_skips_coin_collection() {
        let (mut ctx, progression, tuning) = setup();
        let obstacle = obstacle_on_player(&ctx);
        ctx.obstacles.push(obstacle);
        let p = ctx.player_bounds();
        ctx.coins.push(Coin {
            pos: p.pos,
            size: Vec2::splat(COIN_SIZE),
            fall_speed: 0.0,
        });

        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS, NOW);
        assert_eq!(out.result, StepResult::Crashed);
        assert_eq!(ctx.session.collected_coins, 0.0);
    }

    #[test]
    fn test_invulnerable_player_passes_through() {
        let (mut ctx, progression, tuning) = setup();
        let obstacle = obstacle_on_player(&ctx);
        ctx.obstacles.push(obstacle);
        ctx.player.invulnerable = true;

        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS, NOW);
        assert_eq!(out.result, StepResult::Continue);
        assert!(ctx.world.running);
    }

    #[test]
    fn test_grazing_obstacle_is_forgiven() {
        let (mut ctx, progression, tuning) = setup();
        let p = ctx.player_bounds();
        // Overlaps the car's visual box by 10px, but not its hitbox
        ctx.obstacles.push(Obstacle {
            pos: Vec2::new(p.pos.x, p.pos.y - 30.0),
            size: Vec2::splat(OBSTACLE_SIZE),
            fall_speed: 0.0,
        });
        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS, NOW);
        assert_eq!(out.result, StepResult::Continue);
    }

    #[test]
    fn test_all_overlapping_coins_collected_with_multiplier() {
        let (mut ctx, mut progression, tuning) = setup();
        progression.total_coins = 100;
        assert!(progression.purchase(Attribute::CoinMultiplier));
        let p = ctx.player_bounds();
        for dy in [0.0, 20.0, 40.0] {
            ctx.coins.push(Coin {
                pos: Vec2::new(p.pos.x + 10.0, p.pos.y + dy),
                size: Vec2::splat(COIN_SIZE),
                fall_speed: 0.0,
            });
        }
        // Far away coin stays
        ctx.coins.push(Coin {
            pos: Vec2::new(p.pos.x, 0.0),
            size: Vec2::splat(COIN_SIZE),
            fall_speed: 0.0,
        });

        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS, NOW);
        assert_eq!(out.coins_collected, 3);
        assert_eq!(ctx.coins.len(), 1);
        assert_relative_eq!(ctx.session.collected_coins, 3.6, epsilon = 1e-5);
    }

    #[test]
    fn test_autosave_due_after_interval() {
        let (mut ctx, progression, tuning) = setup();
        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS, NOW + 59_999);
        assert!(!out.autosave_due);
        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS, NOW + 60_000);
        assert!(out.autosave_due);

        // Not while stopped
        ctx.world.running = false;
        let out = advance(&mut ctx, &progression, &tuning, &mut quiet(), FRAME_MS, NOW + 90_000);
        assert!(!out.autosave_due);
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let run = || {
            let (mut ctx, progression, tuning) = setup();
            ctx.player.invulnerable = true;
            let mut rng = Pcg32::seed_from_u64(42);
            for i in 0..600 {
                let dt = 12.0 + (i % 7) as f32;
                advance(&mut ctx, &progression, &tuning, &mut rng, dt, NOW);
            }
            ctx
        };
        let a = run();
        let b = run();
        assert_eq!(a.obstacles, b.obstacles);
        assert_eq!(a.coins, b.coins);
        assert_eq!(a.session, b.session);
    }

    #[test]
    fn test_spawn_spacing_holds_during_run() {
        let (mut ctx, progression, mut tuning) = setup();
        tuning.obstacle_spawn_rate = 1.0;
        ctx.player.invulnerable = true;
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..500 {
            advance(&mut ctx, &progression, &tuning, &mut rng, FRAME_MS, NOW);
            let in_buffer = ctx
                .obstacles
                .iter()
                .filter(|o| o.pos.y < tuning.spawn_buffer)
                .count();
            assert!(in_buffer <= 1);
        }
    }

    proptest! {
        #[test]
        fn prop_speed_and_score_never_decrease(
            dts in proptest::collection::vec(-100.0f32..200.0, 1..50),
            seed in any::<u64>()
        ) {
            let (mut ctx, progression, tuning) = setup();
            ctx.player.invulnerable = true;
            let mut rng = Pcg32::seed_from_u64(seed);
            for dt in dts {
                let speed = ctx.world.speed;
                let score = ctx.session.score;
                advance(&mut ctx, &progression, &tuning, &mut rng, dt, NOW);
                prop_assert!(ctx.world.speed >= speed);
                prop_assert!(ctx.session.score >= score);
                prop_assert!(ctx.world.road_offset >= 0.0 && ctx.world.road_offset < ROAD_TILE);
            }
        }
    }

    #[test]
    fn test_fresh_run_state() {
        let tuning = Tuning::default();
        let mut upgrades = Upgrades::default();
        upgrades.speed.value = 1.4;
        let field = Playfield::new(400.0, 600.0, &tuning);
        let mut ctx = SimContext::new(field, &tuning, &upgrades);
        ctx.session.score = 10.0;
        ctx.reset(&tuning, &upgrades);
        assert_eq!(ctx.session.score, 0.0);
        assert_eq!(ctx.session.collected_coins, 0.0);
        assert_relative_eq!(ctx.world.speed, 0.7 * 1.4);
        assert!(ctx.obstacles.is_empty() && ctx.coins.is_empty());
    }
}
