//! Probabilistic obstacle and coin spawning
//!
//! Spawn chance is normalized to 60 Hz frames so the expected spawn count
//! per second doesn't depend on the display refresh rate.

use glam::Vec2;
use rand::Rng;

use super::state::{Coin, Obstacle, Playfield, World};
use crate::consts::{COIN_SIZE, FRAME_MS, OBSTACLE_SIZE};
use crate::tuning::Tuning;

/// Probability of a spawn this step
#[inline]
pub fn spawn_chance(base_rate: f32, speed: f32, dt_ms: f32) -> f32 {
    base_rate * speed * (dt_ms / FRAME_MS)
}

/// Roll the spawn chance, then pick a lane
///
/// The lane is drawn whenever the roll succeeds, even if the caller later
/// rejects the spawn, so the RNG stream stays the same either way.
fn roll_lane<R: Rng + ?Sized>(
    rng: &mut R,
    base_rate: f32,
    world: &World,
    field: &Playfield,
    dt_ms: f32,
) -> Option<u32> {
    let roll: f32 = rng.random();
    if roll < spawn_chance(base_rate, world.speed, dt_ms) {
        Some(rng.random_range(0..field.lane_count))
    } else {
        None
    }
}

/// Maybe spawn an obstacle above the road
///
/// Skipped while any obstacle (in any lane) is still inside the top
/// `spawn_buffer` pixels.
pub fn maybe_spawn_obstacle<R: Rng + ?Sized>(
    world: &World,
    obstacles: &[Obstacle],
    field: &Playfield,
    tuning: &Tuning,
    rng: &mut R,
    dt_ms: f32,
) -> Option<Obstacle> {
    let lane = roll_lane(rng, tuning.obstacle_spawn_rate, world, field, dt_ms)?;

    if obstacles.iter().any(|o| o.pos.y < tuning.spawn_buffer) {
        return None;
    }

    log::debug!("Obstacle spawned in lane {lane}");
    Some(Obstacle {
        pos: Vec2::new(
            field.lane_center_x(lane) - OBSTACLE_SIZE / 2.0,
            -OBSTACLE_SIZE,
        ),
        size: Vec2::splat(OBSTACLE_SIZE),
        fall_speed: tuning.obstacle_speed * world.speed,
    })
}

/// Maybe spawn a coin above the road (no spacing rule)
pub fn maybe_spawn_coin<R: Rng + ?Sized>(
    world: &World,
    field: &Playfield,
    tuning: &Tuning,
    rng: &mut R,
    dt_ms: f32,
) -> Option<Coin> {
    let lane = roll_lane(rng, tuning.coin_spawn_rate, world, field, dt_ms)?;

    Some(Coin {
        pos: Vec2::new(field.lane_center_x(lane) - COIN_SIZE / 2.0, -COIN_SIZE),
        size: Vec2::splat(COIN_SIZE),
        // Coins fall with the obstacles
        fall_speed: tuning.obstacle_speed * world.speed,
    })
}

#[cfg(test)]
pub(crate) mod test_rng {
    use rand::RngCore;

    /// Returns the same word forever: 0 always spawns, `u32::MAX` never does
    pub struct ConstRng(pub u32);

    impl RngCore for ConstRng {
        fn next_u32(&mut self) -> u32 {
            self.0
        }

        fn next_u64(&mut self) -> u64 {
            ((self.0 as u64) << 32) | self.0 as u64
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for (i, byte) in dst.iter_mut().enumerate() {
                *byte = self.0.to_le_bytes()[i % 4];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_rng::ConstRng;
    use super::*;
    use crate::progression::Upgrades;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn setup() -> (World, Playfield, Tuning) {
        let tuning = Tuning::default();
        let mut world = World::new(&tuning, &Upgrades::default());
        world.speed = 1.0;
        (world, Playfield::new(400.0, 600.0, &tuning), tuning)
    }

    #[test]
    fn test_spawn_chance_scales_with_frame_time() {
        assert_relative_eq!(spawn_chance(0.01, 1.0, FRAME_MS), 0.01);
        assert_relative_eq!(spawn_chance(0.01, 2.0, FRAME_MS * 2.0), 0.04, epsilon = 1e-6);
        assert_eq!(spawn_chance(0.01, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_obstacle_spawns_above_lane() {
        let (world, field, tuning) = setup();
        let obstacle =
            maybe_spawn_obstacle(&world, &[], &field, &tuning, &mut ConstRng(0), FRAME_MS).unwrap();
        // Lane 0 of a 250px road centered in 400px
        assert_relative_eq!(obstacle.pos.x, 75.0 + 250.0 / 6.0 - 20.0, epsilon = 1e-4);
        assert_eq!(obstacle.pos.y, -OBSTACLE_SIZE);
        assert_relative_eq!(obstacle.fall_speed, 3.0);
    }

    #[test]
    fn test_failed_roll_spawns_nothing() {
        let (world, field, tuning) = setup();
        let mut rng = ConstRng(u32::MAX);
        assert!(maybe_spawn_obstacle(&world, &[], &field, &tuning, &mut rng, FRAME_MS).is_none());
        assert!(maybe_spawn_coin(&world, &field, &tuning, &mut rng, FRAME_MS).is_none());
    }

    #[test]
    fn test_obstacle_in_buffer_blocks_every_lane() {
        let (world, field, tuning) = setup();
        let blocker = Obstacle {
            pos: Vec2::new(field.lane_center_x(2) - 20.0, 50.0),
            size: Vec2::splat(OBSTACLE_SIZE),
            fall_speed: 3.0,
        };
        // Rate high enough that every roll succeeds
        let mut hot = tuning.clone();
        hot.obstacle_spawn_rate = 10.0;
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            assert!(
                maybe_spawn_obstacle(&world, &[blocker], &field, &hot, &mut rng, FRAME_MS)
                    .is_none()
            );
        }

        // Once it has cleared the buffer spawning resumes
        let cleared = Obstacle {
            pos: Vec2::new(blocker.pos.x, 100.0),
            ..blocker
        };
        assert!(
            maybe_spawn_obstacle(&world, &[cleared], &field, &tuning, &mut ConstRng(0), FRAME_MS)
                .is_some()
        );
    }

    #[test]
    fn test_coins_ignore_spacing_and_share_speed() {
        let (mut world, field, tuning) = setup();
        world.speed = 1.5;
        let coin = maybe_spawn_coin(&world, &field, &tuning, &mut ConstRng(0), FRAME_MS).unwrap();
        assert_eq!(coin.pos.y, -COIN_SIZE);
        assert_relative_eq!(coin.fall_speed, 4.5);
    }

    #[test]
    fn test_lanes_cover_the_road() {
        let (world, field, mut tuning) = setup();
        tuning.coin_spawn_rate = 10.0;
        let mut rng = Pcg32::seed_from_u64(1234);
        let mut seen = [false; 3];
        for _ in 0..300 {
            let coin = maybe_spawn_coin(&world, &field, &tuning, &mut rng, FRAME_MS).unwrap();
            let lane = ((coin.pos.x + COIN_SIZE / 2.0 - field.road_left()) / field.lane_width()) as usize;
            seen[lane] = true;
        }
        assert_eq!(seen, [true; 3]);
    }
}
