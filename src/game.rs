//! Game loop controller
//!
//! Owns the run/pause/game-over state machine and is the only caller of
//! `sim::advance`. At most one animation frame is ever outstanding: every
//! transition that stops the loop cancels the pending request first.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::persistence::{KeyValueStore, ProgressStore, compute_offline_earnings};
use crate::platform::{Clock, FrameHandle, FrameScheduler};
use crate::progression::{Attribute, ProgressionRecord};
use crate::sim::{Playfield, SimContext, StepResult, advance};
use crate::tuning::Tuning;
use crate::view::{FrameView, MenuView, RunSummary};

/// Which screen the game is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Title screen
    Start,
    /// Upgrade shop
    Upgrades,
    /// Active run
    Running,
    /// Run suspended, no frames scheduled
    Paused,
    /// Run ended by a crash
    GameOver,
}

/// Discrete input delivered between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    LaneLeft,
    LaneRight,
    TogglePause,
    /// Start (or restart) a run
    Start,
    OpenUpgrades,
    CloseUpgrades,
    Purchase(Attribute),
}

/// The game: simulation, progression and loop state
pub struct Game<S: KeyValueStore, F: FrameScheduler, C: Clock> {
    tuning: Tuning,
    ctx: SimContext,
    progression: ProgressionRecord,
    progress: ProgressStore<S>,
    scheduler: F,
    clock: C,
    rng: Pcg32,
    phase: GamePhase,
    /// Single slot: the one outstanding frame request, if any
    pending_frame: Option<FrameHandle>,
    /// Timestamp (ms, frame clock) of the previous step
    last_frame_ms: f64,
    /// Offline grant not yet shown to the player
    offline_earnings: Option<u64>,
    last_run: Option<RunSummary>,
}

impl<S: KeyValueStore, F: FrameScheduler, C: Clock> Game<S, F, C> {
    /// Load progression, grant offline earnings and show the title screen
    pub fn new(
        tuning: Tuning,
        canvas_size: (f32, f32),
        store: S,
        scheduler: F,
        clock: C,
        seed: u64,
    ) -> Self {
        let now = clock.now_ms();
        let mut progress = ProgressStore::new(store);
        let mut offline_earnings = None;

        let progression = match progress.load(now) {
            Some(mut record) => {
                let earnings = compute_offline_earnings(&record, now, &tuning);
                if earnings > 0 {
                    log::info!("Earned {} coins while away", earnings);
                    record.total_coins = record.total_coins.saturating_add(earnings);
                    offline_earnings = Some(earnings);
                    // Re-stamp so a reload can't grant the same interval again
                    progress.save_or_log(&mut record, now);
                }
                record
            }
            None => ProgressionRecord::new(now),
        };

        let field = Playfield::new(canvas_size.0, canvas_size.1, &tuning);
        let ctx = SimContext::new(field, &tuning, &progression.upgrades);

        log::info!("Game initialized with seed: {}", seed);

        Self {
            tuning,
            ctx,
            progression,
            progress,
            scheduler,
            clock,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Start,
            pending_frame: None,
            last_frame_ms: 0.0,
            offline_earnings,
            last_run: None,
        }
    }

    /// Apply one input event; `now_frame_ms` is the frame clock
    pub fn handle_input(&mut self, event: InputEvent, now_frame_ms: f64) {
        match event {
            InputEvent::LaneLeft if self.phase == GamePhase::Running => {
                self.ctx.player.shift_left();
            }
            InputEvent::LaneRight if self.phase == GamePhase::Running => {
                self.ctx.player.shift_right(self.ctx.field.lane_count);
            }
            InputEvent::TogglePause => self.toggle_pause(now_frame_ms),
            InputEvent::Start
                if matches!(self.phase, GamePhase::Start | GamePhase::GameOver) =>
            {
                self.start(now_frame_ms);
            }
            InputEvent::OpenUpgrades
                if matches!(self.phase, GamePhase::Start | GamePhase::GameOver) =>
            {
                self.phase = GamePhase::Upgrades;
            }
            InputEvent::CloseUpgrades if self.phase == GamePhase::Upgrades => {
                self.phase = GamePhase::Start;
            }
            InputEvent::Purchase(attribute) => {
                self.purchase(attribute);
            }
            _ => {}
        }
    }

    /// Begin a fresh run, replacing any loop already in flight
    pub fn start(&mut self, now_frame_ms: f64) {
        self.cancel_pending();
        self.ctx.reset(&self.tuning, &self.progression.upgrades);
        self.phase = GamePhase::Running;
        self.last_frame_ms = now_frame_ms;
        self.last_run = None;
        log::info!("Run started at {:.2}x speed", self.ctx.world.speed);
        self.schedule();
    }

    /// Pause a running game or resume a paused one
    pub fn toggle_pause(&mut self, now_frame_ms: f64) {
        match self.phase {
            GamePhase::Running => {
                self.cancel_pending();
                self.ctx.world.running = false;
                self.phase = GamePhase::Paused;
                log::info!("Paused");
            }
            GamePhase::Paused => {
                self.ctx.world.running = true;
                self.phase = GamePhase::Running;
                // Time spent paused doesn't count
                self.last_frame_ms = now_frame_ms;
                log::info!("Resumed");
                self.schedule();
            }
            _ => {}
        }
    }

    /// Animation-frame callback
    pub fn on_frame(&mut self, timestamp_ms: f64) {
        // The request that brought us here has fired
        self.pending_frame = None;

        if self.phase != GamePhase::Running {
            return;
        }

        let dt = self.frame_delta(timestamp_ms);
        let now = self.clock.now_ms();
        let outcome = advance(
            &mut self.ctx,
            &self.progression,
            &self.tuning,
            &mut self.rng,
            dt as f32,
            now,
        );

        match outcome.result {
            StepResult::Crashed => self.game_over(),
            StepResult::Continue => {
                if outcome.autosave_due {
                    self.progress.save_or_log(&mut self.progression, now);
                }
                self.schedule();
            }
        }
    }

    /// Buy an upgrade from the shop; refused mid-run
    pub fn purchase(&mut self, attribute: Attribute) -> bool {
        if matches!(self.phase, GamePhase::Running | GamePhase::Paused) {
            return false;
        }
        if !self.progression.purchase(attribute) {
            return false;
        }
        let now = self.clock.now_ms();
        self.progress.save_or_log(&mut self.progression, now);
        true
    }

    /// Persist now (page hide, explicit save)
    pub fn save(&mut self) -> bool {
        let now = self.clock.now_ms();
        self.progress.save_or_log(&mut self.progression, now)
    }

    /// Canvas resized; the player keeps its lane
    pub fn resize(&mut self, width: f32, height: f32) {
        self.ctx.resize(width, height);
    }

    /// Offline grant to announce, returned once
    pub fn take_offline_earnings(&mut self) -> Option<u64> {
        self.offline_earnings.take()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn progression(&self) -> &ProgressionRecord {
        &self.progression
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn sim(&self) -> &SimContext {
        &self.ctx
    }

    /// Direct access to the run (power-ups, debugging)
    pub fn sim_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn store(&self) -> &S {
        self.progress.store()
    }

    /// Whether a frame request is outstanding
    pub fn frame_pending(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// Snapshot for the renderer
    pub fn frame_view(&self) -> FrameView<'_> {
        FrameView::new(&self.ctx, self.phase == GamePhase::Paused)
    }

    /// Snapshot for menus and the HUD overlay
    pub fn menu_view(&self) -> MenuView {
        MenuView::new(
            self.phase,
            &self.progression,
            self.last_run,
            self.offline_earnings,
        )
    }

    /// Non-negative delta since the previous step, capped
    fn frame_delta(&mut self, timestamp_ms: f64) -> f64 {
        let raw = timestamp_ms - self.last_frame_ms;
        if timestamp_ms.is_finite() && timestamp_ms > self.last_frame_ms {
            self.last_frame_ms = timestamp_ms;
        }
        if raw.is_finite() && raw > 0.0 {
            raw.min(self.tuning.max_frame_delta_ms)
        } else {
            0.0
        }
    }

    fn game_over(&mut self) {
        self.cancel_pending();
        self.ctx.world.running = false;
        self.phase = GamePhase::GameOver;

        let summary = RunSummary {
            score: self.ctx.session.score,
            collected_coins: self.ctx.session.collected_coins,
        };
        let banked = summary.banked_coins();
        self.progression.total_coins = self.progression.total_coins.saturating_add(banked);
        self.last_run = Some(summary);

        log::info!(
            "Game over: score {:.0}, {} coins banked ({} total)",
            summary.score,
            banked,
            self.progression.total_coins
        );
        let now = self.clock.now_ms();
        self.progress.save_or_log(&mut self.progression, now);
    }

    fn schedule(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = self.scheduler.request_frame();
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.scheduler.cancel_frame(handle);
        }
    }
}
