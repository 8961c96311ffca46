//! Retro Rush entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, Document, HtmlCanvasElement, KeyboardEvent, MouseEvent,
        TouchEvent,
    };

    use retro_rush::persistence::LocalStore;
    use retro_rush::platform::SystemClock;
    use retro_rush::platform::web::WebFrameScheduler;
    use retro_rush::view::{FrameView, Renderer};
    use retro_rush::{Attribute, Game, GamePhase, InputEvent, Tuning};

    type WebGame = Game<LocalStore, WebFrameScheduler, SystemClock>;

    /// Clickable elements and the input each one sends
    const BUTTONS: [(&str, InputEvent); 7] = [
        ("start-button", InputEvent::Start),
        ("restart-button", InputEvent::Start),
        ("upgrade-button", InputEvent::OpenUpgrades),
        ("back-button", InputEvent::CloseUpgrades),
        ("upgrade-speed", InputEvent::Purchase(Attribute::Speed)),
        ("upgrade-handling", InputEvent::Purchase(Attribute::Handling)),
        ("upgrade-coin", InputEvent::Purchase(Attribute::CoinMultiplier)),
    ];

    /// Game instance plus the page it draws into
    struct App {
        game: WebGame,
        renderer: CanvasRenderer,
        document: Document,
    }

    impl App {
        /// Redraw the canvas and sync the DOM screens
        fn refresh(&mut self) {
            self.renderer.draw(&self.game.frame_view());
            update_dom(&self.document, &self.game);
        }
    }

    /// Canvas 2D renderer
    struct CanvasRenderer {
        ctx: CanvasRenderingContext2d,
    }

    impl CanvasRenderer {
        fn fill(&self, color: &str, x: f32, y: f32, w: f32, h: f32) {
            self.ctx.set_fill_style_str(color);
            self.ctx.fill_rect(x as f64, y as f64, w as f64, h as f64);
        }

        fn draw_paused(&self, width: f32, height: f32) {
            self.fill("rgba(0, 0, 0, 0.5)", 0.0, 0.0, width, height);
            let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
            self.ctx.set_fill_style_str("#FFF");
            self.ctx.set_text_align("center");
            self.ctx.set_font("20px \"Press Start 2P\", system-ui, sans-serif");
            let _ = self.ctx.fill_text("PAUSED", cx, cy);
            self.ctx.set_font("12px \"Press Start 2P\", system-ui, sans-serif");
            let _ = self.ctx.fill_text("Press SPACE to resume", cx, cy + 30.0);
        }
    }

    impl Renderer for CanvasRenderer {
        fn draw(&mut self, frame: &FrameView<'_>) {
            let field = &frame.field;
            let road_left = field.road_left();

            // Sky and road
            self.fill("#333366", 0.0, 0.0, field.width, field.height);
            self.fill("#444", road_left, 0.0, field.road_width, field.height);

            // Lane dashes
            self.ctx.set_fill_style_str("#FFF");
            for x in frame.divider_xs() {
                for y in frame.dash_ys() {
                    self.ctx.fill_rect((x - 2.0) as f64, y as f64, 4.0, 20.0);
                }
            }

            // Road edges
            self.fill("#FF0", road_left - 5.0, 0.0, 5.0, field.height);
            self.fill("#FF0", road_left + field.road_width, 0.0, 5.0, field.height);

            for r in frame.obstacle_rects() {
                self.fill("#F33", r.pos.x, r.pos.y, r.size.x, r.size.y);
            }

            self.ctx.set_fill_style_str("#FF0");
            for r in frame.coin_rects() {
                let c = r.center();
                self.ctx.begin_path();
                let _ = self.ctx.arc(
                    c.x as f64,
                    c.y as f64,
                    (r.size.x / 2.0) as f64,
                    0.0,
                    std::f64::consts::TAU,
                );
                self.ctx.fill();
            }

            // Car: body, windshield, wheels
            let p = frame.player;
            self.fill("#0AF", p.pos.x, p.pos.y, p.size.x, p.size.y);
            self.fill("#8CF", p.pos.x + 5.0, p.pos.y + 5.0, p.size.x - 10.0, 15.0);
            for (dx, dy) in [
                (-3.0, 10.0),
                (-3.0, 35.0),
                (p.size.x - 3.0, 10.0),
                (p.size.x - 3.0, 35.0),
            ] {
                self.fill("#000", p.pos.x + dx, p.pos.y + dy, 6.0, 15.0);
            }

            if frame.paused {
                self.draw_paused(field.width, field.height);
            }
        }
    }

    /// Monotonic frame clock (same timebase as requestAnimationFrame)
    fn frame_clock() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0)
    }

    fn dispatch(app: &Rc<RefCell<App>>, input: InputEvent) {
        let mut app = app.borrow_mut();
        app.game.handle_input(input, frame_clock());
        app.refresh();
    }

    fn set_hidden(document: &Document, id: &str, hidden: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.class_list().toggle_with_force("hidden", hidden);
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn dom_prefix(attribute: Attribute) -> &'static str {
        match attribute {
            Attribute::Speed => "speed",
            Attribute::Handling => "handling",
            Attribute::CoinMultiplier => "coin",
        }
    }

    /// Show the screen for the current phase and fill in its text
    fn update_dom(document: &Document, game: &WebGame) {
        let phase = game.phase();
        let in_run = matches!(phase, GamePhase::Running | GamePhase::Paused);
        set_hidden(document, "start-screen", phase != GamePhase::Start);
        set_hidden(document, "upgrade-screen", phase != GamePhase::Upgrades);
        set_hidden(document, "game-over-screen", phase != GamePhase::GameOver);
        set_hidden(document, "hud", !in_run);

        if in_run {
            let hud = game.frame_view().hud();
            set_text(document, "score", &hud.score);
            set_text(document, "coins", &hud.coins);
            set_text(document, "speed", &hud.speed);
            return;
        }

        let menu = game.menu_view();
        if let Some(run) = menu.last_run {
            set_text(document, "final-score", &run.score_label());
            set_text(document, "coins-collected", &run.coins_label());
        }
        set_text(document, "total-coins", &menu.total_coins_label());
        for entry in &menu.upgrades {
            let prefix = dom_prefix(entry.attribute);
            set_text(document, &format!("{}-level", prefix), &entry.level.to_string());
            set_text(document, &format!("{}-cost", prefix), &entry.cost.to_string());
            if let Some(btn) = document.get_element_by_id(&format!("upgrade-{}", prefix)) {
                let _ = btn.toggle_attribute_with_force("disabled", !entry.affordable);
            }
        }
    }

    /// Match the canvas to its container; returns the new size
    fn fit_canvas(document: &Document, canvas: &HtmlCanvasElement) -> (f32, f32) {
        let (w, h) = match document.get_element_by_id("game-container") {
            Some(container) => (container.client_width(), container.client_height()),
            None => (canvas.client_width(), canvas.client_height()),
        };
        let (w, h) = (w.max(1) as u32, h.max(1) as u32);
        canvas.set_width(w);
        canvas.set_height(h);
        (w as f32, h as f32)
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Retro Rush starting...");

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("game-canvas")
            .ok_or_else(|| JsValue::from_str("no canvas"))?
            .dyn_into()?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into()?;

        let size = fit_canvas(&document, &canvas);
        let seed = js_sys::Date::now() as u64;
        let (scheduler, frame_slot) = WebFrameScheduler::new();
        let game = Game::new(
            Tuning::default(),
            size,
            LocalStore::new(),
            scheduler,
            SystemClock,
            seed,
        );

        let app = Rc::new(RefCell::new(App {
            game,
            renderer: CanvasRenderer { ctx },
            document: document.clone(),
        }));

        // Animation frame: step, draw, sync DOM
        {
            let app = app.clone();
            *frame_slot.borrow_mut() = Some(Closure::<dyn FnMut(f64)>::new(
                move |timestamp: f64| {
                    let mut app = app.borrow_mut();
                    app.game.on_frame(timestamp);
                    app.refresh();
                },
            ));
        }

        setup_input_handlers(&window, &canvas, app.clone());
        setup_buttons(&document, app.clone());
        setup_resize(&window, &document, &canvas, app.clone());

        // Flush progress when the tab goes away
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().game.save();
            });
            let _ = window
                .add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        let notice = {
            let mut app = app.borrow_mut();
            app.refresh();
            let notice = app.game.menu_view().offline_label();
            app.game.take_offline_earnings();
            notice
        };
        if let Some(message) = notice {
            let _ = window.alert_with_message(&message);
        }

        log::info!("Retro Rush running!");
        Ok(())
    }

    fn setup_input_handlers(
        window: &web_sys::Window,
        canvas: &HtmlCanvasElement,
        app: Rc<RefCell<App>>,
    ) {
        // Keyboard
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let input = match event.key().as_str() {
                    "ArrowLeft" => InputEvent::LaneLeft,
                    "ArrowRight" => InputEvent::LaneRight,
                    " " | "Spacebar" => InputEvent::TogglePause,
                    "Enter" => InputEvent::Start,
                    _ => return,
                };
                event.prevent_default();
                dispatch(&app, input);
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch: left half steers left, right half steers right
        {
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                let Some(touch) = event.touches().get(0) else {
                    return;
                };
                let rect = canvas_clone.get_bounding_client_rect();
                let x = touch.client_x() as f64 - rect.left();
                let input = if x < rect.width() / 2.0 {
                    InputEvent::LaneLeft
                } else {
                    InputEvent::LaneRight
                };
                dispatch(&app, input);
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(document: &Document, app: Rc<RefCell<App>>) {
        for (id, input) in BUTTONS {
            let Some(btn) = document.get_element_by_id(id) else {
                log::warn!("Missing button #{}", id);
                continue;
            };
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                dispatch(&app, input);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(
        window: &web_sys::Window,
        document: &Document,
        canvas: &HtmlCanvasElement,
        app: Rc<RefCell<App>>,
    ) {
        let document = document.clone();
        let canvas = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (w, h) = fit_canvas(&document, &canvas);
            let mut app = app.borrow_mut();
            app.game.resize(w, h);
            app.refresh();
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use retro_rush::consts::FRAME_MS;
    use retro_rush::persistence::MemoryStore;
    use retro_rush::platform::{Clock, ManualClock, ManualScheduler, SystemClock};
    use retro_rush::sim::{Falling, SimContext};
    use retro_rush::{Attribute, Game, GamePhase, InputEvent, Tuning};

    /// Runs before buying upgrades and starting over
    const RUNS: u32 = 3;
    /// Frame cap per run (five minutes at 60 Hz)
    const MAX_FRAMES: u32 = 60 * 60 * 5;
    /// How far ahead of the car the autopilot looks
    const LOOKAHEAD: f32 = 120.0;

    /// Read balance overrides from the file named by `RETRO_RUSH_TUNING`
    pub fn load_tuning() -> Tuning {
        let Ok(path) = std::env::var("RETRO_RUSH_TUNING") else {
            return Tuning::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(json) => match Tuning::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path);
                    tuning
                }
                Err(e) => {
                    log::warn!("Ignoring tuning file {}: {}", path, e);
                    Tuning::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read tuning file {}: {}", path, e);
                Tuning::default()
            }
        }
    }

    /// Dodge into a free neighbouring lane when something is coming
    fn steer(ctx: &SimContext) -> Option<InputEvent> {
        let car = ctx.player_bounds();
        let blocked = |lane: u32| {
            let x = ctx.field.lane_center_x(lane);
            ctx.obstacles.iter().any(|o| {
                let r = o.bounds();
                r.pos.x <= x
                    && x <= r.pos.x + r.size.x
                    && r.pos.y + r.size.y > car.pos.y - LOOKAHEAD
                    && r.pos.y < car.pos.y + car.size.y
            })
        };

        let lane = ctx.player.lane;
        if !blocked(lane) {
            None
        } else if lane > 0 && !blocked(lane - 1) {
            Some(InputEvent::LaneLeft)
        } else if lane + 1 < ctx.field.lane_count && !blocked(lane + 1) {
            Some(InputEvent::LaneRight)
        } else {
            None
        }
    }

    pub fn run(tuning: Tuning, seed: u64) {
        let clock = ManualClock::new(SystemClock.now_ms());
        let mut game = Game::new(
            tuning,
            (400.0, 600.0),
            MemoryStore::new(),
            ManualScheduler::new(),
            clock,
            seed,
        );
        let frame_ms = FRAME_MS as f64;
        let mut timestamp = 0.0;

        for run in 1..=RUNS {
            game.handle_input(InputEvent::Start, timestamp);
            let mut frames = 0;
            while frames < MAX_FRAMES && game.scheduler_mut().fire().is_some() {
                if let Some(input) = steer(game.sim()) {
                    game.handle_input(input, timestamp);
                }
                timestamp += frame_ms;
                game.clock_mut().advance(FRAME_MS.round() as i64);
                game.on_frame(timestamp);
                frames += 1;
            }

            if game.phase() == GamePhase::Running {
                log::info!("Run {} survived {} frames, stopping", run, frames);
                game.toggle_pause(timestamp);
                game.save();
                break;
            }

            let menu = game.menu_view();
            if let Some(summary) = menu.last_run {
                log::info!(
                    "Run {}: {}, {} after {} frames",
                    run,
                    summary.score_label(),
                    summary.coins_label(),
                    frames
                );
            }

            for attribute in [Attribute::CoinMultiplier, Attribute::Speed] {
                while game.purchase(attribute) {
                    let level = game.progression().upgrades.get(attribute).level;
                    log::info!("Bought {} level {}", attribute.as_str(), level);
                }
            }
        }

        let menu = game.menu_view();
        log::info!("{}", menu.total_coins_label());
        for entry in &menu.upgrades {
            log::info!(
                "  {}: {} (next {} coins)",
                entry.attribute.as_str(),
                entry.level_label(),
                entry.cost
            );
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Retro Rush (native) starting...");
    log::info!("The game runs in the browser (`trunk serve`); playing a headless demo");

    let tuning = headless::load_tuning();
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    headless::run(tuning, seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
