use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::assets::SpriteAtlas;

use super::input::ActionStates;
use super::metrics::{LoopStats, StatsWindow};
use super::overlay::OverlayData;
use super::{InputAction, InputSnapshot, Renderer, Scene, SceneCommand, Viewport};

/// Milliseconds of artificial delay added to every frame; for testing the tick clamp.
pub const SLOW_FRAME_ENV_VAR: &str = "OVERWORLD_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Size of the frame scenes draw into; scaled to the window on present.
    pub logical_width: u32,
    pub logical_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    pub metrics_overlay_visible: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Overworld".to_string(),
            window_width: 960,
            window_height: 540,
            logical_width: 960,
            logical_height: 540,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(5),
            simulated_slow_frame_ms: 0,
            max_render_fps: Some(60),
            metrics_overlay_visible: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
    #[error("scene aborted: {reason}")]
    SceneAborted { reason: String },
}

/// Opens the window and drives `scene` at a fixed tick rate until it quits or aborts.
pub fn run_app(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    sprites: SpriteAtlas,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let logical = Viewport {
        width: config.logical_width.max(1),
        height: config.logical_height.max(1),
    };
    let mut renderer =
        Renderer::new(Arc::clone(&window), logical).map_err(AppError::CreateRenderer)?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let debug_delay = debug_frame_delay(
        env::var(SLOW_FRAME_ENV_VAR).ok(),
        config.simulated_slow_frame_ms,
    );
    let mut pacer = FramePacer::new(&config, Instant::now());
    let stats_length = if config.metrics_log_interval.is_zero() {
        Duration::from_secs(1)
    } else {
        config.metrics_log_interval
    };
    let mut stats_window = StatsWindow::open(stats_length, Instant::now());
    let mut latest_stats = LoopStats::default();
    let mut keyboard = KeyboardState::default();
    let mut overlay_visible = config.metrics_overlay_visible;
    let mut shown_title: Option<String> = None;

    scene.load();
    info!(
        logical_width = logical.width,
        logical_height = logical.height,
        sprite_sheets = sprites.len(),
        "scene_loaded"
    );
    info!(
        tick_ms = pacer.fixed_dt.as_secs_f64() * 1000.0,
        max_ticks_per_frame = pacer.max_ticks,
        render_fps_cap = %describe_cap(pacer.present_cap),
        debug_delay_ms = debug_delay.as_millis() as u64,
        "loop_config"
    );

    let abort_reason: Rc<RefCell<Option<String>>> = Rc::default();
    let abort_slot = Rc::clone(&abort_reason);
    let loop_window = Arc::clone(&window);

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { window_id, event } if window_id == loop_window.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        keyboard.quit_requested = true;
                        info!(reason = "window_close", "shutdown_requested");
                        target.exit();
                    }
                    WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                        let size = loop_window.inner_size();
                        if let Err(error) = renderer.resize(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            target.exit();
                        }
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        keyboard.handle_key(&event);
                        if keyboard.quit_requested {
                            info!(reason = "quit_key", "shutdown_requested");
                            target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        if keyboard.take_overlay_toggle() {
                            overlay_visible = !overlay_visible;
                            info!(overlay_visible, "overlay_toggled");
                        }
                        if !debug_delay.is_zero() {
                            thread::sleep(debug_delay);
                        }

                        let now = Instant::now();
                        let budget = pacer.begin_frame(now);
                        for _ in 0..budget.ticks {
                            let input = keyboard.snapshot_for_tick();
                            stats_window.count_tick();
                            match scene.update(pacer.fixed_dt.as_secs_f32(), &input) {
                                SceneCommand::None => {}
                                SceneCommand::Quit => {
                                    info!(reason = "scene_quit", "shutdown_requested");
                                    target.exit();
                                    break;
                                }
                                SceneCommand::Abort(reason) => {
                                    error!(reason = %reason, "scene_aborted");
                                    *abort_slot.borrow_mut() = Some(reason);
                                    target.exit();
                                    break;
                                }
                            }
                        }
                        if !budget.dropped.is_zero() {
                            stats_window.count_dropped(budget.dropped, pacer.fixed_dt);
                            warn!(
                                dropped_ms = budget.dropped.as_millis() as u64,
                                max_ticks_per_frame = pacer.max_ticks,
                                "tick_backlog_dropped"
                            );
                        }

                        let wait = pacer.present_wait(Instant::now());
                        if !wait.is_zero() {
                            thread::sleep(wait);
                        }

                        let title = scene.debug_title();
                        let overlay = overlay_visible.then(|| OverlayData {
                            stats: latest_stats,
                            present_cap: pacer.present_cap,
                            debug_delay_ms: debug_delay.as_millis() as u64,
                            scene_title: title.clone(),
                        });
                        if let Err(error) =
                            renderer.render_scene(scene.as_ref(), &sprites, overlay.as_ref())
                        {
                            warn!(error = %error, "renderer_draw_failed");
                            target.exit();
                        }
                        pacer.mark_presented(Instant::now());

                        if title != shown_title {
                            let text = title.as_deref().unwrap_or(&config.window_title);
                            renderer.window().set_title(text);
                            shown_title = title;
                        }

                        stats_window.count_frame(budget.frame_dt);
                        if let Some(stats) = stats_window.close_if_due(now) {
                            latest_stats = stats;
                            info!(
                                fps = stats.fps,
                                tps = stats.tps,
                                frame_time_ms = stats.frame_time_ms,
                                dropped_ticks = stats.dropped_ticks,
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => loop_window.request_redraw(),
            Event::LoopExiting => {
                scene.unload();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)?;

    let aborted = abort_reason.borrow_mut().take();
    match aborted {
        Some(reason) => Err(AppError::SceneAborted { reason }),
        None => Ok(()),
    }
}

/// What one redraw owes the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameBudget {
    frame_dt: Duration,
    ticks: u32,
    dropped: Duration,
}

/// Fixed-step accumulator plus the optional present cap.
#[derive(Debug)]
struct FramePacer {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks: u32,
    present_cap: Option<u32>,
    backlog: Duration,
    last_frame: Instant,
    last_present: Instant,
}

impl FramePacer {
    fn new(config: &LoopConfig, now: Instant) -> Self {
        let max_frame_delta = if config.max_frame_delta.is_zero() {
            Duration::from_millis(250)
        } else {
            config.max_frame_delta
        };
        Self {
            fixed_dt: Duration::from_secs_f64(1.0 / f64::from(config.target_tps.max(1))),
            max_frame_delta,
            max_ticks: config.max_ticks_per_frame.max(1),
            present_cap: config.max_render_fps.filter(|fps| *fps > 0),
            backlog: Duration::ZERO,
            last_frame: now,
            last_present: now,
        }
    }

    /// Adds the clamped frame time to the backlog and spends it in whole ticks.
    /// Whatever the tick cap leaves over one full tick is dropped.
    fn begin_frame(&mut self, now: Instant) -> FrameBudget {
        let frame_dt = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.backlog = self
            .backlog
            .saturating_add(frame_dt.min(self.max_frame_delta));

        let mut ticks = 0;
        while self.backlog >= self.fixed_dt && ticks < self.max_ticks {
            self.backlog -= self.fixed_dt;
            ticks += 1;
        }
        let dropped = if self.backlog >= self.fixed_dt {
            std::mem::take(&mut self.backlog)
        } else {
            Duration::ZERO
        };
        FrameBudget {
            frame_dt,
            ticks,
            dropped,
        }
    }

    fn present_wait(&self, now: Instant) -> Duration {
        let Some(fps) = self.present_cap else {
            return Duration::ZERO;
        };
        let interval = Duration::from_secs_f64(1.0 / f64::from(fps));
        interval.saturating_sub(now.saturating_duration_since(self.last_present))
    }

    fn mark_presented(&mut self, now: Instant) {
        self.last_present = now;
    }
}

fn describe_cap(cap: Option<u32>) -> String {
    cap.map_or_else(|| "off".to_string(), |fps| fps.to_string())
}

/// The env override wins when it parses; otherwise the configured delay is used.
fn debug_frame_delay(env_value: Option<String>, configured_ms: u64) -> Duration {
    let Some(raw) = env_value else {
        return Duration::from_millis(configured_ms);
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                value = raw.as_str(),
                error = %err,
                "slow_frame_override_ignored"
            );
            Duration::from_millis(configured_ms)
        }
    }
}

/// Keyboard state between ticks. F3 is handled here and never reaches the scene.
#[derive(Debug, Default)]
struct KeyboardState {
    actions: ActionStates,
    quit_requested: bool,
    overlay_key_down: bool,
    overlay_toggle: bool,
}

impl KeyboardState {
    fn handle_key(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        self.apply(code, event.state == ElementState::Pressed);
    }

    fn apply(&mut self, code: KeyCode, is_down: bool) {
        if code == KeyCode::F3 {
            if is_down && !self.overlay_key_down {
                self.overlay_toggle = true;
            }
            self.overlay_key_down = is_down;
            return;
        }
        let Some(action) = action_for_key(code) else {
            return;
        };
        self.actions.set(action, is_down);
        if action == InputAction::Quit && is_down {
            self.quit_requested = true;
        }
    }

    /// Press edges belong to exactly one tick.
    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(self.quit_requested, self.actions);
        self.actions.clear_pressed();
        snapshot
    }

    fn take_overlay_toggle(&mut self) -> bool {
        std::mem::take(&mut self.overlay_toggle)
    }
}

fn action_for_key(code: KeyCode) -> Option<InputAction> {
    let action = match code {
        KeyCode::KeyW | KeyCode::ArrowUp => InputAction::MoveUp,
        KeyCode::KeyS | KeyCode::ArrowDown => InputAction::MoveDown,
        KeyCode::KeyA | KeyCode::ArrowLeft => InputAction::MoveLeft,
        KeyCode::KeyD | KeyCode::ArrowRight => InputAction::MoveRight,
        KeyCode::Space | KeyCode::Enter | KeyCode::KeyE => InputAction::Interact,
        KeyCode::KeyP => InputAction::Pause,
        KeyCode::Escape => InputAction::Quit,
        KeyCode::F1 => InputAction::ToggleDebug,
        KeyCode::F2 => InputAction::ToggleCollisions,
        KeyCode::F4 => InputAction::ToggleCameraLock,
        KeyCode::Digit1 => InputAction::ToggleLayerBottom,
        KeyCode::Digit2 => InputAction::ToggleLayerMid,
        KeyCode::Digit3 => InputAction::ToggleLayerTop,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(tps: u32, max_ticks: u32, start: Instant) -> FramePacer {
        let config = LoopConfig {
            target_tps: tps,
            max_ticks_per_frame: max_ticks,
            max_frame_delta: Duration::from_millis(250),
            max_render_fps: Some(50),
            ..LoopConfig::default()
        };
        FramePacer::new(&config, start)
    }

    #[test]
    fn frame_time_is_spent_in_whole_ticks() {
        let start = Instant::now();
        let mut pacer = pacer(50, 5, start);
        let budget = pacer.begin_frame(start + Duration::from_millis(50));
        assert_eq!(budget.ticks, 2);
        assert_eq!(budget.dropped, Duration::ZERO);

        let budget = pacer.begin_frame(start + Duration::from_millis(60));
        assert_eq!(budget.ticks, 1);
        assert_eq!(budget.frame_dt, Duration::from_millis(10));
    }

    #[test]
    fn tick_cap_drops_the_remaining_backlog() {
        let start = Instant::now();
        let mut pacer = pacer(50, 2, start);
        let budget = pacer.begin_frame(start + Duration::from_millis(130));
        assert_eq!(budget.ticks, 2);
        assert_eq!(budget.dropped, Duration::from_millis(90));
        assert_eq!(pacer.backlog, Duration::ZERO);
    }

    #[test]
    fn long_stalls_are_clamped_before_ticking() {
        let start = Instant::now();
        let mut pacer = pacer(50, 100, start);
        let budget = pacer.begin_frame(start + Duration::from_secs(3));
        assert_eq!(budget.frame_dt, Duration::from_secs(3));
        assert_eq!(budget.ticks, 12);
        assert_eq!(budget.dropped, Duration::ZERO);
    }

    #[test]
    fn present_wait_fills_the_rest_of_the_cap_interval() {
        let start = Instant::now();
        let mut pacer = pacer(60, 5, start);
        assert_eq!(
            pacer.present_wait(start + Duration::from_millis(5)),
            Duration::from_millis(15)
        );
        assert_eq!(
            pacer.present_wait(start + Duration::from_millis(30)),
            Duration::ZERO
        );
        pacer.present_cap = None;
        assert_eq!(pacer.present_wait(start), Duration::ZERO);
    }

    #[test]
    fn slow_frame_override_falls_back_on_garbage() {
        assert_eq!(debug_frame_delay(None, 7), Duration::from_millis(7));
        assert_eq!(
            debug_frame_delay(Some("40".to_string()), 7),
            Duration::from_millis(40)
        );
        assert_eq!(
            debug_frame_delay(Some("fast".to_string()), 7),
            Duration::from_millis(7)
        );
        assert_eq!(describe_cap(None), "off");
    }

    #[test]
    fn press_edge_survives_only_one_tick() {
        let mut keys = KeyboardState::default();
        keys.apply(KeyCode::Space, true);
        let first = keys.snapshot_for_tick();
        keys.apply(KeyCode::Space, true);
        let second = keys.snapshot_for_tick();
        assert!(first.pressed(InputAction::Interact));
        assert!(!second.pressed(InputAction::Interact));
        assert!(second.is_down(InputAction::Interact));
    }

    #[test]
    fn tap_between_ticks_still_reaches_next_snapshot() {
        let mut keys = KeyboardState::default();
        keys.apply(KeyCode::KeyP, true);
        keys.apply(KeyCode::KeyP, false);
        let snapshot = keys.snapshot_for_tick();
        assert!(snapshot.pressed(InputAction::Pause));
        assert!(!snapshot.is_down(InputAction::Pause));
    }

    #[test]
    fn movement_and_debug_keys_map_to_actions() {
        let mut keys = KeyboardState::default();
        keys.apply(KeyCode::KeyW, true);
        keys.apply(KeyCode::ArrowLeft, true);
        keys.apply(KeyCode::F2, true);
        keys.apply(KeyCode::Digit3, true);
        let snapshot = keys.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveUp));
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(!snapshot.is_down(InputAction::MoveDown));
        assert!(snapshot.pressed(InputAction::ToggleCollisions));
        assert!(snapshot.pressed(InputAction::ToggleLayerTop));
        assert!(!snapshot.pressed(InputAction::ToggleCameraLock));
    }

    #[test]
    fn escape_requests_quit() {
        let mut keys = KeyboardState::default();
        keys.apply(KeyCode::Escape, true);
        assert!(keys.quit_requested);
        assert!(keys.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn overlay_toggle_fires_once_per_press() {
        let mut keys = KeyboardState::default();
        keys.apply(KeyCode::F3, true);
        assert!(keys.take_overlay_toggle());
        keys.apply(KeyCode::F3, true);
        assert!(!keys.take_overlay_toggle());
        keys.apply(KeyCode::F3, false);
        keys.apply(KeyCode::F3, true);
        assert!(keys.take_overlay_toggle());
        assert!(!keys.snapshot_for_tick().pressed(InputAction::ToggleDebug));
    }
}
