use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::WindowBuilder;

use crate::{resolve_app_paths, StartupError};

use super::metrics::MetricsAccumulator;
use super::rendering::{hit_test, ClickTarget, Renderer, Viewport};
use super::{JourneySession, KeyOutcome};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub metrics_log_interval: Duration,
    /// Redraw cadence while something is animating (the intro fade).
    pub animation_frame_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Journey".to_string(),
            window_width: 1280,
            window_height: 720,
            metrics_log_interval: Duration::from_secs(1),
            animation_frame_interval: Duration::from_millis(16),
        }
    }
}

impl LoopConfig {
    pub fn initial_viewport(&self) -> Viewport {
        Viewport::new(self.window_width.max(1), self.window_height.max(1))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives `session` until the window closes.
///
/// The session clock is the time elapsed since this call. The loop sleeps
/// until the next input event, session deadline or metrics interval.
pub fn run_app(config: LoopConfig, mut session: JourneySession) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        asset_dir = %app_paths.asset_dir.display(),
        "startup"
    );

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
    let window_for_loop = Arc::clone(&window);
    let mut renderer =
        Renderer::new(window, app_paths.asset_dir.clone()).map_err(AppError::CreateRenderer)?;

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let animation_frame_interval =
        normalize_non_zero_duration(config.animation_frame_interval, Duration::from_millis(16));
    info!(
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        animation_frame_interval_ms = animation_frame_interval.as_millis() as u64,
        "loop_config"
    );

    let epoch = Instant::now();
    if renderer.viewport() != session.viewport() {
        session.resize(renderer.viewport(), epoch.elapsed());
    }

    let mut pointer = PointerState::default();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_frame_instant = Instant::now();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                            return;
                        }
                        if renderer.viewport() != session.viewport() {
                            session.resize(renderer.viewport(), epoch.elapsed());
                        }
                        window_for_loop.request_redraw();
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        if let Err(error) = renderer.resize(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                            return;
                        }
                        session.resize(renderer.viewport(), epoch.elapsed());
                        window_for_loop.request_redraw();
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        pointer.set_cursor_position_px(position.x as f32, position.y as f32);
                    }
                    WindowEvent::CursorLeft { .. } => {
                        pointer.clear_cursor_position();
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        let Some((x, y)) = pointer.handle_mouse_input(button, state) else {
                            return;
                        };
                        let changed = match hit_test(&session, x, y) {
                            Some(ClickTarget::Start) => session.start(epoch.elapsed()),
                            Some(ClickTarget::Continue) => session.continue_scene(),
                            None => false,
                        };
                        if changed {
                            window_for_loop.request_redraw();
                        }
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state != ElementState::Pressed {
                            return;
                        }
                        let Key::Character(text) = &event.logical_key else {
                            return;
                        };
                        let outcome = session.handle_key(text.as_str(), epoch.elapsed());
                        if !outcome.is_consumed() {
                            return;
                        }
                        metrics_accumulator.record_key(outcome);
                        if outcome == KeyOutcome::Moved {
                            window_for_loop.request_redraw();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        let session_now = epoch.elapsed();
                        session.advance(session_now);
                        if let Err(error) = renderer.render(&session, session_now) {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                            return;
                        }
                        metrics_accumulator.record_frame(raw_frame_dt);
                    }
                    _ => {}
                }
            }
            Event::Resumed => {
                session.reset();
                window_for_loop.request_redraw();
            }
            Event::AboutToWait => {
                if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
                    info!(
                        fps = snapshot.fps,
                        frame_time_ms = snapshot.frame_time_ms,
                        moves_per_sec = snapshot.moves_per_sec,
                        rejected_per_sec = snapshot.rejected_per_sec,
                        offset = session.offset(),
                        "loop_metrics"
                    );
                }

                let now = epoch.elapsed();
                if session.advance(now) || session.is_animating() {
                    window_for_loop.request_redraw();
                }
                let wake = next_wake(
                    now,
                    session.next_deadline(),
                    session.is_animating(),
                    animation_frame_interval,
                );
                let metrics_due = metrics_accumulator
                    .next_snapshot_at()
                    .saturating_duration_since(epoch);
                let wake = wake.map_or(metrics_due, |at| at.min(metrics_due));
                window_target.set_control_flow(ControlFlow::WaitUntil(epoch + wake));
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct PointerState {
    cursor_position_px: Option<(f32, f32)>,
    left_mouse_is_down: bool,
}

impl PointerState {
    fn set_cursor_position_px(&mut self, x: f32, y: f32) {
        self.cursor_position_px = Some((x, y));
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    /// Cursor position on a fresh left press; `None` for everything else.
    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) -> Option<(f32, f32)> {
        if button != MouseButton::Left {
            return None;
        }
        match state {
            ElementState::Pressed => {
                let is_edge = !self.left_mouse_is_down;
                self.left_mouse_is_down = true;
                if is_edge {
                    self.cursor_position_px
                } else {
                    None
                }
            }
            ElementState::Released => {
                self.left_mouse_is_down = false;
                None
            }
        }
    }
}

/// Session time at which the loop should wake without input.
fn next_wake(
    now: Duration,
    deadline: Option<Duration>,
    animating: bool,
    frame_interval: Duration,
) -> Option<Duration> {
    let animation = animating.then(|| now.saturating_add(frame_interval));
    match (deadline, animation) {
        (Some(deadline), Some(animation)) => Some(deadline.min(animation)),
        (deadline, animation) => deadline.or(animation),
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn left_click_is_edge_triggered() {
        let mut pointer = PointerState::default();
        pointer.set_cursor_position_px(100.0, 200.0);

        assert_eq!(
            pointer.handle_mouse_input(MouseButton::Left, ElementState::Pressed),
            Some((100.0, 200.0))
        );
        assert_eq!(
            pointer.handle_mouse_input(MouseButton::Left, ElementState::Pressed),
            None
        );
        pointer.handle_mouse_input(MouseButton::Left, ElementState::Released);
        assert!(pointer
            .handle_mouse_input(MouseButton::Left, ElementState::Pressed)
            .is_some());
    }

    #[test]
    fn click_without_cursor_or_other_button_is_ignored() {
        let mut pointer = PointerState::default();
        assert_eq!(
            pointer.handle_mouse_input(MouseButton::Left, ElementState::Pressed),
            None
        );
        pointer.set_cursor_position_px(1.0, 1.0);
        assert_eq!(
            pointer.handle_mouse_input(MouseButton::Right, ElementState::Pressed),
            None
        );
        pointer.clear_cursor_position();
        pointer.handle_mouse_input(MouseButton::Left, ElementState::Released);
        assert_eq!(
            pointer.handle_mouse_input(MouseButton::Left, ElementState::Pressed),
            None
        );
    }

    #[test]
    fn idle_session_sleeps_until_input() {
        assert_eq!(next_wake(ms(100), None, false, ms(16)), None);
    }

    #[test]
    fn wake_uses_earliest_of_deadline_and_frame() {
        assert_eq!(next_wake(ms(100), Some(ms(600)), false, ms(16)), Some(ms(600)));
        assert_eq!(next_wake(ms(100), Some(ms(600)), true, ms(16)), Some(ms(116)));
        assert_eq!(next_wake(ms(100), Some(ms(105)), true, ms(16)), Some(ms(105)));
        assert_eq!(next_wake(ms(100), None, true, ms(16)), Some(ms(116)));
    }

    #[test]
    fn zero_durations_fall_back() {
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
        assert_eq!(normalize_non_zero_duration(ms(5), Duration::from_secs(1)), ms(5));
    }

    #[test]
    fn initial_viewport_is_never_empty() {
        let config = LoopConfig {
            window_width: 0,
            window_height: 0,
            ..LoopConfig::default()
        };
        assert_eq!(config.initial_viewport(), Viewport::new(1, 1));
    }
}
