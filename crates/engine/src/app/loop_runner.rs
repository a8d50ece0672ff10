use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use super::clock::{
    compute_cap_sleep, normalize_non_zero_duration, target_frame_duration, MetricsAccumulator,
};
use super::input::InputCollector;
use super::rendering::Renderer;
use super::GameLoop;
use crate::color::Color;
use crate::geometry::Resolution;
use crate::physics::PhysicsSpace;
use crate::resources::AssetLoader;
use crate::{resolve_app_paths, EngineError, StartupError};

pub const FPS_ENV_VAR: &str = "TICKWORK_FPS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub title: String,
    pub resolution: Resolution,
    pub background: Color,
    pub fps: u32,
    pub gravity: (f32, f32),
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            title: "Tickwork".to_string(),
            resolution: Resolution::P720,
            background: Color::BLACK,
            fps: 60,
            gravity: (0.0, 0.0),
            metrics_log_interval: Duration::from_secs(1),
        }
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
    #[error("game setup failed: {0}")]
    Setup(#[source] EngineError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens a window sized to `config.resolution`, lets `setup` register
/// entities and callbacks, then runs one frame per redraw until the game
/// loop stops.
pub fn run_app<F>(mut config: LoopConfig, setup: F) -> Result<(), AppError>
where
    F: FnOnce(&mut GameLoop) -> Result<(), EngineError>,
{
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        "startup"
    );
    config.fps = resolve_fps(config.fps);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let frame_target = target_frame_duration(config.fps);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(
                config.resolution.width as f64,
                config.resolution.height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer =
        Renderer::new(Arc::clone(&window), config.resolution).map_err(AppError::CreateRenderer)?;

    let resources = AssetLoader::new(app_paths.assets_dir.clone());
    let mut game = GameLoop::new(&config, build_physics(config.gravity), Box::new(resources));
    setup(&mut game).map_err(AppError::Setup)?;
    game.start(Instant::now())
        .map_err(|error| AppError::Setup(error.into()))?;

    info!(
        title = config.title.as_str(),
        width = config.resolution.width,
        height = config.resolution.height,
        fps = config.fps,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        "loop_config"
    );

    event_loop.set_control_flow(ControlFlow::Poll);
    let mut input = InputCollector::default();
    let mut metrics = MetricsAccumulator::new(metrics_log_interval, Instant::now());
    let mut last_frame_instant = Instant::now();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    let quit = input.mark_quit_requested();
                    game.world_mut().post(quit);
                    info!(reason = "window_close", "shutdown_requested");
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let frame_position = renderer.window_to_frame(position.x, position.y);
                    if let Some(motion) = input.handle_cursor_moved(frame_position) {
                        game.world_mut().post(motion);
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    let click = input.handle_mouse_input(button, state);
                    game.world_mut().post(click);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if let Some(key) = input.handle_keyboard_input(&event) {
                        game.world_mut().post(key);
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    if let Err(error) = game.run_frame(now, &mut renderer) {
                        warn!(error = %error, "renderer_draw_failed");
                        game.stop();
                    }
                    metrics.record_frame(frame_dt);
                    if let Some(snapshot) = metrics.maybe_snapshot(now) {
                        info!(
                            fps = snapshot.fps,
                            frame_time_ms = snapshot.frame_time_ms,
                            entity_count = game.world().registry.len(),
                            tick_count = game.world().tick_count(),
                            "loop_metrics"
                        );
                    }

                    if !game.is_running() {
                        window_target.exit();
                        return;
                    }

                    let elapsed = Instant::now().saturating_duration_since(now);
                    let cap_sleep = compute_cap_sleep(elapsed, frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                game.shutdown();
                info!(quit_requested = input.quit_requested(), "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[cfg(feature = "physics")]
fn build_physics(gravity: (f32, f32)) -> Box<dyn PhysicsSpace> {
    Box::new(crate::physics::PhysicsWorld::new(gravity))
}

#[cfg(not(feature = "physics"))]
fn build_physics(gravity: (f32, f32)) -> Box<dyn PhysicsSpace> {
    if gravity != (0.0, 0.0) {
        warn!(?gravity, "physics_feature_disabled");
    }
    Box::new(crate::physics::NullSpace::new())
}

fn resolve_fps(config_fps: u32) -> u32 {
    fps_from_env_value(env::var(FPS_ENV_VAR), config_fps)
}

fn fps_from_env_value(value: Result<String, env::VarError>, config_fps: u32) -> u32 {
    let config_fps = config_fps.max(1);
    match value {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(fps) if fps > 0 => fps,
            _ => {
                warn!(
                    env_var = FPS_ENV_VAR,
                    value = value.as_str(),
                    "invalid fps env var value; falling back to config"
                );
                config_fps
            }
        },
        Err(env::VarError::NotPresent) => config_fps,
        Err(err) => {
            warn!(
                env_var = FPS_ENV_VAR,
                error = %err,
                "unable to read fps env var; falling back to config"
            );
            config_fps
        }
    }
}
