mod clock;
mod game_loop;
mod input;
mod loop_runner;
pub mod rendering;

pub use clock::{FrameClock, LoopMetricsSnapshot};
pub use game_loop::{GameLoop, GameWorld};
pub use loop_runner::{run_app, AppError, LoopConfig, FPS_ENV_VAR};
