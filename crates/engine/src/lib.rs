use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod color;
pub mod entity;
pub mod event;
pub mod geometry;
pub mod physics;
pub mod resources;

pub use app::rendering::{Canvas, CanvasError, Raster, Renderer};
pub use app::{run_app, AppError, FrameClock, GameLoop, GameWorld, LoopConfig, FPS_ENV_VAR};
pub use color::Color;
pub use entity::image::ImageEntity;
pub use entity::parallax::Parallax;
pub use entity::registry::{CollisionListener, EntityId, EntityRegistry};
pub use entity::shapes::{Circle, PhysicsCircle, PhysicsSegment, Rectangle};
pub use entity::sprite::{Sprite, SpriteError, SpriteState};
pub use entity::text::Text;
pub use entity::{
    Entity, EntityCore, IndexOutOfRangeError, Lifecycle, LifecycleError, RenderPriority,
    SpawnContext,
};
pub use event::{
    DuplicateRegistrationError, Event, EventDispatcher, EventPayload, EventQueue, EventTag, Key,
    MouseButton, TagAllocator, TimerRepeat,
};
pub use geometry::{Location, Rect, Resolution};
#[cfg(feature = "physics")]
pub use physics::PhysicsWorld;
pub use physics::{Body, BodyDesc, BodyHandle, BodyKind, BodyShape, NullSpace, PhysicsSpace};
pub use resources::{AssetLoader, Font, Image, ResourceError, ResourceLoader, Sound};

pub const ROOT_ENV_VAR: &str = "TICKWORK_ROOT";

/// Error type returned by event callbacks and game setup.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    IndexOutOfRange(#[from] IndexOutOfRangeError),
    #[error(transparent)]
    Sprite(#[from] SpriteError),
    #[error(transparent)]
    DuplicateRegistration(#[from] DuplicateRegistrationError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("entity {0:?} is not registered")]
    UnknownEntity(EntityId),
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "TICKWORK_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain an assets/ directory."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/tickwork\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Locates the directory games load their assets from.
///
/// `TICKWORK_ROOT` wins when set; otherwise the executable's ancestors are
/// searched for a checkout containing `Cargo.toml` and `assets/`.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let assets_dir = root.join("assets");
    Ok(AppPaths { root, assets_dir })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if normalized.join("assets").is_dir() {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .flat_map(asset_root_candidates)
                .find(|candidate| is_asset_root(candidate))
                .map(|candidate| normalize_path(&candidate))
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

/// The ancestor itself, then the game crate inside a workspace checkout.
fn asset_root_candidates(dir: &Path) -> [PathBuf; 2] {
    [dir.to_path_buf(), dir.join("crates").join("game")]
}

fn is_asset_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
