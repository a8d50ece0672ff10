use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use super::priority::HIGHEST;
use super::{Entity, EntityCore, IndexOutOfRangeError};
use crate::app::rendering::Canvas;
use crate::geometry::{Location, Rect, Resolution};
use crate::resources::{Image, ResourceError, ResourceLoader};

const TERMINAL_FALL_SPEED: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteState {
    Idle,
    Run,
    Jump,
    MidAir,
    Land,
}

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("sprite state {0:?} has already been set")]
    DuplicateState(SpriteState),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Animated character with simple platformer physics.
///
/// Gravity accelerates `vy` by one pixel per tick up to a terminal speed and
/// the sprite never sinks below its floor. A running sprite above the floor
/// switches to `MidAir`, and lands back into `Run`.
#[derive(Debug)]
pub struct Sprite {
    core: EntityCore,
    animations: HashMap<SpriteState, Vec<Image>>,
    state: SpriteState,
    speed: u64,
    index: usize,
    scalar: f32,
    max_y: i32,
    gravity: bool,
    velocity: (i32, i32),
}

impl Sprite {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            core: EntityCore::new(Location::default(), HIGHEST),
            animations: HashMap::new(),
            state: SpriteState::Idle,
            speed: 1,
            index: 0,
            scalar: 1.0,
            max_y: resolution.height as i32,
            gravity: true,
            velocity: (0, 0),
        }
    }

    /// Advance one animation frame every `speed` ticks.
    pub fn with_speed(mut self, speed: u64) -> Self {
        self.speed = speed.max(1);
        self
    }

    pub fn with_scalar(mut self, scalar: f32) -> Self {
        self.scalar = scalar;
        self
    }

    pub fn with_gravity(mut self, gravity: bool) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_state(mut self, state: SpriteState) -> Self {
        self.state = state;
        self
    }

    pub fn add_state(&mut self, state: SpriteState, frames: Vec<Image>) -> Result<(), SpriteError> {
        if self.animations.contains_key(&state) {
            return Err(SpriteError::DuplicateState(state));
        }
        let frames = frames.iter().map(|frame| frame.scaled(self.scalar)).collect();
        self.animations.insert(state, frames);
        Ok(())
    }

    /// Loads `dir/0.png .. dir/{count - 1}.png` as the frames of `state`.
    pub fn load_state(
        &mut self,
        resources: &mut dyn ResourceLoader,
        state: SpriteState,
        dir: &Path,
        count: usize,
    ) -> Result<(), SpriteError> {
        if self.animations.contains_key(&state) {
            return Err(SpriteError::DuplicateState(state));
        }
        let frames = resources.load_frames(dir, count, self.scalar)?;
        self.animations.insert(state, frames);
        Ok(())
    }

    pub fn state(&self) -> SpriteState {
        self.state
    }

    pub fn set_state(&mut self, state: SpriteState) {
        self.state = state;
        self.index = 0;
    }

    pub fn velocity(&self) -> (i32, i32) {
        self.velocity
    }

    /// Per-tick motion in pixels. Positive `vx` moves right and positive `vy`
    /// moves down.
    pub fn set_velocity(&mut self, velocity: (i32, i32)) {
        self.velocity = velocity;
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    /// Puts the floor `offset` pixels above the bottom edge, measured against
    /// the current state's frame height.
    pub fn set_floor(&mut self, resolution: Resolution, offset: i32) {
        let frame_height = self.frame_size().1 as i32;
        self.max_y = resolution.height as i32 - offset - frame_height;
    }

    pub fn frame_index(&self) -> usize {
        self.index
    }

    pub fn set_frame(&mut self, index: usize) -> Result<(), IndexOutOfRangeError> {
        let len = self.frames().len();
        if index >= len {
            return Err(IndexOutOfRangeError { index, len });
        }
        self.index = index;
        Ok(())
    }

    fn frames(&self) -> &[Image] {
        self.animations
            .get(&self.state)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn frame_size(&self) -> (u32, u32) {
        self.frames().first().map(Image::size).unwrap_or((0, 0))
    }
}

impl Entity for Sprite {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn tick(&mut self, tick_count: u64) {
        let y = self.core.location.y;
        if y < self.max_y && self.state == SpriteState::Run {
            self.set_state(SpriteState::MidAir);
        } else if y >= self.max_y && self.state == SpriteState::MidAir {
            self.set_state(SpriteState::Run);
        }

        let (vx, vy) = self.velocity;
        if self.gravity {
            self.velocity = (vx, (vy + 1).min(TERMINAL_FALL_SPEED));
        }
        let location = &mut self.core.location;
        location.x += vx;
        location.y = (location.y + vy).min(self.max_y);

        if tick_count % self.speed == 0 {
            let len = self.frames().len();
            self.index = if self.index + 1 >= len { 0 } else { self.index + 1 };
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        if let Some(frame) = self.frames().get(self.index) {
            canvas.blit(frame, self.location());
        }
    }

    fn bounds(&self) -> Rect {
        let (w, h) = self.frame_size();
        Rect::at(self.location(), w as i32, h as i32)
    }
}
