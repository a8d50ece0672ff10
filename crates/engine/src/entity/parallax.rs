use std::path::PathBuf;

use tracing::debug;

use super::priority::LOWEST;
use super::{Entity, EntityCore};
use crate::app::rendering::Canvas;
use crate::geometry::{Location, Rect, Resolution};
use crate::resources::{Image, ResourceError, ResourceLoader};

#[derive(Debug)]
struct Layer {
    image: Image,
    offset: f32,
}

/// Horizontally tiled background layers scrolling at increasing speeds.
///
/// Layer `i` moves `scroll * (speed + delta * (i + 1))` pixels per tick, so
/// layers further back in the stack move faster.
#[derive(Debug)]
pub struct Parallax {
    core: EntityCore,
    dir: PathBuf,
    layer_count: usize,
    resolution: Resolution,
    scroll: i32,
    speed: f32,
    delta: f32,
    layers: Vec<Layer>,
    tiles: i32,
}

impl Parallax {
    pub fn new(dir: impl Into<PathBuf>, layer_count: usize, resolution: Resolution) -> Self {
        Self {
            core: EntityCore::new(Location::default(), LOWEST),
            dir: dir.into(),
            layer_count,
            resolution,
            scroll: 0,
            speed: 0.0,
            delta: 0.0,
            layers: Vec::new(),
            tiles: 0,
        }
    }

    pub fn with_motion(mut self, scroll: i32, speed: f32, delta: f32) -> Self {
        self.scroll = scroll;
        self.speed = speed;
        self.delta = delta;
        self
    }

    pub fn scroll(&self) -> i32 {
        self.scroll
    }

    pub fn set_scroll(&mut self, scroll: i32) {
        self.scroll = scroll;
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn set_delta(&mut self, delta: f32) {
        self.delta = delta;
    }

    pub fn layer_offsets(&self) -> Vec<f32> {
        self.layers.iter().map(|layer| layer.offset).collect()
    }
}

impl Entity for Parallax {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn on_load(&mut self, resources: &mut dyn ResourceLoader) -> Result<(), ResourceError> {
        let (width, height) = self.resolution.as_tuple();
        let mut layers = Vec::with_capacity(self.layer_count);
        for index in 0..self.layer_count {
            let image = resources
                .load_image(&self.dir.join(format!("{index}.png")))?
                .resized(width, height);
            layers.push(Layer { image, offset: 0.0 });
        }
        let widest = layers
            .iter()
            .map(|layer| layer.image.width())
            .max()
            .unwrap_or(width)
            .max(1);
        self.tiles = width.div_ceil(widest) as i32 + 1;
        self.layers = layers;
        debug!(
            dir = %self.dir.display(),
            layers = self.layers.len(),
            tiles = self.tiles,
            "parallax_loaded"
        );
        Ok(())
    }

    fn tick(&mut self, _tick_count: u64) {
        let mut speed = self.speed;
        for layer in &mut self.layers {
            speed += self.delta;
            let step = self.scroll as f32 * speed;
            let width = layer.image.width() as f32;
            layer.offset = if layer.offset + step >= width {
                step
            } else {
                (layer.offset + step).ceil()
            };
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas) {
        let origin = self.location();
        for layer in &self.layers {
            let width = layer.image.width() as i32;
            let offset = layer.offset as i32;
            for tile in 0..self.tiles {
                let at = Location::new(origin.x + tile * width - offset, origin.y);
                canvas.blit(&layer.image, at);
            }
        }
    }

    fn bounds(&self) -> Rect {
        Rect::at(
            self.location(),
            self.resolution.width as i32,
            self.resolution.height as i32,
        )
    }
}
