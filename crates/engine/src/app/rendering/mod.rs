mod raster;
mod renderer;

use thiserror::Error;

use crate::color::Color;
use crate::geometry::{Location, Rect};
use crate::resources::Image;

pub use raster::Raster;
pub use renderer::Renderer;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("pixel surface error: {0}")]
    Surface(#[from] pixels::Error),
}

/// Drawing target for one frame. Coordinates are pixels from the top-left
/// corner; anything outside the frame is clipped.
pub trait Canvas {
    fn size(&self) -> (u32, u32);
    fn fill(&mut self, color: Color);
    /// Draws `image` with its top-left corner at `at`, blending by alpha.
    fn blit(&mut self, image: &Image, at: Location);
    fn draw_rect(&mut self, rect: Rect, color: Color);
    fn draw_circle(&mut self, center: Location, radius: i32, color: Color);
    fn draw_line(&mut self, from: Location, to: Location, width: i32, color: Color);
    fn present(&mut self) -> Result<(), CanvasError>;
}
