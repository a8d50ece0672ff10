use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::raster::{blit_image, draw_thick_line, fill_circle, fill_frame, fill_rect};
use super::{Canvas, CanvasError};
use crate::color::Color;
use crate::geometry::{Location, Rect, Resolution};
use crate::resources::Image;

/// Window-backed canvas. The pixel buffer stays at the game resolution and
/// is scaled onto a surface that follows the window size.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    resolution: Resolution,
}

impl Renderer {
    pub fn new(window: Arc<Window>, resolution: Resolution) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), resolution, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            resolution,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.resolution, width, height)?;
        Ok(())
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Maps a window position to frame coordinates. `None` outside the frame.
    pub fn window_to_frame(&self, x: f64, y: f64) -> Option<Location> {
        self.pixels
            .window_pos_to_pixel((x as f32, y as f32))
            .ok()
            .map(|(px, py)| Location::new(px as i32, py as i32))
    }

    fn build_pixels(
        window: Arc<Window>,
        resolution: Resolution,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(
            surface_width.max(1),
            surface_height.max(1),
            window,
        );
        Pixels::new(resolution.width, resolution.height, surface)
    }
}

impl Canvas for Renderer {
    fn size(&self) -> (u32, u32) {
        self.resolution.as_tuple()
    }

    fn fill(&mut self, color: Color) {
        fill_frame(self.pixels.frame_mut(), color);
    }

    fn blit(&mut self, image: &Image, at: Location) {
        let (width, height) = self.resolution.as_tuple();
        blit_image(self.pixels.frame_mut(), width, height, image, at);
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        let (width, height) = self.resolution.as_tuple();
        fill_rect(self.pixels.frame_mut(), width, height, rect, color);
    }

    fn draw_circle(&mut self, center: Location, radius: i32, color: Color) {
        let (width, height) = self.resolution.as_tuple();
        fill_circle(self.pixels.frame_mut(), width, height, center, radius, color);
    }

    fn draw_line(&mut self, from: Location, to: Location, width: i32, color: Color) {
        let (frame_width, frame_height) = self.resolution.as_tuple();
        draw_thick_line(
            self.pixels.frame_mut(),
            frame_width,
            frame_height,
            from,
            to,
            width,
            color,
        );
    }

    fn present(&mut self) -> Result<(), CanvasError> {
        self.pixels.render()?;
        Ok(())
    }
}
