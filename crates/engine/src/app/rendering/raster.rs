use super::{Canvas, CanvasError};
use crate::color::Color;
use crate::geometry::{Location, Rect};
use crate::resources::Image;

/// In-memory RGBA canvas. Backs headless runs and tests.
#[derive(Debug, Clone)]
pub struct Raster {
    width: u32,
    height: u32,
    frame: Vec<u8>,
    presented: u64,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: vec![0; width as usize * height as usize * 4],
            presented: 0,
        }
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut pixel = [0; 4];
        pixel.copy_from_slice(&self.frame[offset..offset + 4]);
        Some(pixel)
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Canvas for Raster {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fill(&mut self, color: Color) {
        fill_frame(&mut self.frame, color);
    }

    fn blit(&mut self, image: &Image, at: Location) {
        blit_image(&mut self.frame, self.width, self.height, image, at);
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        fill_rect(&mut self.frame, self.width, self.height, rect, color);
    }

    fn draw_circle(&mut self, center: Location, radius: i32, color: Color) {
        fill_circle(&mut self.frame, self.width, self.height, center, radius, color);
    }

    fn draw_line(&mut self, from: Location, to: Location, width: i32, color: Color) {
        draw_thick_line(&mut self.frame, self.width, self.height, from, to, width, color);
    }

    fn present(&mut self) -> Result<(), CanvasError> {
        self.presented = self.presented.saturating_add(1);
        Ok(())
    }
}

pub(super) fn fill_frame(frame: &mut [u8], color: Color) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color.0);
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(width as usize)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    let alpha = color[3];
    if alpha == 0xff {
        frame[byte_offset..end].copy_from_slice(&color);
        return;
    }
    if alpha == 0 {
        return;
    }
    let dst = &mut frame[byte_offset..end];
    for channel in 0..3 {
        dst[channel] = blend_channel(color[channel], dst[channel], alpha);
    }
    dst[3] = dst[3].max(alpha);
}

fn blend_channel(src: u8, dst: u8, alpha: u8) -> u8 {
    let alpha = u16::from(alpha);
    ((u16::from(src) * alpha + u16::from(dst) * (255 - alpha)) / 255) as u8
}

pub(super) fn blit_image(frame: &mut [u8], width: u32, height: u32, image: &Image, at: Location) {
    let (image_w, image_h) = image.size();
    if image_w == 0 || image_h == 0 || width == 0 || height == 0 {
        return;
    }

    let left = at.x;
    let top = at.y;
    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = left.saturating_add(image_w as i32).min(width as i32);
    let draw_bottom = top.saturating_add(image_h as i32).min(height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let rgba = image.rgba();
    for out_y in draw_top..draw_bottom {
        let src_row_offset = (out_y - top) as usize * image_w as usize * 4;
        for out_x in draw_left..draw_right {
            let src_offset = src_row_offset + (out_x - left) as usize * 4;
            let mut pixel = [0; 4];
            pixel.copy_from_slice(&rgba[src_offset..src_offset + 4]);
            write_pixel_rgba_clipped(frame, width, height, out_x, out_y, pixel);
        }
    }
}

pub(super) fn fill_rect(frame: &mut [u8], width: u32, height: u32, rect: Rect, color: Color) {
    if rect.is_empty() {
        return;
    }
    let left = rect.x.max(0);
    let top = rect.y.max(0);
    let right = rect.right().min(width as i32);
    let bottom = rect.bottom().min(height as i32);
    for y in top..bottom {
        for x in left..right {
            write_pixel_rgba_clipped(frame, width, height, x, y, color.0);
        }
    }
}

pub(super) fn fill_circle(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center: Location,
    radius: i32,
    color: Color,
) {
    if radius <= 0 {
        return;
    }
    let radius_sqr = i64::from(radius) * i64::from(radius);
    for y in (center.y - radius)..=(center.y + radius) {
        if y < 0 || y >= height as i32 {
            continue;
        }
        for x in (center.x - radius)..=(center.x + radius) {
            let dx = i64::from(x - center.x);
            let dy = i64::from(y - center.y);
            if dx * dx + dy * dy <= radius_sqr {
                write_pixel_rgba_clipped(frame, width, height, x, y, color.0);
            }
        }
    }
}

/// Draws every pixel whose center lies within `line_width / 2` of the
/// segment. Widths below 2 fall back to a one-pixel line.
pub(super) fn draw_thick_line(
    frame: &mut [u8],
    width: u32,
    height: u32,
    from: Location,
    to: Location,
    line_width: i32,
    color: Color,
) {
    if line_width < 2 {
        draw_thin_line(frame, width, height, from, to, color);
        return;
    }

    let half = line_width as f32 / 2.0;
    let pad = half.ceil() as i32;
    let left = (from.x.min(to.x) - pad).max(0);
    let right = (from.x.max(to.x) + pad).min(width as i32 - 1);
    let top = (from.y.min(to.y) - pad).max(0);
    let bottom = (from.y.max(to.y) + pad).min(height as i32 - 1);

    let (ax, ay) = (from.x as f32, from.y as f32);
    let (dx, dy) = ((to.x - from.x) as f32, (to.y - from.y) as f32);
    let length_sqr = dx * dx + dy * dy;
    let half_sqr = half * half;

    for y in top..=bottom {
        for x in left..=right {
            let (px, py) = (x as f32 - ax, y as f32 - ay);
            let t = if length_sqr == 0.0 {
                0.0
            } else {
                ((px * dx + py * dy) / length_sqr).clamp(0.0, 1.0)
            };
            let (ex, ey) = (px - t * dx, py - t * dy);
            if ex * ex + ey * ey <= half_sqr {
                write_pixel_rgba_clipped(frame, width, height, x, y, color.0);
            }
        }
    }
}

fn draw_thin_line(frame: &mut [u8], width: u32, height: u32, from: Location, to: Location, color: Color) {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let step_x = if from.x < to.x { 1 } else { -1 };
    let step_y = if from.y < to.y { 1 } else { -1 };
    let mut error = dx + dy;
    let (mut x, mut y) = (from.x, from.y);
    loop {
        write_pixel_rgba_clipped(frame, width, height, x, y, color.0);
        if x == to.x && y == to.y {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x += step_x;
        }
        if doubled <= dx {
            error += dx;
            y += step_y;
        }
    }
}
