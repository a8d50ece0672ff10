use std::path::Path;

use super::priority::HIGHEST;
use super::{Entity, EntityCore, IndexOutOfRangeError};
use crate::app::rendering::Canvas;
use crate::geometry::{Location, Rect};
use crate::resources::{Image, ResourceError, ResourceLoader};

/// Static multi-frame image. Frames are switched explicitly, never by tick.
#[derive(Debug)]
pub struct ImageEntity {
    core: EntityCore,
    frames: Vec<Image>,
    index: usize,
}

impl ImageEntity {
    pub fn new(frames: Vec<Image>) -> Self {
        Self {
            core: EntityCore::new(Location::default(), HIGHEST),
            frames,
            index: 0,
        }
    }

    /// Loads `dir/0.png .. dir/{count - 1}.png`, scaled by `scalar`.
    pub fn load(
        resources: &mut dyn ResourceLoader,
        dir: &Path,
        count: usize,
        scalar: f32,
    ) -> Result<Self, ResourceError> {
        Ok(Self::new(resources.load_frames(dir, count, scalar)?))
    }

    pub fn at(mut self, location: Location) -> Self {
        self.core.location = location;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn set_index(&mut self, index: usize) -> Result<(), IndexOutOfRangeError> {
        if index >= self.frames.len() {
            return Err(IndexOutOfRangeError {
                index,
                len: self.frames.len(),
            });
        }
        self.index = index;
        Ok(())
    }

    /// Advances one frame, wrapping to the first after the last.
    pub fn next(&mut self) {
        self.index = if self.index + 1 >= self.frames.len() {
            0
        } else {
            self.index + 1
        };
    }
}

impl Entity for ImageEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn tick(&mut self, _tick_count: u64) {}

    fn draw(&self, canvas: &mut dyn Canvas) {
        if let Some(frame) = self.frames.get(self.index) {
            canvas.blit(frame, self.location());
        }
    }

    fn bounds(&self) -> Rect {
        let (w, h) = self
            .frames
            .first()
            .map(Image::size)
            .unwrap_or((0, 0));
        Rect::at(self.location(), w as i32, h as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::Raster;
    use crate::color::Color;

    fn frames() -> Vec<Image> {
        vec![
            Image::solid(4, 2, Color::RED),
            Image::solid(4, 2, Color::GREEN),
            Image::solid(4, 2, Color::BLUE),
        ]
    }

    #[test]
    fn defaults_to_highest_priority() {
        assert_eq!(ImageEntity::new(frames()).priority(), HIGHEST);
    }

    #[test]
    fn set_index_rejects_out_of_range() {
        let mut image = ImageEntity::new(frames());
        image.set_index(2).expect("in range");
        assert_eq!(
            image.set_index(3),
            Err(IndexOutOfRangeError { index: 3, len: 3 })
        );
        assert_eq!(image.index(), 2);
    }

    #[test]
    fn next_wraps_to_first_frame() {
        let mut image = ImageEntity::new(frames());
        image.next();
        image.next();
        assert_eq!(image.index(), 2);
        image.next();
        assert_eq!(image.index(), 0);
    }

    #[test]
    fn draws_current_frame_at_location() {
        let mut image = ImageEntity::new(frames()).at(Location::new(1, 1));
        image.set_index(1).expect("in range");
        let mut canvas = Raster::new(8, 8);
        image.draw(&mut canvas);
        assert_eq!(canvas.pixel(1, 1), Some([0, 255, 0, 255]));
        assert_eq!(image.bounds(), Rect::new(1, 1, 4, 2));
    }
}
