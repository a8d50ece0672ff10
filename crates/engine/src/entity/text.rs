use super::{Entity, EntityCore};
use crate::app::rendering::Canvas;
use crate::color::Color;
use crate::geometry::{Location, Rect};
use crate::resources::{Font, Image};

/// A line of text. Rendered on construction and on every `set_text`, so its
/// bounds are known before it is spawned.
#[derive(Debug)]
pub struct Text {
    core: EntityCore,
    font: Font,
    text: String,
    color: Color,
    rendered: Image,
}

impl Text {
    pub fn new(font: Font, text: impl Into<String>, color: Color) -> Self {
        let text = text.into();
        let rendered = font.render(&text, color);
        Self {
            core: EntityCore::default(),
            font,
            text,
            color,
            rendered,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.core.location = location;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.text {
            return;
        }
        self.rendered = self.font.render(&text, self.color);
        self.text = text;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.rendered = self.font.render(&self.text, color);
    }
}

impl Entity for Text {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn tick(&mut self, _tick_count: u64) {}

    fn draw(&self, canvas: &mut dyn Canvas) {
        canvas.blit(&self.rendered, self.location());
    }

    fn bounds(&self) -> Rect {
        let (w, h) = self.rendered.size();
        Rect::at(self.location(), w as i32, h as i32)
    }
}
