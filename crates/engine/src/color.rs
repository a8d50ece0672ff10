use rand::Rng;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "[u8; 3]")]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const TRANSPARENT: Color = Color([0, 0, 0, 0]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 0xff])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub const fn from_rgba_hex(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn alpha(self) -> u8 {
        self.0[3]
    }

    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng())
    }

    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::rgb(rng.gen(), rng.gen(), rng.gen())
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}
