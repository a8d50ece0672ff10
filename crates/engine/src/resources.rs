use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{ImageReader, RgbaImage};
use thiserror::Error;
use tracing::{debug, info};

use crate::color::Color;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to parse font {path}: {reason}")]
    Font { path: PathBuf, reason: String },
}

/// Decoded RGBA8 pixels. Cloning shares the pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl Image {
    /// Returns `None` when `rgba` does not hold exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba: rgba.into(),
        })
    }

    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let rgba: Vec<u8> = color
            .0
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba: rgba.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut pixel = [0; 4];
        pixel.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(pixel)
    }

    pub fn scaled(&self, scalar: f32) -> Self {
        if !scalar.is_finite() || scalar <= 0.0 || scalar == 1.0 {
            return self.clone();
        }
        let width = (self.width as f32 * scalar).round().max(1.0) as u32;
        let height = (self.height as f32 * scalar).round().max(1.0) as u32;
        self.resized(width, height)
    }

    pub fn resized(&self, width: u32, height: u32) -> Self {
        if (width, height) == self.size() || self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let Some(source) = RgbaImage::from_raw(self.width, self.height, self.rgba.to_vec()) else {
            return self.clone();
        };
        let resized = imageops::resize(&source, width, height, FilterType::Nearest);
        Self {
            width,
            height,
            rgba: resized.into_raw().into(),
        }
    }
}

/// A face rasterized at a fixed pixel size.
#[derive(Clone)]
pub struct Font {
    face: Arc<fontdue::Font>,
    px: f32,
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font").field("px", &self.px).finish()
    }
}

impl Font {
    pub fn from_bytes(bytes: &[u8], px: f32) -> Result<Self, String> {
        let face = fontdue::Font::from_bytes(
            bytes,
            fontdue::FontSettings {
                scale: px,
                ..Default::default()
            },
        )?;
        Ok(Self {
            face: Arc::new(face),
            px,
        })
    }

    pub fn px(&self) -> f32 {
        self.px
    }

    pub fn with_size(&self, px: f32) -> Self {
        Self {
            face: Arc::clone(&self.face),
            px,
        }
    }

    /// Renders a single line of text, tinted with `color`, into a tight image.
    pub fn render(&self, text: &str, color: Color) -> Image {
        let (ascent, descent) = self
            .face
            .horizontal_line_metrics(self.px)
            .map(|metrics| (metrics.ascent, metrics.descent))
            .unwrap_or((self.px, 0.0));

        let glyphs: Vec<(fontdue::Metrics, Vec<u8>)> =
            text.chars().map(|ch| self.face.rasterize(ch, self.px)).collect();
        let advance: f32 = glyphs.iter().map(|(metrics, _)| metrics.advance_width).sum();
        let width = advance.ceil().max(1.0) as u32;
        let height = (ascent - descent).ceil().max(1.0) as u32;

        let mut rgba = vec![0u8; width as usize * height as usize * 4];
        let mut pen_x = 0.0f32;
        for (metrics, coverage) in &glyphs {
            let left = (pen_x + metrics.xmin as f32).round() as i32;
            let top = (ascent - (metrics.ymin + metrics.height as i32) as f32).round() as i32;
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = coverage[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }
                    let x = left + gx as i32;
                    let y = top + gy as i32;
                    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                        continue;
                    }
                    let offset = (y as usize * width as usize + x as usize) * 4;
                    let [r, g, b, a] = color.0;
                    let alpha = (u16::from(alpha) * u16::from(a) / 255) as u8;
                    let slot = &mut rgba[offset..offset + 4];
                    if alpha >= slot[3] {
                        slot.copy_from_slice(&[r, g, b, alpha]);
                    }
                }
            }
            pen_x += metrics.advance_width;
        }

        Image {
            width,
            height,
            rgba: rgba.into(),
        }
    }
}

/// Encoded audio clip. Playback belongs to the platform layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sound {
    path: PathBuf,
    bytes: Arc<[u8]>,
}

impl Sound {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

pub trait ResourceLoader {
    fn load_image(&mut self, path: &Path) -> Result<Image, ResourceError>;
    fn load_font(&mut self, path: &Path, px: f32) -> Result<Font, ResourceError>;
    fn load_sound(&mut self, path: &Path) -> Result<Sound, ResourceError>;

    /// Loads `dir/0.png .. dir/{count - 1}.png`, each scaled by `scalar`.
    fn load_frames(
        &mut self,
        dir: &Path,
        count: usize,
        scalar: f32,
    ) -> Result<Vec<Image>, ResourceError> {
        (0..count)
            .map(|index| {
                self.load_image(&dir.join(format!("{index}.png")))
                    .map(|image| image.scaled(scalar))
            })
            .collect()
    }
}

/// File-backed loader rooted at the asset directory. Decoded images and
/// parsed font faces are cached by resolved path.
#[derive(Debug, Default)]
pub struct AssetLoader {
    root: PathBuf,
    images: HashMap<PathBuf, Image>,
    fonts: HashMap<PathBuf, Font>,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            images: HashMap::new(),
            fonts: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn cached_images(&self) -> usize {
        self.images.len()
    }
}

impl ResourceLoader for AssetLoader {
    fn load_image(&mut self, path: &Path) -> Result<Image, ResourceError> {
        let path = self.resolve(path);
        if let Some(image) = self.images.get(&path) {
            return Ok(image.clone());
        }
        let decoded = ImageReader::open(&path)
            .map_err(|source| ResourceError::Open {
                path: path.clone(),
                source,
            })?
            .decode()
            .map_err(|source| ResourceError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgba8();
        let image = Image {
            width: decoded.width(),
            height: decoded.height(),
            rgba: decoded.into_raw().into(),
        };
        debug!(path = %path.display(), width = image.width, height = image.height, "image_loaded");
        self.images.insert(path, image.clone());
        Ok(image)
    }

    fn load_font(&mut self, path: &Path, px: f32) -> Result<Font, ResourceError> {
        let path = self.resolve(path);
        if let Some(font) = self.fonts.get(&path) {
            return Ok(font.with_size(px));
        }
        let bytes = fs::read(&path).map_err(|source| ResourceError::Open {
            path: path.clone(),
            source,
        })?;
        let font = Font::from_bytes(&bytes, px).map_err(|reason| ResourceError::Font {
            path: path.clone(),
            reason,
        })?;
        info!(path = %path.display(), px, "font_loaded");
        self.fonts.insert(path, font.clone());
        Ok(font)
    }

    fn load_sound(&mut self, path: &Path) -> Result<Sound, ResourceError> {
        let path = self.resolve(path);
        let bytes = fs::read(&path).map_err(|source| ResourceError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Sound {
            path,
            bytes: bytes.into(),
        })
    }
}
