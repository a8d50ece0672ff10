use std::path::{Path, PathBuf};

use engine::Color;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

pub(crate) const EMBEDDED_PRESETS: &str = include_str!("../../assets/presets.json");

pub(crate) type PresetResult<T> = Result<T, String>;

fn default_scroll() -> i32 {
    2
}

fn default_speed() -> f32 {
    1.0
}

fn default_delta() -> f32 {
    2.0
}

/// Background set for the runner plus the matching text color and floor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ParallaxPreset {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) layers: usize,
    #[serde(default)]
    pub(crate) y_offset: i32,
    #[serde(default)]
    pub(crate) color: Color,
    #[serde(default = "default_scroll")]
    pub(crate) scroll: i32,
    #[serde(default = "default_speed")]
    pub(crate) speed: f32,
    #[serde(default = "default_delta")]
    pub(crate) delta: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SoundPresets {
    pub(crate) death: Vec<PathBuf>,
    pub(crate) hurt: Vec<PathBuf>,
}

impl SoundPresets {
    pub(crate) fn random_death<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Path> {
        self.death.choose(rng).map(PathBuf::as_path)
    }

    pub(crate) fn random_hurt<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Path> {
        self.hurt.choose(rng).map(PathBuf::as_path)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Presets {
    pub(crate) parallax: Vec<ParallaxPreset>,
    pub(crate) sounds: SoundPresets,
}

impl Presets {
    pub(crate) fn embedded() -> PresetResult<Self> {
        Self::parse(EMBEDDED_PRESETS)
    }

    pub(crate) fn parse(raw: &str) -> PresetResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let presets = match serde_path_to_error::deserialize::<_, Presets>(&mut deserializer) {
            Ok(presets) => presets,
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                if path.is_empty() || path == "." {
                    return Err(format!("parse presets json: {source}"));
                }
                return Err(format!("parse presets json at {path}: {source}"));
            }
        };
        presets.validate()?;
        Ok(presets)
    }

    pub(crate) fn random_parallax<R: Rng + ?Sized>(&self, rng: &mut R) -> PresetResult<&ParallaxPreset> {
        self.parallax
            .choose(rng)
            .ok_or_else(|| validation_err("parallax", "no presets defined"))
    }

    pub(crate) fn parallax_named(&self, name: &str) -> Option<&ParallaxPreset> {
        self.parallax.iter().find(|preset| preset.name == name)
    }

    fn validate(&self) -> PresetResult<()> {
        if self.parallax.is_empty() {
            return Err(validation_err("parallax", "expected at least one preset"));
        }
        for (index, preset) in self.parallax.iter().enumerate() {
            if preset.layers == 0 {
                return Err(expected_actual(
                    &format!("parallax[{index}].layers"),
                    "at least 1",
                    preset.layers,
                ));
            }
            if preset.y_offset < 0 {
                return Err(expected_actual(
                    &format!("parallax[{index}].y_offset"),
                    "non-negative offset",
                    preset.y_offset,
                ));
            }
            if !preset.speed.is_finite() || !preset.delta.is_finite() {
                return Err(validation_err(
                    &format!("parallax[{index}]"),
                    "speed and delta must be finite",
                ));
            }
        }
        Ok(())
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

fn expected_actual(path: &str, expected: impl std::fmt::Display, actual: impl std::fmt::Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}
