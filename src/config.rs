//! Runtime configuration
//!
//! Loaded from the JSON file named by `VIEWFINDER_CONFIG` when it is set.
//! Missing fields take their defaults, so `{}` is a valid config.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    gfx::resources::texture_resource::MAX_TEXTURE_SIZE,
    studio::{
        camera_animator::{DEFAULT_DAMPING, DEFAULT_EPSILON},
        shadows::ShadowSettings,
    },
};

pub const CONFIG_ENV: &str = "VIEWFINDER_CONFIG";
pub const SHADOW_DEBUG_ENV: &str = "VIEWFINDER_SHADOW_DEBUG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Key-light shadow map resolution
    pub map_size: u32,
    pub samples: u32,
    pub radius: f32,
    pub frames: u32,
    /// Resolution of the accumulation texture on the catcher
    pub accumulation_resolution: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        let settings = ShadowSettings::default();
        Self {
            map_size: 2048,
            samples: settings.samples,
            radius: settings.radius,
            frames: settings.frames,
            accumulation_resolution: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Fraction of the remaining distance covered per tick
    pub damping: f32,
    pub epsilon: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub window: WindowConfig,
    pub shadows: ShadowConfig,
    pub camera: CameraConfig,
    /// Image for the floor; the built-in pattern is used when unset
    pub floor_texture: Option<PathBuf>,
    pub ui_font_size: f32,
    /// Extra soft-shadow logging, also enabled by `VIEWFINDER_SHADOW_DEBUG`
    pub shadow_debug: bool,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            shadows: ShadowConfig::default(),
            camera: CameraConfig::default(),
            floor_texture: None,
            ui_font_size: 18.0,
            shadow_debug: false,
        }
    }
}

impl StudioConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reads `VIEWFINDER_CONFIG` if set, otherwise returns the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                log::info!("Loading config from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        if std::env::var_os(SHADOW_DEBUG_ENV).is_some() {
            config.shadow_debug = true;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid("window size must be non-zero");
        }
        if !self.shadows.map_size.is_power_of_two() {
            return invalid("shadows.map_size must be a power of two");
        }
        if !self.shadows.accumulation_resolution.is_power_of_two() {
            return invalid("shadows.accumulation_resolution must be a power of two");
        }
        if self.shadows.map_size > MAX_TEXTURE_SIZE
            || self.shadows.accumulation_resolution > MAX_TEXTURE_SIZE
        {
            return Err(ConfigError::Invalid(format!(
                "shadow textures are limited to {MAX_TEXTURE_SIZE} pixels per side"
            )));
        }
        if self.shadows.samples == 0 || self.shadows.frames == 0 {
            return invalid("shadows.samples and shadows.frames must be at least 1");
        }
        if !(self.shadows.radius.is_finite() && self.shadows.radius >= 0.0) {
            return invalid("shadows.radius must be a non-negative number");
        }
        if !(self.camera.damping > 0.0 && self.camera.damping <= 1.0) {
            return invalid("camera.damping must be in (0, 1]");
        }
        if !(self.camera.epsilon.is_finite() && self.camera.epsilon >= 0.0) {
            return invalid("camera.epsilon must be a non-negative number");
        }
        if !(self.ui_font_size.is_finite() && self.ui_font_size > 0.0) {
            return invalid("ui_font_size must be positive");
        }
        Ok(())
    }

    pub fn shadow_settings(&self) -> ShadowSettings {
        ShadowSettings {
            samples: self.shadows.samples,
            radius: self.shadows.radius,
            frames: self.shadows.frames,
            ..ShadowSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = StudioConfig::from_json("{}").unwrap();
        assert_eq!(config, StudioConfig::default());
        assert_eq!(config.shadows.samples, 8);
        assert_eq!(config.shadows.frames, 60);
        assert_eq!(config.camera.damping, 0.05);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = StudioConfig::from_json(
            r#"{ "shadows": { "frames": 30 }, "floor_texture": "floor.png" }"#,
        )
        .unwrap();
        assert_eq!(config.shadows.frames, 30);
        assert_eq!(config.shadows.map_size, 2048);
        assert_eq!(config.floor_texture, Some(PathBuf::from("floor.png")));
        assert_eq!(config.shadow_settings().frames, 30);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for json in [
            r#"{ "camera": { "damping": 0.0 } }"#,
            r#"{ "camera": { "damping": 1.5 } }"#,
            r#"{ "shadows": { "map_size": 1000 } }"#,
            r#"{ "shadows": { "map_size": 8192 } }"#,
            r#"{ "shadows": { "accumulation_resolution": 16384 } }"#,
            r#"{ "shadows": { "samples": 0 } }"#,
            r#"{ "window": { "width": 0 } }"#,
        ] {
            assert!(
                matches!(StudioConfig::from_json(json), Err(ConfigError::Invalid(_))),
                "{json} should be invalid"
            );
        }
    }

    #[test]
    fn test_largest_supported_shadow_map_is_accepted() {
        let config = StudioConfig::from_json(r#"{ "shadows": { "map_size": 4096 } }"#).unwrap();
        assert_eq!(config.shadows.map_size, MAX_TEXTURE_SIZE);
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        assert!(matches!(
            StudioConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = StudioConfig::from_file(Path::new("/nonexistent/viewfinder.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
