//! Environment lighting presets
//!
//! Each preset stands in for an image-based environment: it decides the
//! background the frame is cleared to and the ambient light the PBR pass adds
//! on top of the key light.

use std::{fmt, str::FromStr};

use super::params::ParamError;

/// Selectable environment preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvironmentPreset {
    #[default]
    Studio,
    Sunset,
    Night,
}

/// Lighting values derived from a preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentLighting {
    pub background: [f32; 3],
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
}

impl EnvironmentPreset {
    pub const ALL: [EnvironmentPreset; 3] = [
        EnvironmentPreset::Studio,
        EnvironmentPreset::Sunset,
        EnvironmentPreset::Night,
    ];

    /// Lowercase identifier, as used in config files and the preset combo
    pub fn name(self) -> &'static str {
        match self {
            EnvironmentPreset::Studio => "studio",
            EnvironmentPreset::Sunset => "sunset",
            EnvironmentPreset::Night => "night",
        }
    }

    /// Human readable label for the UI
    pub fn label(self) -> &'static str {
        match self {
            EnvironmentPreset::Studio => "Studio",
            EnvironmentPreset::Sunset => "Sunset",
            EnvironmentPreset::Night => "Night",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    /// Parses a preset name, falling back to [`EnvironmentPreset::Studio`]
    /// for anything unrecognised so the render loop never sees a bad preset.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|err| {
            log::warn!("{err}; falling back to '{}'", Self::default().name());
            Self::default()
        })
    }

    pub fn lighting(self) -> EnvironmentLighting {
        match self {
            EnvironmentPreset::Studio => EnvironmentLighting {
                background: [0.82, 0.83, 0.86],
                ambient_color: [1.0, 1.0, 1.0],
                ambient_intensity: 0.45,
            },
            EnvironmentPreset::Sunset => EnvironmentLighting {
                background: [0.96, 0.58, 0.38],
                ambient_color: [1.0, 0.72, 0.52],
                ambient_intensity: 0.35,
            },
            EnvironmentPreset::Night => EnvironmentLighting {
                background: [0.03, 0.04, 0.10],
                ambient_color: [0.45, 0.52, 0.85],
                ambient_intensity: 0.12,
            },
        }
    }
}

impl FromStr for EnvironmentPreset {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "studio" => Ok(EnvironmentPreset::Studio),
            "sunset" => Ok(EnvironmentPreset::Sunset),
            "night" => Ok(EnvironmentPreset::Night),
            _ => Err(ParamError::UnknownPreset(s.to_string())),
        }
    }
}

impl fmt::Display for EnvironmentPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
