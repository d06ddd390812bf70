//! Configuration options for the volume mapper.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolrayError};
use crate::selection::{ArrayAccess, ScalarMode};
use crate::volume::BlendMode;

/// Mapper configuration. Missing keys in JSON take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperOptions {
    /// Ray step length in world units.
    pub sample_distance: f32,

    /// How samples are composited along a ray.
    pub blend_mode: BlendMode,

    /// Where the scalars are looked up.
    pub scalar_mode: ScalarMode,

    /// Array lookup used by the field-data scalar modes.
    pub array_access: ArrayAccess,

    /// Requested side length of the ray-jitter noise texture.
    pub noise_size: u32,

    /// Number of texels in the color and opacity lookup tables.
    pub table_width: u32,

    /// Clear color for headless rendering.
    pub background_color: Vec3,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            sample_distance: 1.0,
            blend_mode: BlendMode::Composite,
            scalar_mode: ScalarMode::Default,
            array_access: ArrayAccess::ById(0),
            noise_size: 128,
            table_width: 1024,
            background_color: Vec3::ZERO,
        }
    }
}

impl MapperOptions {
    /// Parses options from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_distance > 0.0 && self.sample_distance.is_finite()) {
            return Err(VolrayError::InvalidConfig(format!(
                "sample_distance must be positive, got {}",
                self.sample_distance
            )));
        }
        if self.noise_size == 0 {
            return Err(VolrayError::InvalidConfig("noise_size must be non-zero".into()));
        }
        if self.table_width < 2 {
            return Err(VolrayError::InvalidConfig(format!(
                "table_width must be at least 2, got {}",
                self.table_width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MapperOptions::default();
        assert_eq!(options.sample_distance, 1.0);
        assert_eq!(options.noise_size, 128);
        assert_eq!(options.table_width, 1024);
        assert_eq!(options.blend_mode, BlendMode::Composite);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let options = MapperOptions::from_json_str(
            r#"{ "sample_distance": 0.25, "blend_mode": "MaximumIntensity",
                 "array_access": { "ByName": "density" } }"#,
        )
        .unwrap();
        assert_eq!(options.sample_distance, 0.25);
        assert_eq!(options.blend_mode, BlendMode::MaximumIntensity);
        assert_eq!(options.array_access, ArrayAccess::ByName("density".into()));
        assert_eq!(options.table_width, 1024);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            MapperOptions::from_json_str(r#"{ "sample_distance": 0.0 }"#),
            Err(VolrayError::InvalidConfig(_))
        ));
        assert!(matches!(
            MapperOptions::from_json_str("{ not json"),
            Err(VolrayError::JsonError(_))
        ));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let path = std::env::temp_dir().join("volray_options_test.json");
        let options = MapperOptions {
            noise_size: 64,
            ..MapperOptions::default()
        };
        std::fs::write(&path, serde_json::to_string(&options).unwrap()).unwrap();
        assert_eq!(MapperOptions::from_json_file(&path).unwrap(), options);
        let _ = std::fs::remove_file(&path);
    }
}
