use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::crop::{CropRegion, StageSize};
use crate::shape::Color4;

/// Directory name under the platform config dir.
pub const CONFIG_DIR: &str = "crop-markup";
pub const CONFIG_FILE: &str = "config.json";

/// Editor settings. Every field falls back to its default when missing from
/// the config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Crop stage size; the source image is stretched to fit it.
    pub stage_width: f32,
    pub stage_height: f32,
    /// Smallest crop width/height a handle drag can produce.
    pub min_crop_size: f32,
    pub initial_crop: CropRegion,
    /// Output pixels per stage pixel when rasterizing the crop.
    pub pixel_ratio: f32,
    pub stroke_color: Color4,
    pub stroke_width: f32,
    /// Crop rectangle outline and handle color; its fill is a faded copy.
    pub crop_color: Color4,
    /// Radius of the crop corner handles and shape transform handles.
    pub handle_radius: f32,
    pub scallops_per_side: u32,
    pub scallop_radius: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            stage_width: 600.0,
            stage_height: 400.0,
            min_crop_size: 50.0,
            initial_crop: CropRegion::new(200.0, 100.0, 200.0, 200.0),
            pixel_ratio: 1.0,
            stroke_color: Color4::BLACK,
            stroke_width: 4.0,
            crop_color: Color4::from_rgb8(0, 123, 255),
            handle_radius: 6.0,
            scallops_per_side: 20,
            scallop_radius: 8.0,
        }
    }
}

impl EditorConfig {
    pub fn stage(&self) -> StageSize {
        StageSize {
            width: self.stage_width,
            height: self.stage_height,
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validated()
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Reject settings no crop can satisfy and pull the initial crop onto
    /// the stage.
    pub fn validated(mut self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            self.stage_width > 0.0 && self.stage_height > 0.0,
            "stage must be non-empty, got {}x{}",
            self.stage_width,
            self.stage_height
        );
        let limit = self.stage_width.min(self.stage_height);
        anyhow::ensure!(
            self.min_crop_size >= 0.0 && self.min_crop_size <= limit,
            "min_crop_size must be within 0..={limit}, got {}",
            self.min_crop_size
        );
        anyhow::ensure!(
            self.pixel_ratio > 0.0,
            "pixel_ratio must be positive, got {}",
            self.pixel_ratio
        );

        let fitted = self.initial_crop.fit_to(self.stage(), self.min_crop_size);
        if fitted != self.initial_crop {
            log::warn!("initial crop {:?} moved onto the stage as {fitted:?}", self.initial_crop);
            self.initial_crop = fitted;
        }
        Ok(self)
    }

    /// Resolve the config: an explicit path must load, the per-user file is
    /// used when present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => match Self::from_file(&path) {
                Ok(config) => Ok(config),
                Err(err) => {
                    log::warn!("{err:#}; using defaults");
                    Ok(Self::default())
                }
            },
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "stage_width": 800.0, "stroke_width": 2.0 }"#).unwrap();

        let config = EditorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.stage_width, 800.0);
        assert_eq!(config.stroke_width, 2.0);
        assert_eq!(config.stage_height, 400.0);
        assert_eq!(config.min_crop_size, 50.0);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(EditorConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn initial_crop_is_pulled_onto_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "initial_crop": { "x": 500.0, "y": 300.0, "width": 200.0, "height": 200.0 } }"#,
        )
        .unwrap();

        let config = EditorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.initial_crop, CropRegion::new(400.0, 200.0, 200.0, 200.0));
    }

    #[test]
    fn initial_crop_larger_than_stage_shrinks() {
        let config = EditorConfig {
            initial_crop: CropRegion::new(-20.0, 10.0, 900.0, 20.0),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(config.initial_crop, CropRegion::new(0.0, 10.0, 600.0, 50.0));
    }

    #[test]
    fn min_crop_size_beyond_stage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "min_crop_size": 500.0 }"#).unwrap();
        assert!(EditorConfig::load(Some(&path)).is_err());

        let config = EditorConfig {
            stage_width: 0.0,
            ..Default::default()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn stroke_color_reads_hex() {
        let config: EditorConfig =
            serde_json::from_str(r##"{ "stroke_color": "#ff8000" }"##).unwrap();
        assert_eq!(config.stroke_color, Color4::from_rgb8(255, 128, 0));
    }
}
