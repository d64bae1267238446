//! Tool settings file
//!
//! One JSON document holding the defaults for every tool. Missing sections
//! and fields fall back to the built-in defaults, so a file only needs to
//! list what it overrides:
//!
//! ```json
//! { "compress": { "quality": 0.6 }, "background": { "tolerance": 45 } }
//! ```

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::background::BackgroundSettings;
use crate::compose::JoinSettings;
use crate::enhance::EnhanceSettings;
use crate::error::{Result, ToolkitError};
use crate::redact::RedactSettings;
use crate::resample::{CompressSettings, ConvertSettings, ResizeSettings};
use crate::stamp::StampSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub background: BackgroundSettings,
    pub enhance: EnhanceSettings,
    pub compress: CompressSettings,
    pub resize: ResizeSettings,
    pub convert: ConvertSettings,
    pub redact: RedactSettings,
    pub join: JoinSettings,
    pub stamp: StampSettings,
}

impl ToolkitConfig {
    /// Read a settings file. Fails if it is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Read a settings file, or use defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Clamp a slider value into `[min, max]`, logging when it moved.
/// NaN and infinities are rejected.
pub(crate) fn clamp_setting(name: &str, value: f32, (min, max): (f32, f32)) -> Result<f32> {
    if !value.is_finite() {
        return Err(ToolkitError::InvalidParameter(format!(
            "{} must be a finite number, got {}",
            name, value
        )));
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{} {} clamped to {}", name, value, clamped);
    }
    Ok(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::OutputFormat;
    use crate::raster::ColorSample;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("pixel-tools-config-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_defaults() {
        let config = ToolkitConfig::default();
        assert_eq!(config.background.tolerance, 30);
        assert_eq!(config.compress.quality, 0.8);
        assert_eq!(config.compress.max_width, 1920);
        assert_eq!(config.resize.quality, 0.9);
        assert_eq!(config.convert.format, OutputFormat::Jpeg);
        assert_eq!(config.enhance.tone.brightness, 100.0);
        assert_eq!(config.stamp.font_size, 16.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r##"{
            "compress": { "quality": 0.6 },
            "background": { "tolerance": 45, "replacement": "#00ff00" },
            "convert": { "format": "webp" },
            "stamp": { "date_format": "yyyy-MM-dd", "text_color": "#ff0000" }
        }"##;
        let config: ToolkitConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.compress.quality, 0.6);
        assert_eq!(config.compress.max_width, 1920);
        assert_eq!(config.background.tolerance, 45);
        assert_eq!(config.background.replacement, ColorSample::new(0, 255, 0));
        assert_eq!(config.convert.format, OutputFormat::Webp);
        assert_eq!(config.redact.blur_radius, 20.0);
        assert_eq!(config.stamp.date_format, crate::stamp::DateFormat::YearMonthDay);
        assert_eq!(config.stamp.text_color, ColorSample::new(255, 0, 0));
        assert!(config.stamp.include_date);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save_then_load.json");
        let mut config = ToolkitConfig::default();
        config.enhance.sharpness = 4.0;
        config.save(&path).unwrap();

        let loaded = ToolkitConfig::load(&path).unwrap();
        assert_eq!(loaded.enhance.sharpness, 4.0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ToolkitConfig::load_or_default(&temp_path("does-not-exist.json")).unwrap();
        assert_eq!(config.background.tolerance, 30);
    }

    #[test]
    fn test_bad_json_is_error() {
        let path = temp_path("bad.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ToolkitConfig::load(&path), Err(ToolkitError::Json(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_clamp_setting() {
        assert_eq!(clamp_setting("x", 5.0, (0.0, 1.0)).unwrap(), 1.0);
        assert_eq!(clamp_setting("x", 0.5, (0.0, 1.0)).unwrap(), 0.5);
        assert!(clamp_setting("x", f32::INFINITY, (0.0, 1.0)).is_err());
    }
}
