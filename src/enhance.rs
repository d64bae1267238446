//! Enhancement pipeline
//!
//! Fixed order, matching the photo-enhance tool:
//! 1. Tone: brightness -> contrast -> saturation on one float accumulator per
//!    pixel, clamped once at the end
//! 2. Unsharp mask against a blur of the untoned input (only when sharpness > 0)
//! 3. Denoise: flat 0.5px gaussian blur (only when enabled)
//!
//! Each stage is also exposed on its own so callers can preview a single
//! adjustment without running the whole chain.

use log::debug;
use serde::{Deserialize, Serialize};
use crate::blur::gaussian_blur;
use crate::config::clamp_setting;
use crate::error::{Result, ToolkitError};
use crate::raster::{clamp_channel, luma, RasterImage};

/// Blur sigma used to build the unsharp mask
pub const SHARPEN_BLUR_SIGMA: f32 = 1.0;
/// Blur sigma of the denoise pass
pub const DENOISE_BLUR_SIGMA: f32 = 0.5;
/// Fixed divisor applied to the sharpness strength
pub const SHARPEN_DIVISOR: f32 = 10.0;

// ============================================================================
// SETTINGS
// ============================================================================

/// Brightness / contrast / saturation percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSettings {
    /// Channel multiplier in percent, [50, 150] (default: 100)
    pub brightness: f32,
    /// Contrast percent, [50, 150]; factor is (contrast/100 + 0.5)^2 (default: 100)
    pub contrast: f32,
    /// Saturation percent around BT.601 luma, [0, 200] (default: 100)
    pub saturation: f32,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
        }
    }
}

impl ToneSettings {
    pub const BRIGHTNESS_RANGE: (f32, f32) = (50.0, 150.0);
    pub const CONTRAST_RANGE: (f32, f32) = (50.0, 150.0);
    pub const SATURATION_RANGE: (f32, f32) = (0.0, 200.0);

    /// Copy with every slider clamped to its range. Non-finite values are rejected.
    pub fn clamped(&self) -> Result<Self> {
        Ok(Self {
            brightness: clamp_setting("brightness", self.brightness, Self::BRIGHTNESS_RANGE)?,
            contrast: clamp_setting("contrast", self.contrast, Self::CONTRAST_RANGE)?,
            saturation: clamp_setting("saturation", self.saturation, Self::SATURATION_RANGE)?,
        })
    }

    pub fn contrast_factor(&self) -> f32 {
        (self.contrast / 100.0 + 0.5).powi(2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceSettings {
    #[serde(flatten)]
    pub tone: ToneSettings,
    /// Unsharp mask strength, [0, 10] (default: 0 = off)
    pub sharpness: f32,
    /// Apply the flat denoise blur last (default: false)
    pub denoise: bool,
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            tone: ToneSettings::default(),
            sharpness: 0.0,
            denoise: false,
        }
    }
}

impl EnhanceSettings {
    pub const SHARPNESS_RANGE: (f32, f32) = (0.0, 10.0);

    pub fn clamped(&self) -> Result<Self> {
        Ok(Self {
            tone: self.tone.clamped()?,
            sharpness: clamp_setting("sharpness", self.sharpness, Self::SHARPNESS_RANGE)?,
            denoise: self.denoise,
        })
    }
}

// ============================================================================
// TONE ADJUSTMENT
// ============================================================================

/// Brightness -> contrast -> saturation on a single RGB triple.
/// Returns the unclamped result.
fn tone_pixel(rgb: [f32; 3], brightness: f32, contrast_factor: f32, saturation: f32) -> [f32; 3] {
    let mut c = rgb.map(|v| v * brightness);

    c = c.map(|v| ((v / 255.0 - 0.5) * contrast_factor + 0.5) * 255.0);

    let gray = luma(c[0], c[1], c[2]);
    c.map(|v| gray + saturation * (v - gray))
}

/// Apply brightness, contrast and saturation in place. Alpha is untouched.
///
/// Settings are used as given; call `ToneSettings::clamped` first for slider input.
pub fn adjust_tone(img: &mut RasterImage, settings: &ToneSettings) {
    let brightness = settings.brightness / 100.0;
    let contrast_factor = settings.contrast_factor();
    let saturation = settings.saturation / 100.0;

    debug!(
        "Tone: brightness x{} contrast x{} saturation x{}",
        brightness, contrast_factor, saturation
    );

    for pixel in img.as_bytes_mut().chunks_exact_mut(4) {
        let rgb = [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32];
        let out = tone_pixel(rgb, brightness, contrast_factor, saturation);
        pixel[0] = clamp_channel(out[0]);
        pixel[1] = clamp_channel(out[1]);
        pixel[2] = clamp_channel(out[2]);
    }
}

// ============================================================================
// BLUR / SHARPEN / DENOISE
// ============================================================================

/// Unsharp mask: `out = clamp(orig + strength * (orig - blurred) / 10)` on RGB,
/// with `img` blurred against itself. Strength 0 leaves the image untouched.
pub fn unsharp_mask(img: &mut RasterImage, strength: f32) -> Result<()> {
    if strength == 0.0 {
        return Ok(());
    }
    let source = img.clone();
    sharpen_against(img, &source, strength)
}

/// Unsharp mask where the blurred layer comes from `source` rather than `img`.
///
/// The enhance pipeline sharpens the tone-adjusted buffer against a blur of
/// the untouched input, so a pure tone shift also shows up as "detail":
/// a flat 100 brightened to 150 at strength 10 lands on 200.
pub fn sharpen_against(img: &mut RasterImage, source: &RasterImage, strength: f32) -> Result<()> {
    if strength == 0.0 {
        return Ok(());
    }
    if img.dimensions() != source.dimensions() {
        return Err(ToolkitError::InvalidParameter(format!(
            "Sharpen source is {:?}, image is {:?}",
            source.dimensions(),
            img.dimensions()
        )));
    }

    let blurred = gaussian_blur(source, SHARPEN_BLUR_SIGMA)?;
    let amount = strength / SHARPEN_DIVISOR;
    debug!("Unsharp mask: strength {} sigma {}", strength, SHARPEN_BLUR_SIGMA);

    for (pixel, soft) in img
        .as_bytes_mut()
        .chunks_exact_mut(4)
        .zip(blurred.as_bytes().chunks_exact(4))
    {
        for c in 0..3 {
            let orig = pixel[c] as f32;
            pixel[c] = clamp_channel(orig + amount * (orig - soft[c] as f32));
        }
    }

    Ok(())
}

/// Flat blur used as a stand-in for noise reduction. Not edge-aware.
pub fn denoise(img: &mut RasterImage) -> Result<()> {
    *img = gaussian_blur(img, DENOISE_BLUR_SIGMA)?;
    Ok(())
}

// ============================================================================
// FULL PIPELINE
// ============================================================================

/// Run tone -> sharpen -> denoise on a copy of `img`. Sharpening blurs the
/// original `img`, not the toned copy.
pub fn enhance(img: &RasterImage, settings: &EnhanceSettings) -> Result<RasterImage> {
    let settings = settings.clamped()?;
    let mut out = img.clone();

    adjust_tone(&mut out, &settings.tone);

    if settings.sharpness > 0.0 {
        sharpen_against(&mut out, img, settings.sharpness)?;
    }

    if settings.denoise {
        denoise(&mut out)?;
    }

    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(value: u8) -> RasterImage {
        RasterImage::from_pixel(2, 2, [value, value, value, 255]).unwrap()
    }

    /// Contrast 50 gives a contrast factor of exactly 1
    fn neutral() -> ToneSettings {
        ToneSettings {
            brightness: 100.0,
            contrast: 50.0,
            saturation: 100.0,
        }
    }

    #[test]
    fn test_neutral_tone_is_identity() {
        let mut img = RasterImage::new(3, 1).unwrap();
        img.set_pixel(0, 0, [0, 17, 255, 255]);
        img.set_pixel(1, 0, [128, 64, 200, 10]);
        img.set_pixel(2, 0, [255, 255, 1, 0]);
        let before = img.clone();

        adjust_tone(&mut img, &neutral());
        assert_eq!(img, before);
    }

    #[test]
    fn test_brightness_scales_linearly() {
        let mut img = gray(128);
        adjust_tone(&mut img, &ToneSettings { brightness: 150.0, ..neutral() });
        assert_eq!(img.pixel(1, 1), [192, 192, 192, 255]);
    }

    #[test]
    fn test_brightness_saturates_white() {
        let mut img = gray(255);
        adjust_tone(&mut img, &ToneSettings { brightness: 150.0, ..neutral() });
        assert_eq!(img.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_default_contrast_factor() {
        assert!((ToneSettings::default().contrast_factor() - 2.25).abs() < 1e-6);
        assert!((neutral().contrast_factor() - 1.0).abs() < 1e-6);

        // ((128/255 - 0.5) * 2.25 + 0.5) * 255 = 128.625
        let mut img = gray(128);
        adjust_tone(&mut img, &ToneSettings::default());
        assert_eq!(img.pixel(0, 0)[0], 129);
    }

    #[test]
    fn test_single_clamp_at_end() {
        // Brightness pushes 192 -> 288 unclamped; contrast 50 keeps it, clamp gives 255.
        // Saturation 0 then collapses to luma of the unclamped triple.
        let mut img = RasterImage::from_pixel(1, 1, [192, 0, 0, 255]).unwrap();
        let settings = ToneSettings {
            brightness: 150.0,
            contrast: 50.0,
            saturation: 0.0,
        };
        adjust_tone(&mut img, &settings);
        // gray = 0.2989 * 288 = 86.08
        assert_eq!(img.pixel(0, 0), [86, 86, 86, 255]);
    }

    #[test]
    fn test_zero_saturation_is_grayscale() {
        let mut img = RasterImage::from_pixel(1, 1, [200, 100, 50, 255]).unwrap();
        adjust_tone(&mut img, &ToneSettings { saturation: 0.0, ..neutral() });
        let [r, g, b, _] = img.pixel(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_tone_keeps_alpha() {
        let mut img = RasterImage::from_pixel(2, 2, [100, 150, 200, 77]).unwrap();
        adjust_tone(&mut img, &ToneSettings::default());
        assert_eq!(img.pixel(1, 0)[3], 77);
    }

    #[test]
    fn test_clamped_settings() {
        let wild = ToneSettings {
            brightness: 500.0,
            contrast: -3.0,
            saturation: 250.0,
        };
        let c = wild.clamped().unwrap();
        assert_eq!(c.brightness, 150.0);
        assert_eq!(c.contrast, 50.0);
        assert_eq!(c.saturation, 200.0);

        let nan = ToneSettings { brightness: f32::NAN, ..Default::default() };
        assert!(nan.clamped().is_err());
    }

    #[test]
    fn test_unsharp_zero_strength_is_identity() {
        let mut img = RasterImage::new(4, 4).unwrap();
        img.set_pixel(1, 1, [255, 255, 255, 255]);
        let before = img.clone();
        unsharp_mask(&mut img, 0.0).unwrap();
        assert_eq!(img, before);
    }

    #[test]
    fn test_unsharp_uniform_image_unchanged() {
        let mut img = RasterImage::from_pixel(5, 5, [90, 120, 30, 255]).unwrap();
        let before = img.clone();
        unsharp_mask(&mut img, 10.0).unwrap();
        assert_eq!(img, before);
    }

    #[test]
    fn test_unsharp_increases_edge_contrast() {
        // Left half dark, right half light
        let mut img = RasterImage::from_pixel(8, 8, [50, 50, 50, 255]).unwrap();
        for y in 0..8 {
            for x in 4..8 {
                img.set_pixel(x, y, [200, 200, 200, 255]);
            }
        }
        unsharp_mask(&mut img, 10.0).unwrap();

        assert!(img.pixel(3, 4)[0] < 50, "dark side of edge should get darker");
        assert!(img.pixel(4, 4)[0] > 200, "light side of edge should get lighter");
        assert_eq!(img.pixel(3, 4)[3], 255);
    }

    #[test]
    fn test_denoise_keeps_dimensions() {
        let mut img = RasterImage::from_pixel(7, 3, [10, 20, 30, 255]).unwrap();
        img.set_pixel(3, 1, [250, 250, 250, 255]);
        denoise(&mut img).unwrap();
        assert_eq!(img.dimensions(), (7, 3));
        assert!(img.pixel(3, 1)[0] < 250);
    }

    #[test]
    fn test_enhance_defaults_match_tone_only() {
        let mut img = RasterImage::from_pixel(3, 3, [100, 110, 120, 255]).unwrap();
        img.set_pixel(1, 1, [10, 200, 30, 255]);

        let enhanced = enhance(&img, &EnhanceSettings::default()).unwrap();
        let mut expected = img.clone();
        adjust_tone(&mut expected, &ToneSettings::default());
        assert_eq!(enhanced, expected);
    }

    #[test]
    fn test_enhance_sharpens_against_untoned_input() {
        let img = RasterImage::from_pixel(8, 8, [100, 100, 100, 255]).unwrap();
        let settings = EnhanceSettings {
            tone: ToneSettings { brightness: 150.0, ..neutral() },
            sharpness: 10.0,
            denoise: false,
        };
        // toned 150, blurred input 100: 150 + 10 * (150 - 100) / 10
        let out = enhance(&img, &settings).unwrap();
        assert_eq!(out.pixel(4, 4), [200, 200, 200, 255]);
        assert_eq!(out.pixel(0, 7), [200, 200, 200, 255]);
    }

    #[test]
    fn test_sharpen_against_rejects_size_mismatch() {
        let mut img = gray(10);
        let other = RasterImage::from_pixel(3, 3, [10, 10, 10, 255]).unwrap();
        assert!(sharpen_against(&mut img, &other, 5.0).is_err());
    }

    #[test]
    fn test_enhance_settings_json_is_flat() {
        let json = r#"{"brightness": 120, "sharpness": 3, "denoise": true}"#;
        let settings: EnhanceSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.tone.brightness, 120.0);
        assert_eq!(settings.tone.contrast, 100.0);
        assert_eq!(settings.sharpness, 3.0);
        assert!(settings.denoise);
    }
}
