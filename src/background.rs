//! Background Classifier & Replacer
//!
//! A pixel counts as background when each of its RGB channels is strictly
//! within `tolerance` of the reference colour. The reference colour is the
//! top-left corner sample; the other three corners are sampled too but only
//! reported, never voted on.
//!
//! Two ways to treat a background pixel:
//! - Remove: alpha becomes 0, RGB is left as-is
//! - Replace: RGB becomes the target colour, alpha is left as-is

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use crate::raster::{ColorSample, RasterImage};

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSettings {
    /// Per-channel absolute difference threshold, strict (default: 30)
    pub tolerance: u8,
    /// Colour written over background pixels in replace mode (default: white)
    pub replacement: ColorSample,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            tolerance: 30,
            replacement: ColorSample::WHITE,
        }
    }
}

/// What happens to a classified background pixel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    Remove,
    Replace(ColorSample),
}

#[derive(Debug, Clone, Serialize)]
pub struct BackgroundResult {
    /// Reference colour used for classification (top-left corner)
    pub reference: ColorSample,
    /// All four corners: top-left, top-right, bottom-left, bottom-right
    pub corners: [ColorSample; 4],
    /// Number of pixels classified as background
    pub matched_pixels: usize,
}

// ============================================================================
// CORNER SAMPLING
// ============================================================================

/// Sample the four corner pixels: top-left, top-right, bottom-left, bottom-right
pub fn sample_corners(img: &RasterImage) -> [ColorSample; 4] {
    let (width, height) = img.dimensions();
    [
        img.color_at(0, 0),
        img.color_at(width - 1, 0),
        img.color_at(0, height - 1),
        img.color_at(width - 1, height - 1),
    ]
}

/// Reference background colour. Only the first (top-left) corner is consulted.
pub fn estimate_background(img: &RasterImage) -> ColorSample {
    sample_corners(img)[0]
}

// ============================================================================
// CLASSIFY + APPLY
// ============================================================================

/// Classify background pixels against the corner reference and apply `mode`.
/// Dimensions never change.
pub fn classify_and_apply(img: &mut RasterImage, tolerance: u8, mode: BackgroundMode) -> BackgroundResult {
    let corners = sample_corners(img);
    let reference = corners[0];

    debug!(
        "Background pass: reference {} tolerance {} mode {:?}",
        reference, tolerance, mode
    );

    let mut matched_pixels = 0;
    for pixel in img.as_bytes_mut().chunks_exact_mut(4) {
        let color = ColorSample::new(pixel[0], pixel[1], pixel[2]);
        if !color.within_tolerance(&reference, tolerance) {
            continue;
        }

        matched_pixels += 1;
        match mode {
            BackgroundMode::Remove => pixel[3] = 0,
            BackgroundMode::Replace(target) => {
                pixel[0] = target.r;
                pixel[1] = target.g;
                pixel[2] = target.b;
            }
        }
    }

    BackgroundResult {
        reference,
        corners,
        matched_pixels,
    }
}

/// Make background pixels fully transparent
///
/// Safe to re-apply: RGB is untouched, so a second pass with the same
/// tolerance matches the same pixels and alpha stays 0.
pub fn remove_background(img: &mut RasterImage, settings: &BackgroundSettings) -> BackgroundResult {
    classify_and_apply(img, settings.tolerance, BackgroundMode::Remove)
}

/// Paint background pixels with `settings.replacement`, keeping their alpha
pub fn replace_background(img: &mut RasterImage, settings: &BackgroundSettings) -> BackgroundResult {
    classify_and_apply(img, settings.tolerance, BackgroundMode::Replace(settings.replacement))
}

/// Clamp a caller-supplied tolerance (e.g. from an integer slider) into [0, 255]
pub fn tolerance_from(value: i64) -> u8 {
    let clamped = value.clamp(0, 255);
    if clamped != value {
        warn!("Tolerance {} clamped to {}", value, clamped);
    }
    clamped as u8
}

// ============================================================================
// TESTS
// ============================================================================
