//! Raster buffer shared by every transform.
//!
//! `RasterImage` wraps an `RgbaImage` (row-major, top-to-bottom, 4 bytes per
//! pixel) and guarantees non-zero dimensions with a buffer of exactly
//! `width * height * 4` bytes. Transforms take it by reference and either
//! mutate it in place or return a fresh one; there is no shared drawing
//! surface between calls.

use image::{Rgba, RgbaImage};
use palette::Srgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::{Result, ToolkitError};

// ============================================================================
// RASTER IMAGE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: RgbaImage,
}

impl RasterImage {
    /// Fully transparent black image
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::from_pixel(width, height, [0, 0, 0, 0])
    }

    pub fn from_pixel(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba(rgba)),
        })
    }

    /// Wrap a raw RGBA buffer; its length must be `width * height * 4`
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ToolkitError::InvalidParameter(format!(
                "Buffer length {} does not match {}x{} RGBA ({} bytes)",
                data.len(),
                width,
                height,
                expected
            )));
        }
        let pixels = RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| ToolkitError::InvalidParameter("Buffer too small".to_string()))?;
        Ok(Self { pixels })
    }

    pub fn from_rgba(pixels: RgbaImage) -> Result<Self> {
        let (width, height) = pixels.dimensions();
        check_dimensions(width, height)?;
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Mutable view of the RGBA bytes. The slice cannot change length, so the
    /// buffer invariant holds.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Panics if `(x, y)` is out of bounds, like `RgbaImage::get_pixel`
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.pixels.put_pixel(x, y, Rgba(rgba));
    }

    pub fn color_at(&self, x: u32, y: u32) -> ColorSample {
        let [r, g, b, _] = self.pixel(x, y);
        ColorSample::new(r, g, b)
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels.into_raw()
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ToolkitError::InvalidParameter(format!(
            "Image dimensions must be non-zero, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

// ============================================================================
// CHANNEL HELPERS
// ============================================================================

/// Round and clamp a float channel value into [0, 255]. NaN maps to 0.
pub fn clamp_channel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// ITU-R BT.601 luma
pub fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.2989 * r + 0.5870 * g + 0.1140 * b
}

// ============================================================================
// COLOR SAMPLE
// ============================================================================

/// An RGB colour, either sampled from an image or configured by the caller.
/// Serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSample {
    pub const WHITE: ColorSample = ColorSample { r: 255, g: 255, b: 255 };
    pub const BLACK: ColorSample = ColorSample { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let rgb: Srgb<u8> = hex
            .trim()
            .parse()
            .map_err(|e| ToolkitError::InvalidParameter(format!("Invalid colour '{}': {}", hex, e)))?;
        Ok(Self::new(rgb.red, rgb.green, rgb.blue))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// True when every channel differs from `other` by strictly less than `tolerance`
    pub fn within_tolerance(&self, other: &ColorSample, tolerance: u8) -> bool {
        let tolerance = tolerance as i16;
        (self.r as i16 - other.r as i16).abs() < tolerance
            && (self.g as i16 - other.g as i16).abs() < tolerance
            && (self.b as i16 - other.b as i16).abs() < tolerance
    }

    pub fn with_alpha(&self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

impl fmt::Display for ColorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ColorSample {
    type Err = ToolkitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ColorSample {
    type Error = ToolkitError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<ColorSample> for String {
    fn from(color: ColorSample) -> Self {
        color.to_hex()
    }
}

impl From<[u8; 3]> for ColorSample {
    fn from(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

impl From<ColorSample> for [u8; 3] {
    fn from(color: ColorSample) -> Self {
        [color.r, color.g, color.b]
    }
}

// ============================================================================
// TESTS
// ============================================================================
