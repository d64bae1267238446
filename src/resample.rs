//! Compress / Resize / Convert
//!
//! Decoding is the caller's job. These take a `RasterImage`, resample it if
//! needed, and re-encode.
//!
//! - Resize: output is exactly the requested size. Aspect ratio is the
//!   caller's business (see `height_for_width` / `width_for_height`).
//! - Compress: width capped at `max_width` (height follows the ratio), then
//!   re-encoded at `quality` in the source format, JPEG if unknown. The
//!   output is not guaranteed to be smaller than the input.
//! - Convert: same size, chosen format.

use image::imageops::{self, FilterType};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use crate::codec::{encode, EncodedImage, OutputFormat};
use crate::config::clamp_setting;
use crate::error::{Result, ToolkitError};
use crate::raster::RasterImage;

/// Quality factors are kept inside (0, 1]
const QUALITY_RANGE: (f32, f32) = (0.01, 1.0);

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressSettings {
    /// Encoder quality in (0, 1] (default: 0.8)
    pub quality: f32,
    /// Wider images are scaled down to this width (default: 1920)
    pub max_width: u32,
    pub filter: ResizeFilter,
}

impl Default for CompressSettings {
    fn default() -> Self {
        Self {
            quality: 0.8,
            max_width: 1920,
            filter: ResizeFilter::Bilinear,
        }
    }
}

impl CompressSettings {
    pub fn clamped(&self) -> Result<Self> {
        if self.max_width == 0 {
            return Err(ToolkitError::InvalidParameter("max_width must be at least 1".to_string()));
        }
        Ok(Self {
            quality: clamp_setting("quality", self.quality, QUALITY_RANGE)?,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeSettings {
    /// Encoder quality in (0, 1] (default: 0.9)
    pub quality: f32,
    pub filter: ResizeFilter,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            quality: 0.9,
            filter: ResizeFilter::Bilinear,
        }
    }
}

impl ResizeSettings {
    pub fn clamped(&self) -> Result<Self> {
        Ok(Self {
            quality: clamp_setting("quality", self.quality, QUALITY_RANGE)?,
            filter: self.filter,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertSettings {
    pub format: OutputFormat,
    /// Encoder quality in (0, 1], JPEG only (default: 0.9)
    pub quality: f32,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 0.9,
        }
    }
}

impl ConvertSettings {
    pub fn clamped(&self) -> Result<Self> {
        Ok(Self {
            format: self.format,
            quality: clamp_setting("quality", self.quality, QUALITY_RANGE)?,
        })
    }
}

/// Size comparison between source file and compressed output
#[derive(Debug, Clone, Serialize)]
pub struct CompressReport {
    pub original_bytes: usize,
    pub compressed_bytes: usize,
    /// Percent saved, negative when the output grew
    pub percent_saved: i64,
    pub original_size: (u32, u32),
    pub final_size: (u32, u32),
}

impl CompressReport {
    pub fn summary(&self) -> String {
        let original = format_file_size(self.original_bytes as u64, 2);
        let compressed = format_file_size(self.compressed_bytes as u64, 2);
        if self.percent_saved < 0 {
            format!(
                "Grew from {} to {} ({}% larger)",
                original,
                compressed,
                self.percent_saved.unsigned_abs()
            )
        } else {
            format!("Reduced from {} to {} ({}% smaller)", original, compressed, self.percent_saved)
        }
    }
}

// ============================================================================
// DIMENSION HELPERS
// ============================================================================

/// Height that keeps the original aspect ratio at `new_width`
pub fn height_for_width(original: (u32, u32), new_width: u32) -> u32 {
    let aspect = original.0 as f64 / original.1 as f64;
    ((new_width as f64 / aspect).round() as u32).max(1)
}

/// Width that keeps the original aspect ratio at `new_height`
pub fn width_for_height(original: (u32, u32), new_height: u32) -> u32 {
    let aspect = original.0 as f64 / original.1 as f64;
    ((new_height as f64 * aspect).round() as u32).max(1)
}

/// Both dimensions scaled by `percent`, rounded, never below 1
pub fn scale_by_percent(original: (u32, u32), percent: f32) -> (u32, u32) {
    let factor = percent as f64 / 100.0;
    (
        ((original.0 as f64 * factor).round() as u32).max(1),
        ((original.1 as f64 * factor).round() as u32).max(1),
    )
}

/// Size after capping the width at `max_width`. Height truncates like a
/// canvas dimension does.
pub fn capped_dimensions(original: (u32, u32), max_width: u32) -> (u32, u32) {
    let (width, height) = original;
    if width <= max_width {
        return original;
    }
    let scaled = (height as u64 * max_width as u64) / width as u64;
    (max_width, (scaled as u32).max(1))
}

/// Human readable size with 1024 steps: "0 Bytes", "1.5 KB", "2.35 MB"
pub fn format_file_size(bytes: u64, decimals: usize) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let k = 1024f64;
    let i = ((bytes as f64).ln() / k.ln()).floor() as usize;
    let i = i.min(UNITS.len() - 1);
    let value = bytes as f64 / k.powi(i as i32);

    let mut text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{} {}", text, UNITS[i])
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Scale to exactly `width x height`
pub fn resize(img: &RasterImage, width: u32, height: u32, filter: ResizeFilter) -> Result<RasterImage> {
    if width == 0 || height == 0 {
        return Err(ToolkitError::InvalidParameter(format!(
            "Target size must be non-zero, got {}x{}",
            width, height
        )));
    }
    if img.dimensions() == (width, height) {
        return Ok(img.clone());
    }

    debug!("Resize {:?} -> {}x{} ({:?})", img.dimensions(), width, height, filter);
    RasterImage::from_rgba(imageops::resize(img.as_rgba(), width, height, filter.into()))
}

/// Resize and re-encode in the source format (JPEG if unknown)
pub fn resize_and_encode(
    img: &RasterImage,
    source_mime: Option<&str>,
    width: u32,
    height: u32,
    settings: &ResizeSettings,
) -> Result<EncodedImage> {
    let settings = settings.clamped()?;
    let resized = resize(img, width, height, settings.filter)?;
    encode(&resized, OutputFormat::for_source(source_mime), settings.quality)
}

/// Cap the width, then re-encode at the configured quality
///
/// `original_bytes` is the size of the source file and only feeds the report.
pub fn compress(
    img: &RasterImage,
    source_mime: Option<&str>,
    original_bytes: usize,
    settings: &CompressSettings,
) -> Result<(EncodedImage, CompressReport)> {
    let settings = settings.clamped()?;
    let original_size = img.dimensions();
    let (width, height) = capped_dimensions(original_size, settings.max_width);
    let format = OutputFormat::for_source(source_mime);

    let encoded = if (width, height) == original_size {
        encode(img, format, settings.quality)?
    } else {
        let resized = resize(img, width, height, settings.filter)?;
        encode(&resized, format, settings.quality)?
    };

    let percent_saved = if original_bytes == 0 {
        0
    } else {
        ((1.0 - encoded.len() as f64 / original_bytes as f64) * 100.0).round() as i64
    };
    if percent_saved < 0 {
        warn!("Compressed output is larger than the source ({}%)", percent_saved);
    }

    let report = CompressReport {
        original_bytes,
        compressed_bytes: encoded.len(),
        percent_saved,
        original_size,
        final_size: (width, height),
    };
    info!("{}", report.summary());

    Ok((encoded, report))
}

/// Re-encode at the same size in another format
pub fn convert(img: &RasterImage, settings: &ConvertSettings) -> Result<EncodedImage> {
    let settings = settings.clamped()?;
    encode(img, settings.format, settings.quality)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode;

    fn gradient(width: u32, height: u32) -> RasterImage {
        let mut img = RasterImage::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                img.set_pixel(x, y, [(x * 7 % 256) as u8, (y * 5 % 256) as u8, 90, 255]);
            }
        }
        img
    }

    #[test]
    fn test_resize_exact_dimensions() {
        let img = gradient(40, 10);
        for (w, h) in [(1, 1), (13, 77), (80, 20), (40, 10)] {
            let out = resize(&img, w, h, ResizeFilter::Bilinear).unwrap();
            assert_eq!(out.dimensions(), (w, h));
            assert_eq!(out.as_bytes().len(), (w * h * 4) as usize);
        }
    }

    #[test]
    fn test_resize_rejects_zero() {
        let img = gradient(4, 4);
        assert!(resize(&img, 0, 4, ResizeFilter::Nearest).is_err());
    }

    #[test]
    fn test_capped_dimensions() {
        assert_eq!(capped_dimensions((1000, 500), 1920), (1000, 500));
        assert_eq!(capped_dimensions((3840, 2160), 1920), (1920, 1080));
        // 1000 * 1920 / 3001 = 639.78 -> 639
        assert_eq!(capped_dimensions((3001, 1000), 1920), (1920, 639));
        assert_eq!(capped_dimensions((5000, 1), 100), (100, 1));
    }

    #[test]
    fn test_compress_caps_width() {
        let img = gradient(64, 32);
        let settings = CompressSettings { max_width: 16, ..Default::default() };
        let (encoded, report) = compress(&img, Some("image/png"), 10_000, &settings).unwrap();

        assert_eq!(encoded.format, OutputFormat::Png);
        assert_eq!(report.final_size, (16, 8));
        let decoded = decode(&encoded.bytes).unwrap();
        assert_eq!(decoded.image.dimensions(), (16, 8));
    }

    #[test]
    fn test_compress_unknown_mime_is_jpeg() {
        let img = gradient(8, 8);
        let (encoded, _) = compress(&img, None, 0, &CompressSettings::default()).unwrap();
        assert_eq!(encoded.mime(), "image/jpeg");
    }

    #[test]
    fn test_compress_report_percent() {
        let img = gradient(8, 8);
        let (encoded, report) = compress(&img, Some("image/png"), 1_000_000, &CompressSettings::default()).unwrap();
        assert_eq!(report.compressed_bytes, encoded.len());
        assert!(report.percent_saved > 90);
    }

    #[test]
    fn test_summary_reports_growth() {
        let report = CompressReport {
            original_bytes: 1000,
            compressed_bytes: 1120,
            percent_saved: -12,
            original_size: (10, 10),
            final_size: (10, 10),
        };
        assert_eq!(report.summary(), "Grew from 1000 Bytes to 1120 Bytes (12% larger)");

        let report = CompressReport { compressed_bytes: 500, percent_saved: 50, ..report };
        assert_eq!(report.summary(), "Reduced from 1000 Bytes to 500 Bytes (50% smaller)");
    }

    #[test]
    fn test_png_compress_at_full_quality_beats_raw_buffer() {
        let img = gradient(64, 64);
        let source = crate::codec::encode_png(&img).unwrap();
        let decoded = decode(&source.bytes).unwrap();
        let settings = CompressSettings { quality: 1.0, ..Default::default() };

        let (encoded, _) = compress(&decoded.image, decoded.mime, source.len(), &settings).unwrap();
        assert_eq!(encoded.format, OutputFormat::Png);
        assert!(encoded.len() <= 64 * 64 * 4, "{} bytes", encoded.len());
    }

    #[test]
    fn test_quality_is_clamped() {
        let settings = CompressSettings { quality: 5.0, ..Default::default() };
        assert_eq!(settings.clamped().unwrap().quality, 1.0);
        let settings = CompressSettings { quality: 0.0, ..Default::default() };
        assert_eq!(settings.clamped().unwrap().quality, 0.01);
        let settings = CompressSettings { quality: f32::NAN, ..Default::default() };
        assert!(settings.clamped().is_err());
    }

    #[test]
    fn test_aspect_helpers() {
        assert_eq!(height_for_width((1920, 1080), 960), 540);
        assert_eq!(width_for_height((1920, 1080), 100), 178);
        assert_eq!(scale_by_percent((200, 101), 50.0), (100, 51));
        assert_eq!(scale_by_percent((3, 3), 1.0), (1, 1));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0, 2), "0 Bytes");
        assert_eq!(format_file_size(500, 2), "500 Bytes");
        assert_eq!(format_file_size(1536, 2), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024, 2), "1 MB");
        assert_eq!(format_file_size(2_464_153, 2), "2.35 MB");
    }

    #[test]
    fn test_convert_changes_format_only() {
        let img = gradient(10, 6);
        let settings = ConvertSettings { format: OutputFormat::Png, quality: 0.9 };
        let encoded = convert(&img, &settings).unwrap();
        let decoded = decode(&encoded.bytes).unwrap();
        assert_eq!(decoded.image, img);
    }
}
