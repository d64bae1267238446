//! Decode file bytes into a `RasterImage` and encode it back out.
//!
//! Output formats are the four the converter offers. Quality only matters
//! for JPEG; PNG and GIF are lossless and the WebP encoder available here is
//! lossless too.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use crate::error::{Result, ToolkitError};
use crate::raster::RasterImage;

// ============================================================================
// FORMATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl OutputFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Source MIME type if it names a supported format, JPEG otherwise
    pub fn for_source(mime: Option<&str>) -> Self {
        mime.and_then(Self::from_mime).unwrap_or(Self::Jpeg)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Webp => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
        }
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        ImageFormat::Ico => Some("image/x-icon"),
        _ => None,
    }
}

// ============================================================================
// DECODE
// ============================================================================

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: RasterImage,
    /// MIME type sniffed from the bytes, if the container is known
    pub mime: Option<&'static str>,
    /// Size of the encoded input
    pub byte_len: usize,
}

/// Decode any format the `image` crate understands into RGBA8
pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    if bytes.is_empty() {
        return Err(ToolkitError::Decode("Input is empty".to_string()));
    }

    let mime = image::guess_format(bytes).ok().and_then(mime_for);
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ToolkitError::Decode(format!("Error loading image: {}", e)))?;
    let image = RasterImage::from_rgba(decoded.to_rgba8())
        .map_err(|e| ToolkitError::Decode(e.to_string()))?;

    debug!("Decoded {}x{} {:?} ({} bytes)", image.width(), image.height(), mime, bytes.len());

    Ok(DecodedImage {
        image,
        mime,
        byte_len: bytes.len(),
    })
}

// ============================================================================
// ENCODE
// ============================================================================

#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Map a (0, 1] quality factor onto the JPEG 1..=100 scale
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode `img` as `format`. JPEG drops the alpha channel.
pub fn encode(img: &RasterImage, format: OutputFormat, quality: f32) -> Result<EncodedImage> {
    let (width, height) = img.dimensions();
    let dynamic = DynamicImage::ImageRgba8(img.as_rgba().clone());
    let mut buffer = Cursor::new(Vec::new());

    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(dynamic.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
            rgb.write_with_encoder(encoder)
                .map_err(|e| ToolkitError::Encode(format!("Failed to encode JPEG: {}", e)))?;
        }
        other => {
            dynamic
                .write_to(&mut buffer, other.image_format())
                .map_err(|e| ToolkitError::Encode(format!("Failed to encode {}: {}", other.mime(), e)))?;
        }
    }

    let bytes = buffer.into_inner();
    if bytes.is_empty() {
        return Err(ToolkitError::Encode("encoding failed".to_string()));
    }

    debug!("Encoded {}x{} as {} ({} bytes)", width, height, format.mime(), bytes.len());

    Ok(EncodedImage {
        bytes,
        format,
        width,
        height,
    })
}

/// Encode image as PNG bytes (lossless, keeps alpha)
pub fn encode_png(img: &RasterImage) -> Result<EncodedImage> {
    encode(img, OutputFormat::Png, 1.0)
}

// ============================================================================
// TESTS
// ============================================================================
