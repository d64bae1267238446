//! Pixel-buffer image tools.
//!
//! The transforms in `background`, `enhance`, `resample`, `redact`,
//! `compose` and `stamp` are synchronous functions over an owned `RasterImage`. The
//! `*_file` functions below are the one-shot async entry points: read the
//! file, decode + transform + encode on a blocking task, write the result.
//! Each call owns its buffers; nothing is shared between calls.

pub mod background;
pub mod blur;
pub mod codec;
pub mod compose;
pub mod config;
pub mod enhance;
pub mod error;
pub mod raster;
pub mod redact;
pub mod resample;
pub mod stamp;

use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use background::{BackgroundMode, BackgroundResult, BackgroundSettings};
pub use codec::{DecodedImage, EncodedImage, OutputFormat};
pub use compose::{JoinSettings, Orientation, SignPosition};
pub use config::ToolkitConfig;
pub use enhance::{EnhanceSettings, ToneSettings};
pub use error::{Result, ToolkitError};
pub use raster::{ColorSample, RasterImage};
pub use redact::{CircleRegion, RedactSettings};
pub use resample::{CompressReport, CompressSettings, ConvertSettings, ResizeFilter, ResizeSettings};
pub use stamp::{DateFormat, StampPosition, StampSettings};

/// Quality of the JPEG written by `stamp_file`
const STAMP_JPEG_QUALITY: f32 = 0.92;

/// What was written by a file-level operation
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub output_path: PathBuf,
    pub mime: &'static str,
    pub size: (u32, u32),
    pub bytes: usize,
}

// ============================================================================
// PLUMBING
// ============================================================================

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ToolkitError::Processing(format!("Task join error: {}", e)))?
}

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        ToolkitError::Io(std::io::Error::new(
            e.kind(),
            format!("Error reading file {}: {}", path.display(), e),
        ))
    })
}

async fn write_output(path: &Path, encoded: &EncodedImage) -> Result<FileResult> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, &encoded.bytes).await?;

    info!(
        "Wrote {} ({}x{}, {}, {} bytes)",
        path.display(),
        encoded.width,
        encoded.height,
        encoded.mime(),
        encoded.len()
    );

    Ok(FileResult {
        output_path: path.to_path_buf(),
        mime: encoded.mime(),
        size: (encoded.width, encoded.height),
        bytes: encoded.len(),
    })
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Read and decode an image file
pub async fn decode_file(path: impl AsRef<Path>) -> Result<DecodedImage> {
    let bytes = read_input(path.as_ref()).await?;
    run_blocking(move || codec::decode(&bytes)).await
}

pub async fn compress_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    settings: CompressSettings,
) -> Result<(FileResult, CompressReport)> {
    let bytes = read_input(input.as_ref()).await?;

    let (encoded, report) = run_blocking(move || {
        let decoded = codec::decode(&bytes)?;
        resample::compress(&decoded.image, decoded.mime, decoded.byte_len, &settings)
    })
    .await?;

    let file = write_output(output.as_ref(), &encoded).await?;
    Ok((file, report))
}

pub async fn resize_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    width: u32,
    height: u32,
    settings: ResizeSettings,
) -> Result<FileResult> {
    let bytes = read_input(input.as_ref()).await?;

    let encoded = run_blocking(move || {
        let decoded = codec::decode(&bytes)?;
        resample::resize_and_encode(&decoded.image, decoded.mime, width, height, &settings)
    })
    .await?;

    write_output(output.as_ref(), &encoded).await
}

pub async fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    settings: ConvertSettings,
) -> Result<FileResult> {
    let bytes = read_input(input.as_ref()).await?;

    let encoded = run_blocking(move || {
        let decoded = codec::decode(&bytes)?;
        resample::convert(&decoded.image, &settings)
    })
    .await?;

    write_output(output.as_ref(), &encoded).await
}

/// Tone, sharpen and denoise; always written as PNG
pub async fn enhance_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    settings: EnhanceSettings,
) -> Result<FileResult> {
    let bytes = read_input(input.as_ref()).await?;

    let encoded = run_blocking(move || {
        let decoded = codec::decode(&bytes)?;
        let enhanced = enhance::enhance(&decoded.image, &settings)?;
        codec::encode_png(&enhanced)
    })
    .await?;

    write_output(output.as_ref(), &encoded).await
}

/// Background pixels become transparent; written as PNG
pub async fn remove_background_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    settings: BackgroundSettings,
) -> Result<(FileResult, BackgroundResult)> {
    background_file(input.as_ref(), output.as_ref(), settings.tolerance, BackgroundMode::Remove).await
}

/// Background pixels are painted with `settings.replacement`; written as PNG
pub async fn change_background_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    settings: BackgroundSettings,
) -> Result<(FileResult, BackgroundResult)> {
    let mode = BackgroundMode::Replace(settings.replacement);
    background_file(input.as_ref(), output.as_ref(), settings.tolerance, mode).await
}

async fn background_file(
    input: &Path,
    output: &Path,
    tolerance: u8,
    mode: BackgroundMode,
) -> Result<(FileResult, BackgroundResult)> {
    let bytes = read_input(input).await?;

    let (encoded, result) = run_blocking(move || {
        let mut image = codec::decode(&bytes)?.image;
        let result = background::classify_and_apply(&mut image, tolerance, mode);
        Ok((codec::encode_png(&image)?, result))
    })
    .await?;

    let file = write_output(output, &encoded).await?;
    Ok((file, result))
}

/// Blur circular regions (placeholder layout if none given); written as PNG
pub async fn redact_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    settings: RedactSettings,
) -> Result<FileResult> {
    let bytes = read_input(input.as_ref()).await?;

    let encoded = run_blocking(move || {
        let decoded = codec::decode(&bytes)?;
        let redacted = redact::blur_regions(&decoded.image, &settings)?;
        codec::encode_png(&redacted)
    })
    .await?;

    write_output(output.as_ref(), &encoded).await
}

/// Join a photo and a signature; written as PNG
pub async fn join_files(
    photo: impl AsRef<Path>,
    signature: impl AsRef<Path>,
    output: impl AsRef<Path>,
    settings: JoinSettings,
) -> Result<FileResult> {
    let (photo_bytes, sign_bytes) = tokio::try_join!(
        read_input(photo.as_ref()),
        read_input(signature.as_ref())
    )?;

    let encoded = run_blocking(move || {
        let photo = codec::decode(&photo_bytes)?;
        let signature = codec::decode(&sign_bytes)?;
        let joined = compose::join_signature(&photo.image, &signature.image, &settings)?;
        codec::encode_png(&joined)
    })
    .await?;

    write_output(output.as_ref(), &encoded).await
}

/// Write name and date onto the image; written as JPEG like the stamp tool
pub async fn stamp_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    settings: StampSettings,
) -> Result<FileResult> {
    let bytes = read_input(input.as_ref()).await?;

    let encoded = run_blocking(move || {
        let font = stamp::load_font(settings.font_path.as_deref())?;
        let decoded = codec::decode(&bytes)?;
        let stamped = stamp::stamp_text(&decoded.image, &settings, &font)?;
        codec::encode(&stamped, OutputFormat::Jpeg, STAMP_JPEG_QUALITY)
    })
    .await?;

    write_output(output.as_ref(), &encoded).await
}

// ============================================================================
// TESTS
// ============================================================================
