//! Photo + signature joiner
//!
//! Places a scaled signature beside, below, or on top of a photo. Canvas
//! size and placement follow the joiner tool's arithmetic; fractional canvas
//! sizes truncate, fractional draw positions round.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::debug;
use serde::{Deserialize, Serialize};
use crate::config::clamp_setting;
use crate::error::Result;
use crate::raster::RasterImage;

/// Inset of an overlaid signature from the photo edge
const OVERLAY_INSET: f64 = 10.0;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Signature to the right of the photo
    #[default]
    Horizontal,
    /// Signature below the photo
    Vertical,
    /// Signature drawn inside the photo
    Overlay,
}

/// Where the signature sits. Horizontal layouts read the vertical part,
/// vertical layouts the horizontal part, overlays use the corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignPosition {
    Top,
    Bottom,
    Left,
    Right,
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinSettings {
    pub orientation: Orientation,
    pub position: SignPosition,
    /// Signature scale in percent, [10, 100] (default: 30)
    pub scale: f32,
    /// Margin around the photo in pixels, [0, 50] (default: 10)
    pub padding: u32,
    /// Signature transparency in percent, [0, 80] (default: 0)
    pub transparency: f32,
    /// 1px black frame around the canvas (default: false)
    pub border: bool,
    /// Fill the canvas white before drawing (default: true)
    pub white_background: bool,
}

impl Default for JoinSettings {
    fn default() -> Self {
        Self {
            orientation: Orientation::Horizontal,
            position: SignPosition::BottomRight,
            scale: 30.0,
            padding: 10,
            transparency: 0.0,
            border: false,
            white_background: true,
        }
    }
}

impl JoinSettings {
    pub const SCALE_RANGE: (f32, f32) = (10.0, 100.0);
    pub const PADDING_MAX: u32 = 50;
    pub const TRANSPARENCY_RANGE: (f32, f32) = (0.0, 80.0);

    pub fn clamped(&self) -> Result<Self> {
        Ok(Self {
            scale: clamp_setting("scale", self.scale, Self::SCALE_RANGE)?,
            padding: self.padding.min(Self::PADDING_MAX),
            transparency: clamp_setting("transparency", self.transparency, Self::TRANSPARENCY_RANGE)?,
            ..self.clone()
        })
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Canvas size and signature rectangle, in canvas pixels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinLayout {
    pub canvas: (u32, u32),
    pub photo_origin: (i64, i64),
    pub sign_origin: (i64, i64),
    pub sign_size: (u32, u32),
}

pub fn layout(photo: (u32, u32), signature: (u32, u32), settings: &JoinSettings) -> JoinLayout {
    let (pw, ph) = (photo.0 as f64, photo.1 as f64);
    let p = settings.padding as f64;
    let factor = settings.scale as f64 / 100.0;
    let (sw, sh) = (signature.0 as f64 * factor, signature.1 as f64 * factor);

    let (cw, ch) = match settings.orientation {
        Orientation::Horizontal => (pw + sw + p * 2.0, ph.max(sh) + p * 2.0),
        Orientation::Vertical => (pw.max(sw) + p * 2.0, ph + sh + p * 2.0),
        Orientation::Overlay => (pw + p * 2.0, ph + p * 2.0),
    };

    use SignPosition::*;
    let (sx, sy) = match settings.orientation {
        Orientation::Horizontal => {
            let y = match settings.position {
                Top | TopLeft | TopRight => p,
                Center => (ch - sh) / 2.0,
                _ => ch - sh - p,
            };
            (pw + p * 2.0, y)
        }
        Orientation::Vertical => {
            let x = match settings.position {
                Left | TopLeft | BottomLeft => p,
                Center => (cw - sw) / 2.0,
                _ => cw - sw - p,
            };
            (x, ph + p * 2.0)
        }
        Orientation::Overlay => {
            let left = p + OVERLAY_INSET;
            let right = p + pw - sw - OVERLAY_INSET;
            let top = p + OVERLAY_INSET;
            let bottom = p + ph - sh - OVERLAY_INSET;
            match settings.position {
                TopLeft => (left, top),
                TopRight => (right, top),
                BottomLeft => (left, bottom),
                _ => (right, bottom),
            }
        }
    };

    JoinLayout {
        canvas: ((cw as u32).max(1), (ch as u32).max(1)),
        photo_origin: (settings.padding as i64, settings.padding as i64),
        sign_origin: (sx.round() as i64, sy.round() as i64),
        sign_size: ((sw.round() as u32).max(1), (sh.round() as u32).max(1)),
    }
}

// ============================================================================
// COMPOSE
// ============================================================================

/// Draw photo and signature onto a fresh canvas
pub fn join_signature(photo: &RasterImage, signature: &RasterImage, settings: &JoinSettings) -> Result<RasterImage> {
    let settings = settings.clamped()?;
    let plan = layout(photo.dimensions(), signature.dimensions(), &settings);
    debug!("Join layout: {:?}", plan);

    let background = if settings.white_background {
        Rgba([255, 255, 255, 255])
    } else {
        Rgba([0, 0, 0, 0])
    };
    let mut canvas = RgbaImage::from_pixel(plan.canvas.0, plan.canvas.1, background);

    imageops::overlay(&mut canvas, photo.as_rgba(), plan.photo_origin.0, plan.photo_origin.1);

    let mut sign = imageops::resize(
        signature.as_rgba(),
        plan.sign_size.0,
        plan.sign_size.1,
        FilterType::Triangle,
    );
    if settings.transparency > 0.0 {
        let opacity = 1.0 - settings.transparency / 100.0;
        for pixel in sign.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
        }
    }
    imageops::overlay(&mut canvas, &sign, plan.sign_origin.0, plan.sign_origin.1);

    if settings.border {
        let rect = Rect::at(0, 0).of_size(plan.canvas.0, plan.canvas.1);
        draw_hollow_rect_mut(&mut canvas, rect, Rgba([0, 0, 0, 255]));
    }

    RasterImage::from_rgba(canvas)
}

// ============================================================================
// TESTS
// ============================================================================
