//! Circular region blur.
//!
//! There is no face detection here. Regions are supplied by the caller, or
//! taken from `placeholder_face_regions`, a fixed layout centred in the upper
//! third of the frame.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use log::debug;
use serde::{Deserialize, Serialize};
use crate::blur::gaussian_blur;
use crate::config::clamp_setting;
use crate::error::Result;
use crate::raster::RasterImage;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleRegion {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactSettings {
    /// Blur standard deviation in pixels, [5, 50] (default: 20)
    pub blur_radius: f32,
    /// Regions to blur; the placeholder layout when empty
    pub regions: Vec<CircleRegion>,
}

impl Default for RedactSettings {
    fn default() -> Self {
        Self {
            blur_radius: 20.0,
            regions: Vec::new(),
        }
    }
}

impl RedactSettings {
    pub const BLUR_RADIUS_RANGE: (f32, f32) = (5.0, 50.0);

    pub fn clamped(&self) -> Result<Self> {
        Ok(Self {
            blur_radius: clamp_setting("blur_radius", self.blur_radius, Self::BLUR_RADIUS_RANGE)?,
            regions: self.regions.clone(),
        })
    }
}

/// Fixed stand-in regions: one circle at (w/2, h/3) with radius min(w, h)/4,
/// plus a smaller one down and to the left on images taller than 400px.
pub fn placeholder_face_regions(width: u32, height: u32) -> Vec<CircleRegion> {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 3.0;
    let radius = width.min(height) as f32 / 4.0;

    let mut regions = vec![CircleRegion { center_x, center_y, radius }];
    if height > 400 {
        regions.push(CircleRegion {
            center_x: center_x - 100.0,
            center_y: center_y + 120.0,
            radius: radius * 0.7,
        });
    }
    regions
}

fn region_mask(width: u32, height: u32, regions: &[CircleRegion]) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for region in regions {
        draw_filled_circle_mut(
            &mut mask,
            (region.center_x.round() as i32, region.center_y.round() as i32),
            region.radius.round() as i32,
            Luma([255u8]),
        );
    }
    mask
}

/// Blur the pixels inside each region, leaving the rest untouched
pub fn blur_regions(img: &RasterImage, settings: &RedactSettings) -> Result<RasterImage> {
    let settings = settings.clamped()?;
    let (width, height) = img.dimensions();
    let regions = if settings.regions.is_empty() {
        placeholder_face_regions(width, height)
    } else {
        settings.regions
    };

    debug!("Blurring {} region(s) with radius {}", regions.len(), settings.blur_radius);

    let blurred = gaussian_blur(img, settings.blur_radius)?;
    let mask = region_mask(width, height, &regions);

    let mut out = img.clone();
    for ((pixel, soft), inside) in out
        .as_bytes_mut()
        .chunks_exact_mut(4)
        .zip(blurred.as_bytes().chunks_exact(4))
        .zip(mask.as_raw().iter())
    {
        if *inside > 0 {
            pixel.copy_from_slice(soft);
        }
    }

    Ok(out)
}
