//! Separable gaussian blur on RGBA8 buffers.
//!
//! Weights are Q16 fixed point and sum to exactly 1.0, so a flat image stays
//! flat. Samples past the border replicate the edge pixel. Both passes run
//! through the same line convolution; only the stride differs.

use crate::error::{Result, ToolkitError};
use crate::raster::RasterImage;

const Q16_ONE: u32 = 1 << 16;

/// Kernel radius covering three standard deviations
pub fn radius_for_sigma(sigma: f32) -> u32 {
    (sigma * 3.0).ceil().max(1.0) as u32
}

/// Blur all four channels with a gaussian of the given standard deviation
pub fn gaussian_blur(img: &RasterImage, sigma: f32) -> Result<RasterImage> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ToolkitError::InvalidParameter(format!(
            "Blur sigma must be positive, got {}",
            sigma
        )));
    }

    let (width, height) = img.dimensions();
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| ToolkitError::InvalidParameter(format!("{}x{} is too large to blur", width, height)))?;

    let kernel = Kernel::gaussian(sigma);
    let mut across = vec![0u8; len];
    let mut out = vec![0u8; len];
    convolve(img.as_bytes(), &mut across, (width as usize, height as usize), &kernel, Axis::Rows);
    convolve(&across, &mut out, (width as usize, height as usize), &kernel, Axis::Columns);

    RasterImage::from_raw(width, height, out)
}

struct Kernel {
    taps: Vec<u32>,
    radius: usize,
}

impl Kernel {
    fn gaussian(sigma: f32) -> Self {
        let radius = radius_for_sigma(sigma) as usize;
        let two_sigma_sq = 2.0 * (sigma as f64).powi(2);
        let falloff: Vec<f64> = (0..=2 * radius)
            .map(|i| {
                let d = i as f64 - radius as f64;
                (-d * d / two_sigma_sq).exp()
            })
            .collect();
        let total: f64 = falloff.iter().sum();

        let mut taps: Vec<u32> = falloff
            .iter()
            .map(|f| (f / total * Q16_ONE as f64).round() as u32)
            .collect();

        // Whatever rounding lost or gained goes to the centre tap
        let sum: i64 = taps.iter().map(|&t| t as i64).sum();
        let centre = taps[radius] as i64 + (Q16_ONE as i64 - sum);
        taps[radius] = centre.clamp(0, Q16_ONE as i64) as u32;

        Self { taps, radius }
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Columns,
}

/// Convolve every row (or column) of `src` into `dst`
fn convolve(src: &[u8], dst: &mut [u8], (width, height): (usize, usize), kernel: &Kernel, axis: Axis) {
    // (line count, samples per line, byte offset between lines, byte step along a line)
    let (lines, samples, line_offset, step) = match axis {
        Axis::Rows => (height, width, width * 4, 4),
        Axis::Columns => (width, height, 4, width * 4),
    };
    let last = samples - 1;

    for line in 0..lines {
        let base = line * line_offset;
        for i in 0..samples {
            let mut acc = [0u64; 4];
            for (k, &tap) in kernel.taps.iter().enumerate() {
                let j = (i + k).saturating_sub(kernel.radius).min(last);
                let at = base + j * step;
                for (sum, &v) in acc.iter_mut().zip(&src[at..at + 4]) {
                    *sum += tap as u64 * v as u64;
                }
            }
            let at = base + i * step;
            for (px, sum) in dst[at..at + 4].iter_mut().zip(acc) {
                *px = ((sum + (Q16_ONE as u64 >> 1)) >> 16).min(255) as u8;
            }
        }
    }
}
