//! Name / date stamp
//!
//! Writes `name` (plus ` - <date>` when enabled) into a corner or edge of the
//! image, optionally over a translucent box. Placement works on the text
//! baseline like a canvas `fillText`: the box reaches `font_size` above it.

use ab_glyph::{FontVec, PxScale};
use chrono::{Datelike, Local, NaiveDate};
use image::Rgba;
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size, Blend};
use imageproc::rect::Rect;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use crate::config::clamp_setting;
use crate::error::{Result, ToolkitError};
use crate::raster::{ColorSample, RasterImage};

/// Tried in order when no font file is configured
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StampPosition {
    #[default]
    BottomRight,
    BottomLeft,
    BottomCenter,
    TopRight,
    TopLeft,
    TopCenter,
}

/// The date layouts offered by the stamp tool
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "dd/MM/yyyy")]
    DayMonthYear,
    #[serde(rename = "MM/dd/yyyy")]
    MonthDayYear,
    #[serde(rename = "yyyy-MM-dd")]
    YearMonthDay,
    #[serde(rename = "dd.MM.yyyy")]
    Dotted,
    #[serde(rename = "dd-MM-yy")]
    ShortYear,
}

impl DateFormat {
    pub const ALL: [DateFormat; 5] = [
        DateFormat::DayMonthYear,
        DateFormat::MonthDayYear,
        DateFormat::YearMonthDay,
        DateFormat::Dotted,
        DateFormat::ShortYear,
    ];

    pub fn pattern(&self) -> &'static str {
        match self {
            Self::DayMonthYear => "dd/MM/yyyy",
            Self::MonthDayYear => "MM/dd/yyyy",
            Self::YearMonthDay => "yyyy-MM-dd",
            Self::Dotted => "dd.MM.yyyy",
            Self::ShortYear => "dd-MM-yy",
        }
    }

    pub fn format(&self, date: NaiveDate) -> String {
        format_date(self.pattern(), date)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

impl FromStr for DateFormat {
    type Err = ToolkitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.pattern() == s.trim())
            .ok_or_else(|| ToolkitError::InvalidParameter(format!("Unknown date format '{}'", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StampSettings {
    /// Name written first (default: "John Doe")
    pub text: String,
    /// Append " - <date>" (default: true)
    pub include_date: bool,
    /// Fixed date; today when unset
    pub date: Option<NaiveDate>,
    pub date_format: DateFormat,
    pub position: StampPosition,
    /// Pixel height of the text, [8, 72] (default: 16)
    pub font_size: f32,
    /// Default: black
    pub text_color: ColorSample,
    /// Fill a box behind the text (default: false)
    pub background: bool,
    /// Default: white
    pub background_color: ColorSample,
    /// Box opacity in percent, [1, 100] (default: 70)
    pub background_opacity: f32,
    /// Distance from the image edge in pixels, [0, 50] (default: 10)
    pub padding: u32,
    /// TrueType/OpenType file; a system font is looked up when unset
    pub font_path: Option<PathBuf>,
}

impl Default for StampSettings {
    fn default() -> Self {
        Self {
            text: "John Doe".to_string(),
            include_date: true,
            date: None,
            date_format: DateFormat::DayMonthYear,
            position: StampPosition::BottomRight,
            font_size: 16.0,
            text_color: ColorSample::BLACK,
            background: false,
            background_color: ColorSample::WHITE,
            background_opacity: 70.0,
            padding: 10,
            font_path: None,
        }
    }
}

impl StampSettings {
    pub const FONT_SIZE_RANGE: (f32, f32) = (8.0, 72.0);
    pub const OPACITY_RANGE: (f32, f32) = (1.0, 100.0);
    pub const PADDING_MAX: u32 = 50;

    pub fn clamped(&self) -> Result<Self> {
        Ok(Self {
            font_size: clamp_setting("font_size", self.font_size, Self::FONT_SIZE_RANGE)?,
            background_opacity: clamp_setting(
                "background_opacity",
                self.background_opacity,
                Self::OPACITY_RANGE,
            )?,
            padding: self.padding.min(Self::PADDING_MAX),
            ..self.clone()
        })
    }

    /// `text`, or `text - <date>` when the date is on
    pub fn display_text(&self, today: NaiveDate) -> String {
        if !self.include_date {
            return self.text.clone();
        }
        let date = self.date.unwrap_or(today);
        format!("{} - {}", self.text, self.date_format.format(date))
    }
}

// ============================================================================
// TEXT + LAYOUT
// ============================================================================

/// Substitute `dd`, `MM`, `yyyy`, then `yy` (first occurrence each)
pub fn format_date(pattern: &str, date: NaiveDate) -> String {
    let year = date.year().to_string();
    let short_year = &year[year.len().saturating_sub(2)..];

    pattern
        .replacen("dd", &format!("{:02}", date.day()), 1)
        .replacen("MM", &format!("{:02}", date.month()), 1)
        .replacen("yyyy", &year, 1)
        .replacen("yy", short_year, 1)
}

/// Baseline origin of the text. `text_size` is (width, height) where the
/// height is the font size.
pub fn text_origin(
    position: StampPosition,
    text_size: (f32, f32),
    image: (u32, u32),
    padding: u32,
) -> (f32, f32) {
    let (tw, th) = text_size;
    let (iw, ih) = (image.0 as f32, image.1 as f32);
    let p = padding as f32;

    let top = th + p;
    let bottom = ih - p;
    match position {
        StampPosition::BottomRight => (iw - tw - p, bottom),
        StampPosition::BottomLeft => (p, bottom),
        StampPosition::BottomCenter => ((iw - tw) / 2.0, bottom),
        StampPosition::TopRight => (iw - tw - p, top),
        StampPosition::TopLeft => (p, top),
        StampPosition::TopCenter => ((iw - tw) / 2.0, top),
    }
}

/// Box behind the text as (x, y, width, height)
pub fn background_box(origin: (f32, f32), text_size: (f32, f32), padding: u32) -> (f32, f32, f32, f32) {
    let p = padding as f32;
    (
        origin.0 - p,
        origin.1 - text_size.1 - p / 2.0,
        text_size.0 + p * 2.0,
        text_size.1 + p * 1.5,
    )
}

// ============================================================================
// FONT
// ============================================================================

/// Load `path`, or the first system font that exists
pub fn load_font(path: Option<&Path>) -> Result<FontVec> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => FALLBACK_FONTS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .ok_or_else(|| {
                ToolkitError::InvalidParameter("No system font found; set font_path".to_string())
            })?,
    };

    let bytes = std::fs::read(&path)?;
    let font = FontVec::try_from_vec(bytes)
        .map_err(|e| ToolkitError::InvalidParameter(format!("Bad font {}: {}", path.display(), e)))?;
    debug!("Loaded font {}", path.display());
    Ok(font)
}

// ============================================================================
// DRAW
// ============================================================================

/// Draw the stamp onto a copy of `img`
pub fn stamp_text(img: &RasterImage, settings: &StampSettings, font: &FontVec) -> Result<RasterImage> {
    let settings = settings.clamped()?;
    let text = settings.display_text(Local::now().date_naive());
    if text.trim().is_empty() {
        return Err(ToolkitError::InvalidParameter("Stamp text is empty".to_string()));
    }

    let scale = PxScale::from(settings.font_size);
    let (measured_w, _) = text_size(scale, font, &text);
    let size = (measured_w as f32, settings.font_size);
    let (x, y) = text_origin(settings.position, size, img.dimensions(), settings.padding);

    debug!("Stamp '{}' at ({}, {}) size {:?}", text, x, y, size);

    let mut canvas = img.clone().into_rgba();

    if settings.background {
        let (bx, by, bw, bh) = background_box((x, y), size, settings.padding);
        let alpha = (settings.background_opacity / 100.0 * 255.0).round() as u8;
        let rect = Rect::at(bx.round() as i32, by.round() as i32)
            .of_size((bw.round() as u32).max(1), (bh.round() as u32).max(1));
        let mut blend = Blend(canvas);
        draw_filled_rect_mut(&mut blend, rect, Rgba(settings.background_color.with_alpha(alpha)));
        canvas = blend.0;
    }

    // draw_text_mut takes the top of the line; the origin is the baseline
    draw_text_mut(
        &mut canvas,
        Rgba(settings.text_color.with_alpha(255)),
        x.round() as i32,
        (y - settings.font_size).round() as i32,
        scale,
        font,
        &text,
    );

    RasterImage::from_rgba(canvas)
}

// ============================================================================
// TESTS
// ============================================================================
