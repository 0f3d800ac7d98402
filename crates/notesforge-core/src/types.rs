// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core value types for the NotesForge engine: colours, RGBA pixel buffers,
// binary masks, and the page/quality enums shared by every crate.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{NotesForgeError, Result};

// -- Color --------------------------------------------------------------------

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mean of the three channels.
    pub fn brightness(&self) -> f32 {
        (self.r as f32 + self.g as f32 + self.b as f32) / 3.0
    }

    /// `max - min` across the channels.
    pub fn spread(&self) -> u8 {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        max - min
    }

    /// `(max - min) / max`, or 0 for black.
    pub fn saturation(&self) -> f32 {
        let max = self.r.max(self.g).max(self.b);
        if max == 0 {
            return 0.0;
        }
        self.spread() as f32 / max as f32
    }

    /// Round every channel down to a multiple of `bucket`.
    pub fn quantize(&self, bucket: u8) -> Color {
        let q = |c: u8| (c / bucket) * bucket;
        Color::new(q(self.r), q(self.g), q(self.b))
    }

    /// Euclidean distance in RGB space.
    pub fn distance(&self, other: &Color) -> f32 {
        let dr = self.r as f32 - other.r as f32;
        let dg = self.g as f32 - other.g as f32;
        let db = self.b as f32 - other.b as f32;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// True when every channel differs from `other` by less than `tolerance`.
    pub fn within(&self, other: &Color, tolerance: u8) -> bool {
        self.r.abs_diff(other.r) < tolerance
            && self.g.abs_diff(other.g) < tolerance
            && self.b.abs_diff(other.b) < tolerance
    }
}

// -- PixelBuffer --------------------------------------------------------------

/// An RGBA raster: row-major, four bytes per pixel, no row padding.
///
/// A `PixelBuffer` can only be constructed with non-zero dimensions and a
/// byte length of exactly `width * height * 4`, so every filter downstream can
/// assume a valid buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, validating dimensions and length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(NotesForgeError::InvalidInput(format!(
                "pixel buffer must be non-empty, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(NotesForgeError::InvalidInput(format!(
                "pixel buffer {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A buffer where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let count = width as usize * height as usize;
        Self::new(width, height, rgba.repeat(count))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (not bytes).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// RGB of the pixel at linear index `index` (row-major).
    pub fn color_at(&self, index: usize) -> Color {
        let i = index * 4;
        Color::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2])
    }

    /// Overwrite the RGB of the pixel at linear index `index`; alpha is kept.
    pub fn set_color(&mut self, index: usize, color: Color) {
        let i = index * 4;
        self.pixels[i] = color.r;
        self.pixels[i + 1] = color.g;
        self.pixels[i + 2] = color.b;
    }

    /// Full RGBA of the pixel at `(x, y)`.
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Convert into an `image` crate buffer (no copy).
    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.pixels).ok_or_else(|| {
            NotesForgeError::InvalidInput(format!("cannot view {width}x{height} buffer as RGBA"))
        })
    }
}

impl TryFrom<RgbaImage> for PixelBuffer {
    type Error = NotesForgeError;

    fn try_from(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }
}

// -- Mask ---------------------------------------------------------------------

/// One bit per pixel, same row-major layout as [`PixelBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32, bits: Vec<bool>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if expected == 0 || bits.len() != expected {
            return Err(NotesForgeError::InvalidInput(format!(
                "mask {width}x{height} needs {expected} entries, got {}",
                bits.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// An all-clear mask.
    pub fn empty(width: u32, height: u32) -> Result<Self> {
        Self::new(width, height, vec![false; width as usize * height as usize])
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Result<Self> {
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self::new(width, height, bits)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.bits[index]
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Fraction of pixels that are set, in `[0, 1]`.
    pub fn coverage(&self) -> f64 {
        self.count() as f64 / self.bits.len() as f64
    }

    /// Whether this mask lines up with `buffer` pixel for pixel.
    pub fn matches(&self, buffer: &PixelBuffer) -> bool {
        self.width == buffer.width() && self.height == buffer.height()
    }
}

// -- Quality ------------------------------------------------------------------

/// Output quality tier. Controls the embedded-image compression and the scale
/// at which page sources should rasterise PDF pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    /// Baseline JPEG quality (1-100) for embedded page images.
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            Self::Low => 60,
            Self::Medium => 80,
            Self::High => 95,
        }
    }

    /// Rasterisation scale relative to the source page's native size.
    pub fn render_scale(&self) -> f32 {
        match self {
            Self::Low => 1.0,
            Self::Medium => 1.5,
            Self::High => 2.0,
        }
    }

    /// The next tier down, if any. Useful for caller-side retry policies.
    pub fn lower(&self) -> Option<Self> {
        match self {
            Self::High => Some(Self::Medium),
            Self::Medium => Some(Self::Low),
            Self::Low => None,
        }
    }
}

// -- Paper --------------------------------------------------------------------

/// Output paper sizes, in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    Letter,
    A3,
    Custom { width_pt: f64, height_pt: f64 },
    /// Size the page after the first input image, at 0.75pt per pixel.
    MatchFirstPage,
}

/// Points per pixel when a page is sized from a 96 dpi raster.
pub const POINTS_PER_PIXEL: f64 = 0.75;

impl PaperSize {
    /// Portrait dimensions `(width, height)` in points.
    ///
    /// `first_page` is the pixel size of the first input image, used only by
    /// [`PaperSize::MatchFirstPage`]; without it that variant falls back to A4.
    pub fn dimensions_pt(&self, first_page: Option<(u32, u32)>) -> (f64, f64) {
        match self {
            Self::A4 => (595.28, 841.89),
            Self::Letter => (612.0, 792.0),
            Self::A3 => (841.89, 1190.55),
            Self::Custom {
                width_pt,
                height_pt,
            } => (*width_pt, *height_pt),
            Self::MatchFirstPage => match first_page {
                Some((w, h)) => (w as f64 * POINTS_PER_PIXEL, h as f64 * POINTS_PER_PIXEL),
                None => Self::A4.dimensions_pt(None),
            },
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Apply the orientation to portrait dimensions.
    pub fn apply(&self, (width, height): (f64, f64)) -> (f64, f64) {
        match self {
            Self::Portrait => (width, height),
            Self::Landscape => (height, width),
        }
    }
}

/// Clockwise quarter-turn applied to a page before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Build from a degree value; only exact multiples of 90 are accepted.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::None),
            90 => Some(Self::Cw90),
            180 => Some(Self::Cw180),
            270 => Some(Self::Cw270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_buffer_is_rejected() {
        assert!(matches!(
            PixelBuffer::new(0, 10, Vec::new()),
            Err(NotesForgeError::InvalidInput(_))
        ));
        assert!(PixelBuffer::filled(4, 0, [0, 0, 0, 255]).is_err());
    }

    #[test]
    fn buffer_length_must_match_dimensions() {
        assert!(PixelBuffer::new(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn saturation_and_brightness() {
        let gray = Color::new(120, 120, 120);
        assert_eq!(gray.saturation(), 0.0);
        assert_eq!(gray.brightness(), 120.0);

        let red = Color::new(200, 100, 100);
        assert!((red.saturation() - 0.5).abs() < 1e-6);
        assert_eq!(Color::BLACK.saturation(), 0.0);
    }

    #[test]
    fn quantize_floors_to_bucket() {
        assert_eq!(Color::new(255, 31, 32).quantize(32), Color::new(224, 0, 32));
        assert_eq!(Color::new(255, 15, 16).quantize(16), Color::new(240, 0, 16));
    }

    #[test]
    fn mask_coverage() {
        let mask = Mask::from_fn(10, 10, |x, _| x == 0).unwrap();
        assert_eq!(mask.count(), 10);
        assert!((mask.coverage() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let dims = Orientation::Landscape.apply(PaperSize::Letter.dimensions_pt(None));
        assert_eq!(dims, (792.0, 612.0));
    }

    #[test]
    fn match_first_page_uses_pixel_scale() {
        let dims = PaperSize::MatchFirstPage.dimensions_pt(Some((800, 600)));
        assert_eq!(dims, (600.0, 450.0));
    }

    #[test]
    fn quality_tiers() {
        assert_eq!(Quality::Low.jpeg_quality(), 60);
        assert_eq!(Quality::High.render_scale(), 2.0);
        assert_eq!(Quality::Medium.lower(), Some(Quality::Low));
        assert_eq!(Quality::Low.lower(), None);
    }

    #[test]
    fn rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Cw270));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Cw90));
        assert_eq!(Rotation::from_degrees(45), None);
    }
}
