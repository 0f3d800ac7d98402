// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration: filter flags, grid layout, and the heuristic tuning
// constants used by the pixel filters and mask compositor.

use serde::{Deserialize, Serialize};

use crate::error::{NotesForgeError, Result};
use crate::types::{Orientation, PaperSize, Quality};

// -- Filter flags -------------------------------------------------------------

/// Which filters to run. The chain order is fixed no matter how these are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub invert: bool,
    pub clear_background: bool,
    pub remove_watermark: bool,
    pub greyscale: bool,
    pub black_and_white: bool,
    /// Luminance at or above which a pixel becomes white in black & white mode.
    pub black_and_white_threshold: u8,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            invert: false,
            clear_background: false,
            remove_watermark: false,
            greyscale: false,
            black_and_white: false,
            black_and_white_threshold: 128,
        }
    }
}

impl FilterSettings {
    /// True when no filter is enabled.
    pub fn is_passthrough(&self) -> bool {
        !(self.invert
            || self.clear_background
            || self.remove_watermark
            || self.greyscale
            || self.black_and_white)
    }
}

// -- Grid layout --------------------------------------------------------------

/// Geometry of the output grid, all lengths in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayoutSettings {
    pub rows: u32,
    pub cols: u32,
    pub page_width: f64,
    pub page_height: f64,
    pub margin_pt: f64,
    pub cell_padding_pt: f64,
    pub show_borders: bool,
    pub add_page_numbers: bool,
}

impl Default for GridLayoutSettings {
    fn default() -> Self {
        let (page_width, page_height) = PaperSize::A4.dimensions_pt(None);
        Self {
            rows: 3,
            cols: 1,
            page_width,
            page_height,
            margin_pt: 20.0,
            cell_padding_pt: 5.0,
            show_borders: false,
            add_page_numbers: true,
        }
    }
}

impl GridLayoutSettings {
    /// Defaults sized for a paper preset and orientation.
    ///
    /// `first_page` is the pixel size of the first input page and is only
    /// consulted for [`PaperSize::MatchFirstPage`].
    pub fn for_paper(
        paper: PaperSize,
        orientation: Orientation,
        first_page: Option<(u32, u32)>,
    ) -> Self {
        let (page_width, page_height) = orientation.apply(paper.dimensions_pt(first_page));
        Self {
            page_width,
            page_height,
            ..Self::default()
        }
    }

    /// Cells per output page.
    pub fn slots_per_page(&self) -> u32 {
        self.rows.saturating_mul(self.cols)
    }

    /// Range checks: a non-empty grid, margins that leave usable space, and
    /// padding that leaves a drawable area inside every cell.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(NotesForgeError::InvalidInput(format!(
                "grid must have at least one cell, got {}x{}",
                self.rows, self.cols
            )));
        }
        let finite = [
            self.page_width,
            self.page_height,
            self.margin_pt,
            self.cell_padding_pt,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite || self.page_width <= 0.0 || self.page_height <= 0.0 {
            return Err(NotesForgeError::InvalidInput(format!(
                "page size must be positive, got {}x{}",
                self.page_width, self.page_height
            )));
        }
        if self.margin_pt < 0.0 || self.cell_padding_pt < 0.0 {
            return Err(NotesForgeError::InvalidInput(
                "margin and cell padding must not be negative".into(),
            ));
        }
        if self.margin_pt * 2.0 >= self.page_width.min(self.page_height) {
            return Err(NotesForgeError::InvalidInput(format!(
                "margin {}pt leaves no room on a {}x{} page",
                self.margin_pt, self.page_width, self.page_height
            )));
        }
        let cell_w = (self.page_width - 2.0 * self.margin_pt) / self.cols as f64;
        let cell_h = (self.page_height - 2.0 * self.margin_pt) / self.rows as f64;
        if self.cell_padding_pt * 2.0 >= cell_w.min(cell_h) {
            return Err(NotesForgeError::InvalidInput(format!(
                "cell padding {}pt leaves no drawable area in a {:.2}x{:.2} cell",
                self.cell_padding_pt, cell_w, cell_h
            )));
        }
        Ok(())
    }
}

// -- Heuristic tuning ---------------------------------------------------------

/// Dominant-colour sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerTuning {
    /// Sample one pixel out of every `sample_stride`.
    pub sample_stride: usize,
    /// Channel quantisation step.
    pub bucket_size: u8,
}

impl Default for AnalyzerTuning {
    fn default() -> Self {
        Self {
            sample_stride: 10,
            bucket_size: 32,
        }
    }
}

/// Thresholds for the clear-background filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearBackgroundTuning {
    /// Pixels closer than this (Euclidean RGB) to the background turn white.
    pub sensitivity: f32,
    /// Backgrounds darker than this are treated as dark.
    pub dark_background_below: f32,
    /// On dark backgrounds, content darker than this becomes pure black.
    pub dark_content_below: f32,
    /// Channel spread above which a pixel counts as a coloured annotation.
    pub annotation_spread: u8,
    /// Multiplier applied to annotation channels.
    pub annotation_boost: f32,
}

impl Default for ClearBackgroundTuning {
    fn default() -> Self {
        Self {
            sensitivity: 40.0,
            dark_background_below: 128.0,
            dark_content_below: 100.0,
            annotation_spread: 30,
            annotation_boost: 1.2,
        }
    }
}

/// Thresholds for the two-pass watermark filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkTuning {
    pub bucket_size: u8,
    pub near_black_below: f32,
    pub near_white_above: f32,
    /// Per-channel distance under which a pixel counts as background.
    pub background_distance: u8,
    /// Colour frequencies are measured against `pixel_count / frequency_divisor`,
    /// so the default window of 3%..40% covers 0.75%..10% of the page.
    pub frequency_divisor: u32,
    pub min_frequency: f64,
    pub max_frequency: f64,
    pub max_saturation: f32,
    /// Per-channel distance under which a pixel matches a watermark colour.
    pub match_distance: u8,
    pub light_gray_min: f32,
    pub light_gray_max: f32,
    pub light_gray_max_spread: u8,
}

impl Default for WatermarkTuning {
    fn default() -> Self {
        Self {
            bucket_size: 16,
            near_black_below: 20.0,
            near_white_above: 235.0,
            background_distance: 20,
            frequency_divisor: 4,
            min_frequency: 0.03,
            max_frequency: 0.40,
            max_saturation: 0.3,
            match_distance: 25,
            light_gray_min: 180.0,
            light_gray_max: 250.0,
            light_gray_max_spread: 20,
        }
    }
}

/// All filter heuristics in one place.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterTuning {
    pub analyzer: AnalyzerTuning,
    pub clear_background: ClearBackgroundTuning,
    pub watermark: WatermarkTuning,
}

impl FilterTuning {
    pub fn validate(&self) -> Result<()> {
        if self.analyzer.sample_stride == 0 {
            return Err(NotesForgeError::Config("sample_stride must be at least 1".into()));
        }
        if self.analyzer.bucket_size == 0 || self.watermark.bucket_size == 0 {
            return Err(NotesForgeError::Config("bucket sizes must be at least 1".into()));
        }
        let wm = &self.watermark;
        if wm.frequency_divisor == 0 {
            return Err(NotesForgeError::Config("frequency_divisor must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&wm.min_frequency)
            || !(0.0..=1.0).contains(&wm.max_frequency)
            || wm.min_frequency > wm.max_frequency
        {
            return Err(NotesForgeError::Config(format!(
                "watermark frequency window {}..{} is not within 0..1",
                wm.min_frequency, wm.max_frequency
            )));
        }
        if self.clear_background.annotation_boost < 0.0 {
            return Err(NotesForgeError::Config("annotation_boost must not be negative".into()));
        }
        Ok(())
    }
}

/// Person-removal parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskTuning {
    /// Square dilation radius applied before filling.
    pub dilate_radius: u32,
    /// Masks covering less than this fraction of the page are ignored.
    pub min_coverage: f64,
}

impl Default for MaskTuning {
    fn default() -> Self {
        Self {
            dilate_radius: 5,
            min_coverage: 0.01,
        }
    }
}

impl MaskTuning {
    pub fn validate(&self) -> Result<()> {
        if self.dilate_radius > u8::MAX as u32 {
            return Err(NotesForgeError::Config(format!(
                "dilate_radius {} exceeds {}",
                self.dilate_radius,
                u8::MAX
            )));
        }
        if !(0.0..=1.0).contains(&self.min_coverage) {
            return Err(NotesForgeError::Config(format!(
                "min_coverage {} is not within 0..1",
                self.min_coverage
            )));
        }
        Ok(())
    }
}

// -- Complete run configuration -----------------------------------------------

/// Everything a composition run needs, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub filters: FilterSettings,
    pub layout: GridLayoutSettings,
    pub quality: Quality,
    pub tuning: FilterTuning,
    pub mask: MaskTuning,
}

impl ForgeConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        self.tuning.validate()?;
        self.mask.validate()
    }
}
