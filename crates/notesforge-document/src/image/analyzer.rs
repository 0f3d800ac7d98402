// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background analysis — dominant colour detection over a strided sample of a
// page, using a quantised colour histogram.

use std::collections::HashMap;

use notesforge_core::config::AnalyzerTuning;
use notesforge_core::error::{NotesForgeError, Result};
use notesforge_core::types::{Color, Mask, PixelBuffer};
use tracing::{debug, instrument};

/// Samples that fell into one bucket.
#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    count: u32,
    sum: [u64; 3],
}

impl Bucket {
    fn mean(&self) -> Color {
        let n = self.count.max(1) as u64;
        let avg = |s: u64| ((s + n / 2) / n) as u8;
        Color::new(avg(self.sum[0]), avg(self.sum[1]), avg(self.sum[2]))
    }
}

/// Frequency count of colours after rounding each channel down to a bucket.
///
/// The running maximum is tracked as samples are added, so the dominant
/// bucket is the first one to reach the highest count in sampling order.
#[derive(Debug, Clone)]
pub struct QuantizedHistogram {
    bucket_size: u8,
    buckets: HashMap<Color, Bucket>,
    total: u64,
    dominant: Option<(Color, u32)>,
}

impl QuantizedHistogram {
    pub fn new(bucket_size: u8) -> Self {
        Self {
            bucket_size: bucket_size.max(1),
            buckets: HashMap::new(),
            total: 0,
            dominant: None,
        }
    }

    /// Count one sample.
    pub fn add(&mut self, color: Color) {
        let key = color.quantize(self.bucket_size);
        let bucket = self.buckets.entry(key).or_default();
        bucket.count += 1;
        bucket.sum[0] += color.r as u64;
        bucket.sum[1] += color.g as u64;
        bucket.sum[2] += color.b as u64;
        self.total += 1;

        let best = self.dominant.map_or(0, |(_, c)| c);
        if bucket.count > best {
            self.dominant = Some((key, bucket.count));
        }
    }

    /// Key of the most frequent bucket, or `None` if nothing was added.
    pub fn dominant_key(&self) -> Option<Color> {
        self.dominant.map(|(key, _)| key)
    }

    /// Mean colour of the samples in the most frequent bucket.
    ///
    /// For a uniform input this is exactly the input colour.
    pub fn dominant(&self) -> Option<Color> {
        let (key, _) = self.dominant?;
        self.buckets.get(&key).map(Bucket::mean)
    }

    /// Number of samples added.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket keys and their counts, sorted by key for stable iteration.
    pub fn entries(&self) -> Vec<(Color, u32)> {
        let mut entries: Vec<(Color, u32)> =
            self.buckets.iter().map(|(key, b)| (*key, b.count)).collect();
        entries.sort_unstable();
        entries
    }
}

/// A detected background and its brightness class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Background {
    pub color: Color,
    pub dark: bool,
}

/// Finds the dominant (background) colour of a page.
///
/// Both the clear-background filter and person removal go through this type,
/// so they agree on what "background" means.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundAnalyzer {
    tuning: AnalyzerTuning,
}

impl BackgroundAnalyzer {
    pub fn new(tuning: AnalyzerTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &AnalyzerTuning {
        &self.tuning
    }

    /// Dominant quantised colour over every `sample_stride`-th pixel.
    #[instrument(skip_all, fields(width = buffer.width(), height = buffer.height()))]
    pub fn detect(&self, buffer: &PixelBuffer) -> Color {
        let histogram = self.sample(buffer, None);
        // Pixel 0 is always sampled, so a valid buffer never yields an empty
        // histogram.
        let background = histogram.dominant().unwrap_or(Color::WHITE);
        debug!(
            ?background,
            samples = histogram.total(),
            buckets = histogram.len(),
            "Background detected"
        );
        background
    }

    /// [`detect`](Self::detect) plus a dark/light call: dark when the
    /// background's brightness is below `dark_below`.
    pub fn classify(&self, buffer: &PixelBuffer, dark_below: f32) -> Background {
        let color = self.detect(buffer);
        Background {
            color,
            dark: color.brightness() < dark_below,
        }
    }

    /// Same analysis, ignoring pixels set in `exclude`.
    ///
    /// Falls back to white when every sampled pixel is excluded.
    #[instrument(skip_all, fields(width = buffer.width(), height = buffer.height()))]
    pub fn detect_excluding(&self, buffer: &PixelBuffer, exclude: &Mask) -> Result<Color> {
        if !exclude.matches(buffer) {
            return Err(NotesForgeError::InvalidInput(format!(
                "mask {}x{} does not match buffer {}x{}",
                exclude.width(),
                exclude.height(),
                buffer.width(),
                buffer.height()
            )));
        }
        let histogram = self.sample(buffer, Some(exclude));
        let background = histogram.dominant().unwrap_or(Color::WHITE);
        debug!(
            ?background,
            samples = histogram.total(),
            "Background detected outside mask"
        );
        Ok(background)
    }

    fn sample(&self, buffer: &PixelBuffer, exclude: Option<&Mask>) -> QuantizedHistogram {
        let mut histogram = QuantizedHistogram::new(self.tuning.bucket_size);
        let stride = self.tuning.sample_stride.max(1);
        for index in (0..buffer.pixel_count()).step_by(stride) {
            if exclude.is_some_and(|mask| mask.is_set(index)) {
                continue;
            }
            histogram.add(buffer.color_at(index));
        }
        histogram
    }
}

/// Detect the background with the default tuning.
pub fn detect_background(buffer: &PixelBuffer) -> Color {
    BackgroundAnalyzer::default().detect(buffer)
}
