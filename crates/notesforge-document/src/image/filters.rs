// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filter chain — invert, clear background, watermark removal, greyscale and
// black & white, always applied in that order.
//
// Every filter consumes a `PixelBuffer` and hands back a buffer of the same
// dimensions. Alpha is never touched.

use notesforge_core::config::{ClearBackgroundTuning, FilterSettings, FilterTuning, WatermarkTuning};
use notesforge_core::types::{Color, PixelBuffer};
use tracing::{debug, info, instrument};

use super::analyzer::{Background, BackgroundAnalyzer, QuantizedHistogram};

/// One named transformation in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStep {
    Invert,
    ClearBackground,
    RemoveWatermark,
    Greyscale,
    BlackAndWhite,
}

impl FilterStep {
    /// Application order. Cleanup heuristics expect dark ink on a light page,
    /// so they follow inversion; the quantising steps come last.
    pub const ORDER: [FilterStep; 5] = [
        FilterStep::Invert,
        FilterStep::ClearBackground,
        FilterStep::RemoveWatermark,
        FilterStep::Greyscale,
        FilterStep::BlackAndWhite,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Invert => "invert",
            Self::ClearBackground => "clear-background",
            Self::RemoveWatermark => "remove-watermark",
            Self::Greyscale => "greyscale",
            Self::BlackAndWhite => "black-and-white",
        }
    }

    fn enabled_in(&self, settings: &FilterSettings) -> bool {
        match self {
            Self::Invert => settings.invert,
            Self::ClearBackground => settings.clear_background,
            Self::RemoveWatermark => settings.remove_watermark,
            Self::Greyscale => settings.greyscale,
            Self::BlackAndWhite => settings.black_and_white,
        }
    }
}

/// Applies the enabled filters of a [`FilterSettings`] in [`FilterStep::ORDER`].
///
/// ```ignore
/// let chain = FilterChain::new(settings, FilterTuning::default());
/// let cleaned = chain.apply(page_buffer);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FilterChain {
    settings: FilterSettings,
    tuning: FilterTuning,
    analyzer: BackgroundAnalyzer,
}

impl FilterChain {
    pub fn new(settings: FilterSettings, tuning: FilterTuning) -> Self {
        Self {
            settings,
            tuning,
            analyzer: BackgroundAnalyzer::new(tuning.analyzer),
        }
    }

    /// Chain with the stock heuristics.
    pub fn with_settings(settings: FilterSettings) -> Self {
        Self::new(settings, FilterTuning::default())
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Enabled steps, in the order they will run.
    pub fn enabled_steps(&self) -> Vec<FilterStep> {
        FilterStep::ORDER
            .into_iter()
            .filter(|step| step.enabled_in(&self.settings))
            .collect()
    }

    /// Run every enabled step over `buffer`.
    #[instrument(skip_all, fields(width = buffer.width(), height = buffer.height()))]
    pub fn apply(&self, buffer: PixelBuffer) -> PixelBuffer {
        let steps = self.enabled_steps();
        if steps.is_empty() {
            debug!("No filters enabled");
            return buffer;
        }
        info!(
            steps = ?steps.iter().map(FilterStep::name).collect::<Vec<_>>(),
            "Applying filters"
        );
        steps
            .into_iter()
            .fold(buffer, |buf, step| self.apply_step(step, buf))
    }

    /// Run a single step regardless of whether it is enabled.
    pub fn apply_step(&self, step: FilterStep, buffer: PixelBuffer) -> PixelBuffer {
        match step {
            FilterStep::Invert => invert(buffer),
            FilterStep::ClearBackground => {
                clear_background(buffer, &self.analyzer, &self.tuning.clear_background)
            }
            FilterStep::RemoveWatermark => {
                remove_watermark(buffer, &self.analyzer, &self.tuning.watermark)
            }
            FilterStep::Greyscale => greyscale(buffer),
            FilterStep::BlackAndWhite => {
                black_and_white(buffer, self.settings.black_and_white_threshold)
            }
        }
    }
}

// -- Individual filters -------------------------------------------------------

/// `c' = 255 - c` on R, G and B.
pub fn invert(mut buffer: PixelBuffer) -> PixelBuffer {
    for px in buffer.pixels_mut().chunks_exact_mut(4) {
        px[0] = 255 - px[0];
        px[1] = 255 - px[1];
        px[2] = 255 - px[2];
    }
    buffer
}

/// Whiten everything close to the detected background.
///
/// On a dark background the remaining content also gets a contrast boost:
/// dark pixels go pure black and coloured annotations are brightened.
pub fn clear_background(
    mut buffer: PixelBuffer,
    analyzer: &BackgroundAnalyzer,
    tuning: &ClearBackgroundTuning,
) -> PixelBuffer {
    let Background {
        color: background,
        dark,
    } = analyzer.classify(&buffer, tuning.dark_background_below);
    debug!(?background, dark, "Clearing background");

    let boost = |c: u8| (c as f32 * tuning.annotation_boost).round().min(255.0) as u8;

    for px in buffer.pixels_mut().chunks_exact_mut(4) {
        let color = Color::new(px[0], px[1], px[2]);
        if color.distance(&background) < tuning.sensitivity {
            set_rgb(px, Color::WHITE);
        } else if dark {
            if color.brightness() < tuning.dark_content_below {
                set_rgb(px, Color::BLACK);
            } else if color.spread() > tuning.annotation_spread {
                set_rgb(px, Color::new(boost(color.r), boost(color.g), boost(color.b)));
            }
        }
    }
    buffer
}

/// Two-pass watermark removal.
///
/// Pass 1 finds muted colours that recur across a moderate share of the page
/// (the signature of a tiled or faded overlay) and whitens every pixel near
/// one of them. Shares are measured against a quarter of the pixel count by
/// default, so the 3%..40% window selects colours covering 0.75%..10% of
/// the page. Pass 2 whitens light, nearly neutral greys. Both passes run
/// whenever the filter is enabled; on mostly-grey photographs this can also
/// erase legitimate light content.
pub fn remove_watermark(
    mut buffer: PixelBuffer,
    analyzer: &BackgroundAnalyzer,
    tuning: &WatermarkTuning,
) -> PixelBuffer {
    let background = analyzer.detect(&buffer);
    let marks = watermark_colors(&buffer, background, tuning);
    debug!(?background, ?marks, "Watermark colours detected");

    if !marks.is_empty() {
        for px in buffer.pixels_mut().chunks_exact_mut(4) {
            let color = Color::new(px[0], px[1], px[2]);
            if marks
                .iter()
                .any(|mark| color.within(mark, tuning.match_distance))
            {
                set_rgb(px, Color::WHITE);
            }
        }
    }

    for px in buffer.pixels_mut().chunks_exact_mut(4) {
        let color = Color::new(px[0], px[1], px[2]);
        let brightness = color.brightness();
        if brightness > tuning.light_gray_min
            && brightness < tuning.light_gray_max
            && color.spread() < tuning.light_gray_max_spread
        {
            set_rgb(px, Color::WHITE);
        }
    }
    buffer
}

/// Quantised colours that look like a watermark: neither near-black,
/// near-white nor background, whose share of `pixel_count / frequency_divisor`
/// lies strictly between `min_frequency` and `max_frequency`, with low
/// saturation.
fn watermark_colors(buffer: &PixelBuffer, background: Color, tuning: &WatermarkTuning) -> Vec<Color> {
    let mut histogram = QuantizedHistogram::new(tuning.bucket_size);
    for index in 0..buffer.pixel_count() {
        let color = buffer.color_at(index);
        let brightness = color.brightness();
        if brightness < tuning.near_black_below || brightness > tuning.near_white_above {
            continue;
        }
        if color.within(&background, tuning.background_distance) {
            continue;
        }
        histogram.add(color);
    }

    let total = buffer.pixel_count() as f64 / tuning.frequency_divisor.max(1) as f64;
    histogram
        .entries()
        .into_iter()
        .filter(|(color, count)| {
            let frequency = *count as f64 / total;
            frequency > tuning.min_frequency
                && frequency < tuning.max_frequency
                && color.saturation() < tuning.max_saturation
        })
        .map(|(color, _)| color)
        .collect()
}

/// Rec. 601 luma scaled by 1000, exact in integers.
fn luma_permille(px: &[u8]) -> u32 {
    299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32
}

/// Replace R, G and B with the rounded luma `0.299R + 0.587G + 0.114B`.
pub fn greyscale(mut buffer: PixelBuffer) -> PixelBuffer {
    for px in buffer.pixels_mut().chunks_exact_mut(4) {
        let grey = ((luma_permille(px) + 500) / 1000) as u8;
        set_rgb(px, Color::new(grey, grey, grey));
    }
    buffer
}

/// Hard threshold on luma: at or above `threshold` is white, below is black.
/// No dithering.
pub fn black_and_white(mut buffer: PixelBuffer, threshold: u8) -> PixelBuffer {
    let cutoff = threshold as u32 * 1000;
    for px in buffer.pixels_mut().chunks_exact_mut(4) {
        let value = if luma_permille(px) >= cutoff { 255 } else { 0 };
        set_rgb(px, Color::new(value, value, value));
    }
    buffer
}

fn set_rgb(px: &mut [u8], color: Color) {
    px[0] = color.r;
    px[1] = color.g;
    px[2] = color.b;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_from(colors: &[[u8; 4]], width: u32) -> PixelBuffer {
        let height = colors.len() as u32 / width;
        PixelBuffer::new(width, height, colors.concat()).unwrap()
    }

    fn all_rgb(buf: &PixelBuffer, expected: Color) -> bool {
        (0..buf.pixel_count()).all(|i| buf.color_at(i) == expected)
    }

    #[test]
    fn invert_is_involutive_and_keeps_alpha() {
        let buf = buffer_from(&[[0, 10, 255, 7], [128, 64, 32, 200], [1, 2, 3, 0]], 3);
        let once = invert(buf.clone());
        assert_eq!(once.rgba(0, 0), [255, 245, 0, 7]);
        assert_eq!(invert(once), buf);
    }

    #[test]
    fn filters_preserve_dimensions() {
        let buf = PixelBuffer::filled(13, 7, [90, 100, 110, 255]).unwrap();
        let settings = FilterSettings {
            invert: true,
            clear_background: true,
            remove_watermark: true,
            greyscale: true,
            black_and_white: true,
            ..FilterSettings::default()
        };
        let out = FilterChain::with_settings(settings).apply(buf);
        assert_eq!((out.width(), out.height()), (13, 7));
        assert_eq!(out.pixels().len(), 13 * 7 * 4);
    }

    #[test]
    fn steps_run_in_fixed_order() {
        let settings = FilterSettings {
            black_and_white: true,
            invert: true,
            greyscale: true,
            ..FilterSettings::default()
        };
        let steps = FilterChain::with_settings(settings).enabled_steps();
        assert_eq!(
            steps,
            vec![FilterStep::Invert, FilterStep::Greyscale, FilterStep::BlackAndWhite]
        );
    }

    #[test]
    fn passthrough_leaves_buffer_untouched() {
        let buf = buffer_from(&[[1, 2, 3, 4], [5, 6, 7, 8]], 2);
        let out = FilterChain::with_settings(FilterSettings::default()).apply(buf.clone());
        assert_eq!(out, buf);
    }

    #[test]
    fn clear_background_whitens_uniform_page() {
        for color in [[250, 250, 250, 255], [20, 30, 40, 255], [0, 128, 255, 255]] {
            let buf = PixelBuffer::filled(20, 20, color).unwrap();
            let out = clear_background(
                buf,
                &BackgroundAnalyzer::default(),
                &ClearBackgroundTuning::default(),
            );
            assert!(all_rgb(&out, Color::WHITE), "{color:?} was not cleared");
        }
    }

    #[test]
    fn clear_background_boosts_content_on_dark_page() {
        // Dark blue page with near-black text and an orange highlight.
        let mut colors = vec![[10, 10, 40, 255]; 20];
        colors[3] = [90, 90, 90, 255];
        colors[7] = [200, 120, 50, 255];
        colors[11] = [150, 150, 150, 255];
        let buf = buffer_from(&colors, 5);
        let out = clear_background(
            buf,
            &BackgroundAnalyzer::default(),
            &ClearBackgroundTuning::default(),
        );
        assert_eq!(out.color_at(0), Color::WHITE);
        assert_eq!(out.color_at(3), Color::BLACK);
        assert_eq!(out.color_at(7), Color::new(240, 144, 60));
        // Light neutral content is left as is.
        assert_eq!(out.color_at(11), Color::new(150, 150, 150));
    }

    #[test]
    fn clear_background_keeps_ink_on_light_page() {
        let mut colors = vec![[245, 245, 245, 255]; 20];
        colors[5] = [20, 20, 20, 255];
        let buf = buffer_from(&colors, 5);
        let out = clear_background(
            buf,
            &BackgroundAnalyzer::default(),
            &ClearBackgroundTuning::default(),
        );
        assert_eq!(out.color_at(0), Color::WHITE);
        assert_eq!(out.color_at(5), Color::new(20, 20, 20));
    }

    /// White 10x10 page with the mid-grey (130,130,135) at `grey`. None of
    /// the indices are multiples of 10, so the background samples stay white.
    fn page_with_grey(grey: impl IntoIterator<Item = usize>) -> Vec<[u8; 4]> {
        let mut colors = vec![[255, 255, 255, 255]; 100];
        for i in grey {
            colors[i] = [130, 130, 135, 255];
        }
        colors
    }

    fn strip_watermark(colors: &[[u8; 4]]) -> PixelBuffer {
        remove_watermark(
            buffer_from(colors, 10),
            &BackgroundAnalyzer::default(),
            &WatermarkTuning::default(),
        )
    }

    #[test]
    fn watermark_frequency_pass_removes_recurring_grey() {
        // 5% grey watermark plus a little ink.
        let mut colors = page_with_grey((3..100).step_by(20));
        colors[55] = [0, 0, 0, 255];
        colors[56] = [200, 40, 40, 255];
        let out = strip_watermark(&colors);
        assert_eq!(out.color_at(3), Color::WHITE);
        assert_eq!(out.color_at(83), Color::WHITE);
        assert_eq!(out.color_at(55), Color::BLACK);
        // Saturated colour is not a watermark.
        assert_eq!(out.color_at(56), Color::new(200, 40, 40));
    }

    #[test]
    fn watermark_window_is_measured_against_quarter_page() {
        // 2% of the page is an 8% share: inside the window.
        let out = strip_watermark(&page_with_grey([3, 57]));
        assert_eq!(out.color_at(3), Color::WHITE);
        assert_eq!(out.color_at(57), Color::WHITE);

        // 20% of the page is an 80% share: too common to be a watermark.
        let grey: Vec<usize> = (0..10).flat_map(|row| [row * 10 + 3, row * 10 + 7]).collect();
        let out = strip_watermark(&page_with_grey(grey));
        assert_eq!(out.color_at(3), Color::new(130, 130, 135));
        assert_eq!(out.color_at(97), Color::new(130, 130, 135));

        // 10% of the page sits exactly on the exclusive upper bound.
        let out = strip_watermark(&page_with_grey((3..100).step_by(10)));
        assert_eq!(out.color_at(93), Color::new(130, 130, 135));
    }

    #[test]
    fn watermark_light_grey_pass_is_unconditional() {
        // A single light grey pixel is too rare for pass 1 but caught by pass 2.
        let mut colors = vec![[255, 255, 255, 255]; 100];
        colors[42] = [210, 212, 208, 255];
        colors[43] = [240, 200, 160, 255];
        let buf = buffer_from(&colors, 10);
        let out = remove_watermark(
            buf,
            &BackgroundAnalyzer::default(),
            &WatermarkTuning::default(),
        );
        assert_eq!(out.color_at(42), Color::WHITE);
        assert_eq!(out.color_at(43), Color::new(240, 200, 160));
    }

    #[test]
    fn greyscale_uses_luma_weights() {
        let buf = buffer_from(&[[255, 0, 0, 9], [0, 255, 0, 9], [0, 0, 255, 9]], 3);
        let out = greyscale(buf);
        assert_eq!(out.rgba(0, 0), [76, 76, 76, 9]);
        assert_eq!(out.rgba(1, 0), [150, 150, 150, 9]);
        assert_eq!(out.rgba(2, 0), [29, 29, 29, 9]);
    }

    #[test]
    fn black_and_white_threshold_boundary() {
        let buf = buffer_from(&[[128, 128, 128, 255], [127, 127, 127, 255]], 2);
        let out = black_and_white(buf, 128);
        assert_eq!(out.color_at(0), Color::WHITE);
        assert_eq!(out.color_at(1), Color::BLACK);
    }

    #[test]
    fn black_and_white_follows_configured_threshold() {
        let buf = buffer_from(&[[150, 150, 150, 255]], 1);
        let settings = FilterSettings {
            black_and_white: true,
            black_and_white_threshold: 200,
            ..FilterSettings::default()
        };
        let out = FilterChain::with_settings(settings).apply(buf);
        assert_eq!(out.color_at(0), Color::BLACK);
    }

    #[test]
    fn dark_slide_becomes_white_page_with_dark_text() {
        // Typical lecture slide: near-black page with light text.
        let mut colors = vec![[15, 15, 15, 255]; 100];
        for i in 40..50 {
            colors[i] = [235, 235, 235, 255];
        }
        let buf = buffer_from(&colors, 10);
        let settings = FilterSettings {
            invert: true,
            clear_background: true,
            ..FilterSettings::default()
        };
        let out = FilterChain::with_settings(settings).apply(buf);
        assert_eq!(out.color_at(0), Color::WHITE);
        assert_eq!(out.color_at(45), Color::new(20, 20, 20));
    }
}
