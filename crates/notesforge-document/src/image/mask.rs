// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mask compositing — erase a segmented region (typically a presenter standing
// in front of a slide) and fill it with the page's background colour.
//
// The segmentation model itself lives outside this crate. It is handed in as
// a `SegmentationProvider` capability and only its mask output is consumed.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use notesforge_core::config::{AnalyzerTuning, MaskTuning};
use notesforge_core::error::{NotesForgeError, Result};
use notesforge_core::types::{Color, Mask, PixelBuffer};
use tracing::{debug, info, instrument, warn};

use super::analyzer::BackgroundAnalyzer;

/// External capability that produces a person mask for a page.
///
/// Implementations own their model's lifecycle (loading, caching). The mask
/// must have the same dimensions as the buffer it was computed from.
pub trait SegmentationProvider {
    fn segment(&self, image: &PixelBuffer) -> Result<Mask>;
}

/// Erases masked regions of a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskCompositor {
    tuning: MaskTuning,
    analyzer: BackgroundAnalyzer,
}

impl MaskCompositor {
    pub fn new(tuning: MaskTuning, analyzer: AnalyzerTuning) -> Self {
        Self {
            tuning,
            analyzer: BackgroundAnalyzer::new(analyzer),
        }
    }

    pub fn tuning(&self) -> &MaskTuning {
        &self.tuning
    }

    /// True when `mask` covers enough of the page to be worth acting on.
    /// Tiny masks are almost always false positives.
    pub fn is_significant(&self, mask: &Mask) -> bool {
        mask.coverage() >= self.tuning.min_coverage
    }

    /// Background colour computed only from pixels outside `mask`.
    pub fn fill_color(&self, buffer: &PixelBuffer, mask: &Mask) -> Result<Color> {
        self.analyzer.detect_excluding(buffer, mask)
    }

    /// Replace every pixel of the dilated `mask` with `fill`, keeping alpha.
    ///
    /// Returns `buffer` unchanged when the mask is below the coverage
    /// threshold.
    #[instrument(skip_all, fields(width = buffer.width(), height = buffer.height(), ?fill))]
    pub fn remove_masked(&self, mut buffer: PixelBuffer, mask: &Mask, fill: Color) -> Result<PixelBuffer> {
        check_dimensions(&buffer, mask)?;

        let coverage = mask.coverage();
        if !self.is_significant(mask) {
            warn!(coverage, "Mask below coverage threshold, nothing to remove");
            return Ok(buffer);
        }

        let dilated = dilate_mask(mask, self.tuning.dilate_radius)?;
        let mut erased = 0usize;
        for (index, &set) in dilated.bits().iter().enumerate() {
            if set {
                buffer.set_color(index, fill);
                erased += 1;
            }
        }
        info!(coverage, erased, "Masked region removed");
        Ok(buffer)
    }

    /// [`remove_masked`](Self::remove_masked) with the fill taken from the
    /// non-masked background.
    pub fn remove_with_background(&self, buffer: PixelBuffer, mask: &Mask) -> Result<PixelBuffer> {
        check_dimensions(&buffer, mask)?;
        if !self.is_significant(mask) {
            warn!(coverage = mask.coverage(), "Mask below coverage threshold, nothing to remove");
            return Ok(buffer);
        }
        let fill = self.fill_color(&buffer, mask)?;
        debug!(?fill, "Fill colour from unmasked background");
        self.remove_masked(buffer, mask, fill)
    }

    /// Ask `provider` for a mask and erase what it finds.
    #[instrument(skip_all, fields(width = buffer.width(), height = buffer.height()))]
    pub fn remove_person(
        &self,
        buffer: PixelBuffer,
        provider: &dyn SegmentationProvider,
    ) -> Result<PixelBuffer> {
        let mask = provider.segment(&buffer)?;
        if !mask.matches(&buffer) {
            return Err(NotesForgeError::Segmentation(format!(
                "provider returned a {}x{} mask for a {}x{} page",
                mask.width(),
                mask.height(),
                buffer.width(),
                buffer.height()
            )));
        }
        self.remove_with_background(buffer, &mask)
    }
}

fn check_dimensions(buffer: &PixelBuffer, mask: &Mask) -> Result<()> {
    if mask.matches(buffer) {
        return Ok(());
    }
    Err(NotesForgeError::InvalidInput(format!(
        "mask {}x{} does not match page {}x{}",
        mask.width(),
        mask.height(),
        buffer.width(),
        buffer.height()
    )))
}

/// Square dilation: a pixel is set when any pixel within `radius` on both
/// axes is set in `mask`.
///
/// Uses an L-infinity distance dilation, which gives exactly the square
/// neighbourhood of a brute-force scan in separable time.
pub fn dilate_mask(mask: &Mask, radius: u32) -> Result<Mask> {
    if radius == 0 {
        return Ok(mask.clone());
    }
    let k = u8::try_from(radius).map_err(|_| {
        NotesForgeError::Config(format!("dilate radius {radius} exceeds {}", u8::MAX))
    })?;

    let (width, height) = (mask.width(), mask.height());
    let bits = mask.bits();
    let gray = GrayImage::from_fn(width, height, |x, y| {
        let set = bits[y as usize * width as usize + x as usize];
        Luma([if set { 255 } else { 0 }])
    });
    let grown = dilate(&gray, Norm::LInf, k);
    Mask::new(width, height, grown.pixels().map(|p| p.0[0] > 0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMask(Mask);

    impl SegmentationProvider for FixedMask {
        fn segment(&self, _image: &PixelBuffer) -> Result<Mask> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl SegmentationProvider for Broken {
        fn segment(&self, _image: &PixelBuffer) -> Result<Mask> {
            Err(NotesForgeError::Segmentation("model not loaded".into()))
        }
    }

    /// Reference brute-force dilation.
    fn dilate_naive(mask: &Mask, radius: i64) -> Vec<bool> {
        let (w, h) = (mask.width() as i64, mask.height() as i64);
        let mut out = vec![false; (w * h) as usize];
        for y in 0..h {
            for x in 0..w {
                'scan: for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx >= 0 && nx < w && ny >= 0 && ny < h && mask.is_set((ny * w + nx) as usize) {
                            out[(y * w + x) as usize] = true;
                            break 'scan;
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn dilation_matches_square_neighbourhood_scan() {
        let mask = Mask::from_fn(23, 17, |x, y| (x * 7 + y * 3) % 29 == 0 || (x == 22 && y == 0)).unwrap();
        for radius in [1u32, 2, 5] {
            let fast = dilate_mask(&mask, radius).unwrap();
            assert_eq!(fast.bits(), dilate_naive(&mask, radius as i64).as_slice(), "radius {radius}");
        }
    }

    #[test]
    fn single_pixel_grows_into_square() {
        let mask = Mask::from_fn(11, 11, |x, y| x == 5 && y == 5).unwrap();
        let grown = dilate_mask(&mask, 2).unwrap();
        assert_eq!(grown.count(), 25);
        assert!(grown.is_set(3 * 11 + 3));
        assert!(!grown.is_set(2 * 11 + 5));
    }

    #[test]
    fn small_mask_is_a_no_op() {
        // 1 pixel out of 200 = 0.5% coverage.
        let buf = PixelBuffer::filled(20, 10, [40, 50, 60, 255]).unwrap();
        let mask = Mask::from_fn(20, 10, |x, y| x == 3 && y == 3).unwrap();
        let out = MaskCompositor::default()
            .remove_masked(buf.clone(), &mask, Color::WHITE)
            .unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn masked_region_is_filled_and_alpha_kept() {
        let buf = PixelBuffer::filled(30, 30, [200, 10, 10, 77]).unwrap();
        let mask = Mask::from_fn(30, 30, |x, y| (10..20).contains(&x) && (10..20).contains(&y)).unwrap();
        let out = MaskCompositor::default()
            .remove_masked(buf, &mask, Color::new(1, 2, 3))
            .unwrap();
        // Radius 5 grows the 10x10 block to 20x20.
        assert_eq!(out.rgba(5, 5), [1, 2, 3, 77]);
        assert_eq!(out.rgba(24, 24), [1, 2, 3, 77]);
        assert_eq!(out.rgba(4, 4), [200, 10, 10, 77]);
        assert_eq!(out.rgba(25, 15), [200, 10, 10, 77]);
    }

    #[test]
    fn mismatched_mask_is_invalid_input() {
        let buf = PixelBuffer::filled(10, 10, [0, 0, 0, 255]).unwrap();
        let mask = Mask::empty(10, 9).unwrap();
        let result = MaskCompositor::default().remove_masked(buf, &mask, Color::WHITE);
        assert!(matches!(result, Err(NotesForgeError::InvalidInput(_))));
    }

    #[test]
    fn person_is_replaced_with_slide_background() {
        // Pale yellow slide, presenter occupying the right third.
        let mut pixels = Vec::new();
        for _y in 0..30 {
            for x in 0..30 {
                let px: [u8; 4] = if x >= 20 { [60, 40, 30, 255] } else { [250, 240, 200, 255] };
                pixels.extend_from_slice(&px);
            }
        }
        let buf = PixelBuffer::new(30, 30, pixels).unwrap();
        let mask = Mask::from_fn(30, 30, |x, _| x >= 20).unwrap();
        let out = MaskCompositor::default()
            .remove_person(buf, &FixedMask(mask))
            .unwrap();
        for x in [0, 14, 15, 29] {
            assert_eq!(out.rgba(x, 12), [250, 240, 200, 255], "column {x}");
        }
    }

    #[test]
    fn provider_failure_surfaces() {
        let buf = PixelBuffer::filled(4, 4, [0, 0, 0, 255]).unwrap();
        let result = MaskCompositor::default().remove_person(buf, &Broken);
        assert!(matches!(result, Err(NotesForgeError::Segmentation(_))));
    }

    #[test]
    fn provider_mask_of_wrong_size_is_rejected() {
        let buf = PixelBuffer::filled(4, 4, [0, 0, 0, 255]).unwrap();
        let provider = FixedMask(Mask::from_fn(5, 4, |_, _| true).unwrap());
        let result = MaskCompositor::default().remove_person(buf, &provider);
        assert!(matches!(result, Err(NotesForgeError::Segmentation(_))));
    }
}
