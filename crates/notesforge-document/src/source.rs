// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page sources — the ordered, already-rasterised input of a composition run,
// plus where each page came from and what the user did to it.

use notesforge_core::error::{NotesForgeError, Result};
use notesforge_core::types::{Mask, PixelBuffer, Quality, Rotation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::image::edit::{self, RegionEdit};
use crate::image::mask::MaskCompositor;

/// Where a page was rasterised from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageOrigin {
    /// A page of an uploaded PDF (`page_number` is 1-indexed).
    PdfPage { file_index: usize, page_number: u32 },
    /// A standalone image file.
    Image { name: String },
    /// A slide extracted from a presentation (`slide_number` is 1-indexed).
    Slide { file_index: usize, slide_number: u32 },
    #[default]
    Unknown,
}

/// Per-page edit state carried alongside the pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageProvenance {
    pub origin: PageOrigin,
    pub rotation: Rotation,
    pub edits: Vec<RegionEdit>,
}

/// One input image and everything needed to turn it into a grid cell.
///
/// Pages are consumed by the composer; nothing is retained after the output
/// bytes are produced.
#[derive(Debug, Clone)]
pub struct Page {
    image: PixelBuffer,
    provenance: PageProvenance,
    removal_mask: Option<Mask>,
}

impl Page {
    pub fn new(image: PixelBuffer) -> Self {
        Self {
            image,
            provenance: PageProvenance::default(),
            removal_mask: None,
        }
    }

    pub fn with_origin(mut self, origin: PageOrigin) -> Self {
        self.provenance.origin = origin;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.provenance.rotation = rotation;
        self
    }

    pub fn with_edit(mut self, edit: RegionEdit) -> Self {
        self.provenance.edits.push(edit);
        self
    }

    /// Attach a segmentation mask whose region should be erased.
    pub fn with_removal_mask(mut self, mask: Mask) -> Self {
        self.removal_mask = Some(mask);
        self
    }

    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    pub fn provenance(&self) -> &PageProvenance {
        &self.provenance
    }

    pub fn removal_mask(&self) -> Option<&Mask> {
        self.removal_mask.as_ref()
    }

    /// Pixel size after rotation, i.e. the size that ends up in the layout.
    pub fn output_dimensions(&self) -> (u32, u32) {
        let (w, h) = (self.image.width(), self.image.height());
        match self.provenance.rotation {
            Rotation::Cw90 | Rotation::Cw270 => (h, w),
            Rotation::None | Rotation::Cw180 => (w, h),
        }
    }

    /// Check the page can be processed. `index` is only used in messages.
    pub fn validate(&self, index: usize) -> Result<()> {
        if let Some(mask) = &self.removal_mask
            && !mask.matches(&self.image)
        {
            return Err(NotesForgeError::InvalidInput(format!(
                "mask {}x{} does not match page {} ({}x{})",
                mask.width(),
                mask.height(),
                index,
                self.image.width(),
                self.image.height()
            )));
        }
        Ok(())
    }

    /// Produce the buffer the filter chain should see: masked region erased,
    /// region edits applied, then rotation.
    ///
    /// Mask and edits are both expressed in the coordinates of the buffer as
    /// supplied, so they run before the rotation.
    pub fn normalize(self, compositor: &MaskCompositor) -> Result<PixelBuffer> {
        let Page {
            image,
            provenance,
            removal_mask,
        } = self;

        let mut buffer = match removal_mask {
            Some(mask) => compositor.remove_with_background(image, &mask)?,
            None => image,
        };
        for region in &provenance.edits {
            buffer = edit::apply_edit(buffer, region);
        }
        edit::rotate(buffer, provenance.rotation)
    }
}

/// Produces rasterised pages on demand. Implemented by PDF renderers, image
/// loaders and slide extractors outside this crate.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Rasterise page `index` (0-based) at `scale` times its native size.
    /// Sources that hold fixed-size rasters may ignore `scale`.
    fn render_page(&mut self, index: usize, scale: f32) -> Result<Page>;
}

/// Pull every page from `source`, in order, at the quality's render scale.
#[instrument(skip(source), fields(pages = source.page_count()))]
pub fn collect_pages(source: &mut dyn PageSource, quality: Quality) -> Result<Vec<Page>> {
    let scale = quality.render_scale();
    let count = source.page_count();
    info!(count, scale, "Collecting pages");

    let mut pages = Vec::with_capacity(count);
    for index in 0..count {
        let page = source.render_page(index, scale)?;
        debug!(
            index,
            width = page.image().width(),
            height = page.image().height(),
            "Page rendered"
        );
        pages.push(page);
    }
    Ok(pages)
}

/// A page source over buffers that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPageSource {
    pages: Vec<Page>,
}

impl InMemoryPageSource {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    pub fn push(&mut self, page: Page) {
        self.pages.push(page);
    }
}

impl PageSource for InMemoryPageSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&mut self, index: usize, _scale: f32) -> Result<Page> {
        self.pages.get(index).cloned().ok_or_else(|| {
            NotesForgeError::InvalidInput(format!(
                "page {index} out of range (source has {} pages)",
                self.pages.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::edit::EditAction;
    use notesforge_core::types::Color;

    #[test]
    fn mismatched_mask_fails_validation() {
        let page = Page::new(PixelBuffer::filled(10, 10, [0, 0, 0, 255]).unwrap())
            .with_removal_mask(Mask::empty(10, 11).unwrap());
        assert!(matches!(page.validate(3), Err(NotesForgeError::InvalidInput(_))));
    }

    #[test]
    fn rotation_swaps_output_dimensions() {
        let page = Page::new(PixelBuffer::filled(30, 10, [0, 0, 0, 255]).unwrap())
            .with_rotation(Rotation::Cw270);
        assert_eq!(page.output_dimensions(), (10, 30));
        let out = page.normalize(&MaskCompositor::default()).unwrap();
        assert_eq!((out.width(), out.height()), (10, 30));
    }

    #[test]
    fn edits_use_source_coordinates_before_rotation() {
        let page = Page::new(PixelBuffer::filled(20, 10, [255, 255, 255, 255]).unwrap())
            .with_edit(RegionEdit::rectangle(0, 0, 5, 5, EditAction::PaintBlack))
            .with_rotation(Rotation::Cw90);
        let out = page.normalize(&MaskCompositor::default()).unwrap();
        // Source top-left block is now top-right.
        assert_eq!(out.color_at(9), Color::BLACK);
        assert_eq!(out.color_at(0), Color::WHITE);
    }

    #[test]
    fn in_memory_source_yields_pages_in_order() {
        let mut source = InMemoryPageSource::default();
        for shade in [10u8, 20, 30] {
            source.push(
                Page::new(PixelBuffer::filled(2, 2, [shade, shade, shade, 255]).unwrap())
                    .with_origin(PageOrigin::Image { name: format!("{shade}.png") }),
            );
        }
        let pages = collect_pages(&mut source, Quality::High).unwrap();
        let shades: Vec<u8> = pages.iter().map(|p| p.image().color_at(0).r).collect();
        assert_eq!(shades, vec![10, 20, 30]);
        assert!(source.render_page(3, 1.0).is_err());
    }
}
