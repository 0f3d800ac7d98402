// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document composer — filter every page, pack the results into a grid, and
// emit the finished PDF with optional cell borders and page numbers.
//
// The PDF is assembled directly with `lopdf`: page images are embedded as
// DCTDecode XObjects so the quality tier controls the JPEG parameters, and
// each output page gets one content stream built from plain operators.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use notesforge_core::config::{FilterSettings, FilterTuning, ForgeConfig, GridLayoutSettings, MaskTuning};
use notesforge_core::error::{NotesForgeError, Result};
use notesforge_core::types::Quality;
use tracing::{debug, info, instrument};

use super::encode::{EncodedImage, encode_page};
use super::layout::{LayoutPlan, Rect, compute_layout};
use crate::image::filters::FilterChain;
use crate::image::mask::MaskCompositor;
use crate::source::Page;

/// Border stroke width in points.
const BORDER_WIDTH_PT: f32 = 0.5;
/// Border stroke grey level.
const BORDER_GREY: f32 = 0.7;
/// Page-number font size in points.
const FOOTER_FONT_SIZE_PT: f32 = 10.0;
/// Page-number fill grey level.
const FOOTER_GREY: f32 = 0.5;
/// Page-number baseline above the bottom edge, in points.
const FOOTER_BASELINE_PT: f64 = 15.0;
/// Resource name of the footer font.
const FOOTER_FONT: &[u8] = b"F1";

/// The finished document. Ownership passes entirely to the caller.
#[derive(Debug, Clone)]
pub struct CompositionResult {
    pub bytes: Vec<u8>,
    pub page_count: u32,
}

/// Lifecycle of one composition run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    Empty,
    Placing { remaining: usize },
    Finalizing,
    Done,
}

/// Turns an ordered list of pages into a print-ready PDF.
///
/// ```ignore
/// let composer = DocumentComposer::new(filters, layout, Quality::Medium);
/// let result = composer.compose(pages)?;
/// std::fs::write("handout.pdf", &result.bytes)?;
/// ```
#[derive(Debug, Clone)]
pub struct DocumentComposer {
    filters: FilterSettings,
    layout: GridLayoutSettings,
    quality: Quality,
    tuning: FilterTuning,
    mask: MaskTuning,
}

impl DocumentComposer {
    pub fn new(filters: FilterSettings, layout: GridLayoutSettings, quality: Quality) -> Self {
        Self {
            filters,
            layout,
            quality,
            tuning: FilterTuning::default(),
            mask: MaskTuning::default(),
        }
    }

    pub fn from_config(config: &ForgeConfig) -> Self {
        Self {
            filters: config.filters,
            layout: config.layout,
            quality: config.quality,
            tuning: config.tuning,
            mask: config.mask,
        }
    }

    pub fn with_tuning(mut self, tuning: FilterTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_mask_tuning(mut self, mask: MaskTuning) -> Self {
        self.mask = mask;
        self
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Filter, lay out and encode `pages` into one PDF.
    ///
    /// Every input is validated before any page is processed. Any failure
    /// aborts the whole run; no partial document is ever returned.
    #[instrument(skip_all, fields(pages = pages.len(), quality = ?self.quality))]
    pub fn compose(&self, pages: Vec<Page>) -> Result<CompositionResult> {
        if pages.is_empty() {
            return Err(NotesForgeError::InvalidInput("no pages to compose".into()));
        }
        self.tuning.validate()?;
        self.mask.validate()?;
        for (index, page) in pages.iter().enumerate() {
            page.validate(index)?;
        }
        let page_count = u32::try_from(pages.len()).map_err(|_| {
            NotesForgeError::InvalidInput(format!("too many pages: {}", pages.len()))
        })?;
        let plan = compute_layout(page_count, self.layout)?;

        info!(
            inputs = page_count,
            output_pages = plan.pages_needed(),
            rows = self.layout.rows,
            cols = self.layout.cols,
            "Composing document"
        );

        let chain = FilterChain::new(self.filters, self.tuning);
        let compositor = MaskCompositor::new(self.mask, self.tuning.analyzer);

        let mut composition = Composition::new(plan);
        composition.begin(pages.len());
        for (index, page) in pages.into_iter().enumerate() {
            let normalized = page.normalize(&compositor)?;
            let filtered = chain.apply(normalized);
            let encoded = encode_page(&filtered, self.quality, index)?;
            composition.place(index, encoded)?;
        }
        composition.finalize()
    }
}

/// Convenience wrapper around [`DocumentComposer::compose`].
pub fn compose(
    pages: Vec<Page>,
    filters: FilterSettings,
    layout: GridLayoutSettings,
    quality: Quality,
) -> Result<CompositionResult> {
    DocumentComposer::new(filters, layout, quality).compose(pages)
}

// -- Assembly -----------------------------------------------------------------

/// Content and resources collected for one output page.
#[derive(Default)]
struct DraftPage {
    operations: Vec<Operation>,
    xobjects: Dictionary,
    cells: Vec<Rect>,
}

/// One in-flight composition: the lopdf document being built plus the
/// per-page drafts.
struct Composition {
    plan: LayoutPlan,
    doc: Document,
    drafts: Vec<DraftPage>,
    state: ComposerState,
}

impl Composition {
    fn new(plan: LayoutPlan) -> Self {
        Self {
            plan,
            doc: Document::with_version("1.5"),
            drafts: Vec::new(),
            state: ComposerState::Empty,
        }
    }

    fn transition(&mut self, next: ComposerState) {
        debug!(from = ?self.state, to = ?next, "Composer state");
        self.state = next;
    }

    fn begin(&mut self, total: usize) {
        self.transition(ComposerState::Placing { remaining: total });
    }

    /// Embed page `index` and draw it into its cell, opening a new output
    /// page when pagination requires it.
    fn place(&mut self, index: usize, image: EncodedImage) -> Result<()> {
        let ComposerState::Placing { remaining } = self.state else {
            return Err(NotesForgeError::Composition(format!(
                "cannot place page {index} while {:?}",
                self.state
            )));
        };

        let grid = *self.plan.grid();
        let (page_index, slot) = grid.position_of(index);
        let cell = self.plan.cell_rect(page_index, slot).ok_or_else(|| {
            NotesForgeError::Composition(format!("page {index} has no cell in the layout"))
        })?;
        let placement = grid.fit_image(&cell, image.width, image.height);

        while self.drafts.len() <= page_index as usize {
            self.drafts.push(DraftPage::default());
        }

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            image.data,
        )
        .with_compression(false);
        let image_id = self.doc.add_object(stream);

        let name = format!("Im{index}");
        let draft = &mut self.drafts[page_index as usize];
        draft.xobjects.set(name.as_bytes(), image_id);
        draft.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(placement.rect.width),
                    real(0.0),
                    real(0.0),
                    real(placement.rect.height),
                    real(placement.rect.x),
                    real(placement.rect.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        draft.cells.push(cell);

        debug!(
            index,
            page_index,
            slot,
            x = placement.rect.x,
            y = placement.rect.y,
            w = placement.rect.width,
            h = placement.rect.height,
            "Page placed"
        );
        self.transition(ComposerState::Placing {
            remaining: remaining.saturating_sub(1),
        });
        Ok(())
    }

    /// Draw borders and page numbers over the placed content, build the page
    /// tree and serialise.
    fn finalize(mut self) -> Result<CompositionResult> {
        match self.state {
            ComposerState::Placing { remaining: 0 } => {}
            state => {
                return Err(NotesForgeError::Composition(format!(
                    "cannot finalize while {state:?}"
                )));
            }
        }
        self.transition(ComposerState::Finalizing);

        let settings = *self.plan.grid().settings();
        let total = self.drafts.len();
        let font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let pages_id = self.doc.new_object_id();

        let drafts = std::mem::take(&mut self.drafts);
        let mut kids: Vec<Object> = Vec::with_capacity(total);
        for (page_index, mut draft) in drafts.into_iter().enumerate() {
            if settings.show_borders {
                let cells = std::mem::take(&mut draft.cells);
                draft.operations.extend(border_operations(&cells));
            }
            if settings.add_page_numbers {
                let label = format!("{} / {}", page_index + 1, total);
                draft
                    .operations
                    .extend(footer_operations(&label, settings.page_width));
            }
            let page_id = self.emit_page(pages_id, font_id, draft, &settings)?;
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
        };
        self.doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal("NotesForge"),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).map_err(|err| {
            NotesForgeError::Composition(format!("failed to serialise PDF: {err}"))
        })?;

        self.transition(ComposerState::Done);
        info!(pages = total, bytes = bytes.len(), "Document composed");
        Ok(CompositionResult {
            bytes,
            page_count: total as u32,
        })
    }

    fn emit_page(
        &mut self,
        pages_id: ObjectId,
        font_id: ObjectId,
        draft: DraftPage,
        settings: &GridLayoutSettings,
    ) -> Result<ObjectId> {
        let content = Content {
            operations: draft.operations,
        };
        let encoded = content.encode().map_err(|err| {
            NotesForgeError::Composition(format!("failed to encode page content: {err}"))
        })?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                real(settings.page_width),
                real(settings.page_height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => draft.xobjects,
            },
        });
        Ok(page_id)
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Thin light-grey outline around each occupied cell's full rectangle.
fn border_operations(cells: &[Rect]) -> Vec<Operation> {
    if cells.is_empty() {
        return Vec::new();
    }
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("RG", vec![BORDER_GREY.into(), BORDER_GREY.into(), BORDER_GREY.into()]),
        Operation::new("w", vec![BORDER_WIDTH_PT.into()]),
    ];
    for cell in cells {
        ops.push(Operation::new(
            "re",
            vec![real(cell.x), real(cell.y), real(cell.width), real(cell.height)],
        ));
        ops.push(Operation::new("S", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// `label` centred horizontally near the bottom edge in small grey type.
fn footer_operations(label: &str, page_width: f64) -> Vec<Operation> {
    let x = (page_width - helvetica_width(label, FOOTER_FONT_SIZE_PT as f64)) / 2.0;
    vec![
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![FOOTER_GREY.into(), FOOTER_GREY.into(), FOOTER_GREY.into()]),
        Operation::new(
            "Tf",
            vec![Object::Name(FOOTER_FONT.to_vec()), FOOTER_FONT_SIZE_PT.into()],
        ),
        Operation::new("Td", vec![real(x), real(FOOTER_BASELINE_PT)]),
        Operation::new("Tj", vec![Object::string_literal(label)]),
        Operation::new("ET", vec![]),
    ]
}

/// Advance width of `text` in Helvetica, from the standard AFM metrics for
/// the characters a page label uses.
fn helvetica_width(text: &str, size: f64) -> f64 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' ' | '/' => 278,
            // Every Helvetica digit is 556 units wide.
            _ => 556,
        })
        .sum();
    units as f64 * size / 1000.0
}
