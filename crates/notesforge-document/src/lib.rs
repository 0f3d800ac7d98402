// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// notesforge-document — Turns rasterised lecture pages into a compact,
// print-ready PDF handout.
//
// Provides pixel filters (invert, background clearing, watermark removal,
// greyscale, black & white), segmentation-mask erasure, grid layout and
// lopdf-based document composition.

pub mod image;
pub mod pdf;
pub mod source;

// Re-export the primary entry points so callers can use
// `notesforge_document::DocumentComposer` etc.
pub use image::analyzer::BackgroundAnalyzer;
pub use image::filters::FilterChain;
pub use image::mask::{MaskCompositor, SegmentationProvider};
pub use pdf::composer::{CompositionResult, DocumentComposer, compose};
pub use pdf::layout::{LayoutPlan, compute_layout};
pub use source::{InMemoryPageSource, Page, PageOrigin, PageProvenance, PageSource, collect_pages};
