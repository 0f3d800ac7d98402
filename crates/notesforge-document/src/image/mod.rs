// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — background detection, the fixed-order filter chain, mask
// compositing, and per-page region edits and rotation.

pub mod analyzer;
pub mod edit;
pub mod filters;
pub mod mask;

pub use analyzer::{Background, BackgroundAnalyzer, QuantizedHistogram, detect_background};
pub use edit::{EditAction, RegionEdit, SelectionShape, apply_edit, rotate};
pub use filters::{FilterChain, FilterStep};
pub use mask::{MaskCompositor, SegmentationProvider, dilate_mask};
