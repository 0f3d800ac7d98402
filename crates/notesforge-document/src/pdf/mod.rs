// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — grid geometry, embedded-image encoding and document composition.

pub mod composer;
pub mod encode;
pub mod layout;

pub use composer::{ComposerState, CompositionResult, DocumentComposer, compose};
pub use encode::{EncodedImage, encode_page};
pub use layout::{GridLayout, LayoutPlan, Placement, Rect, compute_layout, fit_within};
