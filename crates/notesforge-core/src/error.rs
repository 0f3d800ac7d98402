// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for NotesForge.

use thiserror::Error;

/// Top-level error type for all NotesForge operations.
///
/// Nothing in the engine retries on its own; every variant reaches the
/// immediate caller, which decides whether to retry (for example with a lower
/// quality tier).
#[derive(Debug, Error)]
pub enum NotesForgeError {
    // -- Caller contract --
    /// Rejected before any processing began: zero-sized buffer, empty page
    /// list, mask/page mismatch, impossible grid geometry.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A tuning or settings value is outside its permitted range.
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Composition --
    /// The embedded-image codec could not encode one page.
    #[error("failed to encode page {page_index}: {reason}")]
    Encoding { page_index: usize, reason: String },

    /// Low-level PDF structure error while emitting pages or objects.
    #[error("PDF composition failed: {0}")]
    Composition(String),

    // -- External collaborators --
    /// The segmentation capability failed to produce a mask.
    #[error("segmentation failed: {0}")]
    Segmentation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NotesForgeError {
    /// Index of the page that caused the failure, when one is known.
    pub fn page_index(&self) -> Option<usize> {
        match self {
            Self::Encoding { page_index, .. } => Some(*page_index),
            _ => None,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NotesForgeError>;
