// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// NotesForge — Core types, settings and error definitions shared across crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::{
    AnalyzerTuning, ClearBackgroundTuning, FilterSettings, FilterTuning, ForgeConfig,
    GridLayoutSettings, MaskTuning, WatermarkTuning,
};
pub use error::NotesForgeError;
pub use types::*;
