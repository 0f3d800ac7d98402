// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid layout — pagination, cell rectangles and scale-to-fit placement.
//
// All coordinates are PDF points with the origin at the bottom-left of the
// page. Cells are filled row-major starting from the top-left.

use notesforge_core::config::GridLayoutSettings;
use notesforge_core::error::Result;
use tracing::{debug, instrument};

/// Axis-aligned rectangle; `(x, y)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Where and how large an image is drawn inside its cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rect: Rect,
    /// Points per source pixel.
    pub scale: f64,
}

/// Cell geometry derived from validated [`GridLayoutSettings`].
#[derive(Debug, Clone, Copy)]
pub struct GridLayout {
    settings: GridLayoutSettings,
    cell_width: f64,
    cell_height: f64,
}

impl GridLayout {
    /// Validate `settings` and precompute the cell size.
    pub fn new(settings: GridLayoutSettings) -> Result<Self> {
        settings.validate()?;
        let cell_width = (settings.page_width - 2.0 * settings.margin_pt) / settings.cols as f64;
        let cell_height = (settings.page_height - 2.0 * settings.margin_pt) / settings.rows as f64;
        debug!(cell_width, cell_height, "Grid geometry");
        Ok(Self {
            settings,
            cell_width,
            cell_height,
        })
    }

    pub fn settings(&self) -> &GridLayoutSettings {
        &self.settings
    }

    pub fn cell_size(&self) -> (f64, f64) {
        (self.cell_width, self.cell_height)
    }

    pub fn slots_per_page(&self) -> u32 {
        self.settings.slots_per_page()
    }

    /// `ceil(page_count / (rows * cols))`.
    pub fn pages_needed(&self, page_count: u32) -> u32 {
        page_count.div_ceil(self.slots_per_page())
    }

    /// Output page and slot for the `index`-th input image.
    pub fn position_of(&self, index: usize) -> (u32, u32) {
        let per_page = self.slots_per_page() as usize;
        ((index / per_page) as u32, (index % per_page) as u32)
    }

    /// Rectangle of `slot` on any output page. Slot `k` sits at row
    /// `k / cols`, column `k % cols`.
    pub fn slot_rect(&self, slot: u32) -> Rect {
        let row = slot / self.settings.cols;
        let col = slot % self.settings.cols;
        Rect {
            x: self.settings.margin_pt + col as f64 * self.cell_width,
            y: self.settings.page_height
                - self.settings.margin_pt
                - (row + 1) as f64 * self.cell_height,
            width: self.cell_width,
            height: self.cell_height,
        }
    }

    /// Scale an `image_width` x `image_height` pixel image to fit inside the
    /// padded `cell`, keeping its aspect ratio, centred on both axes.
    pub fn fit_image(&self, cell: &Rect, image_width: u32, image_height: u32) -> Placement {
        fit_within(cell, self.settings.cell_padding_pt, image_width, image_height)
    }
}

/// Scale-to-fit inside `cell` shrunk by `padding` on every side.
pub fn fit_within(cell: &Rect, padding: f64, image_width: u32, image_height: u32) -> Placement {
    let draw_width = cell.width - 2.0 * padding;
    let draw_height = cell.height - 2.0 * padding;
    let scale = (draw_width / image_width as f64).min(draw_height / image_height as f64);
    let width = image_width as f64 * scale;
    let height = image_height as f64 * scale;
    Placement {
        rect: Rect {
            x: cell.x + padding + (draw_width - width) / 2.0,
            y: cell.y + padding + (draw_height - height) / 2.0,
            width,
            height,
        },
        scale,
    }
}

/// Pagination for a specific number of input pages.
#[derive(Debug, Clone, Copy)]
pub struct LayoutPlan {
    grid: GridLayout,
    page_count: u32,
    pages_needed: u32,
}

impl LayoutPlan {
    pub fn grid(&self) -> &GridLayout {
        &self.grid
    }

    /// Number of input pages the plan was made for.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of output pages.
    pub fn pages_needed(&self) -> u32 {
        self.pages_needed
    }

    /// Cell rectangle for `slot` on output page `page_index`, or `None` when
    /// that slot holds no input page.
    pub fn cell_rect(&self, page_index: u32, slot: u32) -> Option<Rect> {
        let per_page = self.grid.slots_per_page();
        if slot >= per_page {
            return None;
        }
        let index = page_index as u64 * per_page as u64 + slot as u64;
        (index < self.page_count as u64).then(|| self.grid.slot_rect(slot))
    }

    /// Occupied cells on output page `page_index`, in slot order.
    pub fn cells_on_page(&self, page_index: u32) -> Vec<Rect> {
        (0..self.grid.slots_per_page())
            .map_while(|slot| self.cell_rect(page_index, slot))
            .collect()
    }
}

/// Plan the grid for `page_count` input pages.
#[instrument(skip(settings), fields(rows = settings.rows, cols = settings.cols))]
pub fn compute_layout(page_count: u32, settings: GridLayoutSettings) -> Result<LayoutPlan> {
    let grid = GridLayout::new(settings)?;
    let pages_needed = grid.pages_needed(page_count);
    debug!(page_count, pages_needed, "Layout planned");
    Ok(LayoutPlan {
        grid,
        page_count,
        pages_needed,
    })
}
