// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page normalisation — lossless quarter-turn rotation and manual region edits
// (invert or black out a rectangular or elliptical selection).

use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_ellipse_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use notesforge_core::error::Result;
use notesforge_core::types::{Color, PixelBuffer, Rotation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Selections narrower or shorter than this (in pixels) are ignored.
pub const MIN_SELECTION_PX: u32 = 5;

/// Outline of a region edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionShape {
    Rectangle,
    /// Ellipse inscribed in the selection rectangle.
    Ellipse,
}

/// What happens to the pixels inside a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Invert,
    PaintBlack,
}

/// A manual correction over part of a page, in pixel coordinates of the
/// buffer as supplied (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEdit {
    pub shape: SelectionShape,
    pub action: EditAction,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionEdit {
    pub fn rectangle(x: u32, y: u32, width: u32, height: u32, action: EditAction) -> Self {
        Self {
            shape: SelectionShape::Rectangle,
            action,
            x,
            y,
            width,
            height,
        }
    }

    pub fn ellipse(x: u32, y: u32, width: u32, height: u32, action: EditAction) -> Self {
        Self {
            shape: SelectionShape::Ellipse,
            ..Self::rectangle(x, y, width, height, action)
        }
    }

    fn is_too_small(&self) -> bool {
        self.width < MIN_SELECTION_PX || self.height < MIN_SELECTION_PX
    }
}

/// Apply one region edit. Out-of-bounds parts of the selection are clipped.
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn apply_edit(mut buffer: PixelBuffer, edit: &RegionEdit) -> PixelBuffer {
    if edit.is_too_small() || edit.x >= buffer.width() || edit.y >= buffer.height() {
        debug!("Selection empty after clipping, skipped");
        return buffer;
    }

    let selection = selection_mask(buffer.width(), buffer.height(), edit);
    for (index, px) in selection.pixels().enumerate() {
        if px.0[0] == 0 {
            continue;
        }
        let color = buffer.color_at(index);
        let edited = match edit.action {
            EditAction::Invert => Color::new(255 - color.r, 255 - color.g, 255 - color.b),
            EditAction::PaintBlack => Color::BLACK,
        };
        buffer.set_color(index, edited);
    }
    buffer
}

fn selection_mask(width: u32, height: u32, edit: &RegionEdit) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let on = Luma([255u8]);
    match edit.shape {
        SelectionShape::Rectangle => {
            let rect = Rect::at(edit.x as i32, edit.y as i32).of_size(edit.width, edit.height);
            draw_filled_rect_mut(&mut mask, rect, on);
        }
        SelectionShape::Ellipse => {
            let rx = edit.width / 2;
            let ry = edit.height / 2;
            let center = ((edit.x + rx) as i32, (edit.y + ry) as i32);
            draw_filled_ellipse_mut(&mut mask, center, rx as i32, ry as i32, on);
        }
    }
    mask
}

/// Rotate clockwise by a quarter-turn multiple. Width and height swap for 90
/// and 270 degrees.
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn rotate(buffer: PixelBuffer, rotation: Rotation) -> Result<PixelBuffer> {
    if rotation == Rotation::None {
        return Ok(buffer);
    }
    let image = buffer.into_rgba_image()?;
    let rotated = match rotation {
        Rotation::Cw90 => image::imageops::rotate90(&image),
        Rotation::Cw180 => image::imageops::rotate180(&image),
        Rotation::Cw270 => image::imageops::rotate270(&image),
        Rotation::None => image,
    };
    debug!(
        degrees = rotation.degrees(),
        new_w = rotated.width(),
        new_h = rotated.height(),
        "Rotation applied"
    );
    PixelBuffer::try_from(rotated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[x as u8, y as u8, 100, 255]);
            }
        }
        PixelBuffer::new(width, height, pixels).unwrap()
    }

    #[test]
    fn rotate_90_swaps_dimensions_and_moves_corners() {
        let buf = gradient(4, 2);
        let out = rotate(buf, Rotation::Cw90).unwrap();
        assert_eq!((out.width(), out.height()), (2, 4));
        // Top-left of the source ends up top-right.
        assert_eq!(out.rgba(1, 0), [0, 0, 100, 255]);
        // Bottom-left of the source ends up top-left.
        assert_eq!(out.rgba(0, 0), [0, 1, 100, 255]);
    }

    #[test]
    fn full_turn_restores_buffer() {
        let buf = gradient(5, 3);
        let mut out = buf.clone();
        for _ in 0..4 {
            out = rotate(out, Rotation::Cw90).unwrap();
        }
        assert_eq!(out, buf);
        assert_eq!(rotate(buf.clone(), Rotation::None).unwrap(), buf);
    }

    #[test]
    fn rectangle_paint_black_is_clipped_to_buffer() {
        let buf = PixelBuffer::filled(20, 20, [255, 255, 255, 200]).unwrap();
        let edit = RegionEdit::rectangle(15, 15, 10, 10, EditAction::PaintBlack);
        let out = apply_edit(buf, &edit);
        assert_eq!(out.rgba(19, 19), [0, 0, 0, 200]);
        assert_eq!(out.rgba(15, 15), [0, 0, 0, 200]);
        assert_eq!(out.rgba(14, 15), [255, 255, 255, 200]);
    }

    #[test]
    fn ellipse_invert_spares_corners() {
        let buf = PixelBuffer::filled(20, 20, [10, 20, 30, 255]).unwrap();
        let edit = RegionEdit::ellipse(0, 0, 20, 20, EditAction::Invert);
        let out = apply_edit(buf, &edit);
        assert_eq!(out.rgba(10, 10), [245, 235, 225, 255]);
        assert_eq!(out.rgba(0, 0), [10, 20, 30, 255]);
        assert_eq!(out.rgba(19, 19), [10, 20, 30, 255]);
    }

    #[test]
    fn tiny_selection_is_ignored() {
        let buf = PixelBuffer::filled(20, 20, [10, 20, 30, 255]).unwrap();
        let edit = RegionEdit::rectangle(2, 2, 4, 10, EditAction::PaintBlack);
        assert_eq!(apply_edit(buf.clone(), &edit), buf);
    }

    #[test]
    fn selection_outside_buffer_is_ignored() {
        let buf = PixelBuffer::filled(20, 20, [10, 20, 30, 255]).unwrap();
        let edit = RegionEdit::rectangle(30, 0, 10, 10, EditAction::PaintBlack);
        assert_eq!(apply_edit(buf.clone(), &edit), buf);
    }
}
