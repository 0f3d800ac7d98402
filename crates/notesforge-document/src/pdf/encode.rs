// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Embedded image encoding — flatten RGBA onto white paper and compress as
// baseline JPEG at the quality tier's setting, ready for a DCTDecode XObject.

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use notesforge_core::error::{NotesForgeError, Result};
use notesforge_core::types::{PixelBuffer, Quality};
use tracing::{debug, instrument};

/// A compressed page image plus the metadata a PDF image XObject needs.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Encode `buffer` as an opaque RGB JPEG.
///
/// Transparent pixels are composited over white, since that is what they
/// will sit on once printed. `page_index` is reported in the error on failure.
#[instrument(skip(buffer), fields(width = buffer.width(), height = buffer.height()))]
pub fn encode_page(buffer: &PixelBuffer, quality: Quality, page_index: usize) -> Result<EncodedImage> {
    let (width, height) = (buffer.width(), buffer.height());
    let rgb = RgbImage::from_raw(width, height, flatten_on_white(buffer)).ok_or_else(|| {
        NotesForgeError::Encoding {
            page_index,
            reason: format!("cannot build {width}x{height} RGB image"),
        }
    })?;

    let mut data = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut data, quality.jpeg_quality());
    rgb.write_with_encoder(encoder)
        .map_err(|err| NotesForgeError::Encoding {
            page_index,
            reason: format!("JPEG encoding failed: {err}"),
        })?;

    debug!(bytes = data.len(), jpeg_quality = quality.jpeg_quality(), "Page encoded");
    Ok(EncodedImage {
        data,
        width,
        height,
    })
}

/// Drop alpha by blending each pixel over white.
fn flatten_on_white(buffer: &PixelBuffer) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(buffer.pixel_count() * 3);
    for px in buffer.pixels().chunks_exact(4) {
        let alpha = px[3] as u32;
        for &channel in &px[..3] {
            let blended = (channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_jpeg_with_matching_dimensions() {
        let buf = PixelBuffer::filled(32, 16, [40, 80, 120, 255]).unwrap();
        let encoded = encode_page(&buf, Quality::Medium, 0).unwrap();
        assert_eq!((encoded.width, encoded.height), (32, 16));
        // SOI marker.
        assert_eq!(&encoded.data[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&encoded.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let buf = PixelBuffer::new(2, 1, vec![0, 0, 0, 0, 0, 0, 0, 255]).unwrap();
        assert_eq!(flatten_on_white(&buf), vec![255, 255, 255, 0, 0, 0]);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let mut pixels = Vec::new();
        for i in 0..(64u32 * 64) {
            let v = (i * 37 % 251) as u8;
            pixels.extend_from_slice(&[v, v.wrapping_mul(3), v.wrapping_add(90), 255]);
        }
        let buf = PixelBuffer::new(64, 64, pixels).unwrap();
        let low = encode_page(&buf, Quality::Low, 0).unwrap();
        let high = encode_page(&buf, Quality::High, 0).unwrap();
        assert!(low.data.len() < high.data.len());
    }
}
