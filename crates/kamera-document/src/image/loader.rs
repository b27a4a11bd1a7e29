// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image loader: decode JPEG/PNG bytes into RGB pixel data printpdf can embed.
// Large camera photos are downscaled first so reports stay a sensible size.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use kamera_core::error::{KameraError, Result};
use printpdf::{RawImage, RawImageData, RawImageFormat};
use tracing::{debug, instrument};

/// Longest edge, in pixels, kept for remark photos.
pub const REMARK_MAX_EDGE: u32 = 1600;

/// Longest edge, in pixels, kept for the header logo.
pub const LOGO_MAX_EDGE: u32 = 600;

/// A decoded image ready to register with a PDF document.
pub struct LoadedImage {
    pub raw: RawImage,
    pub width: u32,
    pub height: u32,
}

impl LoadedImage {
    /// Decode encoded bytes (JPEG, PNG, ...) and shrink them so neither edge
    /// exceeds `max_edge`. Transparent pixels are flattened onto white.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn decode(data: &[u8], max_edge: u32) -> Result<Self> {
        let image = image::load_from_memory(data).map_err(|err| {
            KameraError::ImageError(format!("failed to decode image: {}", err))
        })?;
        let (original_w, original_h) = image.dimensions();

        let image = if original_w > max_edge || original_h > max_edge {
            image.resize(max_edge, max_edge, image::imageops::FilterType::Triangle)
        } else {
            image
        };

        let rgb = flatten_onto_white(&image);
        let (width, height) = rgb.dimensions();
        debug!(original_w, original_h, width, height, "Image decoded");

        Ok(Self {
            raw: RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            },
            width,
            height,
        })
    }
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let image::Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let blend = |channel: u8| -> u8 {
            let alpha = u32::from(a);
            ((u32::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}
