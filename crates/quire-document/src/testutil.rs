// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for unit tests.

use image::{Rgb, RgbImage};
use quire_core::{Attachment, EngineConfig};

use crate::compose::PageComposer;

/// Encoded PNG bytes of a solid-colour image.
pub(crate) fn png_bytes(rgb: [u8; 3], width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .expect("png encode");
    buffer
}

/// An image attachment whose declared size matches its pixel data.
pub(crate) fn image_attachment(rgb: [u8; 3], width: u32, height: u32) -> Attachment {
    Attachment::image(png_bytes(rgb, width, height), width, height)
}

/// A composed page stream with `pages` pages, each a distinct solid image.
pub(crate) fn sample_stream(pages: usize) -> Vec<u8> {
    let attachments: Vec<Attachment> = (0..pages)
        .map(|index| {
            let shade = 30 + (index as u8 % 8) * 25;
            // Vary the aspect ratio so fitted rectangles differ per page.
            image_attachment([shade, 120, 200 - shade], 20 + index as u32 * 10, 30)
        })
        .collect();
    PageComposer::new(EngineConfig::default())
        .compose(&attachments)
        .expect("sample stream")
}
