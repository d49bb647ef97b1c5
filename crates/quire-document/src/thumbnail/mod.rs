// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// First-page thumbnail rendering.
//
// Parses the page stream, aspect-fits the first page's box onto a small
// white canvas, and replays the page's drawable content. Failure to parse or
// an empty stream means "no thumbnail available" — never an error that
// terminates the surrounding operation.

mod replay;

use image::{Rgba, RgbaImage};
use lopdf::Document;
use quire_core::geometry::{RectPt, SizePt, aspect_fit};
use quire_core::EngineConfig;
use tracing::{debug, instrument, warn};

use crate::stream::graph;
use replay::PageMap;

/// Output encoding for a rendered thumbnail.
#[derive(Debug, Clone, Copy)]
pub enum ThumbnailFormat {
    /// Lossless, used for freshly built documents.
    Png,
    /// Lossy, acceptable for merge thumbnails.
    Jpeg { quality: u8 },
}

/// Renders the first page of a page stream into a small raster preview.
///
/// Stateless; any number of renderers may run concurrently, each on its own
/// copy of the input bytes.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailRenderer {
    width: u32,
    height: u32,
}

impl ThumbnailRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.thumbnail_width, config.thumbnail_height)
    }

    /// Render the first page onto a white canvas and encode it.
    ///
    /// Returns `None` when the stream fails to parse or has zero pages.
    #[instrument(skip(self, data), fields(bytes_len = data.len()))]
    pub fn render(&self, data: &[u8], format: ThumbnailFormat) -> Option<Vec<u8>> {
        let doc = match Document::load_mem(data) {
            Ok(doc) => doc,
            Err(err) => {
                debug!(%err, "No thumbnail: stream failed to parse");
                return None;
            }
        };

        let pages = doc.get_pages();
        let Some((_, first_page)) = pages.iter().next() else {
            debug!("No thumbnail: stream has no pages");
            return None;
        };
        let first_page = *first_page;

        let mut canvas =
            RgbaImage::from_pixel(self.width, self.height, Rgba([255, 255, 255, 255]));

        let page_box = graph::page_box(&doc, first_page);
        let fitted = aspect_fit(
            SizePt::new(page_box.width, page_box.height),
            RectPt::new(0.0, 0.0, self.width as f32, self.height as f32),
        );
        if !fitted.is_empty() {
            replay::replay_page(&doc, first_page, &mut canvas, &PageMap::new(page_box, fitted));
        }

        self.encode(canvas, format)
    }

    fn encode(&self, canvas: RgbaImage, format: ThumbnailFormat) -> Option<Vec<u8>> {
        let mut buffer = Vec::new();
        let result = match format {
            ThumbnailFormat::Png => {
                let mut cursor = std::io::Cursor::new(&mut buffer);
                image::DynamicImage::ImageRgba8(canvas)
                    .write_to(&mut cursor, image::ImageFormat::Png)
                    .map_err(|err| err.to_string())
            }
            ThumbnailFormat::Jpeg { quality } => {
                let rgb = image::DynamicImage::ImageRgba8(canvas).to_rgb8();
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
                rgb.write_with_encoder(encoder).map_err(|err| err.to_string())
            }
        };

        match result {
            Ok(()) => Some(buffer),
            Err(err) => {
                warn!(%err, "Thumbnail encoding failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::graph::DocumentBuilder;
    use crate::testutil;
    use lopdf::{Dictionary, Object, Stream, dictionary};

    fn renderer() -> ThumbnailRenderer {
        ThumbnailRenderer::new(120, 150)
    }

    fn decode(thumbnail: &[u8]) -> image::DynamicImage {
        image::load_from_memory(thumbnail).unwrap()
    }

    #[test]
    fn garbage_bytes_yield_none_without_panicking() {
        assert!(renderer().render(b"not a pdf", ThumbnailFormat::Png).is_none());
    }

    #[test]
    fn zero_page_stream_yields_none() {
        let empty = DocumentBuilder::new().finish().unwrap();
        assert!(renderer().render(&empty, ThumbnailFormat::Png).is_none());
    }

    #[test]
    fn composed_stream_yields_canvas_sized_png() {
        let stream = testutil::sample_stream(2);
        let thumbnail = renderer().render(&stream, ThumbnailFormat::Png).unwrap();
        let decoded = decode(&thumbnail);
        assert_eq!((decoded.width(), decoded.height()), (120, 150));
    }

    #[test]
    fn jpeg_format_produces_jpeg_bytes() {
        let stream = testutil::sample_stream(1);
        let thumbnail = renderer()
            .render(&stream, ThumbnailFormat::Jpeg { quality: 80 })
            .unwrap();
        // JPEG SOI marker.
        assert_eq!(&thumbnail[..2], &[0xFF, 0xD8]);
    }

    /// Hand-built stream with a raw DeviceRGB image: the replay path must
    /// paint its pixels onto the canvas.
    #[test]
    fn raw_rgb_image_content_reaches_the_canvas() {
        let mut builder = DocumentBuilder::new();

        let (img_w, img_h) = (4u32, 4u32);
        let mut samples = Vec::with_capacity((img_w * img_h * 3) as usize);
        for _ in 0..(img_w * img_h) {
            samples.extend_from_slice(&[200u8, 30, 30]);
        }
        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => img_w as i64,
                "Height" => img_h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            samples,
        );
        let image_id = builder.doc_mut().add_object(image_stream);

        // Fill the whole 100x100 page with the image.
        let content_id = builder.doc_mut().add_object(Stream::new(
            Dictionary::new(),
            b"q 100 0 0 100 0 0 cm /Im0 Do Q".to_vec(),
        ));

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(100),
                Object::Integer(100),
            ]),
        );
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Reference(content_id));
        builder.add_page(page_dict);

        let bytes = builder.finish().unwrap();
        let thumbnail = renderer().render(&bytes, ThumbnailFormat::Png).unwrap();
        let decoded = decode(&thumbnail).to_rgba8();

        // The center of the fitted square page card must carry the image's
        // red, not the white background.
        let pixel = decoded.get_pixel(60, 75);
        assert!(pixel[0] > 150 && pixel[1] < 100 && pixel[2] < 100);
    }
}
