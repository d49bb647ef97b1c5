// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page composer — renders an ordered attachment list onto uniform target
// pages and serializes the result into canonical page-stream bytes.
//
// Synthesized pages (images, captions, text) are built with `printpdf` 0.8's
// data-oriented API (`PdfPage` structs holding `Vec<Op>` operation lists);
// existing documents are re-paginated by wrapping each source page as a Form
// XObject placed with a uniform scale. Every per-attachment chunk is
// round-tripped through the canonical byte form before concatenation.

pub(crate) mod text;

use std::collections::HashMap;

use lopdf::{Dictionary, Object, Stream};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use quire_core::error::Result;
use quire_core::geometry::{RectPt, SizePt, aspect_fit};
use quire_core::{Attachment, EngineConfig, QuireError};
use tracing::{debug, info, instrument, warn};

use crate::stream::graph::{self, DocumentBuilder};
use text::{max_chars_per_line, wrap_text};

/// Millimetres per point; `printpdf` page geometry is specified in Mm.
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Renders attachments into pages of one fixed target geometry.
///
/// Pure with respect to its inputs: no disk writes, no shared state. Any
/// number of composers may run concurrently on their own attachment lists.
#[derive(Debug, Clone)]
pub struct PageComposer {
    config: EngineConfig,
}

impl PageComposer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- Attachments to page stream -------------------------------------------

    /// Render every attachment, in order, into one serialized page stream.
    ///
    /// Contribution per attachment: one page per image or unsupported file,
    /// one page per source page of an existing document. A single bad
    /// attachment degrades to a caption placeholder page; it never aborts the
    /// remaining attachments.
    #[instrument(skip_all, fields(attachments = attachments.len()))]
    pub fn compose(&self, attachments: &[Attachment]) -> Result<Vec<u8>> {
        if attachments.is_empty() {
            return Err(QuireError::EmptyResult("attachment list is empty".into()));
        }

        info!(count = attachments.len(), "Composing document");

        let mut chunks = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            chunks.push(self.render_attachment(attachment)?);
        }

        let bytes = concat_chunks(&chunks)?;
        debug!(output_bytes = bytes.len(), "Composition complete");
        Ok(bytes)
    }

    /// Render a single synthesized text page (used when inserting a page into
    /// an editing session). The text is drawn inside the configured inset;
    /// lines beyond the bottom of the page are clipped.
    pub fn text_page(&self, body: &str) -> Result<Vec<u8>> {
        self.render_text_page(
            body,
            self.config.body_font_size_pt,
            self.config.text_inset_pt,
        )
    }

    // -- Per-attachment rendering ---------------------------------------------

    fn render_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        match attachment {
            Attachment::Image {
                data,
                width,
                height,
            } => match image::load_from_memory(data) {
                Ok(decoded) => {
                    self.image_page(&decoded, SizePt::new(*width as f32, *height as f32))
                }
                Err(err) => {
                    warn!(%err, "Image attachment failed to decode, degrading to placeholder");
                    self.caption_page("Unreadable image attachment")
                }
            },
            Attachment::Document { name, data } => match lopdf::Document::load_mem(data) {
                Ok(source) => match self.repaginate_document(&source) {
                    Ok(chunk) => Ok(chunk),
                    Err(err) => {
                        warn!(name = %name, %err, "Document attachment failed to re-paginate, degrading to placeholder");
                        self.caption_page(&format!("Failed to insert document: {name}"))
                    }
                },
                Err(err) => {
                    warn!(name = %name, %err, "Document attachment failed to parse, degrading to placeholder");
                    self.caption_page(&format!("Failed to insert document: {name}"))
                }
            },
            Attachment::Unsupported { name } => {
                self.caption_page(&format!("Unsupported file\n{name}"))
            }
        }
    }

    /// One page: the image aspect-fitted into the full page rectangle, no
    /// margin. The declared pixel size is the fit contract's source size; a
    /// degenerate declaration yields a blank page.
    fn image_page(&self, decoded: &image::DynamicImage, declared: SizePt) -> Result<Vec<u8>> {
        let page_rect = RectPt::of_size(self.config.page_size);
        let fitted = aspect_fit(declared, page_rect);

        let (px_w, px_h) = (decoded.width() as usize, decoded.height() as usize);
        let rgb = decoded.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: px_w,
            height: px_h,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new("Quire Page");
        let xobject_id = doc.add_image(&raw);

        let mut ops = Vec::new();
        if !fitted.is_empty() && px_w > 0 && px_h > 0 {
            // At 72 dpi the image's native size in points equals its pixel
            // size, so the scale factors are plain point ratios.
            let scale_x = fitted.width / px_w as f32;
            let scale_y = fitted.height / px_h as f32;
            ops.push(Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(fitted.x)),
                    translate_y: Some(Pt(fitted.y)),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    dpi: Some(72.0),
                    rotate: None,
                },
            });
        }

        let (page_w, page_h) = self.page_dimensions_mm();
        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);
        save_document(doc)
    }

    /// One target-size page per source page, each source page wrapped as a
    /// Form XObject and placed with a uniform scale, anchored to the top-left
    /// of the target page.
    fn repaginate_document(&self, source: &lopdf::Document) -> Result<Vec<u8>> {
        let page_size = self.config.page_size;
        let mut builder = DocumentBuilder::new();
        let mut cache = HashMap::new();

        for page_id in graph::sorted_page_ids(source) {
            let (form_id, bbox) =
                graph::wrap_page_as_form(builder.doc_mut(), source, page_id, &mut cache)?;

            let mut content = String::new();
            if bbox.width > 0.0 && bbox.height > 0.0 {
                let scale =
                    (page_size.width / bbox.width).min(page_size.height / bbox.height);
                let tx = -bbox.x * scale;
                let ty = page_size.height - (bbox.y + bbox.height) * scale;
                content = format!("q {scale} 0 0 {scale} {tx} {ty} cm /P0 Do Q\n");
            }

            let content_id = builder
                .doc_mut()
                .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

            let mut xobjects = Dictionary::new();
            xobjects.set("P0", Object::Reference(form_id));
            let mut resources = Dictionary::new();
            resources.set("XObject", Object::Dictionary(xobjects));

            let mut page_dict = Dictionary::new();
            page_dict.set("MediaBox", media_box_array(page_size));
            page_dict.set("Resources", Object::Dictionary(resources));
            page_dict.set("Contents", Object::Reference(content_id));
            builder.add_page(page_dict);
        }

        builder.finish()
    }

    /// One caption page naming an attachment the build could not convert.
    fn caption_page(&self, caption: &str) -> Result<Vec<u8>> {
        self.render_text_page(
            caption,
            self.config.caption_font_size_pt,
            self.config.caption_inset_pt,
        )
    }

    fn render_text_page(&self, body: &str, font_size_pt: f32, inset_pt: f32) -> Result<Vec<u8>> {
        let page = self.config.page_size;
        let line_height_pt = font_size_pt * 1.25;
        let usable_width_pt = page.width - 2.0 * inset_pt;
        let usable_height_pt = page.height - 2.0 * inset_pt;

        let wrapped = wrap_text(body, max_chars_per_line(usable_width_pt, font_size_pt));
        let lines_per_page = (usable_height_pt / line_height_pt).max(1.0) as usize;

        let mut ops = Vec::new();
        for (index, line) in wrapped.iter().take(lines_per_page).enumerate() {
            if line.is_empty() {
                continue;
            }
            let y_pt = page.height - inset_pt - font_size_pt - index as f32 * line_height_pt;

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(inset_pt),
                    y: Pt(y_pt),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(font_size_pt),
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line.clone())],
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::EndTextSection);
        }

        let mut doc = PdfDocument::new("Quire Page");
        let (page_w, page_h) = self.page_dimensions_mm();
        doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);
        save_document(doc)
    }

    fn page_dimensions_mm(&self) -> (Mm, Mm) {
        (
            Mm(self.config.page_size.width * MM_PER_PT),
            Mm(self.config.page_size.height * MM_PER_PT),
        )
    }
}

/// Serialize a printpdf document, treating writer failure as the fatal
/// resource error it is (never per-attachment).
fn save_document(doc: PdfDocument) -> Result<Vec<u8>> {
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if output.is_empty() {
        return Err(QuireError::ResourceAllocation(
            "page writer produced no output".into(),
        ));
    }
    Ok(output)
}

/// Parse each per-attachment chunk back from its canonical bytes and clone
/// its pages, in order, into one output document.
fn concat_chunks(chunks: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut builder = DocumentBuilder::new();

    for chunk in chunks {
        let source = lopdf::Document::load_mem(chunk).map_err(|err| {
            QuireError::SerializeFailed(format!("composed chunk did not round-trip: {err}"))
        })?;
        let mut cache = HashMap::new();
        for page_id in graph::sorted_page_ids(&source) {
            builder.append_cloned_page(&source, page_id, &mut cache)?;
        }
    }

    builder.finish()
}

fn media_box_array(page_size: SizePt) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(page_size.width),
        Object::Real(page_size.height),
    ])
}
