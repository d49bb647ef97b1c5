// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Best-effort content-stream replay for thumbnailing.
//
// Walks a page's operations tracking the graphics-state stack and the CTM,
// draws image XObjects onto the raster canvas, and recurses into Form
// XObjects with bounded depth. Vector paths and text are not rasterized;
// unsupported content is skipped, never an error.

use image::RgbaImage;
use image::imageops::FilterType;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use quire_core::geometry::RectPt;
use tracing::debug;

use crate::stream::graph::{inherited_page_attr, object_number, page_content};

/// Nested Form XObjects beyond this depth are ignored.
const MAX_FORM_DEPTH: usize = 4;

/// 2×3 affine transformation matrix in PDF operand order [a b c d e f].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        Some(Self {
            a: object_number(&operands[0])?,
            b: object_number(&operands[1])?,
            c: object_number(&operands[2])?,
            d: object_number(&operands[3])?,
            e: object_number(&operands[4])?,
            f: object_number(&operands[5])?,
        })
    }

    /// `self` applied first, then `after`.
    fn then(&self, after: &Self) -> Self {
        Self {
            a: self.a * after.a + self.b * after.c,
            b: self.a * after.b + self.b * after.d,
            c: self.c * after.a + self.d * after.c,
            d: self.c * after.b + self.d * after.d,
            e: self.e * after.a + self.f * after.c + after.e,
            f: self.e * after.b + self.f * after.d + after.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }
}

/// Maps page-space coordinates onto canvas pixels (top-left origin).
pub(crate) struct PageMap {
    page: RectPt,
    fitted: RectPt,
    scale: f32,
}

impl PageMap {
    /// `fitted` is the aspect-fitted page card in canvas pixels; because the
    /// fit is centered, its offset is valid from the top edge as well.
    pub(crate) fn new(page: RectPt, fitted: RectPt) -> Self {
        let scale = if page.width > 0.0 {
            fitted.width / page.width
        } else {
            0.0
        };
        Self {
            page,
            fitted,
            scale,
        }
    }

    fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        let cx = self.fitted.x + (x - self.page.x) * self.scale;
        let cy = self.fitted.y + (self.page.y + self.page.height - y) * self.scale;
        (cx, cy)
    }
}

/// Replay the first page's drawable content onto the canvas.
pub(crate) fn replay_page(doc: &Document, page_id: ObjectId, canvas: &mut RgbaImage, map: &PageMap) {
    let Ok(page_dict) = doc.get_dictionary(page_id) else {
        return;
    };
    let Ok(data) = page_content(doc, page_dict) else {
        return;
    };
    let Ok(content) = Content::decode(&data) else {
        debug!("Page content failed to decode, thumbnail stays blank");
        return;
    };

    let resources = resolve_dict(doc, inherited_page_attr(doc, page_id, b"Resources"));
    draw_ops(
        doc,
        &content.operations,
        resources.as_ref(),
        Matrix::IDENTITY,
        canvas,
        map,
        0,
    );
}

fn draw_ops(
    doc: &Document,
    operations: &[lopdf::content::Operation],
    resources: Option<&Dictionary>,
    base: Matrix,
    canvas: &mut RgbaImage,
    map: &PageMap,
    depth: usize,
) {
    let mut ctm = base;
    let mut stack: Vec<Matrix> = Vec::new();

    for op in operations {
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => ctm = stack.pop().unwrap_or(base),
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    ctm = m.then(&ctm);
                }
            }
            "Do" => {
                let Some(Object::Name(name)) = op.operands.first() else {
                    continue;
                };
                let Some(xobject) = lookup_xobject(doc, resources, name) else {
                    continue;
                };
                match xobject.dict.get(b"Subtype") {
                    Ok(Object::Name(subtype)) if subtype == b"Image" => {
                        if let Some(decoded) = decode_image(&xobject) {
                            draw_image(canvas, &decoded, &ctm, map);
                        }
                    }
                    Ok(Object::Name(subtype)) if subtype == b"Form" => {
                        if depth < MAX_FORM_DEPTH {
                            draw_form(doc, &xobject, resources, ctm, canvas, map, depth);
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

fn draw_form(
    doc: &Document,
    form: &Stream,
    outer_resources: Option<&Dictionary>,
    ctm: Matrix,
    canvas: &mut RgbaImage,
    map: &PageMap,
    depth: usize,
) {
    let data = form
        .decompressed_content()
        .unwrap_or_else(|_| form.content.clone());
    let Ok(content) = Content::decode(&data) else {
        return;
    };

    let base = match form.dict.get(b"Matrix") {
        Ok(Object::Array(operands)) => Matrix::from_operands(operands)
            .map(|m| m.then(&ctm))
            .unwrap_or(ctm),
        _ => ctm,
    };

    // The form's own resources take precedence over the page's.
    let own_resources = resolve_dict(doc, form.dict.get(b"Resources").ok().cloned());
    let resources = own_resources.as_ref().or(outer_resources);

    draw_ops(
        doc,
        &content.operations,
        resources,
        base,
        canvas,
        map,
        depth + 1,
    );
}

fn lookup_xobject(doc: &Document, resources: Option<&Dictionary>, name: &[u8]) -> Option<Stream> {
    let resources = resources?;
    let xobjects = resolve_dict(doc, resources.get(b"XObject").ok().cloned())?;
    match xobjects.get(name).ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_stream().ok().cloned(),
        Object::Stream(stream) => Some(stream.clone()),
        _ => None,
    }
}

fn resolve_dict(doc: &Document, obj: Option<Object>) -> Option<Dictionary> {
    match obj? {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_object(id).ok()?.as_dict().ok().cloned(),
        _ => None,
    }
}

// -- Image sample decoding ----------------------------------------------------

/// Decode an image XObject into pixels.
///
/// Handles DCT-encoded (JPEG) streams and raw or Flate-compressed 8-bit
/// DeviceRGB/DeviceGray samples. Anything fancier (predictors, CMYK, masks)
/// is skipped — the thumbnail stays best-effort.
fn decode_image(stream: &Stream) -> Option<image::DynamicImage> {
    let filters = filter_names(&stream.dict);

    if filters.iter().any(|f| f == b"DCTDecode") {
        return image::load_from_memory(&stream.content).ok();
    }

    if has_predictor(&stream.dict) {
        return None;
    }

    let width = stream.dict.get(b"Width").ok().and_then(object_number)? as u32;
    let height = stream.dict.get(b"Height").ok().and_then(object_number)? as u32;
    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(object_number)
        .unwrap_or(8.0) as u32;
    if width == 0 || height == 0 || bits != 8 {
        return None;
    }

    let samples = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    match stream.dict.get(b"ColorSpace").ok()? {
        Object::Name(cs) if cs == b"DeviceRGB" => {
            let len = (width * height * 3) as usize;
            let buf = samples.get(..len)?.to_vec();
            image::RgbImage::from_raw(width, height, buf).map(image::DynamicImage::ImageRgb8)
        }
        Object::Name(cs) if cs == b"DeviceGray" => {
            let len = (width * height) as usize;
            let buf = samples.get(..len)?.to_vec();
            image::GrayImage::from_raw(width, height, buf).map(image::DynamicImage::ImageLuma8)
        }
        _ => None,
    }
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|obj| match obj {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn has_predictor(dict: &Dictionary) -> bool {
    let parms = match dict.get(b"DecodeParms") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Array(arr)) => match arr.first() {
            Some(Object::Dictionary(d)) => d.clone(),
            _ => return false,
        },
        _ => return false,
    };
    matches!(
        parms.get(b"Predictor").ok().and_then(object_number),
        Some(p) if p > 1.0
    )
}

// -- Drawing ------------------------------------------------------------------

/// An image XObject paints the unit square through the CTM; draw its
/// axis-aligned bounding box scaled into canvas space.
fn draw_image(canvas: &mut RgbaImage, decoded: &image::DynamicImage, ctm: &Matrix, map: &PageMap) {
    let corners = [
        ctm.apply(0.0, 0.0),
        ctm.apply(1.0, 0.0),
        ctm.apply(0.0, 1.0),
        ctm.apply(1.0, 1.0),
    ];

    let canvas_pts: Vec<(f32, f32)> = corners
        .iter()
        .map(|(x, y)| map.to_canvas(*x, *y))
        .collect();

    let min_x = canvas_pts.iter().map(|p| p.0).fold(f32::MAX, f32::min);
    let max_x = canvas_pts.iter().map(|p| p.0).fold(f32::MIN, f32::max);
    let min_y = canvas_pts.iter().map(|p| p.1).fold(f32::MAX, f32::min);
    let max_y = canvas_pts.iter().map(|p| p.1).fold(f32::MIN, f32::max);

    let dest_w = (max_x - min_x).round() as i64;
    let dest_h = (max_y - min_y).round() as i64;
    if dest_w < 1 || dest_h < 1 {
        return;
    }

    let resized = decoded
        .resize_exact(dest_w as u32, dest_h as u32, FilterType::Lanczos3)
        .to_rgba8();
    image::imageops::overlay(canvas, &resized, min_x.round() as i64, min_y.round() as i64);
}
