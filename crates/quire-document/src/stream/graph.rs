// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lopdf object-graph plumbing shared by the composer, the editing session,
// and the merge path: deep-copying pages between documents, wrapping source
// pages as Form XObjects, and finalizing freshly built documents.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use quire_core::QuireError;
use quire_core::error::Result;
use quire_core::geometry::RectPt;
use tracing::warn;

/// Fallback page box when a source page carries no resolvable MediaBox.
const DEFAULT_PAGE_BOX: RectPt = RectPt::new(0.0, 0.0, 612.0, 792.0);

/// Page object ids in reading order.
pub(crate) fn sorted_page_ids(doc: &Document) -> Vec<ObjectId> {
    // get_pages() is keyed by 1-indexed page number, so iteration order is
    // reading order.
    doc.get_pages().into_values().collect()
}

/// Incrementally builds a fresh single-tree document from cloned or
/// hand-assembled pages, then finalizes the page tree, catalog, and trailer.
pub(crate) struct DocumentBuilder {
    doc: Document,
    pages_tree_id: ObjectId,
    kids: Vec<Object>,
}

impl DocumentBuilder {
    pub(crate) fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_tree_id = doc.new_object_id();
        Self {
            doc,
            pages_tree_id,
            kids: Vec::new(),
        }
    }

    pub(crate) fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub(crate) fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Deep-copy one page (and everything it references) out of `source` and
    /// append it. The source document is never modified.
    pub(crate) fn append_cloned_page(
        &mut self,
        source: &Document,
        page_id: ObjectId,
        cache: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<()> {
        let page_object = source.get_object(page_id).map_err(|err| {
            QuireError::ParseFailed(format!("cannot read page object {page_id:?}: {err}"))
        })?;

        let cloned = deep_copy_object(&mut self.doc, source, page_object, cache)?;
        let new_id = self.doc.add_object(cloned);

        if let Ok(Object::Dictionary(dict)) = self.doc.get_object_mut(new_id) {
            dict.set("Parent", Object::Reference(self.pages_tree_id));
        }

        self.kids.push(Object::Reference(new_id));
        Ok(())
    }

    /// Append a hand-assembled page dictionary (Contents/Resources/MediaBox
    /// already set). Type and Parent are filled in here.
    pub(crate) fn add_page(&mut self, mut page_dict: Dictionary) -> ObjectId {
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_tree_id));
        let id = self.doc.add_object(Object::Dictionary(page_dict));
        self.kids.push(Object::Reference(id));
        id
    }

    /// Install the page tree, catalog, and trailer Root, returning the
    /// completed document.
    pub(crate) fn into_document(mut self) -> Document {
        let count = self.kids.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_tree_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_tree_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        self.doc
    }

    /// Finalize and serialize in one step.
    pub(crate) fn finish(self) -> Result<Vec<u8>> {
        let mut doc = self.into_document();
        serialize(&mut doc)
    }
}

/// Serialize a document to its canonical byte form.
pub(crate) fn serialize(doc: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| QuireError::SerializeFailed(err.to_string()))?;
    Ok(output)
}

/// Deep-copy an object from `source` into `target`, following references.
///
/// Referenced objects are registered in `cache` before their bodies are
/// copied, so reference cycles (annotation back-links and the like) terminate.
/// `Parent` keys are skipped — they would drag the whole source page tree
/// along; callers patch Parent afterwards.
pub(crate) fn deep_copy_object(
    target: &mut Document,
    source: &Document,
    object: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match object {
        Object::Reference(ref_id) => {
            if let Some(&new_id) = cache.get(ref_id) {
                return Ok(Object::Reference(new_id));
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let new_id = target.new_object_id();
                    cache.insert(*ref_id, new_id);
                    let copied = deep_copy_object(target, source, referenced, cache)?;
                    target.objects.insert(new_id, copied);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                    Ok(Object::Null)
                }
            }
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                new_dict.set(key.clone(), deep_copy_object(target, source, value, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let mut new_arr = Vec::with_capacity(arr.len());
            for item in arr {
                new_arr.push(deep_copy_object(target, source, item, cache)?);
            }
            Ok(Object::Array(new_arr))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                new_dict.set(key.clone(), deep_copy_object(target, source, value, cache)?);
            }
            Ok(Object::Stream(Stream::new(new_dict, stream.content.clone())))
        }
        // Boolean, Integer, Real, String, Name, Null are trivially cloneable.
        other => Ok(other.clone()),
    }
}

/// Wrap one source page as a Form XObject in `target` so it can be placed on
/// an output page with a transformation. Returns the XObject id and the
/// source page box.
pub(crate) fn wrap_page_as_form(
    target: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<(ObjectId, RectPt)> {
    let page_dict = source.get_dictionary(page_id).map_err(|err| {
        QuireError::ParseFailed(format!("page {page_id:?} has no dictionary: {err}"))
    })?;

    let media_box = inherited_page_attr(source, page_id, b"MediaBox");
    let page_box = media_box
        .as_ref()
        .and_then(|obj| rect_from_media_box(source, obj))
        .unwrap_or(DEFAULT_PAGE_BOX);

    let content = page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(page_box.x),
            Object::Real(page_box.y),
            Object::Real(page_box.x + page_box.width),
            Object::Real(page_box.y + page_box.height),
        ]),
    );

    if let Some(resources) = inherited_page_attr(source, page_id, b"Resources") {
        let copied = deep_copy_object(target, source, &resources, cache)?;
        xobject_dict.set("Resources", copied);
    }

    Ok((
        target.add_object(Stream::new(xobject_dict, content)),
        page_box,
    ))
}

/// Concatenated, decompressed content stream data for a page.
pub(crate) fn page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()), // no content = blank page
    };

    match contents {
        Object::Reference(id) => single_content_stream(doc, *id),
        Object::Array(refs) => {
            let mut result = Vec::new();
            for obj in refs {
                if let Object::Reference(id) = obj {
                    result.extend_from_slice(&single_content_stream(doc, *id)?);
                    result.push(b'\n');
                }
            }
            Ok(result)
        }
        _ => Ok(Vec::new()),
    }
}

fn single_content_stream(doc: &Document, id: ObjectId) -> Result<Vec<u8>> {
    match doc.get_object(id).and_then(|obj| obj.as_stream()) {
        Ok(stream) => Ok(stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())),
        Err(_) => Ok(Vec::new()),
    }
}

/// Look up a page attribute, walking the Parent chain for inheritable keys
/// (MediaBox and Resources live on the Pages node in many real files).
pub(crate) fn inherited_page_attr(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..16 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current = *parent_id,
            _ => return None,
        }
    }
    None
}

/// Resolved page box of a page, falling back to US Letter when absent.
pub(crate) fn page_box(doc: &Document, page_id: ObjectId) -> RectPt {
    inherited_page_attr(doc, page_id, b"MediaBox")
        .as_ref()
        .and_then(|obj| rect_from_media_box(doc, obj))
        .unwrap_or(DEFAULT_PAGE_BOX)
}

fn rect_from_media_box(doc: &Document, obj: &Object) -> Option<RectPt> {
    let resolved = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let x0 = object_number(&arr[0])?;
    let y0 = object_number(&arr[1])?;
    let x1 = object_number(&arr[2])?;
    let y1 = object_number(&arr[3])?;
    Some(RectPt::new(x0, y0, x1 - x0, y1 - y0))
}

/// Numeric value of a PDF object.
pub(crate) fn object_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_parseable_empty_tree() {
        let bytes = DocumentBuilder::new().finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn object_number_reads_integers_and_reals() {
        assert_eq!(object_number(&Object::Integer(7)), Some(7.0));
        assert_eq!(object_number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(object_number(&Object::Null), None);
    }
}
