// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Quire document engine.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short prefix used in generated display titles.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user-supplied input to a document build.
///
/// Immutable once constructed; owned by the caller for the duration of a
/// single composition call. Each variant's renderer is selected by match in
/// the page composer.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// An encoded raster image (PNG/JPEG bytes) with its declared pixel size.
    Image {
        data: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// An existing paginated document (page-stream bytes) and the display
    /// name used in degradation captions.
    Document { name: String, data: Vec<u8> },
    /// A file the engine cannot convert; rendered as a caption page.
    Unsupported { name: String },
}

impl Attachment {
    pub fn image(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::Image {
            data,
            width,
            height,
        }
    }

    pub fn document(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Document {
            name: name.into(),
            data,
        }
    }

    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::Unsupported { name: name.into() }
    }
}

/// Persisted metadata for one document.
///
/// Records are replaced wholesale on save: a new value with the same id, a
/// later timestamp, and a new thumbnail/location supersedes the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub title: String,
    pub extension: String,
    pub created_at: DateTime<Utc>,
    /// Encoded raster preview of the first page; empty when unavailable.
    pub thumbnail: Vec<u8>,
    /// Where the page-stream bytes live (blob store location).
    pub location: PathBuf,
}

/// A set of 0-based page indices selected in an editing session.
///
/// Valid only until the owning stream mutates in a way that shifts indices;
/// after any deletion the caller must clear the selection — the engine does
/// not translate indices across a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection(BTreeSet<usize>);

impl PageSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize) {
        self.0.insert(index);
    }

    pub fn toggle(&mut self, index: usize) {
        if !self.0.remove(&index) {
            self.0.insert(index);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indices low to high, the order for subset extraction.
    pub fn ascending(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Indices high to low, the order for deletion, so that removal does not
    /// invalidate not-yet-processed indices.
    pub fn descending(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().rev().copied()
    }
}

impl FromIterator<usize> for PageSelection {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which pages of a merge source participate in the result.
#[derive(Debug, Clone)]
pub enum SubsetSpec {
    /// Every page, in reading order.
    All,
    /// The selected pages only, ascending.
    Pages(PageSelection),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_orders() {
        let sel: PageSelection = [4, 0, 2].into_iter().collect();
        assert_eq!(sel.ascending().collect::<Vec<_>>(), vec![0, 2, 4]);
        assert_eq!(sel.descending().collect::<Vec<_>>(), vec![4, 2, 0]);
    }

    #[test]
    fn selection_toggle() {
        let mut sel = PageSelection::new();
        sel.toggle(3);
        assert!(sel.contains(3));
        sel.toggle(3);
        assert!(sel.is_empty());
    }

    #[test]
    fn document_id_short_is_stable_prefix() {
        let id = DocumentId::new();
        let short = id.short();
        assert_eq!(short.len(), 8);
        assert!(id.0.simple().to_string().starts_with(&short));
    }
}
