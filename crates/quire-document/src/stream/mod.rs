// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editing session over one page stream.
//
// State machine: Unloaded → Loaded → Mutated → Loaded. `open` is the only
// way to obtain a session, so a stream that fails to parse never becomes
// mutable (the terminal LoadFailed state is the `Err` of `open`). Every
// structural mutation rebuilds through the canonical byte form — the
// in-memory page graph is never trusted as persisted truth; it is
// serialized and reparsed before the mutation is considered complete. When
// that round-trip fails the mutated in-memory pages are kept as a degraded
// fallback and the session is flagged not-serializable.

pub(crate) mod graph;
pub mod merge;

use std::collections::HashMap;

use lopdf::{Document, ObjectId};
use quire_core::error::Result;
use quire_core::{EngineConfig, PageSelection, QuireError};
use tracing::{debug, info, instrument, warn};

use crate::compose::PageComposer;
use graph::{DocumentBuilder, serialize, sorted_page_ids};

/// A loaded page stream plus the mutations defined on it.
///
/// Owns its stream exclusively: all mutations take `&mut self`, so the
/// single-writer discipline required for structural edits is enforced by the
/// borrow checker rather than by convention.
#[derive(Debug)]
pub struct EditSession {
    /// The parsed page graph, kept in sync with `bytes` by `rebuild`.
    doc: Document,
    /// Canonical serialized form of `doc` as of the last successful rebuild.
    bytes: Vec<u8>,
    /// Page object ids in reading order.
    pages: Vec<ObjectId>,
    /// Cleared when a rebuild fails to round-trip; `commit` restores it.
    serializable: bool,
    composer: PageComposer,
}

impl EditSession {
    // -- Construction ---------------------------------------------------------

    /// Open a session over existing page-stream bytes.
    ///
    /// A stream that fails to parse leaves no session behind — the error is
    /// terminal for this open attempt and the caller reports it.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn open(bytes: Vec<u8>, config: &EngineConfig) -> Result<Self> {
        let doc = Document::load_mem(&bytes)
            .map_err(|err| QuireError::ParseFailed(format!("cannot open stream: {err}")))?;
        let pages = sorted_page_ids(&doc);

        info!(pages = pages.len(), "Editing session opened");

        Ok(Self {
            doc,
            bytes,
            pages,
            serializable: true,
            composer: PageComposer::new(config.clone()),
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Authoritative page count.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Canonical bytes as of the last successful rebuild or commit.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// False while the session holds mutated pages that failed to round-trip
    /// through the canonical form.
    pub fn is_serializable(&self) -> bool {
        self.serializable
    }

    // -- Mutations ------------------------------------------------------------

    /// Delete the selected pages.
    ///
    /// Indices are processed in descending order so removal does not shift
    /// not-yet-processed indices; out-of-range indices are silently ignored.
    /// The caller must clear its selection afterwards; indices are not
    /// translated across the delete.
    #[instrument(skip(self), fields(selected = selection.len(), pages = self.pages.len()))]
    pub fn delete_pages(&mut self, selection: &PageSelection) -> Result<()> {
        if selection.is_empty() {
            return Ok(());
        }

        let mut kept = self.pages.clone();
        let mut removed = 0usize;
        for index in selection.descending() {
            if index < kept.len() {
                kept.remove(index);
                removed += 1;
            }
        }

        if removed == 0 {
            debug!("All selected indices out of range, nothing deleted");
            return Ok(());
        }

        info!(removed, remaining = kept.len(), "Deleting pages");
        self.rebuild_from_ids(&kept)
    }

    /// Append one page rendered from plain text.
    ///
    /// Whitespace-only input is a no-op (returns `false`). The text page is
    /// produced through the composer's byte form and parsed back (it must
    /// round-trip to exactly one page), then appended and rebuilt.
    #[instrument(skip_all, fields(text_len = text.len()))]
    pub fn insert_text_page(&mut self, text: &str) -> Result<bool> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("Ignoring empty text page");
            return Ok(false);
        }

        let page_bytes = self.composer.text_page(trimmed)?;
        let rendered = Document::load_mem(&page_bytes)
            .map_err(|err| QuireError::ParseFailed(format!("text page did not parse: {err}")))?;
        let rendered_pages = sorted_page_ids(&rendered);
        if rendered_pages.len() != 1 {
            return Err(QuireError::ParseFailed(format!(
                "text page rendered to {} pages, expected 1",
                rendered_pages.len()
            )));
        }

        info!(pages = self.pages.len() + 1, "Appending text page");
        self.rebuild_with_appended(&rendered, rendered_pages[0])
    }

    /// Build a brand-new stream containing only the selected pages, in
    /// ascending order, each page deep-copied so this stream is untouched.
    #[instrument(skip(self), fields(selected = selection.len()))]
    pub fn extract_subset(&self, selection: &PageSelection) -> Result<Vec<u8>> {
        let chosen: Vec<ObjectId> = selection
            .ascending()
            .filter(|index| *index < self.pages.len())
            .map(|index| self.pages[index])
            .collect();

        if chosen.is_empty() {
            return Err(QuireError::EmptyResult(
                "no pages selected for extraction".into(),
            ));
        }

        let mut builder = DocumentBuilder::new();
        let mut cache = HashMap::new();
        for id in &chosen {
            builder.append_cloned_page(&self.doc, *id, &mut cache)?;
        }

        let bytes = builder.finish()?;
        if bytes.is_empty() {
            return Err(QuireError::EmptyResult(
                "extracted subset serialized to zero bytes".into(),
            ));
        }

        debug!(pages = chosen.len(), bytes = bytes.len(), "Subset extracted");
        Ok(bytes)
    }

    /// Serialize the current pages into fresh canonical bytes.
    #[instrument(skip(self), fields(pages = self.pages.len()))]
    pub fn commit(&mut self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(QuireError::EmptyResult("stream has no pages".into()));
        }

        let mut builder = DocumentBuilder::new();
        let mut cache = HashMap::new();
        for id in &self.pages {
            builder.append_cloned_page(&self.doc, *id, &mut cache)?;
        }

        let mut rebuilt = builder.into_document();
        let bytes = serialize(&mut rebuilt)?;
        if bytes.is_empty() {
            return Err(QuireError::EmptyResult(
                "stream serialized to zero bytes".into(),
            ));
        }

        // Refresh the canonical pair from the just-serialized form.
        if let Ok(parsed) = Document::load_mem(&bytes) {
            self.pages = sorted_page_ids(&parsed);
            self.doc = parsed;
        } else {
            self.pages = sorted_page_ids(&rebuilt);
            self.doc = rebuilt;
        }
        self.bytes = bytes.clone();
        self.serializable = true;

        info!(bytes = bytes.len(), "Session committed");
        Ok(bytes)
    }

    // -- Rebuild --------------------------------------------------------------

    fn rebuild_from_ids(&mut self, kept: &[ObjectId]) -> Result<()> {
        let mut builder = DocumentBuilder::new();
        let mut cache = HashMap::new();
        for id in kept {
            builder.append_cloned_page(&self.doc, *id, &mut cache)?;
        }
        self.install_rebuilt(builder);
        Ok(())
    }

    fn rebuild_with_appended(
        &mut self,
        extra_source: &Document,
        extra_page: ObjectId,
    ) -> Result<bool> {
        let mut builder = DocumentBuilder::new();
        let mut cache = HashMap::new();
        for id in &self.pages {
            builder.append_cloned_page(&self.doc, *id, &mut cache)?;
        }
        let mut extra_cache = HashMap::new();
        builder.append_cloned_page(extra_source, extra_page, &mut extra_cache)?;
        self.install_rebuilt(builder);
        Ok(true)
    }

    /// Serialize the rebuilt document and reparse it into the new canonical
    /// pair. If the round-trip fails, the mutated in-memory pages stay
    /// authoritative (degraded, not lost) and the previous canonical bytes
    /// remain the last good serialized form.
    fn install_rebuilt(&mut self, builder: DocumentBuilder) {
        let mut rebuilt = builder.into_document();

        match serialize(&mut rebuilt) {
            Ok(bytes) if !bytes.is_empty() => match Document::load_mem(&bytes) {
                Ok(parsed) => {
                    self.pages = sorted_page_ids(&parsed);
                    self.doc = parsed;
                    self.bytes = bytes;
                    self.serializable = true;
                    debug!(pages = self.pages.len(), "Rebuild round-trip complete");
                    return;
                }
                Err(err) => {
                    warn!(%err, "Rebuilt stream failed to reparse, keeping in-memory pages");
                }
            },
            Ok(_) => warn!("Rebuilt stream serialized to zero bytes, keeping in-memory pages"),
            Err(err) => warn!(%err, "Rebuilt stream failed to serialize, keeping in-memory pages"),
        }

        self.pages = sorted_page_ids(&rebuilt);
        self.doc = rebuilt;
        self.serializable = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use quire_core::EngineConfig;

    fn open_session(pages: usize) -> EditSession {
        EditSession::open(testutil::sample_stream(pages), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn open_rejects_garbage() {
        let err = EditSession::open(b"garbage".to_vec(), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, QuireError::ParseFailed(_)));
    }

    #[test]
    fn delete_removes_selected_pages_in_order() {
        let mut session = open_session(5);
        let selection: PageSelection = [1, 3].into_iter().collect();

        session.delete_pages(&selection).unwrap();

        assert_eq!(session.page_count(), 3);
        assert!(session.is_serializable());
        // The canonical bytes reparse to the same count.
        let doc = Document::load_mem(session.bytes()).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn delete_out_of_range_changes_nothing() {
        let mut session = open_session(2);
        let before = session.bytes().to_vec();
        let selection: PageSelection = [7, 12].into_iter().collect();

        session.delete_pages(&selection).unwrap();

        assert_eq!(session.page_count(), 2);
        assert_eq!(session.bytes(), &before[..]);
    }

    #[test]
    fn delete_mixed_range_removes_only_valid_indices() {
        let mut session = open_session(3);
        let selection: PageSelection = [0, 9].into_iter().collect();

        session.delete_pages(&selection).unwrap();
        assert_eq!(session.page_count(), 2);
    }

    #[test]
    fn delete_all_pages_yields_empty_stream() {
        let mut session = open_session(2);
        let selection: PageSelection = [0, 1].into_iter().collect();

        session.delete_pages(&selection).unwrap();
        assert_eq!(session.page_count(), 0);

        let err = session.commit().unwrap_err();
        assert!(matches!(err, QuireError::EmptyResult(_)));
    }

    #[test]
    fn insert_text_page_appends_exactly_one_page() {
        let mut session = open_session(2);
        let inserted = session.insert_text_page("meeting notes").unwrap();

        assert!(inserted);
        assert_eq!(session.page_count(), 3);
        let doc = Document::load_mem(session.bytes()).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn insert_blank_text_is_a_noop() {
        let mut session = open_session(2);
        let inserted = session.insert_text_page("   \n\t ").unwrap();

        assert!(!inserted);
        assert_eq!(session.page_count(), 2);
    }

    #[test]
    fn extract_subset_leaves_source_untouched() {
        let session = open_session(4);
        let selection: PageSelection = [0, 2].into_iter().collect();

        let subset = session.extract_subset(&selection).unwrap();
        let subset_doc = Document::load_mem(&subset).unwrap();

        assert_eq!(subset_doc.get_pages().len(), 2);
        assert_eq!(session.page_count(), 4);
    }

    #[test]
    fn extract_empty_selection_is_empty_result() {
        let session = open_session(3);
        let err = session.extract_subset(&PageSelection::new()).unwrap_err();
        assert!(matches!(err, QuireError::EmptyResult(_)));
    }

    #[test]
    fn commit_round_trips_page_count() {
        let mut session = open_session(3);
        let bytes = session.commit().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), session.page_count());
    }

    #[test]
    fn mutation_sequence_stays_consistent() {
        let mut session = open_session(4);

        session
            .delete_pages(&[3].into_iter().collect::<PageSelection>())
            .unwrap();
        session.insert_text_page("appendix").unwrap();

        assert_eq!(session.page_count(), 4);
        let committed = session.commit().unwrap();
        assert_eq!(Document::load_mem(&committed).unwrap().get_pages().len(), 4);
    }
}
