// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cross-stream merge: concatenate chosen pages from several page streams
// into one brand-new stream.

use std::collections::HashMap;

use lopdf::{Document, ObjectId};
use quire_core::error::Result;
use quire_core::{QuireError, SubsetSpec};
use tracing::{debug, instrument, warn};

use super::graph::{DocumentBuilder, sorted_page_ids};

/// One merge source: page-stream bytes plus the pages that participate.
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub data: Vec<u8>,
    pub selection: SubsetSpec,
}

impl MergeInput {
    pub fn all(data: Vec<u8>) -> Self {
        Self {
            data,
            selection: SubsetSpec::All,
        }
    }

    pub fn pages(data: Vec<u8>, selection: quire_core::PageSelection) -> Self {
        Self {
            data,
            selection: SubsetSpec::Pages(selection),
        }
    }
}

/// Concatenate the selected pages of each source, preserving ascending page
/// order within each source and source order across sources.
///
/// Sources that fail to parse are skipped with a warning; the merge fails
/// only when no pages survive at all, so partial output is never persisted.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn merge_streams(sources: &[MergeInput]) -> Result<Vec<u8>> {
    let mut builder = DocumentBuilder::new();

    for (index, source) in sources.iter().enumerate() {
        let doc = match Document::load_mem(&source.data) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(index, %err, "Merge source failed to parse, skipping");
                continue;
            }
        };

        let page_ids = sorted_page_ids(&doc);
        let chosen: Vec<ObjectId> = match &source.selection {
            SubsetSpec::All => page_ids,
            SubsetSpec::Pages(selection) => selection
                .ascending()
                .filter(|i| *i < page_ids.len())
                .map(|i| page_ids[i])
                .collect(),
        };

        let mut cache = HashMap::new();
        for id in chosen {
            builder.append_cloned_page(&doc, id, &mut cache)?;
        }
    }

    if builder.page_count() == 0 {
        return Err(QuireError::EmptyResult("merge produced no pages".into()));
    }

    let bytes = builder.finish()?;
    if bytes.is_empty() {
        return Err(QuireError::EmptyResult(
            "merged stream serialized to zero bytes".into(),
        ));
    }

    debug!(bytes = bytes.len(), "Merge complete");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::graph::{self, page_content};
    use crate::testutil;
    use quire_core::PageSelection;

    /// Content stream bytes of every page, in reading order.
    fn page_contents(bytes: &[u8]) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(bytes).unwrap();
        graph::sorted_page_ids(&doc)
            .into_iter()
            .map(|id| {
                let dict = doc.get_dictionary(id).unwrap().clone();
                page_content(&doc, &dict).unwrap()
            })
            .collect()
    }

    #[test]
    fn merge_preserves_selection_and_source_order() {
        let s1 = testutil::sample_stream(3);
        let s2 = testutil::sample_stream(2);

        let merged = merge_streams(&[
            MergeInput::pages(s1.clone(), [0, 2].into_iter().collect::<PageSelection>()),
            MergeInput::all(s2.clone()),
        ])
        .unwrap();

        let s1_pages = page_contents(&s1);
        let s2_pages = page_contents(&s2);
        let merged_pages = page_contents(&merged);

        assert_eq!(merged_pages.len(), 4);
        // Page content is preserved byte-for-byte by the deep copy, so the
        // result order is [S1p0, S1p2, S2p0, S2p1].
        assert_eq!(merged_pages[0], s1_pages[0]);
        assert_eq!(merged_pages[1], s1_pages[2]);
        assert_eq!(merged_pages[2], s2_pages[0]);
        assert_eq!(merged_pages[3], s2_pages[1]);
    }

    #[test]
    fn unparseable_source_is_skipped() {
        let good = testutil::sample_stream(2);
        let merged = merge_streams(&[
            MergeInput::all(b"junk".to_vec()),
            MergeInput::all(good),
        ])
        .unwrap();

        assert_eq!(page_contents(&merged).len(), 2);
    }

    #[test]
    fn merge_with_no_surviving_pages_fails() {
        let err = merge_streams(&[MergeInput::all(b"junk".to_vec())]).unwrap_err();
        assert!(matches!(err, QuireError::EmptyResult(_)));
    }

    #[test]
    fn out_of_range_selection_contributes_nothing() {
        let s1 = testutil::sample_stream(2);
        let merged = merge_streams(&[
            MergeInput::pages(s1.clone(), [5].into_iter().collect::<PageSelection>()),
            MergeInput::all(s1),
        ])
        .unwrap();
        assert_eq!(page_contents(&merged).len(), 2);
    }
}
