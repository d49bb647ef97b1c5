// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// quire-document — Page-stream processing for the Quire document engine.
//
// Provides attachment composition (images, existing documents, and
// unsupported-file placeholders rendered onto uniform pages), the editing
// session state machine (delete, insert synthesized text pages, extract
// subsets, commit — always rebuilding through the canonical byte form), and
// first-page thumbnail rendering.

pub mod compose;
pub mod stream;
pub mod thumbnail;

// Re-export the primary types so callers can use `quire_document::PageComposer` etc.
pub use compose::PageComposer;
pub use stream::merge::{MergeInput, merge_streams};
pub use stream::EditSession;
pub use thumbnail::{ThumbnailFormat, ThumbnailRenderer};

#[cfg(test)]
pub(crate) mod testutil;
