// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// quire-engine — Orchestration layer of the Quire document engine.
//
// Coordinates the composer, thumbnail renderer, and editing session against
// the record and blob stores: building previews from attachments, merging
// page subsets into new documents, saving edits in place, and resolving
// collision-free titles. A background worker publishes completed results to
// the presentation layer over channels.

pub mod assembler;
pub mod titles;
pub mod worker;

pub use assembler::DocumentAssembler;
pub use quire_document::MergeInput;
pub use titles::resolve_unique_title;
pub use worker::{EngineCommand, EngineUpdate, spawn_worker};
