// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// quire-storage — Local persistence collaborators for the Quire engine.
//
// The engine talks to two narrow interfaces: a record store for document
// metadata and a blob store for page-stream bytes. Both are in-process and
// synchronous; in an async context, wrap calls in
// `tokio::task::spawn_blocking`.

pub mod blobs;
pub mod records;

pub use blobs::{BlobStore, FileStorage};
pub use records::{RecordStore, SqliteRecordStore};
