// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Quire.

use thiserror::Error;

/// Top-level error type for all Quire operations.
#[derive(Debug, Error)]
pub enum QuireError {
    // -- Rendering errors --
    #[error("rendering resource allocation failed: {0}")]
    ResourceAllocation(String),

    #[error("page stream unreadable: {0}")]
    ParseFailed(String),

    #[error("page stream serialization failed: {0}")]
    SerializeFailed(String),

    /// Distinct from the other failures so callers can tell "nothing
    /// selected" apart from corruption.
    #[error("operation produced no pages: {0}")]
    EmptyResult(String),

    #[error("image processing failed: {0}")]
    ImageDecode(String),

    // -- Lookup / persistence --
    #[error("not found: {0}")]
    NotFound(String),

    #[error("persistence rejected: {0}")]
    Persistence(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Scheduling --
    #[error("background task failed: {0}")]
    Background(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, QuireError>;
