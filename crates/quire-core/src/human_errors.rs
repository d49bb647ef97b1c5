// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the presentation layer.
//
// Every technical error is mapped to plain English with a clear suggestion.

use crate::error::QuireError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth trying again — a transient resource problem.
    Transient,
    /// The user must pick something else or change their selection.
    ActionRequired,
    /// Cannot be fixed by retrying — corrupt input, unsupported content.
    Permanent,
}

/// A human-readable error with a plain English message and suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert a `QuireError` into a `HumanError` suitable for direct display.
pub fn humanize_error(err: &QuireError) -> HumanError {
    match err {
        QuireError::ResourceAllocation(_) | QuireError::Background(_) => HumanError {
            message: "The document couldn't be rendered right now.".into(),
            suggestion: "Close other apps to free memory, then try again.".into(),
            severity: Severity::Transient,
        },

        QuireError::ParseFailed(_) => HumanError {
            message: "This document can't be opened.".into(),
            suggestion: "The file may be damaged. Try re-adding it from its original source.".into(),
            severity: Severity::Permanent,
        },

        QuireError::SerializeFailed(_) => HumanError {
            message: "Your changes couldn't be written out.".into(),
            suggestion: "Try saving again. If it keeps failing, share the pages into a new document.".into(),
            severity: Severity::Transient,
        },

        QuireError::EmptyResult(_) => HumanError {
            message: "There are no pages to work with.".into(),
            suggestion: "Select at least one page, then try again.".into(),
            severity: Severity::ActionRequired,
        },

        QuireError::ImageDecode(_) => HumanError {
            message: "This image can't be read.".into(),
            suggestion: "Try exporting it as PNG or JPEG and adding it again.".into(),
            severity: Severity::Permanent,
        },

        QuireError::NotFound(detail) => HumanError {
            message: "That document is missing.".into(),
            suggestion: format!("It may have been deleted. ({detail})"),
            severity: Severity::Permanent,
        },

        QuireError::Persistence(_) | QuireError::Database(_) | QuireError::Io(_) => HumanError {
            message: "Your document couldn't be saved.".into(),
            suggestion: "Check that there is free storage space, then try again.".into(),
            severity: Severity::Transient,
        },

        QuireError::Serialization(_) => HumanError {
            message: "Something went wrong preparing your document.".into(),
            suggestion: "Try the operation again.".into(),
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_asks_for_a_selection() {
        let err = QuireError::EmptyResult("no pages selected".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("Select"));
    }

    #[test]
    fn parse_failure_is_permanent() {
        let err = QuireError::ParseFailed("bad xref".into());
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }
}
