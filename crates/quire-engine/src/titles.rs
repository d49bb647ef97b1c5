// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collision-free title derivation against the record store.

use std::collections::HashSet;
use std::sync::Arc;

use quire_core::QuireError;
use quire_core::error::Result;
use quire_storage::RecordStore;
use tracing::debug;

/// Resolve `candidate` against the titles currently in the store.
///
/// The title set is fetched fresh on every call — no caching across calls —
/// and no lock is held between resolution and persistence, so two racing
/// callers working from the same snapshot can mint the same disambiguated
/// title. That race is documented, accepted behaviour.
pub async fn resolve_unique_title(
    records: Arc<dyn RecordStore>,
    candidate: String,
) -> Result<String> {
    let titles = tokio::task::spawn_blocking(move || records.list_titles())
        .await
        .map_err(|err| QuireError::Background(err.to_string()))??;

    let resolved = disambiguate(&candidate, &titles.into_iter().collect());
    if resolved != candidate {
        debug!(candidate = %candidate, resolved = %resolved, "Title disambiguated");
    }
    Ok(resolved)
}

/// Append the copy suffix, counting up until the title is free.
pub(crate) fn disambiguate(candidate: &str, existing: &HashSet<String>) -> String {
    if !existing.contains(candidate) {
        return candidate.to_owned();
    }

    let mut counter = 0usize;
    loop {
        let attempt = if counter == 0 {
            format!("{candidate} (копия)")
        } else {
            format!("{candidate} (копия {counter})")
        };
        if !existing.contains(&attempt) {
            return attempt;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(titles: &[&str]) -> HashSet<String> {
        titles.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn absent_candidate_is_returned_unchanged() {
        assert_eq!(disambiguate("A", &set(&[])), "A");
        assert_eq!(disambiguate("A", &set(&["B", "C"])), "A");
    }

    #[test]
    fn first_collision_appends_copy_suffix() {
        assert_eq!(disambiguate("A", &set(&["A"])), "A (копия)");
    }

    #[test]
    fn counter_increments_past_taken_suffixes() {
        assert_eq!(disambiguate("A", &set(&["A", "A (копия)"])), "A (копия 1)");
        assert_eq!(
            disambiguate("A", &set(&["A", "A (копия)", "A (копия 1)"])),
            "A (копия 2)"
        );
    }
}
