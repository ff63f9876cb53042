//! Reviewer-enumeration strategy under the source's result cap.
//!
//! The source truncates any filtered view at a fixed ceiling (observed
//! around 5400 results) regardless of the true count, so naively paging
//! "all raters of book B" silently loses data for popular books. A
//! [`ReviewPlan`] approximates full enumeration instead:
//!
//! - Rigor level 1 partitions the rating space by star value and issues one
//!   independently-capped sub-query per star (1..=5), multiplying effective
//!   coverage roughly five-fold.
//! - Rigor level 2 adds a dictionary-driven review-text search for books
//!   whose rating count exceeds the configured trigger, bounded by a
//!   2-minute wall-clock budget.
//! - Level n > 2 is level 2 with an n-minute budget.
//! - Level 0 would only surface the most recent raters, defeating the
//!   enumeration goal, and is rejected outright.
//!
//! Sub-query and word order must not affect the final deduplicated reviewer
//! set; only the wall-clock spent on the dictionary pass is order-sensitive.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::RigorThresholds;

/// Star values used to partition the rating space.
const STAR_VALUES: [u8; 5] = [1, 2, 3, 4, 5];

/// Errors from plan construction.
#[derive(Debug, Error)]
pub enum RigorError {
    /// Rigor level 0 is explicitly unsupported for reviewer enumeration.
    #[error(
        "rigor level 0 only surfaces the most recent raters and is unsupported; use level 1 or higher"
    )]
    UnsupportedLevel,
}

/// The dictionary-search fallback leg of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryPass {
    /// Wall-clock ceiling for the whole pass. Words still pending when the
    /// budget elapses are skipped; partial coverage is accepted.
    pub budget: Duration,
}

/// A query plan for enumerating one book's reviewers at a rigor level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPlan {
    /// Star-filtered sub-queries, one per star value.
    pub star_filters: Vec<u8>,
    /// The dictionary pass, when the rigor level and rating count call
    /// for it.
    pub dictionary: Option<DictionaryPass>,
}

impl ReviewPlan {
    /// Builds the plan for `level` against a book with `ratings_count`
    /// total ratings.
    ///
    /// # Errors
    ///
    /// Returns [`RigorError::UnsupportedLevel`] for level 0.
    pub fn build(
        level: u32,
        ratings_count: Option<u64>,
        thresholds: &RigorThresholds,
    ) -> Result<Self, RigorError> {
        if level == 0 {
            return Err(RigorError::UnsupportedLevel);
        }

        let dictionary = if level >= 2
            && ratings_count.unwrap_or(0) > thresholds.dictionary_trigger
        {
            Some(DictionaryPass {
                budget: thresholds.budget_per_level * level,
            })
        } else {
            None
        };

        debug!(
            level,
            ratings_count,
            dictionary = dictionary.is_some(),
            "review plan built"
        );

        Ok(Self {
            star_filters: STAR_VALUES.to_vec(),
            dictionary,
        })
    }
}

/// Loads a plain newline-delimited word list, skipping blank lines.
///
/// # Errors
///
/// Returns the underlying IO error when the file cannot be read.
pub fn load_dictionary(path: &Path) -> std::io::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    let words: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    debug!(path = %path.display(), words = words.len(), "dictionary loaded");
    Ok(words)
}
