//! Similarity and ranking computation over the entity store's contents.
//!
//! A consumer-level layer: given the target user's authors-read set and each
//! candidate's, it computes a commonality percentage and a match score.
//! Candidates with a private profile or an empty/unknown library are
//! non-comparable and excluded before any division happens.

use std::collections::HashSet;

use tracing::debug;

use crate::model::User;

/// Integer round-half-up of `numerator / denominator`.
///
/// Callers must guard `denominator != 0`.
#[allow(clippy::cast_possible_truncation)]
fn round_half_up(numerator: u64, denominator: u64) -> u32 {
    ((numerator * 2 + denominator) / (denominator * 2)) as u32
}

/// Percentage of the target's authors the candidate shares, rounded half-up.
///
/// A target with zero authors yields 0 (callers normally reject that run
/// earlier as a precondition violation).
#[must_use]
pub fn commonality_pct(common_authors: usize, target_authors: usize) -> u32 {
    if target_authors == 0 {
        return 0;
    }
    round_half_up(common_authors as u64 * 100, target_authors as u64)
}

/// Match score: shared authors per thousand books of the candidate's
/// library, rounded half-up. `None` when the library size is zero — the
/// candidate is non-comparable, not an error.
#[must_use]
pub fn match_score(common_authors: usize, library_size: u64) -> Option<u32> {
    if library_size == 0 {
        return None;
    }
    Some(round_half_up(common_authors as u64 * 1000, library_size))
}

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedCandidate {
    /// The candidate's user ID.
    pub user_id: u64,
    /// Authors shared with the target.
    pub common_authors: u64,
    /// Commonality percentage against the target's author set.
    pub commonality_pct: u32,
    /// Match score against the candidate's library size.
    pub match_score: u32,
}

/// Ranks candidates against the target's authors-read set.
///
/// Private users and users with an empty or unknown library are excluded.
/// The result is sorted by match score descending, with user ID as a
/// deterministic tie-break.
#[must_use]
pub fn rank(
    target_authors: &HashSet<u64>,
    candidates: &[(User, HashSet<u64>)],
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .filter_map(|(user, authors)| {
            if user.private {
                debug!(user_id = user.id, "excluding private user from ranking");
                return None;
            }
            let library_size = user.library_size.unwrap_or(0);
            let common = authors.intersection(target_authors).count();
            let score = match_score(common, library_size)?;
            Some(RankedCandidate {
                user_id: user.id,
                common_authors: common as u64,
                commonality_pct: commonality_pct(common, target_authors.len()),
                match_score: score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    ranked
}
