//! Result aggregator: k-nearest majority vote over the shard outputs.

use crate::utils::types::{CandidateScore, PositionEstimate};
use log::debug;

/// Concatenate shard outputs in shard order and vote over the first `k`
/// candidates.
///
/// The label with the most votes wins. On a tie the label of the first
/// concatenated candidate is preferred; between other tied labels the one
/// seen first wins, so the outcome never depends on hashing order. Returns
/// [`PositionEstimate::not_found`] when no shard produced a candidate.
pub fn majority_vote(shard_results: &[Vec<CandidateScore>], k: usize) -> PositionEstimate {
    let ranked: Vec<&CandidateScore> = shard_results.iter().flatten().collect();
    let Some(first) = ranked.first() else {
        return PositionEstimate::not_found();
    };

    let nearest = &ranked[..k.min(ranked.len())];
    debug!(
        "top-{} candidates: {:?}",
        k,
        nearest.iter().map(|c| (c.record_id, c.label.as_str(), c.ratio)).collect::<Vec<_>>()
    );

    // (label, votes) in order of first appearance
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for candidate in nearest {
        match tally.iter_mut().find(|(label, _)| *label == candidate.label) {
            | Some((_, votes)) => *votes += 1,
            | None => tally.push((candidate.label.as_str(), 1)),
        }
    }

    let mut best: (&str, usize) = (PositionEstimate::NOT_FOUND, 0);
    for (label, votes) in tally {
        if votes > best.1 || (votes == best.1 && label == first.label) {
            best = (label, votes);
        }
    }

    PositionEstimate { label: best.0.to_string(), vote_count: best.1 }
}
