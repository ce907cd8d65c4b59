//! Ranking and truncation.

use crate::schema::Candidate;

/// Order by feasibility score, highest first, and keep the first `top_k`.
///
/// The sort is stable: candidates with equal scores keep the oracle's order.
/// `top_k` bounds are the caller's concern.
pub fn rank_and_limit(mut candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.feasibility_score().cmp(&a.feasibility_score()));
    candidates.truncate(top_k);
    candidates
}
