//! Mode-dependent diversity selection
//!
//! Thresholds apply to the normalized 0–1 score of each candidate.

use super::types::{CandidateTrack, Mode};

/// `strict` keeps only candidates at or above this score
pub const STRICT_MIN_SCORE: f64 = 0.5;
/// `normal` high bucket lower bound
pub const HIGH_MIN_SCORE: f64 = 0.3;
/// `normal` medium bucket lower bound
pub const MEDIUM_MIN_SCORE: f64 = 0.1;

/// Sort best-first: score, then tier trust, then insertion order (stable)
pub fn rank(mut candidates: Vec<CandidateTrack>) -> Vec<CandidateTrack> {
    candidates.sort_by(|a, b| b.tier.ranking(&a.tier));
    candidates
}

/// Select at most `limit` candidates from a ranked list
pub fn apply(ranked: Vec<CandidateTrack>, mode: Mode, limit: usize) -> Vec<CandidateTrack> {
    match mode {
        Mode::Strict => ranked
            .into_iter()
            .filter(|c| c.score() >= STRICT_MIN_SCORE)
            .take(limit)
            .collect(),
        Mode::Normal => {
            let (high_quota, medium_quota) = normal_quotas(limit);
            let mut high = Vec::with_capacity(high_quota);
            let mut medium = Vec::with_capacity(medium_quota);

            for candidate in ranked {
                let score = candidate.score();
                if score >= HIGH_MIN_SCORE {
                    if high.len() < high_quota {
                        high.push(candidate);
                    }
                } else if score >= MEDIUM_MIN_SCORE && medium.len() < medium_quota {
                    medium.push(candidate);
                }
            }

            high.extend(medium);
            high.truncate(limit);
            high
        }
        Mode::Diverse => ranked.into_iter().take(limit).collect(),
    }
}

/// `(floor(limit * 0.7), ceil(limit * 0.3))` in exact integer arithmetic
fn normal_quotas(limit: usize) -> (usize, usize) {
    let high = limit * 7 / 10;
    let medium = (limit * 3 + 9) / 10;
    (high, medium)
}
