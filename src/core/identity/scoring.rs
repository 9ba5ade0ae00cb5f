// src/core/identity/scoring.rs
//! Maps comparator distances onto a `[0, 1]` similarity score and decides
//! approval.

use crate::core::identity::types::MatchResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePolicy {
    /// Distance at (and beyond) which the score is zero.
    pub distance_threshold: f64,
    /// Minimum normalized score for approval.
    pub approval_cutoff: f64,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            distance_threshold: 0.6,
            approval_cutoff: 0.8,
        }
    }
}

impl ScorePolicy {
    pub fn new(distance_threshold: f64, approval_cutoff: f64) -> Self {
        Self {
            distance_threshold,
            approval_cutoff,
        }
    }

    /// `clamp(1 - distance / threshold, 0, 1)`. NaN distances score zero.
    pub fn normalize(&self, raw_distance: f64) -> f64 {
        let score = 1.0 - raw_distance / self.distance_threshold;
        if score.is_nan() {
            return 0.0;
        }
        score.clamp(0.0, 1.0)
    }

    pub fn is_approved(&self, normalized_score: f64) -> bool {
        normalized_score >= self.approval_cutoff
    }

    pub fn evaluate(&self, raw_distance: f64) -> MatchResult {
        let normalized_score = self.normalize(raw_distance);
        MatchResult {
            raw_distance,
            normalized_score,
            approved: self.is_approved(normalized_score),
        }
    }
}
