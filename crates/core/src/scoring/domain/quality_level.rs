use std::fmt;

use serde::Serialize;

/// Scores at or above this are [`QualityLevel::Good`].
pub const GOOD_THRESHOLD: f32 = 0.7;

/// Scores at or above this are acceptable for collection.
pub const ACCEPTABLE_THRESHOLD: f32 = 0.5;

/// Coarse bucket for a quality score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Poor,
    Acceptable,
    Good,
}

impl QualityLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= GOOD_THRESHOLD {
            QualityLevel::Good
        } else if score >= ACCEPTABLE_THRESHOLD {
            QualityLevel::Acceptable
        } else {
            QualityLevel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Poor => "poor",
            QualityLevel::Acceptable => "acceptable",
            QualityLevel::Good => "good",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `score` clears the collection threshold.
pub fn threshold_met(score: f32) -> bool {
    score >= ACCEPTABLE_THRESHOLD
}
