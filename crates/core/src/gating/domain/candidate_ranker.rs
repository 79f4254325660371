//! Turns raw detections into a single selected face, or an early rejection.
//!
//! Detections are ordered by area (largest first). When the two largest are
//! close in size the frame is ambiguous; otherwise each candidate is scored
//! by `area_norm * center_weight * confidence` and the best one wins.

use crate::detection::domain::detection_record::DetectionRecord;

/// A detection under consideration, with its selection score in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub detection: DetectionRecord,
    pub selection_score: f64,
}

/// Result of ranking one frame's detections.
#[derive(Clone, Debug, PartialEq)]
pub enum Ranking {
    NoFace,
    /// The second-largest face is too close in size to the largest.
    Ambiguous {
        face_count: usize,
        largest: DetectionRecord,
    },
    Selected {
        candidate: Candidate,
        /// Every candidate in area-descending order, including the selected one.
        candidates: Vec<Candidate>,
    },
}

/// Stateless single-pass ranker.
#[derive(Clone, Copy, Debug)]
pub struct CandidateRanker {
    ambiguity_ratio: f64,
}

impl CandidateRanker {
    pub fn new(ambiguity_ratio: f64) -> Self {
        Self { ambiguity_ratio }
    }

    pub fn rank(
        &self,
        mut detections: Vec<DetectionRecord>,
        frame_width: u32,
        frame_height: u32,
    ) -> Ranking {
        if detections.is_empty() {
            return Ranking::NoFace;
        }

        // Stable: equal areas keep detector order.
        detections.sort_by(|a, b| b.area().cmp(&a.area()));

        if self.is_ambiguous(&detections) {
            return Ranking::Ambiguous {
                face_count: detections.len(),
                largest: detections[0].clone(),
            };
        }

        let candidates: Vec<Candidate> = detections
            .into_iter()
            .map(|detection| Candidate {
                selection_score: selection_score(&detection, frame_width, frame_height),
                detection,
            })
            .collect();

        let mut best = 0;
        for (i, c) in candidates.iter().enumerate().skip(1) {
            if c.selection_score > candidates[best].selection_score {
                best = i;
            }
        }

        Ranking::Selected {
            candidate: candidates[best].clone(),
            candidates,
        }
    }

    /// Expects `sorted` in area-descending order.
    fn is_ambiguous(&self, sorted: &[DetectionRecord]) -> bool {
        match sorted {
            [largest, second, ..] => {
                second.area() as f64 >= self.ambiguity_ratio * largest.area() as f64
            }
            _ => false,
        }
    }
}

/// `area_norm * center_weight * confidence`.
///
/// `center_weight` falls off linearly from 1.0 at the frame center to 0.0 at
/// half the frame diagonal.
pub fn selection_score(detection: &DetectionRecord, frame_width: u32, frame_height: u32) -> f64 {
    let fw = frame_width as f64;
    let fh = frame_height as f64;

    let area_norm = detection.area() as f64 / (fw * fh);

    let (cx, cy) = detection.bbox.center();
    let dist = ((cx - fw / 2.0).powi(2) + (cy - fh / 2.0).powi(2)).sqrt();
    let max_dist = (fw * fw + fh * fh).sqrt() / 2.0;
    let center_weight = 1.0 - dist / max_dist;

    area_norm * center_weight * detection.confidence as f64
}
