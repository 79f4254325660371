use std::time::Duration;

use ndarray::Array4;
use serde::Serialize;

use super::acceptance::{GateStatus, Rejection};
use super::crop_geometry::CropResult;
use crate::detection::domain::detection_record::BoundingBox;

/// The externally visible result of gating one frame.
///
/// Fields are private so that a tensor can only exist on an `OK` outcome.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineOutcome {
    status: GateStatus,
    #[serde(skip)]
    tensor: Option<Array4<f32>>,
    face_confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    face_bbox: Option<BoundingBox>,
    message: String,
}

impl PipelineOutcome {
    pub fn accepted(face_confidence: f32, face_bbox: BoundingBox, tensor: Array4<f32>) -> Self {
        Self {
            status: GateStatus::Ok,
            tensor: Some(tensor),
            face_confidence,
            face_bbox: Some(face_bbox),
            message: "Face detected and preprocessed successfully".to_string(),
        }
    }

    pub fn rejected(
        rejection: Rejection,
        face_confidence: f32,
        face_bbox: Option<BoundingBox>,
    ) -> Self {
        debug_assert!(!rejection.status.is_ok());
        Self {
            status: rejection.status,
            tensor: None,
            face_confidence,
            face_bbox,
            message: rejection.message,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: GateStatus::Error,
            tensor: None,
            face_confidence: 0.0,
            face_bbox: None,
            message: message.into(),
        }
    }

    pub fn status(&self) -> GateStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    pub fn tensor(&self) -> Option<&Array4<f32>> {
        self.tensor.as_ref()
    }

    /// Moves the tensor out, leaving the rest of the outcome intact.
    pub fn take_tensor(&mut self) -> Option<Array4<f32>> {
        self.tensor.take()
    }

    pub fn face_confidence(&self) -> f32 {
        self.face_confidence
    }

    pub fn face_bbox(&self) -> Option<BoundingBox> {
        self.face_bbox
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Wall-clock time spent in each stage of one evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub decode: Duration,
    pub detect: Duration,
    pub select: Duration,
    pub crop: Duration,
    pub normalize: Duration,
}

impl StageTimings {
    /// `(stage name, milliseconds)` for every stage that ran.
    pub fn stages(&self) -> Vec<(&'static str, f64)> {
        [
            ("decode", self.decode),
            ("detect", self.detect),
            ("select", self.select),
            ("crop", self.crop),
            ("normalize", self.normalize),
        ]
        .into_iter()
        .filter(|(_, d)| !d.is_zero())
        .map(|(name, d)| (name, d.as_secs_f64() * 1000.0))
        .collect()
    }

    pub fn total(&self) -> Duration {
        self.decode + self.detect + self.select + self.crop + self.normalize
    }
}

/// An outcome plus the intermediate crop (when one was made) and timings.
#[derive(Clone, Debug)]
pub struct GateEvaluation {
    pub outcome: PipelineOutcome,
    pub crop: Option<CropResult>,
    pub timings: StageTimings,
}

impl GateEvaluation {
    pub fn new(outcome: PipelineOutcome) -> Self {
        Self {
            outcome,
            crop: None,
            timings: StageTimings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_carries_tensor() {
        let outcome = PipelineOutcome::accepted(
            0.9,
            BoundingBox::new(1, 2, 3, 4),
            Array4::zeros((1, 3, 2, 2)),
        );
        assert!(outcome.is_ok());
        assert_eq!(outcome.tensor().map(|t| t.shape().to_vec()), Some(vec![1, 3, 2, 2]));
        assert_eq!(outcome.message(), "Face detected and preprocessed successfully");
    }

    #[test]
    fn test_rejected_has_no_tensor() {
        let outcome = PipelineOutcome::rejected(Rejection::multiple_faces(2), 0.8, None);
        assert_eq!(outcome.status(), GateStatus::MultipleFaces);
        assert!(outcome.tensor().is_none());
        assert_eq!(outcome.face_confidence(), 0.8);
    }

    #[test]
    fn test_error_zeroes_confidence() {
        let outcome = PipelineOutcome::error("boom");
        assert_eq!(outcome.status(), GateStatus::Error);
        assert_eq!(outcome.face_confidence(), 0.0);
        assert!(outcome.face_bbox().is_none());
        assert_eq!(outcome.message(), "boom");
    }

    #[test]
    fn test_serialization_skips_tensor_and_missing_bbox() {
        let outcome = PipelineOutcome::rejected(Rejection::no_face(), 0.0, None);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "NO_FACE");
        assert_eq!(json["message"], "No face detected in frame");
        assert!(json.get("tensor").is_none());
        assert!(json.get("face_bbox").is_none());
    }

    #[test]
    fn test_serialization_includes_bbox() {
        let outcome = PipelineOutcome::accepted(
            0.5,
            BoundingBox::new(260, 150, 120, 120),
            Array4::zeros((1, 3, 1, 1)),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "OK");
        assert_eq!(json["face_bbox"][0], 260);
        assert_eq!(json["face_bbox"][2], 120);
    }

    #[test]
    fn test_take_tensor_keeps_status() {
        let mut outcome =
            PipelineOutcome::accepted(0.9, BoundingBox::new(0, 0, 1, 1), Array4::zeros((1, 3, 1, 1)));
        assert!(outcome.take_tensor().is_some());
        assert!(outcome.tensor().is_none());
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_stage_timings_skip_stages_that_did_not_run() {
        let timings = StageTimings {
            detect: Duration::from_millis(4),
            crop: Duration::from_millis(1),
            ..StageTimings::default()
        };
        let names: Vec<&str> = timings.stages().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["detect", "crop"]);
        assert_eq!(timings.total(), Duration::from_millis(5));
    }
}
