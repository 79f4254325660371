use std::time::Instant;

use serde::Serialize;

use crate::detection::domain::detection_record::BoundingBox;
use crate::gating::domain::acceptance::GateStatus;
use crate::gating::domain::pipeline_outcome::PipelineOutcome;
use crate::pipeline::evaluate_frame_use_case::EvaluateFrameUseCase;
use crate::scoring::domain::quality_level::{threshold_met, QualityLevel};
use crate::scoring::domain::quality_scorer::QualityScorer;
use crate::shared::frame::Frame;

/// Gate outcome plus the quality score for accepted frames.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QualityReport {
    pub status: GateStatus,
    pub quality_score: Option<f32>,
    pub quality_level: Option<QualityLevel>,
    pub threshold_met: bool,
    pub face_confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_bbox: Option<BoundingBox>,
    pub message: String,
    pub inference_time_ms: f64,
}

impl QualityReport {
    /// Score an `OK` outcome; any other outcome passes through unscored.
    ///
    /// `started` marks the beginning of the request so the elapsed time
    /// covers decoding and gating as well as inference.
    pub fn from_outcome(
        mut outcome: PipelineOutcome,
        scorer: &mut dyn QualityScorer,
        started: Instant,
    ) -> Self {
        let mut report = Self {
            status: outcome.status(),
            quality_score: None,
            quality_level: None,
            threshold_met: false,
            face_confidence: outcome.face_confidence(),
            face_bbox: outcome.face_bbox(),
            message: outcome.message().to_string(),
            inference_time_ms: 0.0,
        };

        if let Some(tensor) = outcome.take_tensor() {
            match scorer.score(&tensor) {
                Ok(score) => {
                    report.quality_score = Some(score);
                    report.quality_level = Some(QualityLevel::from_score(score));
                    report.threshold_met = threshold_met(score);
                    report.message = "Face quality assessed successfully".to_string();
                }
                Err(e) => {
                    log::warn!("Quality inference failed: {e}");
                    report.status = GateStatus::Error;
                    report.message = format!("Inference failed: {e}");
                }
            }
        }

        report.inference_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        report
    }
}

/// Gate a frame, then score it when the gate accepts.
pub struct AssessQualityUseCase {
    evaluator: EvaluateFrameUseCase,
    scorer: Box<dyn QualityScorer>,
}

impl AssessQualityUseCase {
    pub fn new(evaluator: EvaluateFrameUseCase, scorer: Box<dyn QualityScorer>) -> Self {
        Self { evaluator, scorer }
    }

    pub fn assess_payload(&mut self, payload: &str) -> QualityReport {
        let started = Instant::now();
        let outcome = self.evaluator.evaluate_payload(payload);
        QualityReport::from_outcome(outcome, self.scorer.as_mut(), started)
    }

    pub fn assess_encoded(&mut self, bytes: &[u8]) -> QualityReport {
        let started = Instant::now();
        let outcome = self.evaluator.evaluate_encoded(bytes);
        QualityReport::from_outcome(outcome, self.scorer.as_mut(), started)
    }

    pub fn assess_frame(&mut self, frame: &Frame) -> QualityReport {
        let started = Instant::now();
        let outcome = self.evaluator.evaluate(frame);
        QualityReport::from_outcome(outcome, self.scorer.as_mut(), started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_record::DetectionRecord;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::detection::infrastructure::detector_pool::DetectorPool;
    use crate::gating::domain::face_gate::FaceGate;
    use crate::gating::domain::gate_config::GateConfig;
    use crate::imaging::domain::frame_decoder::{FrameDecodeError, FrameDecoder};
    use ndarray::Array4;
    use rstest::rstest;

    // ── Stubs ───────────────────────────────────────────────────────

    struct StubScorer {
        result: Result<f32, String>,
        calls: usize,
    }

    impl QualityScorer for StubScorer {
        fn score(&mut self, tensor: &Array4<f32>) -> Result<f32, Box<dyn std::error::Error>> {
            assert_eq!(tensor.shape(), &[1, 3, 352, 352]);
            self.calls += 1;
            self.result.clone().map_err(|e| e.into())
        }
    }

    struct StubDetector {
        detections: Vec<DetectionRecord>,
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<DetectionRecord>, Box<dyn std::error::Error>> {
            Ok(self.detections.clone())
        }
    }

    struct FailingDecoder;

    impl FrameDecoder for FailingDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<Frame, FrameDecodeError> {
            Err(FrameDecodeError::Image("corrupt".to_string()))
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn use_case(detections: Vec<DetectionRecord>, result: Result<f32, String>) -> AssessQualityUseCase {
        let detector: Box<dyn FaceDetector> = Box::new(StubDetector { detections });
        let evaluator = EvaluateFrameUseCase::new(
            FaceGate::new(GateConfig::default()).unwrap(),
            Box::new(FailingDecoder),
            DetectorPool::new(vec![detector]).unwrap(),
        );
        AssessQualityUseCase::new(evaluator, Box::new(StubScorer { result, calls: 0 }))
    }

    fn centered_face() -> DetectionRecord {
        DetectionRecord::from_bbox(BoundingBox::new(260, 150, 120, 120), 0.92)
    }

    fn vga() -> Frame {
        Frame::filled(640, 480, [90, 90, 90])
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[rstest]
    #[case::good(0.81, QualityLevel::Good, true)]
    #[case::acceptable(0.55, QualityLevel::Acceptable, true)]
    #[case::poor(0.2, QualityLevel::Poor, false)]
    fn test_accepted_frame_is_scored(
        #[case] score: f32,
        #[case] level: QualityLevel,
        #[case] met: bool,
    ) {
        let mut uc = use_case(vec![centered_face()], Ok(score));
        let report = uc.assess_frame(&vga());

        assert_eq!(report.status, GateStatus::Ok);
        assert_eq!(report.quality_score, Some(score));
        assert_eq!(report.quality_level, Some(level));
        assert_eq!(report.threshold_met, met);
        assert_eq!(report.face_bbox, Some(BoundingBox::new(260, 150, 120, 120)));
        assert_eq!(report.message, "Face quality assessed successfully");
        assert!(report.inference_time_ms >= 0.0);
    }

    #[test]
    fn test_rejected_frame_is_not_scored() {
        let mut scorer = StubScorer {
            result: Ok(0.9),
            calls: 0,
        };
        let outcome = PipelineOutcome::error("No frame data provided");
        let report = QualityReport::from_outcome(outcome, &mut scorer, Instant::now());

        assert_eq!(scorer.calls, 0);
        assert_eq!(report.status, GateStatus::Error);
        assert_eq!(report.quality_score, None);
        assert_eq!(report.quality_level, None);
        assert!(!report.threshold_met);
        assert_eq!(report.message, "No frame data provided");
    }

    #[test]
    fn test_no_face_passes_through() {
        let mut uc = use_case(vec![], Ok(0.9));
        let report = uc.assess_frame(&vga());
        assert_eq!(report.status, GateStatus::NoFace);
        assert_eq!(report.message, "No face detected in frame");
        assert!(report.quality_score.is_none());
    }

    #[test]
    fn test_scorer_failure_is_error() {
        let mut uc = use_case(vec![centered_face()], Err("session closed".to_string()));
        let report = uc.assess_frame(&vga());

        assert_eq!(report.status, GateStatus::Error);
        assert_eq!(report.message, "Inference failed: session closed");
        assert!(report.quality_score.is_none());
        assert_eq!(report.face_bbox, Some(BoundingBox::new(260, 150, 120, 120)));
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let mut uc = use_case(vec![centered_face()], Ok(0.9));
        let report = uc.assess_encoded(b"not an image");
        assert_eq!(report.status, GateStatus::Error);
        assert_eq!(report.message, "Failed to decode image: corrupt");
    }

    #[test]
    fn test_empty_payload_is_reported() {
        let mut uc = use_case(vec![centered_face()], Ok(0.9));
        let report = uc.assess_payload("   ");
        assert_eq!(report.status, GateStatus::Error);
        assert_eq!(report.message, "No frame data provided");
    }

    #[test]
    fn test_report_json_shape() {
        let mut uc = use_case(vec![centered_face()], Ok(0.75));
        let json = serde_json::to_value(uc.assess_frame(&vga())).unwrap();

        assert_eq!(json["status"], "OK");
        assert_eq!(json["quality_level"], "good");
        assert_eq!(json["threshold_met"], true);
        assert_eq!(json["face_bbox"][2], 120);
        assert!(json.get("inference_time_ms").is_some());
    }
}
