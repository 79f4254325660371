//! The face quality gate: detections → single face → square crop → tensor.

use std::time::Instant;

use super::acceptance::{AcceptanceClassifier, Rejection};
use super::candidate_ranker::{CandidateRanker, Ranking};
use super::crop_geometry::{square_crop, CropRegion};
use super::gate_config::{GateConfig, GateConfigError};
use super::normalizer::Normalizer;
use super::pipeline_outcome::{GateEvaluation, PipelineOutcome, StageTimings};
use crate::detection::domain::detection_record::DetectionRecord;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;

/// Deterministic gating over one frame at a time.
///
/// Holds no per-frame state, so one gate can be shared by any number of
/// threads; the detector is passed in per call.
#[derive(Clone, Debug)]
pub struct FaceGate {
    config: GateConfig,
    ranker: CandidateRanker,
    classifier: AcceptanceClassifier,
    normalizer: Normalizer,
}

impl FaceGate {
    pub fn new(config: GateConfig) -> Result<Self, GateConfigError> {
        Self::with_normalizer(config, Normalizer::default())
    }

    pub fn with_normalizer(
        config: GateConfig,
        normalizer: Normalizer,
    ) -> Result<Self, GateConfigError> {
        config.validate()?;
        Ok(Self {
            ranker: CandidateRanker::new(config.ambiguity_ratio),
            classifier: AcceptanceClassifier::new(config.min_face_ratio, config.max_padding_ratio),
            normalizer,
            config,
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run `detector` on `frame` and gate the result.
    ///
    /// Detector failures become an `ERROR` outcome.
    pub fn evaluate(&self, detector: &mut dyn FaceDetector, frame: &Frame) -> GateEvaluation {
        if let Some(rejected) = reject_empty_frame(frame) {
            return rejected;
        }

        let t0 = Instant::now();
        let detections = match detector.detect(frame) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Face detection failed: {e}");
                return GateEvaluation::new(PipelineOutcome::error(format!(
                    "Preprocessing error: {e}"
                )));
            }
        };
        let detect = t0.elapsed();

        let mut evaluation = self.evaluate_detections(frame, detections);
        evaluation.timings.detect = detect;
        evaluation
    }

    /// Gate an already-detected frame.
    pub fn evaluate_detections(
        &self,
        frame: &Frame,
        detections: Vec<DetectionRecord>,
    ) -> GateEvaluation {
        if let Some(rejected) = reject_empty_frame(frame) {
            return rejected;
        }
        let mut timings = StageTimings::default();

        let t0 = Instant::now();
        let ranking = self.ranker.rank(detections, frame.width(), frame.height());
        timings.select = t0.elapsed();

        let candidate = match ranking {
            Ranking::NoFace => {
                log::debug!("No face detected in frame");
                return finish(PipelineOutcome::rejected(Rejection::no_face(), 0.0, None), timings);
            }
            Ranking::Ambiguous {
                face_count,
                largest,
            } => {
                log::debug!("Multiple ambiguous faces detected: {face_count} faces");
                return finish(
                    PipelineOutcome::rejected(
                        Rejection::multiple_faces(face_count),
                        largest.confidence,
                        None,
                    ),
                    timings,
                );
            }
            Ranking::Selected { candidate, .. } => candidate,
        };

        let face = candidate.detection;
        let bbox = face.bbox;

        if let Some(rejection) = self.classifier.classify_size(&bbox, frame.width()) {
            return finish(
                PipelineOutcome::rejected(rejection, face.confidence, Some(bbox)),
                timings,
            );
        }

        let t0 = Instant::now();
        let region =
            CropRegion::around(&bbox, self.config.margin_ratio, frame.width(), frame.height());
        let padding_ratio = region.padding_ratio();
        if let Some(rejection) = self.classifier.classify_padding(padding_ratio) {
            timings.crop = t0.elapsed();
            return finish(
                PipelineOutcome::rejected(rejection, face.confidence, Some(bbox)),
                timings,
            );
        }

        let crop = square_crop(frame, region);
        timings.crop = t0.elapsed();

        let Some(crop) = crop else {
            log::debug!("Crop region for {bbox:?} cannot be materialized from the frame");
            return finish(
                PipelineOutcome::rejected(
                    Rejection::partial_face(padding_ratio),
                    face.confidence,
                    Some(bbox),
                ),
                timings,
            );
        };

        let t0 = Instant::now();
        let tensor = self.normalizer.normalize(&crop.crop);
        timings.normalize = t0.elapsed();

        log::debug!(
            "Face preprocessed: conf={:.2}, bbox={:?}, padding={:.2}%",
            face.confidence,
            bbox,
            crop.padding_ratio * 100.0
        );

        GateEvaluation {
            outcome: PipelineOutcome::accepted(face.confidence, bbox, tensor),
            crop: Some(crop),
            timings,
        }
    }
}

fn finish(outcome: PipelineOutcome, timings: StageTimings) -> GateEvaluation {
    GateEvaluation {
        outcome,
        crop: None,
        timings,
    }
}

fn reject_empty_frame(frame: &Frame) -> Option<GateEvaluation> {
    if frame.width() == 0 || frame.height() == 0 {
        Some(GateEvaluation::new(PipelineOutcome::error(format!(
            "Invalid frame dimensions: {}x{}",
            frame.width(),
            frame.height()
        ))))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_record::BoundingBox;
    use crate::gating::domain::acceptance::GateStatus;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── Stubs ───────────────────────────────────────────────────────

    struct StubDetector {
        detections: Vec<DetectionRecord>,
        calls: usize,
    }

    impl StubDetector {
        fn new(detections: Vec<DetectionRecord>) -> Self {
            Self {
                detections,
                calls: 0,
            }
        }
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<DetectionRecord>, Box<dyn std::error::Error>> {
            self.calls += 1;
            Ok(self.detections.clone())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<DetectionRecord>, Box<dyn std::error::Error>> {
            Err("session exploded".into())
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn gate() -> FaceGate {
        FaceGate::new(GateConfig::default()).unwrap()
    }

    fn frame() -> Frame {
        Frame::filled(640, 480, [90, 120, 150])
    }

    fn det(x: i32, y: i32, w: i32, h: i32, confidence: f32) -> DetectionRecord {
        DetectionRecord::from_bbox(BoundingBox::new(x, y, w, h), confidence)
    }

    // ── Worked examples ─────────────────────────────────────────────

    #[test]
    fn test_centered_face_is_ok() {
        let eval = gate().evaluate_detections(&frame(), vec![det(260, 150, 120, 120, 0.9)]);

        assert_eq!(eval.outcome.status(), GateStatus::Ok);
        assert_eq!(eval.outcome.tensor().unwrap().shape(), &[1, 3, 352, 352]);
        assert_relative_eq!(eval.outcome.face_confidence(), 0.9);
        assert_eq!(eval.outcome.face_bbox(), Some(BoundingBox::new(260, 150, 120, 120)));

        let crop = eval.crop.unwrap();
        assert_eq!(crop.crop.width(), 168);
        assert_eq!(crop.crop.height(), 168);
        assert_eq!(crop.padding_ratio, 0.0);
        assert_eq!(
            (crop.region.x1, crop.region.y1, crop.region.x2, crop.region.y2),
            (236, 126, 404, 294)
        );
    }

    #[test]
    fn test_right_edge_face_is_partial() {
        let eval = gate().evaluate_detections(&frame(), vec![det(600, 20, 100, 100, 0.9)]);

        assert_eq!(eval.outcome.status(), GateStatus::PartialFace);
        assert!(eval.outcome.tensor().is_none());
        assert_eq!(eval.outcome.face_bbox(), Some(BoundingBox::new(600, 20, 100, 100)));
        assert_eq!(
            eval.outcome.message(),
            "Face partially out of frame (14% padding)"
        );
        assert!(eval.crop.is_none());
    }

    #[test]
    fn test_padding_rejection_skips_crop_materialization() {
        let eval = gate().evaluate_detections(&frame(), vec![det(-2000, -2000, 5000, 5000, 0.9)]);
        assert_eq!(eval.outcome.status(), GateStatus::PartialFace);
        assert!(eval.crop.is_none());
    }

    #[rstest]
    #[case::huge_positive(0, 0, 2_000_000_000)]
    #[case::max_extent(i32::MAX, i32::MAX, i32::MAX)]
    #[case::min_origin(i32::MIN, i32::MIN, 2_000_000_000)]
    fn test_extreme_boxes_fold_into_partial_face(#[case] x: i32, #[case] y: i32, #[case] side: i32) {
        let eval = gate().evaluate_detections(&frame(), vec![det(x, y, side, side, 0.9)]);
        assert_eq!(eval.outcome.status(), GateStatus::PartialFace);
        assert!(!eval.outcome.message().contains("(0% padding)"));
        assert!(eval.crop.is_none());
    }

    #[test]
    fn test_relaxed_padding_still_bounds_crop_size() {
        let config = GateConfig {
            max_padding_ratio: 0.9,
            ..GateConfig::default()
        };
        let gate = FaceGate::new(config).unwrap();
        let eval = gate.evaluate_detections(&frame(), vec![det(0, 0, 2_000_000_000, 2_000_000_000, 0.9)]);
        assert_eq!(eval.outcome.status(), GateStatus::PartialFace);
        assert!(eval.crop.is_none());
    }

    // ── Status transitions ──────────────────────────────────────────

    #[test]
    fn test_no_detections_is_no_face() {
        let eval = gate().evaluate_detections(&frame(), vec![]);
        assert_eq!(eval.outcome.status(), GateStatus::NoFace);
        assert_eq!(eval.outcome.face_confidence(), 0.0);
        assert!(eval.outcome.tensor().is_none());
        assert!(eval.crop.is_none());
    }

    #[rstest]
    #[case::confident(0.99, 0.98)]
    #[case::unconfident(0.1, 0.2)]
    fn test_similar_faces_are_multiple_regardless_of_confidence(
        #[case] c1: f32,
        #[case] c2: f32,
    ) {
        let eval = gate().evaluate_detections(
            &frame(),
            vec![det(50, 50, 100, 100, c1), det(400, 50, 90, 90, c2)],
        );
        assert_eq!(eval.outcome.status(), GateStatus::MultipleFaces);
        assert_relative_eq!(eval.outcome.face_confidence(), c1);
        assert!(eval.outcome.face_bbox().is_none());
        assert_eq!(
            eval.outcome.message(),
            "Multiple faces detected (2), unable to select one"
        );
    }

    #[test]
    fn test_narrow_face_is_too_small_before_cropping() {
        let eval = gate().evaluate_detections(&frame(), vec![det(300, 200, 70, 70, 0.9)]);
        assert_eq!(eval.outcome.status(), GateStatus::FaceTooSmall);
        assert_eq!(eval.outcome.message(), "Face too small (70px, need >76px)");
        assert!(eval.crop.is_none());
    }

    #[test]
    fn test_small_face_near_edge_reports_size_first() {
        let eval = gate().evaluate_detections(&frame(), vec![det(630, 0, 40, 40, 0.9)]);
        assert_eq!(eval.outcome.status(), GateStatus::FaceTooSmall);
    }

    #[test]
    fn test_face_outside_frame_is_partial() {
        let eval = gate().evaluate_detections(&frame(), vec![det(900, 900, 100, 100, 0.9)]);
        assert_eq!(eval.outcome.status(), GateStatus::PartialFace);
        assert!(eval.outcome.tensor().is_none());
    }

    #[test]
    fn test_small_padding_is_tolerated() {
        // side=140 at x1=-10 → padding 10/560 < 0.10
        let eval = gate().evaluate_detections(&frame(), vec![det(10, 150, 100, 100, 0.9)]);
        assert_eq!(eval.outcome.status(), GateStatus::Ok);
        assert!(eval.crop.unwrap().padding_ratio > 0.0);
    }

    #[test]
    fn test_selects_centered_face_among_several() {
        let eval = gate().evaluate_detections(
            &frame(),
            vec![det(0, 0, 150, 150, 0.3), det(270, 190, 100, 75, 1.0)],
        );
        assert_eq!(eval.outcome.status(), GateStatus::Ok);
        assert_eq!(eval.outcome.face_bbox(), Some(BoundingBox::new(270, 190, 100, 75)));
    }

    // ── Detector integration ────────────────────────────────────────

    #[test]
    fn test_evaluate_runs_detector_once() {
        let mut detector = StubDetector::new(vec![det(260, 150, 120, 120, 0.9)]);
        let eval = gate().evaluate(&mut detector, &frame());
        assert_eq!(detector.calls, 1);
        assert!(eval.outcome.is_ok());
    }

    #[test]
    fn test_detector_failure_is_error() {
        let eval = gate().evaluate(&mut FailingDetector, &frame());
        assert_eq!(eval.outcome.status(), GateStatus::Error);
        assert!(eval.outcome.message().contains("session exploded"));
        assert_eq!(eval.outcome.face_confidence(), 0.0);
    }

    #[test]
    fn test_zero_size_frame_is_error_without_detection() {
        let mut detector = StubDetector::new(vec![]);
        let eval = gate().evaluate(&mut detector, &Frame::new(vec![], 0, 0));
        assert_eq!(eval.outcome.status(), GateStatus::Error);
        assert_eq!(detector.calls, 0);
    }

    #[test]
    fn test_tensor_only_when_ok() {
        let cases = vec![
            vec![],
            vec![det(260, 150, 120, 120, 0.9)],
            vec![det(600, 20, 100, 100, 0.9)],
            vec![det(300, 200, 20, 20, 0.9)],
            vec![det(50, 50, 100, 100, 0.9), det(400, 50, 100, 100, 0.9)],
        ];
        for detections in cases {
            let eval = gate().evaluate_detections(&frame(), detections);
            assert_eq!(eval.outcome.tensor().is_some(), eval.outcome.is_ok());
        }
    }

    // ── Configuration ───────────────────────────────────────────────

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GateConfig {
            ambiguity_ratio: 0.0,
            ..GateConfig::default()
        };
        assert!(FaceGate::new(config).is_err());
    }

    #[test]
    fn test_relaxed_padding_accepts_edge_face() {
        let config = GateConfig {
            max_padding_ratio: 0.5,
            ..GateConfig::default()
        };
        let gate = FaceGate::new(config).unwrap();
        let eval = gate.evaluate_detections(&frame(), vec![det(600, 20, 100, 100, 0.9)]);
        assert_eq!(eval.outcome.status(), GateStatus::Ok);
        assert_eq!(eval.crop.unwrap().crop.width(), 140);
    }

    #[test]
    fn test_smaller_normalizer_size() {
        let gate = FaceGate::with_normalizer(
            GateConfig::default(),
            Normalizer::new(64, [0.5; 3], [0.5; 3]),
        )
        .unwrap();
        let eval = gate.evaluate_detections(&frame(), vec![det(260, 150, 120, 120, 0.9)]);
        assert_eq!(eval.outcome.tensor().unwrap().shape(), &[1, 3, 64, 64]);
    }
}
