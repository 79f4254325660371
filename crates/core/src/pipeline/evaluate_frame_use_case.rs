use std::time::Instant;

use crate::detection::infrastructure::detector_pool::DetectorPool;
use crate::gating::domain::face_gate::FaceGate;
use crate::gating::domain::pipeline_outcome::{GateEvaluation, PipelineOutcome};
use crate::imaging::domain::frame_decoder::{FrameDecodeError, FrameDecoder};
use crate::imaging::domain::payload::decode_payload;
use crate::shared::frame::Frame;

/// Gating entry points: frame, encoded image bytes, or a text payload → outcome.
///
/// Takes `&self` throughout, so one instance can serve many threads; each
/// call checks a detector out of the pool for the duration of detection.
/// Every failure is folded into an `ERROR` outcome.
pub struct EvaluateFrameUseCase {
    gate: FaceGate,
    decoder: Box<dyn FrameDecoder>,
    detectors: DetectorPool,
}

impl EvaluateFrameUseCase {
    pub fn new(gate: FaceGate, decoder: Box<dyn FrameDecoder>, detectors: DetectorPool) -> Self {
        Self {
            gate,
            decoder,
            detectors,
        }
    }

    pub fn gate(&self) -> &FaceGate {
        &self.gate
    }

    pub fn evaluate(&self, frame: &Frame) -> PipelineOutcome {
        self.evaluate_detailed(frame).outcome
    }

    pub fn evaluate_encoded(&self, bytes: &[u8]) -> PipelineOutcome {
        self.evaluate_encoded_detailed(bytes).outcome
    }

    /// Decode a raw-base64 or data-URL payload, then evaluate it.
    pub fn evaluate_payload(&self, payload: &str) -> PipelineOutcome {
        match decode_payload(payload) {
            Ok(bytes) => self.evaluate_encoded(&bytes),
            Err(e) => decode_failure(e),
        }
    }

    pub fn evaluate_detailed(&self, frame: &Frame) -> GateEvaluation {
        let mut detector = match self.detectors.checkout() {
            Ok(d) => d,
            Err(e) => {
                log::warn!("No detector available: {e}");
                return GateEvaluation::new(PipelineOutcome::error(format!(
                    "Preprocessing error: {e}"
                )));
            }
        };
        self.gate.evaluate(&mut detector, frame)
    }

    pub fn evaluate_encoded_detailed(&self, bytes: &[u8]) -> GateEvaluation {
        let t0 = Instant::now();
        let frame = match self.decoder.decode(bytes) {
            Ok(frame) => frame,
            Err(e) => return GateEvaluation::new(decode_failure(e)),
        };
        let decode = t0.elapsed();

        let mut evaluation = self.evaluate_detailed(&frame);
        evaluation.timings.decode = decode;
        evaluation
    }
}

fn decode_failure(e: FrameDecodeError) -> PipelineOutcome {
    match e {
        FrameDecodeError::Empty => log::debug!("{e}"),
        _ => log::warn!("{e}"),
    }
    PipelineOutcome::error(e.to_string())
}
