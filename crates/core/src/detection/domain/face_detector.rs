use crate::detection::domain::detection_record::DetectionRecord;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Implementations size their working resolution from each frame they are
/// given, so there is no separate configuration step to race on. `&mut self`
/// makes one instance serve one caller at a time; share detectors across
/// threads through a [`DetectorPool`](crate::detection::infrastructure::detector_pool::DetectorPool).
///
/// Returns an empty vector, not an error, when the frame contains no faces.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRecord>, Box<dyn std::error::Error>>;
}
