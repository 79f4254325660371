use ndarray::Array4;

/// Domain interface for face image quality assessment.
///
/// Takes the normalized `(1, 3, H, W)` tensor produced by the gate and
/// returns a quality score, higher is better, nominally in `[0, 1]`.
pub trait QualityScorer: Send {
    fn score(&mut self, tensor: &Array4<f32>) -> Result<f32, Box<dyn std::error::Error>>;
}
