/// Face image quality scorer (Efficient-FIQA style) using ONNX Runtime.
use std::path::Path;

use ndarray::Array4;

use crate::scoring::domain::quality_scorer::QualityScorer;
use crate::shared::onnx_session::load_session;

pub struct OnnxQualityScorer {
    session: ort::session::Session,
}

impl OnnxQualityScorer {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = load_session(model_path, intra_threads)?;
        Ok(Self { session })
    }
}

impl QualityScorer for OnnxQualityScorer {
    fn score(&mut self, tensor: &Array4<f32>) -> Result<f32, Box<dyn std::error::Error>> {
        let input_value = ort::value::TensorRef::from_array_view(tensor.view())?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Quality model produced no outputs".into());
        }
        let scores = outputs[0].try_extract_array::<f32>()?;
        // Output is [batch, 1]; take the first row's first value.
        let score = scores.iter().next().copied().ok_or("Quality model output is empty")?;
        if !score.is_finite() {
            return Err(format!("Quality model returned non-finite score {score}").into());
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file_is_an_error() {
        assert!(OnnxQualityScorer::new(Path::new("/nonexistent/fiqa.onnx")).is_err());
    }
}
