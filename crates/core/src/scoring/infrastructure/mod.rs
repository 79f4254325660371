pub mod onnx_quality_scorer;
