pub mod detector_pool;
pub mod math;
pub mod onnx_yunet_detector;
