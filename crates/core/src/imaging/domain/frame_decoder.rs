use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FrameDecodeError {
    #[error("No frame data provided")]
    Empty,
    #[error("Base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Failed to decode image: {0}")]
    Image(String),
}

/// Decodes encoded image bytes (PNG, JPEG, ...) into a BGR [`Frame`].
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, FrameDecodeError>;
}
