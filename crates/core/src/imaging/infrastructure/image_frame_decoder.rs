use crate::imaging::domain::frame_decoder::{FrameDecodeError, FrameDecoder};
use crate::shared::frame::Frame;

/// Decodes any format the `image` crate recognizes, dropping alpha and
/// reordering to BGR.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFrameDecoder;

impl ImageFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Frame, FrameDecodeError> {
        if bytes.is_empty() {
            return Err(FrameDecodeError::Empty);
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| FrameDecodeError::Image(e.to_string()))?
            .to_rgb8();
        let (width, height) = img.dimensions();

        let mut data = img.into_raw();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
        Ok(Frame::new(data, width, height))
    }
}
