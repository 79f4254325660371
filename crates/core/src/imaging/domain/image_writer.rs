use std::path::Path;

use crate::shared::frame::Frame;

/// Writes a BGR frame to an image file.
pub trait ImageWriter: Send + Sync {
    /// Writes `frame` to `path`, optionally resizing to `size` first.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
