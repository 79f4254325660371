//! Square face crops with margin and mirrored out-of-frame padding.
//!
//! The requested square is centered on the face box and may extend past the
//! frame. Whatever falls outside is synthesized by reflect-101 mirroring
//! (`gfedcb|abcdefgh|gfedcba`) so the scoring model never sees hard synthetic
//! edges. The padding ratio is measured on the requested square, before
//! clamping.

use crate::detection::domain::detection_record::BoundingBox;
use crate::shared::frame::{Frame, CHANNELS};

/// Largest crop side that [`square_crop`] will materialize.
pub const MAX_CROP_SIDE: i64 = 16_384;

/// The requested (unclamped) crop square and its overflow on each side.
///
/// Coordinates are `i64` so that any `i32` box, however large, can be
/// measured without overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRegion {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    pub pad_left: i64,
    pub pad_top: i64,
    pub pad_right: i64,
    pub pad_bottom: i64,
}

impl CropRegion {
    /// Square of side `max(w, h) + 2 * floor(max(w, h) * margin_ratio)`
    /// centered on the box, using floor division throughout.
    pub fn around(
        bbox: &BoundingBox,
        margin_ratio: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let width = i64::from(bbox.width);
        let height = i64::from(bbox.height);
        let size = width.max(height);
        let margin = (size as f64 * margin_ratio).floor() as i64;
        let side = size + 2 * margin;

        let center_x = i64::from(bbox.x) + width.div_euclid(2);
        let center_y = i64::from(bbox.y) + height.div_euclid(2);

        let x1 = center_x - side.div_euclid(2);
        let y1 = center_y - side.div_euclid(2);
        let x2 = x1 + side;
        let y2 = y1 + side;

        let fw = i64::from(frame_width);
        let fh = i64::from(frame_height);

        Self {
            x1,
            y1,
            x2,
            y2,
            pad_left: (-x1).max(0),
            pad_top: (-y1).max(0),
            pad_right: (x2 - fw).max(0),
            pad_bottom: (y2 - fh).max(0),
        }
    }

    /// Side length of the requested square.
    pub fn side(&self) -> i64 {
        self.x2 - self.x1
    }

    pub fn total_padding(&self) -> i64 {
        self.pad_left + self.pad_top + self.pad_right + self.pad_bottom
    }

    /// Total overflow normalized by `4 * side`.
    ///
    /// Not an area fraction: the thresholds were calibrated against this
    /// perimeter-style measure.
    pub fn padding_ratio(&self) -> f64 {
        let side = self.side();
        if side <= 0 {
            return 0.0;
        }
        self.total_padding() as f64 / (4.0 * side as f64)
    }

    /// The requested square intersected with the frame, as `(x1, y1, x2, y2)`.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> (i64, i64, i64, i64) {
        (
            self.x1.max(0),
            self.y1.max(0),
            self.x2.min(i64::from(frame_width)),
            self.y2.min(i64::from(frame_height)),
        )
    }
}

/// A square crop plus how much of it had to be synthesized.
#[derive(Clone, Debug, PartialEq)]
pub struct CropResult {
    pub crop: Frame,
    pub padding_ratio: f64,
    pub region: CropRegion,
}

/// Crop a margin-expanded square around `bbox`, mirroring pixels in for the
/// parts that fall outside the frame.
///
/// Returns `None` when the square does not overlap the frame at all (or is
/// empty), since there is nothing to mirror from.
pub fn square_crop_with_margin(
    frame: &Frame,
    bbox: &BoundingBox,
    margin_ratio: f64,
) -> Option<CropResult> {
    let region = CropRegion::around(bbox, margin_ratio, frame.width(), frame.height());
    square_crop(frame, region)
}

/// Materialize `region` from `frame`; see [`square_crop_with_margin`].
///
/// Allocates `side * side` pixels, so callers should check the padding ratio
/// on the region first. Sides above [`MAX_CROP_SIDE`] return `None`.
pub fn square_crop(frame: &Frame, region: CropRegion) -> Option<CropResult> {
    let side = region.side();
    let (cx1, cy1, cx2, cy2) = region.clamped(frame.width(), frame.height());
    let sampled_w = cx2 - cx1;
    let sampled_h = cy2 - cy1;
    if side <= 0 || side > MAX_CROP_SIDE || sampled_w <= 0 || sampled_h <= 0 {
        return None;
    }
    let side_px = u32::try_from(side).ok()?;

    let src = frame.data();
    let src_stride = frame.width() as usize * CHANNELS;
    let n = side as usize;
    let mut data = Vec::with_capacity(n * n * CHANNELS);

    // Pre-compute source columns once; rows are resolved per output row.
    let src_cols: Vec<usize> = (0..side)
        .map(|ox| (cx1 + reflect_101(ox - region.pad_left, sampled_w)) as usize)
        .collect();

    for oy in 0..side {
        let sy = (cy1 + reflect_101(oy - region.pad_top, sampled_h)) as usize;
        let row = &src[sy * src_stride..(sy + 1) * src_stride];
        for &sx in &src_cols {
            let i = sx * CHANNELS;
            data.extend_from_slice(&row[i..i + CHANNELS]);
        }
    }

    Some(CropResult {
        crop: Frame::new(data, side_px, side_px),
        padding_ratio: region.padding_ratio(),
        region,
    })
}

/// Map `p` into `[0, len)` by mirroring without repeating the edge sample.
///
/// Reflection repeats as needed when `p` is more than one extent away.
fn reflect_101(mut p: i64, len: i64) -> i64 {
    if len == 1 {
        return 0;
    }
    while p < 0 || p >= len {
        if p < 0 {
            p = -p;
        } else {
            p = 2 * (len - 1) - p;
        }
    }
    p
}
