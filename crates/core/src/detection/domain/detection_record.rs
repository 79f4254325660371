//! Raw face detections as produced by a [`FaceDetector`](super::face_detector::FaceDetector).

use serde::Serialize;

/// Axis-aligned face box in integer pixel coordinates (top-left origin).
///
/// `x`/`y` may be negative and the box may extend past the frame: detectors
/// report where the face is, not where the frame ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "[i32; 4]")]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `width * height`, widened so large frames cannot overflow.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Geometric center in continuous coordinates.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// Serialized as `[x, y, width, height]`.
impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// Facial landmark in image space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One detected face: box, five landmarks, and detector confidence in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub bbox: BoundingBox,
    pub confidence: f32,
    /// Right eye, left eye, nose tip, right mouth corner, left mouth corner.
    pub landmarks: [Landmark; 5],
}

impl DetectionRecord {
    pub fn new(bbox: BoundingBox, confidence: f32, landmarks: [Landmark; 5]) -> Self {
        Self {
            bbox,
            confidence,
            landmarks,
        }
    }

    /// A detection without landmark information.
    pub fn from_bbox(bbox: BoundingBox, confidence: f32) -> Self {
        Self::new(bbox, confidence, [Landmark::default(); 5])
    }

    pub fn area(&self) -> i64 {
        self.bbox.area()
    }
}
