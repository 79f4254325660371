use std::fmt;

use serde::Serialize;

use crate::detection::domain::detection_record::BoundingBox;

/// Terminal status of one gating evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    NoFace,
    MultipleFaces,
    FaceTooSmall,
    PartialFace,
    Ok,
    Error,
}

impl GateStatus {
    pub const ALL: [GateStatus; 6] = [
        GateStatus::NoFace,
        GateStatus::MultipleFaces,
        GateStatus::FaceTooSmall,
        GateStatus::PartialFace,
        GateStatus::Ok,
        GateStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::NoFace => "NO_FACE",
            GateStatus::MultipleFaces => "MULTIPLE_FACES",
            GateStatus::FaceTooSmall => "FACE_TOO_SMALL",
            GateStatus::PartialFace => "PARTIAL_FACE",
            GateStatus::Ok => "OK",
            GateStatus::Error => "ERROR",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, GateStatus::Ok)
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-OK adequacy finding and its human-readable reason.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    pub status: GateStatus,
    pub message: String,
}

impl Rejection {
    pub fn no_face() -> Self {
        Self {
            status: GateStatus::NoFace,
            message: "No face detected in frame".to_string(),
        }
    }

    pub fn multiple_faces(face_count: usize) -> Self {
        Self {
            status: GateStatus::MultipleFaces,
            message: format!("Multiple faces detected ({face_count}), unable to select one"),
        }
    }

    pub fn face_too_small(width: i32, required: i64) -> Self {
        Self {
            status: GateStatus::FaceTooSmall,
            message: format!("Face too small ({width}px, need >{required}px)"),
        }
    }

    pub fn partial_face(padding_ratio: f64) -> Self {
        Self {
            status: GateStatus::PartialFace,
            message: format!(
                "Face partially out of frame ({:.0}% padding)",
                padding_ratio * 100.0
            ),
        }
    }
}

/// Size and padding checks applied to the selected face.
///
/// Size is checked before cropping, padding after. Both thresholds are strict:
/// a face exactly `min_face_ratio` wide passes, and a padding ratio exactly at
/// `max_padding_ratio` passes.
#[derive(Clone, Copy, Debug)]
pub struct AcceptanceClassifier {
    min_face_ratio: f64,
    max_padding_ratio: f64,
}

impl AcceptanceClassifier {
    pub fn new(min_face_ratio: f64, max_padding_ratio: f64) -> Self {
        Self {
            min_face_ratio,
            max_padding_ratio,
        }
    }

    pub fn min_face_width(&self, frame_width: u32) -> f64 {
        frame_width as f64 * self.min_face_ratio
    }

    pub fn classify_size(&self, bbox: &BoundingBox, frame_width: u32) -> Option<Rejection> {
        let min_width = self.min_face_width(frame_width);
        if (bbox.width as f64) < min_width {
            log::debug!(
                "Face too small: {}px ({:.1}% of frame width)",
                bbox.width,
                bbox.width as f64 / frame_width as f64 * 100.0
            );
            Some(Rejection::face_too_small(bbox.width, min_width.floor() as i64))
        } else {
            None
        }
    }

    pub fn classify_padding(&self, padding_ratio: f64) -> Option<Rejection> {
        if padding_ratio > self.max_padding_ratio {
            log::debug!(
                "Face too close to boundary: {:.1}% padding",
                padding_ratio * 100.0
            );
            Some(Rejection::partial_face(padding_ratio))
        } else {
            None
        }
    }
}
