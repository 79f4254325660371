use thiserror::Error;

/// Second-largest face area, as a fraction of the largest, at which the
/// frame is considered ambiguous.
pub const DEFAULT_AMBIGUITY_RATIO: f64 = 0.35;

/// Minimum face box width as a fraction of frame width.
pub const DEFAULT_MIN_FACE_RATIO: f64 = 0.12;

/// Margin added on each side of the face square, as a fraction of its side.
pub const DEFAULT_MARGIN_RATIO: f64 = 0.20;

/// Largest acceptable padding ratio before a face counts as partial.
pub const DEFAULT_MAX_PADDING_RATIO: f64 = 0.10;

#[derive(Error, Debug, PartialEq)]
pub enum GateConfigError {
    #[error("{name} must be within {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f64,
    },
}

/// Calibrated thresholds for the gating pipeline.
///
/// The defaults were tuned against the scoring model; in particular the
/// padding threshold only makes sense for the perimeter-normalized padding
/// ratio computed by [`CropRegion`](super::crop_geometry::CropRegion).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GateConfig {
    pub ambiguity_ratio: f64,
    pub min_face_ratio: f64,
    pub margin_ratio: f64,
    pub max_padding_ratio: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ambiguity_ratio: DEFAULT_AMBIGUITY_RATIO,
            min_face_ratio: DEFAULT_MIN_FACE_RATIO,
            margin_ratio: DEFAULT_MARGIN_RATIO,
            max_padding_ratio: DEFAULT_MAX_PADDING_RATIO,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<(), GateConfigError> {
        check(
            "ambiguity_ratio",
            "(0, 1]",
            self.ambiguity_ratio,
            |v| v > 0.0 && v <= 1.0,
        )?;
        check(
            "min_face_ratio",
            "[0, 1)",
            self.min_face_ratio,
            |v| (0.0..1.0).contains(&v),
        )?;
        check("margin_ratio", "[0, 2]", self.margin_ratio, |v| {
            (0.0..=2.0).contains(&v)
        })?;
        check(
            "max_padding_ratio",
            "[0, 1)",
            self.max_padding_ratio,
            |v| (0.0..1.0).contains(&v),
        )?;
        Ok(())
    }
}

fn check(
    name: &'static str,
    range: &'static str,
    value: f64,
    ok: impl Fn(f64) -> bool,
) -> Result<(), GateConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(GateConfigError::OutOfRange { name, range, value })
    }
}
