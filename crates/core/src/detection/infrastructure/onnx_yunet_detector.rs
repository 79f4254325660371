/// YuNet (2023mar) face detector using ONNX Runtime via `ort`.
///
/// The model is anchor-free with three output heads per stride (8, 16, 32):
/// class score, objectness, box regression and five landmark offsets. Decoding,
/// score filtering and NMS happen here; the gate sees plain detection records.
use std::borrow::Cow;
use std::path::Path;

use ndarray::Array4;

use crate::detection::domain::detection_record::{BoundingBox, DetectionRecord, Landmark};
use crate::detection::domain::face_detector::FaceDetector;
use crate::gating::domain::normalizer::resize_bilinear;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::load_session;

use super::math::nms_sorted;

/// Default minimum face score.
pub const DEFAULT_CONFIDENCE: f32 = 0.6;

/// Default NMS IoU threshold.
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.3;

/// Default number of candidates kept before NMS.
pub const DEFAULT_TOP_K: usize = 5000;

const STRIDES: [usize; 3] = [8, 16, 32];

/// Dynamic model inputs are zero-padded up to a multiple of this.
const INPUT_ALIGNMENT: u32 = 32;

const HEADS: [&str; 4] = ["cls", "obj", "bbox", "kps"];

/// Detector thresholds, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    pub confidence: f32,
    pub nms_threshold: f32,
    pub top_k: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// YuNet face detector backed by an ONNX Runtime session.
pub struct OnnxYunetDetector {
    session: ort::session::Session,
    config: DetectorConfig,
    /// `(width, height)` when the model was exported with a static input.
    fixed_input: Option<(u32, u32)>,
}

impl OnnxYunetDetector {
    /// Load a YuNet ONNX model.
    ///
    /// Fails if the model does not expose the twelve `{cls,obj,bbox,kps}_{8,16,32}`
    /// outputs.
    pub fn new(model_path: &Path, config: DetectorConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path, 1)?;

        for stride in STRIDES {
            for head in HEADS {
                let name = format!("{head}_{stride}");
                if !session.outputs().iter().any(|o| o.name() == name) {
                    return Err(format!("YuNet model is missing output '{name}'").into());
                }
            }
        }

        // NCHW: [1, 3, H, W]; negative dims are dynamic.
        let fixed_input = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                if shape.len() >= 4 && shape[2] > 0 && shape[3] > 0 {
                    Some((shape[3] as u32, shape[2] as u32))
                } else {
                    None
                }
            } else {
                None
            }
        });
        if let Some((w, h)) = fixed_input {
            log::info!("YuNet model has a static {w}x{h} input; frames will be resized");
        }

        Ok(Self {
            session,
            config,
            fixed_input,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

impl FaceDetector for OnnxYunetDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRecord>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let input = prepare_input(frame, self.fixed_input);
        let in_w = input.width as usize;
        let in_h = input.height as usize;

        let input_value = ort::value::Tensor::from_array(input.tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let mut faces = Vec::new();
        for stride in STRIDES {
            let (_, cls) = outputs[format!("cls_{stride}").as_str()].try_extract_tensor::<f32>()?;
            let (_, obj) = outputs[format!("obj_{stride}").as_str()].try_extract_tensor::<f32>()?;
            let (_, bbox) = outputs[format!("bbox_{stride}").as_str()].try_extract_tensor::<f32>()?;
            let (_, kps) = outputs[format!("kps_{stride}").as_str()].try_extract_tensor::<f32>()?;

            let heads = StrideHeads {
                cls,
                obj,
                bbox,
                kps,
            };
            let grid = Grid {
                stride,
                cols: in_w / stride,
                rows: in_h / stride,
            };
            decode_stride(
                &heads,
                grid,
                self.config.confidence,
                (input.scale_x, input.scale_y),
                &mut faces,
            )?;
        }

        Ok(select_faces(faces, &self.config))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// NCHW model input plus the factors that map model coordinates back to the
/// frame.
struct PreparedInput {
    tensor: Array4<f32>,
    width: u32,
    height: u32,
    scale_x: f32,
    scale_y: f32,
}

/// Smallest multiple of 32 that is `>= len`.
fn aligned_dim(len: u32) -> u32 {
    len.div_ceil(INPUT_ALIGNMENT) * INPUT_ALIGNMENT
}

/// BGR values in `[0, 255]`, channels first.
///
/// Dynamic models get the frame at native resolution, zero-padded on the
/// bottom and right. Static models get the frame resized to their input.
fn prepare_input(frame: &Frame, fixed_input: Option<(u32, u32)>) -> PreparedInput {
    let (source, width, height, scale_x, scale_y) = match fixed_input {
        Some((w, h)) => (
            Cow::Owned(resize_bilinear(frame, w, h)),
            w,
            h,
            frame.width() as f32 / w as f32,
            frame.height() as f32 / h as f32,
        ),
        None => (
            Cow::Borrowed(frame),
            aligned_dim(frame.width()),
            aligned_dim(frame.height()),
            1.0,
            1.0,
        ),
    };

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    let src = source.as_ndarray();
    for y in 0..source.height() as usize {
        for x in 0..source.width() as usize {
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[y, x, c]] as f32;
            }
        }
    }

    PreparedInput {
        tensor,
        width,
        height,
        scale_x,
        scale_y,
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Flattened outputs of one stride: `cls`/`obj` are `[N]`, `bbox` is `[N, 4]`
/// and `kps` is `[N, 10]`, with `N = rows * cols` in row-major cell order.
struct StrideHeads<'a> {
    cls: &'a [f32],
    obj: &'a [f32],
    bbox: &'a [f32],
    kps: &'a [f32],
}

#[derive(Clone, Copy, Debug)]
struct Grid {
    stride: usize,
    cols: usize,
    rows: usize,
}

/// A decoded face in continuous frame coordinates.
#[derive(Clone, Debug, PartialEq)]
struct RawFace {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    score: f32,
    landmarks: [(f32, f32); 5],
}

fn decode_stride(
    heads: &StrideHeads<'_>,
    grid: Grid,
    confidence: f32,
    (scale_x, scale_y): (f32, f32),
    out: &mut Vec<RawFace>,
) -> Result<(), Box<dyn std::error::Error>> {
    let n = grid.rows * grid.cols;
    if heads.cls.len() < n || heads.obj.len() < n || heads.bbox.len() < n * 4 || heads.kps.len() < n * 10 {
        return Err(format!(
            "Unexpected YuNet output size for stride {}: expected {n} cells",
            grid.stride
        )
        .into());
    }

    let s = grid.stride as f32;
    for r in 0..grid.rows {
        for c in 0..grid.cols {
            let idx = r * grid.cols + c;

            let cls = heads.cls[idx].clamp(0.0, 1.0);
            let obj = heads.obj[idx].clamp(0.0, 1.0);
            let score = (cls * obj).sqrt();
            if score < confidence {
                continue;
            }

            let b = &heads.bbox[idx * 4..idx * 4 + 4];
            let cx = (c as f32 + b[0]) * s;
            let cy = (r as f32 + b[1]) * s;
            let w = b[2].exp() * s;
            let h = b[3].exp() * s;

            let k = &heads.kps[idx * 10..idx * 10 + 10];
            let mut landmarks = [(0.0f32, 0.0f32); 5];
            for (i, lm) in landmarks.iter_mut().enumerate() {
                *lm = (
                    (c as f32 + k[2 * i]) * s * scale_x,
                    (r as f32 + k[2 * i + 1]) * s * scale_y,
                );
            }

            out.push(RawFace {
                x: (cx - w / 2.0) * scale_x,
                y: (cy - h / 2.0) * scale_y,
                width: w * scale_x,
                height: h * scale_y,
                score,
                landmarks,
            });
        }
    }
    Ok(())
}

/// Sort by score, keep `top_k`, truncate to integer boxes, then NMS.
fn select_faces(mut faces: Vec<RawFace>, config: &DetectorConfig) -> Vec<DetectionRecord> {
    faces.sort_by(|a, b| b.score.total_cmp(&a.score));
    faces.truncate(config.top_k);

    let records: Vec<DetectionRecord> = faces
        .into_iter()
        .map(|f| {
            let bbox = BoundingBox::new(f.x as i32, f.y as i32, f.width as i32, f.height as i32);
            let landmarks = f.landmarks.map(|(x, y)| Landmark::new(x, y));
            DetectionRecord::new(bbox, f.score, landmarks)
        })
        .collect();

    let boxes: Vec<BoundingBox> = records.iter().map(|r| r.bbox).collect();
    let keep = nms_sorted(&boxes, config.nms_threshold as f64);
    log::trace!("YuNet: {} candidates, {} after NMS", records.len(), keep.len());

    let mut keep = keep.into_iter().peekable();
    records
        .into_iter()
        .enumerate()
        .filter_map(|(i, r)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(r)
            } else {
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
