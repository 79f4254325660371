//! Crop → model input tensor.

use ndarray::Array4;

use crate::shared::constants::{IMAGENET_MEAN, IMAGENET_STD, MODEL_INPUT_SIZE};
use crate::shared::frame::{Frame, CHANNELS};

/// Resizes a BGR crop to the scoring model's square input and standardizes
/// it into a `(1, 3, size, size)` RGB tensor.
#[derive(Clone, Debug)]
pub struct Normalizer {
    size: usize,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(MODEL_INPUT_SIZE, IMAGENET_MEAN, IMAGENET_STD)
    }
}

impl Normalizer {
    /// `mean` and `std` are per RGB channel on the `[0, 1]` scale.
    pub fn new(size: usize, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self { size, mean, std }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn normalize(&self, crop: &Frame) -> Array4<f32> {
        let n = self.size;
        let resized = resize_bilinear(crop, n as u32, n as u32);
        let data = resized.data();

        let mut tensor = Array4::<f32>::zeros((1, 3, n, n));
        for y in 0..n {
            for x in 0..n {
                let i = (y * n + x) * CHANNELS;
                // BGR → RGB
                let rgb = [data[i + 2], data[i + 1], data[i]];
                for c in 0..3 {
                    let v = rgb[c] as f32 / 255.0;
                    tensor[[0, c, y, x]] = (v - self.mean[c]) / self.std[c];
                }
            }
        }
        tensor
    }
}

/// One axis of a half-pixel bilinear mapping: left source index, right source
/// index and the weight of the right one.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Tap {
    lo: usize,
    hi: usize,
    frac: f32,
}

fn taps(src_len: u32, dst_len: u32) -> Vec<Tap> {
    let scale = src_len as f64 / dst_len as f64;
    let last = src_len as i64 - 1;
    (0..dst_len)
        .map(|d| {
            let f = (d as f64 + 0.5) * scale - 0.5;
            let mut lo = f.floor() as i64;
            let mut frac = (f - lo as f64) as f32;
            if lo < 0 {
                lo = 0;
                frac = 0.0;
            }
            if lo >= last {
                lo = last;
                frac = 0.0;
            }
            let lo = lo as usize;
            Tap {
                lo,
                hi: (lo + 1).min(last as usize),
                frac,
            }
        })
        .collect()
}

/// Bilinear resize with half-pixel centers and edge clamping, rounded back to
/// 8-bit.
pub fn resize_bilinear(frame: &Frame, out_width: u32, out_height: u32) -> Frame {
    if frame.width() == out_width && frame.height() == out_height {
        return frame.clone();
    }

    let xs = taps(frame.width(), out_width);
    let ys = taps(frame.height(), out_height);
    let src = frame.data();
    let stride = frame.width() as usize * CHANNELS;

    let mut out = Vec::with_capacity(out_width as usize * out_height as usize * CHANNELS);
    for ty in &ys {
        let row0 = &src[ty.lo * stride..(ty.lo + 1) * stride];
        let row1 = &src[ty.hi * stride..(ty.hi + 1) * stride];
        for tx in &xs {
            for c in 0..CHANNELS {
                let a = row0[tx.lo * CHANNELS + c] as f32;
                let b = row0[tx.hi * CHANNELS + c] as f32;
                let d = row1[tx.lo * CHANNELS + c] as f32;
                let e = row1[tx.hi * CHANNELS + c] as f32;
                let top = a + (b - a) * tx.frac;
                let bottom = d + (e - d) * tx.frac;
                let v = top + (bottom - top) * ty.frac;
                out.push(v.round().clamp(0.0, 255.0) as u8);
            }
        }
    }
    Frame::new(out, out_width, out_height)
}
