//! Box geometry shared by detection backends.

use crate::detection::domain::detection_record::BoundingBox;

/// IoU between two boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Corner form of an `(x, y, w, h)` box.
pub fn corners(bbox: &BoundingBox) -> [f64; 4] {
    let x = bbox.x as f64;
    let y = bbox.y as f64;
    [x, y, x + bbox.width as f64, y + bbox.height as f64]
}

/// Greedy non-maximum suppression over boxes already sorted by descending
/// score. Returns the indices that survive, in input order.
///
/// A box is dropped when its IoU with an earlier kept box exceeds
/// `iou_threshold`.
pub fn nms_sorted(boxes: &[BoundingBox], iou_threshold: f64) -> Vec<usize> {
    let corners: Vec<[f64; 4]> = boxes.iter().map(corners).collect();
    let mut keep: Vec<usize> = Vec::new();
    for (i, c) in corners.iter().enumerate() {
        if keep
            .iter()
            .all(|&k| bbox_iou(&corners[k], c) <= iou_threshold)
        {
            keep.push(i);
        }
    }
    keep
}
