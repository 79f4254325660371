use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::detection_record::DetectionRecord;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;

/// Fixed set of detector instances shared across worker threads.
///
/// Each detector serves one frame at a time. Callers check one out, use it,
/// and it returns to the pool when the guard drops. Checkout blocks while all
/// instances are busy.
pub struct DetectorPool {
    tx: Sender<Box<dyn FaceDetector>>,
    rx: Receiver<Box<dyn FaceDetector>>,
    size: usize,
}

impl DetectorPool {
    pub fn new(detectors: Vec<Box<dyn FaceDetector>>) -> Result<Self, Box<dyn std::error::Error>> {
        if detectors.is_empty() {
            return Err("Detector pool needs at least one detector".into());
        }
        let size = detectors.len();
        let (tx, rx) = crossbeam_channel::bounded(size);
        for detector in detectors {
            tx.send(detector)
                .map_err(|_| "Detector pool channel closed")?;
        }
        Ok(Self { tx, rx, size })
    }

    /// Build `size` detectors with `factory`, failing on the first error.
    pub fn build<F>(size: usize, mut factory: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: FnMut() -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>>,
    {
        let detectors = (0..size).map(|_| factory()).collect::<Result<Vec<_>, _>>()?;
        Self::new(detectors)
    }

    /// Wait for a free detector.
    pub fn checkout(&self) -> Result<PooledDetector<'_>, Box<dyn std::error::Error>> {
        let detector = self.rx.recv()?;
        Ok(PooledDetector {
            pool: self,
            detector: Some(detector),
        })
    }

    /// A free detector, or `None` if all are checked out.
    pub fn try_checkout(&self) -> Option<PooledDetector<'_>> {
        self.rx.try_recv().ok().map(|detector| PooledDetector {
            pool: self,
            detector: Some(detector),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of detectors not currently checked out.
    pub fn available(&self) -> usize {
        self.rx.len()
    }
}

/// A checked-out detector; returns itself to the pool on drop.
pub struct PooledDetector<'a> {
    pool: &'a DetectorPool,
    detector: Option<Box<dyn FaceDetector>>,
}

impl FaceDetector for PooledDetector<'_> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionRecord>, Box<dyn std::error::Error>> {
        match self.detector.as_mut() {
            Some(detector) => detector.detect(frame),
            None => Err("Pooled detector already released".into()),
        }
    }
}

impl Drop for PooledDetector<'_> {
    fn drop(&mut self) {
        if let Some(detector) = self.detector.take() {
            // Capacity equals pool size, so this never blocks.
            if self.pool.tx.send(detector).is_err() {
                log::warn!("Detector pool closed; dropping detector");
            }
        }
    }
}
