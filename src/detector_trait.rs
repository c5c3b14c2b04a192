/// Unified detector trait for the model backends
///
/// The renderer and the capture loop only talk to this interface, so the
/// ONNX detector and the scripted stub are interchangeable.
use crate::error::Result;
use crate::types::Detection;
use image::RgbImage;

/// Common interface for object detectors
pub trait Detector {
    /// Detect objects in a single frame, keeping only scores at or above
    /// `confidence_threshold`
    fn detect(&mut self, frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>>;

    /// Class names the model can report
    fn class_names(&self) -> &[String];

    /// Get the detector name (for logging/debugging)
    fn name(&self) -> &str;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        (**self).detect(frame, confidence_threshold)
    }

    fn class_names(&self) -> &[String] {
        (**self).class_names()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(feature = "onnx")]
impl Detector for crate::detector_yolov8::YoloV8Detector {
    fn detect(&mut self, frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        self.detect(frame, confidence_threshold)
    }

    fn class_names(&self) -> &[String] {
        self.class_names()
    }

    fn name(&self) -> &str {
        "YOLOv8"
    }
}
