//! Scripted detector used by tests and the `--stub` demo mode

use crate::detector_trait::Detector;
use crate::error::{DashboardError, Result};
use crate::types::{BoundingBox, Detection, DEFAULT_PPE_CLASSES};
use image::RgbImage;
use std::collections::VecDeque;

/// Detector that replays a fixed script instead of running a model
///
/// Each call to `detect` consumes the next scripted frame; once the script
/// is exhausted the last entry repeats. Detections below the requested
/// threshold are filtered out the same way a real model would drop them.
pub struct StubDetector {
    script: VecDeque<Result<Vec<Detection>>>,
    last: Vec<Detection>,
    class_names: Vec<String>,
    calls: usize,
}

impl StubDetector {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: script.into_iter().map(Ok).collect(),
            last: Vec::new(),
            class_names: DEFAULT_PPE_CLASSES.iter().map(|s| s.to_string()).collect(),
            calls: 0,
        }
    }

    /// A stub that never reports anything
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Demo scene: a worker with hardhat and vest, and one missing mask
    pub fn demo() -> Self {
        log::info!("Creating stub detector (no model loaded)");
        Self::new(vec![vec![
            Detection::new("Person", 0.91, BoundingBox::new(420.0, 160.0, 760.0, 700.0)),
            Detection::new("Hardhat", 0.88, BoundingBox::new(520.0, 170.0, 640.0, 250.0)),
            Detection::new("Safety Vest", 0.74, BoundingBox::new(470.0, 330.0, 720.0, 520.0)),
            Detection::new("NO-Mask", 0.41, BoundingBox::new(545.0, 260.0, 620.0, 320.0)),
        ]])
    }

    /// Queue an inference failure as the next result
    pub fn push_failure<S: Into<String>>(&mut self, msg: S) {
        self.script.push_back(Err(DashboardError::inference(msg)));
    }

    pub fn push_frame(&mut self, detections: Vec<Detection>) {
        self.script.push_back(Ok(detections));
    }

    /// Number of frames this stub has been asked to detect
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Detector for StubDetector {
    fn detect(&mut self, _frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        self.calls += 1;

        if let Some(next) = self.script.pop_front() {
            self.last = next?;
        }

        Ok(self
            .last
            .iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .cloned()
            .collect())
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn name(&self) -> &str {
        "stub"
    }
}
