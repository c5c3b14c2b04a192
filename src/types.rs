//! Type definitions for PPE detection and the dashboard session

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Lowest confidence threshold reachable from the keyboard
pub const MIN_CONFIDENCE: f32 = 0.05;
/// Highest confidence threshold reachable from the keyboard
pub const MAX_CONFIDENCE: f32 = 0.95;
/// Threshold change applied by a single `+`/`-` key press
pub const CONFIDENCE_STEP: f32 = 0.05;
/// Threshold used when nothing else is configured
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Class names of the stock construction-site PPE model, used when the
/// model carries no `names` metadata and no labels file is given
pub const DEFAULT_PPE_CLASSES: &[&str] = &[
    "Hardhat",
    "Mask",
    "NO-Hardhat",
    "NO-Mask",
    "NO-Safety Vest",
    "Person",
    "Safety Cone",
    "Safety Vest",
    "machinery",
    "vehicle",
];

/// Bounding box in frame pixel coordinates (corner form)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from YOLO center form
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// A box is drawable only when both corners are strictly ordered
    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Clamp the box to an image of the given size
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }

    /// Calculate intersection over union (IoU) with another bounding box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x_left = self.x1.max(other.x1);
        let y_top = self.y1.max(other.y1);
        let x_right = self.x2.min(other.x2);
        let y_bottom = self.y2.min(other.y2);

        if x_right <= x_left || y_bottom <= y_top {
            return 0.0;
        }

        let intersection_area = (x_right - x_left) * (y_bottom - y_top);
        let union_area = self.area() + other.area() - intersection_area;
        if union_area <= 0.0 {
            return 0.0;
        }

        intersection_area / union_area
    }

    /// Integer pixel corners, as used by the drawing routines
    pub fn to_pixels(&self) -> (i32, i32, i32, i32) {
        (
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        )
    }
}

/// A single labeled box produced by the model for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class name exactly as reported by the model
    pub label: String,
    /// Model confidence score (0-1)
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new<S: Into<String>>(label: S, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// Keyboard-driven parameters read by every processed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeParameters {
    pub confidence_threshold: f32,
    pub paused: bool,
}

impl RuntimeParameters {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold: clamp_confidence(confidence_threshold),
            paused: false,
        }
    }

    pub fn increase_confidence(&mut self) -> f32 {
        self.confidence_threshold =
            clamp_confidence(self.confidence_threshold + CONFIDENCE_STEP);
        self.confidence_threshold
    }

    pub fn decrease_confidence(&mut self) -> f32 {
        self.confidence_threshold =
            clamp_confidence(self.confidence_threshold - CONFIDENCE_STEP);
        self.confidence_threshold
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Threshold as a whole percentage, as shown on the dashboard
    pub fn confidence_percent(&self) -> f32 {
        self.confidence_threshold * 100.0
    }
}

impl Default for RuntimeParameters {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE)
    }
}

/// Snap to the 0.01 grid so repeated steps never drift, then clamp
fn clamp_confidence(value: f32) -> f32 {
    ((value * 100.0).round() / 100.0).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Running counters for one capture session
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub frame_count: u64,
    pub total_detections: u64,
    pub start_time: Instant,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            total_detections: 0,
            start_time: Instant::now(),
        }
    }

    /// Count a new frame and return its 1-based index
    pub fn begin_frame(&mut self) -> u64 {
        self.frame_count += 1;
        self.frame_count
    }

    pub fn record_detections(&mut self, count: usize) {
        self.total_detections += count as u64;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Freeze the counters into a printable summary
    pub fn summary(&self) -> SessionSummary {
        SessionSummary::new(self.frame_count, self.total_detections, self.elapsed())
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate figures printed when the session ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub total_detections: u64,
    pub duration_secs: f64,
    pub average_fps: f64,
}

impl SessionSummary {
    pub fn new(frames: u64, total_detections: u64, duration: Duration) -> Self {
        let duration_secs = duration.as_secs_f64();
        let average_fps = if duration_secs > 0.0 {
            frames as f64 / duration_secs
        } else {
            0.0
        };

        Self {
            frames,
            total_detections,
            duration_secs,
            average_fps,
        }
    }

    /// Average detections per processed frame
    ///
    /// Fails with [`DashboardError::NoFramesProcessed`] when the session ended
    /// before the first frame.
    pub fn detections_per_frame(&self) -> Result<f64> {
        if self.frames == 0 {
            return Err(DashboardError::NoFramesProcessed);
        }
        Ok(self.total_detections as f64 / self.frames as f64)
    }

    /// Write the summary as pretty JSON
    pub fn write_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "SESSION SUMMARY")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Frames:              {}", self.frames)?;
        writeln!(f, "Average FPS:         {:.1}", self.average_fps)?;
        writeln!(f, "Duration:            {:.1}s", self.duration_secs)?;
        writeln!(f, "Total detections:    {}", self.total_detections)?;
        match self.detections_per_frame() {
            Ok(avg) => writeln!(f, "Avg per frame:       {:.2}", avg)?,
            Err(_) => writeln!(f, "Avg per frame:       n/a")?,
        }
        write!(f, "{}", rule)
    }
}

/// Detector configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to the ONNX model file
    pub model_path: String,

    /// Optional newline-separated class names file
    pub labels_path: Option<String>,

    /// Model input size (width, height)
    pub input_size: (u32, u32),

    /// Non-maximum suppression IoU threshold (0-1)
    pub nms_threshold: f32,

    /// Maximum number of detections per frame
    pub max_detections: usize,

    /// Use GPU acceleration if available
    pub use_gpu: bool,

    /// GPU device ID (for multi-GPU systems)
    pub gpu_device_id: i32,

    /// Number of threads for CPU inference
    pub num_threads: Option<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "ppe_local.onnx".to_string(),
            labels_path: None,
            input_size: (640, 640),
            nms_threshold: 0.7,
            max_detections: 300,
            use_gpu: false,
            gpu_device_id: 0,
            num_threads: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_confidence_stays_in_range() {
        let mut params = RuntimeParameters::default();
        for _ in 0..50 {
            params.increase_confidence();
            assert!(params.confidence_threshold <= MAX_CONFIDENCE);
        }
        assert_abs_diff_eq!(params.confidence_threshold, MAX_CONFIDENCE);

        for _ in 0..50 {
            params.decrease_confidence();
            assert!(params.confidence_threshold >= MIN_CONFIDENCE);
        }
        assert_abs_diff_eq!(params.confidence_threshold, MIN_CONFIDENCE);
    }

    #[test]
    fn test_confidence_step_has_no_drift() {
        let mut params = RuntimeParameters::new(0.25);
        for _ in 0..7 {
            params.increase_confidence();
        }
        for _ in 0..7 {
            params.decrease_confidence();
        }
        assert_eq!(params.confidence_threshold, 0.25);
        assert_eq!(params.confidence_percent().round(), 25.0);
    }

    #[test]
    fn test_initial_confidence_is_clamped() {
        assert_eq!(RuntimeParameters::new(2.0).confidence_threshold, MAX_CONFIDENCE);
        assert_eq!(RuntimeParameters::new(0.0).confidence_threshold, MIN_CONFIDENCE);
    }

    #[test]
    fn test_toggle_pause() {
        let mut params = RuntimeParameters::default();
        assert!(params.toggle_pause());
        assert!(!params.toggle_pause());
    }

    #[test]
    fn test_bounding_box_iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert_abs_diff_eq!(a.iou(&b), 25.0 / 175.0, epsilon = 0.001);
        assert_eq!(a.iou(&BoundingBox::new(20.0, 20.0, 30.0, 30.0)), 0.0);
    }

    #[test]
    fn test_bounding_box_from_center_and_clamp() {
        let bbox = BoundingBox::from_center(10.0, 10.0, 30.0, 10.0);
        assert_eq!(bbox, BoundingBox::new(-5.0, 5.0, 25.0, 15.0));

        let clamped = bbox.clamp_to(20, 20);
        assert_eq!(clamped, BoundingBox::new(0.0, 5.0, 20.0, 15.0));
        assert!(clamped.is_valid());
        assert!(!BoundingBox::new(3.0, 3.0, 3.0, 8.0).is_valid());
    }

    #[test]
    fn test_summary_without_frames_is_an_error() {
        let summary = SessionSummary::new(0, 0, Duration::from_secs(3));
        assert!(matches!(
            summary.detections_per_frame(),
            Err(DashboardError::NoFramesProcessed)
        ));
        assert!(summary.to_string().contains("Avg per frame:       n/a"));
    }

    #[test]
    fn test_summary_averages() {
        let summary = SessionSummary::new(60, 90, Duration::from_secs(2));
        assert_abs_diff_eq!(summary.average_fps, 30.0);
        assert_abs_diff_eq!(summary.detections_per_frame().unwrap(), 1.5);
        assert!(summary.to_string().contains("Avg per frame:       1.50"));
    }

    #[test]
    fn test_summary_zero_duration() {
        let summary = SessionSummary::new(0, 0, Duration::ZERO);
        assert_eq!(summary.average_fps, 0.0);
    }

    #[test]
    fn test_session_stats_counts() {
        let mut stats = SessionStats::new();
        assert_eq!(stats.begin_frame(), 1);
        stats.record_detections(3);
        assert_eq!(stats.begin_frame(), 2);
        stats.record_detections(0);

        let summary = stats.summary();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.total_detections, 3);
    }
}
