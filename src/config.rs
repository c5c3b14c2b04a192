//! Command-line and environment configuration

use crate::app::{AppOptions, FailurePolicy};
use crate::error::{DashboardError, Result};
use crate::types::{DetectorConfig, MAX_CONFIDENCE, MIN_CONFIDENCE};
use clap::Parser;
use std::path::PathBuf;

/// Real-time PPE detection dashboard
#[derive(Parser, Debug, Clone)]
#[command(name = "ppe-dashboard", version)]
pub struct AppConfig {
    /// Path to the YOLOv8 ONNX model
    #[arg(long, env = "PPE_MODEL", default_value = "ppe_local.onnx")]
    pub model: String,

    /// Optional labels file, one class name per line
    #[arg(long, env = "PPE_LABELS")]
    pub labels: Option<String>,

    /// Camera index
    #[arg(long, env = "PPE_CAMERA", default_value_t = 0)]
    pub camera: i32,

    /// Requested capture width
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Initial confidence threshold
    #[arg(long, default_value_t = 0.25)]
    pub confidence: f32,

    /// IoU threshold for non-maximum suppression
    #[arg(long, default_value_t = 0.7)]
    pub nms_threshold: f32,

    /// Directory for saved snapshots
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write the session summary as JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Keep running when a single frame fails to process
    #[arg(long)]
    pub skip_failed_frames: bool,

    /// Try a GPU execution provider before falling back to CPU
    #[arg(long)]
    pub use_gpu: bool,

    /// Replay a canned scene instead of loading a model
    #[arg(long)]
    pub stub: bool,
}

impl AppConfig {
    /// Reject values the loop cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&self.confidence) {
            return Err(DashboardError::config(format!(
                "confidence must be within [{}, {}], got {}",
                MIN_CONFIDENCE, MAX_CONFIDENCE, self.confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err(DashboardError::config(format!(
                "nms-threshold must be within [0, 1], got {}",
                self.nms_threshold
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(DashboardError::config("capture size must be non-zero"));
        }
        Ok(())
    }

    pub fn capture_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            model_path: self.model.clone(),
            labels_path: self.labels.clone(),
            nms_threshold: self.nms_threshold,
            use_gpu: self.use_gpu,
            ..DetectorConfig::default()
        }
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            output_dir: self.output_dir.clone(),
            failure_policy: if self.skip_failed_frames {
                FailurePolicy::SkipFrame
            } else {
                FailurePolicy::FailFast
            },
            initial_confidence: self.confidence,
        }
    }
}
