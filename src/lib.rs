//! PPE Detection Dashboard Library
//!
//! Real-time personal protective equipment detection: frames come from a
//! camera, a YOLOv8 model finds PPE items, and each frame is annotated with
//! boxes and a dashboard overlay before it is shown. Keyboard commands
//! adjust the confidence threshold, pause the stream and save snapshots.

pub mod app;
pub mod config;
pub mod dashboard;
pub mod detector_stub;
pub mod detector_trait;
pub mod error;
pub mod font;
pub mod image_utils;
pub mod palette;
pub mod postprocessing;
pub mod preprocessing;
pub mod renderer;
pub mod types;

#[cfg(feature = "onnx")]
pub mod detector_yolov8;

#[cfg(feature = "opencv")]
pub mod video;

pub use app::{App, AppOptions, FailurePolicy, FrameDisplay, FrameSource, KeyAction, StopReason};
pub use config::AppConfig;
pub use detector_stub::StubDetector;
pub use detector_trait::Detector;
pub use error::{DashboardError, Result};
pub use renderer::DetectionRenderer;
pub use types::{
    BoundingBox, Detection, DetectorConfig, RuntimeParameters, SessionStats, SessionSummary,
};

#[cfg(feature = "onnx")]
pub use detector_yolov8::YoloV8Detector;

/// Initialize the dashboard library
pub fn init() -> Result<()> {
    log::info!("PPE detection dashboard library initialized");
    Ok(())
}

/// Get library version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
