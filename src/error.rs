//! Error types for the PPE detection dashboard

use thiserror::Error;

/// Result type alias for the dashboard library
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Errors that can occur while detecting, rendering or driving the capture loop
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Model loading failed: {0}")]
    ModelLoadError(String),

    #[error("Inference failed: {0}")]
    InferenceError(String),

    #[error("Image preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("Camera error: {0}")]
    CameraError(String),

    #[error("Display error: {0}")]
    DisplayError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No frames were processed in this session")]
    NoFramesProcessed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCvError(#[from] opencv::Error),
}

impl DashboardError {
    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoadError(msg.into())
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::InferenceError(msg.into())
    }

    pub fn preprocessing<S: Into<String>>(msg: S) -> Self {
        Self::PreprocessingError(msg.into())
    }

    pub fn postprocessing<S: Into<String>>(msg: S) -> Self {
        Self::InferenceError(format!("Postprocessing error: {}", msg.into()))
    }

    pub fn camera<S: Into<String>>(msg: S) -> Self {
        Self::CameraError(msg.into())
    }

    pub fn display<S: Into<String>>(msg: S) -> Self {
        Self::DisplayError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }
}
