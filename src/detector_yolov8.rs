//! YOLOv8 PPE detector using ONNX Runtime
//!
//! Runs an Ultralytics YOLOv8 export on CPU, or on CUDA / CoreML when the
//! matching feature is enabled and `use_gpu` is set.

use crate::error::DashboardError;
use crate::postprocessing::{load_labels_file, parse_class_names, Postprocessor};
use crate::preprocessing::ImagePreprocessor;
use crate::types::{Detection, DetectorConfig, DEFAULT_PPE_CLASSES};
use image::RgbImage;
use log::{debug, info, warn};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};

/// YOLOv8 detector backed by an ONNX Runtime session
pub struct YoloV8Detector {
    session: Session,
    preprocessor: ImagePreprocessor,
    postprocessor: Postprocessor,
    class_names: Vec<String>,
}

impl YoloV8Detector {
    /// Load the model and resolve its class names
    ///
    /// Class names come from, in order: the labels file in the config, the
    /// `names` entry of the model metadata, the built-in PPE class list.
    pub fn new(config: DetectorConfig) -> Result<Self, DashboardError> {
        info!("Initializing ONNX Runtime detector");
        info!("Selected model: {}", config.model_path);

        let session = Self::create_session(&config)?;

        let class_names = match config.labels_path.as_deref() {
            Some(path) => {
                let names = load_labels_file(path).map_err(|e| {
                    DashboardError::model_load(format!("Failed to read labels {}: {}", path, e))
                })?;
                info!("Loaded {} class names from {}", names.len(), path);
                names
            }
            None => Self::class_names_from_metadata(&session).unwrap_or_else(|| {
                warn!("Model carries no class names, using the default PPE classes");
                DEFAULT_PPE_CLASSES.iter().map(|s| s.to_string()).collect()
            }),
        };

        let (input_w, input_h) = config.input_size;
        if input_w != input_h {
            return Err(DashboardError::config(format!(
                "YOLOv8 expects a square input, got {}x{}",
                input_w, input_h
            )));
        }

        Ok(Self {
            session,
            preprocessor: ImagePreprocessor::new(input_w),
            postprocessor: Postprocessor::new(config.nms_threshold, config.max_detections),
            class_names,
        })
    }

    fn create_session(config: &DetectorConfig) -> Result<Session, DashboardError> {
        if config.use_gpu {
            #[cfg(feature = "cuda")]
            {
                match Self::try_create_cuda_session(config) {
                    Ok(session) => {
                        info!("✓ Model loaded successfully with CUDA (NVIDIA GPU)");
                        return Ok(session);
                    }
                    Err(e) => {
                        warn!("CUDA initialization failed: {}", e);
                        warn!("Falling back to CPU...");
                    }
                }
            }

            #[cfg(feature = "metal")]
            {
                match Self::try_create_coreml_session(config) {
                    Ok(session) => {
                        info!("✓ Model loaded successfully with CoreML (GPU/Metal)");
                        return Ok(session);
                    }
                    Err(e) => {
                        warn!("CoreML initialization failed: {}", e);
                        warn!("Falling back to CPU...");
                    }
                }
            }

            #[cfg(not(any(feature = "cuda", feature = "metal")))]
            {
                warn!("No GPU backend feature enabled (cuda/metal), falling back to CPU");
            }
        }

        let session = Self::create_cpu_session(config)?;
        info!("✓ Model loaded successfully with CPU");
        Ok(session)
    }

    /// Try to create a GPU-accelerated session with CUDA (NVIDIA)
    #[cfg(feature = "cuda")]
    fn try_create_cuda_session(config: &DetectorConfig) -> Result<Session, DashboardError> {
        use ort::execution_providers::CUDAExecutionProvider;

        info!("Attempting to use CUDA backend (NVIDIA GPU)...");

        Session::builder()
            .map_err(|e| DashboardError::model_load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DashboardError::model_load(e.to_string()))?
            .with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(config.gpu_device_id)
                .build()])
            .map_err(|e| DashboardError::model_load(format!("CUDA provider failed: {}", e)))?
            .commit_from_file(&config.model_path)
            .map_err(|e| {
                DashboardError::model_load(format!("Failed to load model with CUDA: {}", e))
            })
    }

    /// Try to create a GPU-accelerated session with CoreML
    #[cfg(feature = "metal")]
    fn try_create_coreml_session(config: &DetectorConfig) -> Result<Session, DashboardError> {
        use ort::execution_providers::CoreMLExecutionProvider;

        info!("Attempting to use CoreML (Metal) backend...");

        Session::builder()
            .map_err(|e| DashboardError::model_load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DashboardError::model_load(e.to_string()))?
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
            .map_err(|e| DashboardError::model_load(format!("CoreML provider failed: {}", e)))?
            .commit_from_file(&config.model_path)
            .map_err(|e| {
                DashboardError::model_load(format!("Failed to load model with CoreML: {}", e))
            })
    }

    /// Create a CPU-only session
    fn create_cpu_session(config: &DetectorConfig) -> Result<Session, DashboardError> {
        let mut builder = Session::builder()
            .map_err(|e| DashboardError::model_load(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DashboardError::model_load(e.to_string()))?;

        if let Some(threads) = config.num_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| DashboardError::model_load(e.to_string()))?;
        }

        builder.commit_from_file(&config.model_path).map_err(|e| {
            DashboardError::model_load(format!(
                "Failed to load model {}: {}",
                config.model_path, e
            ))
        })
    }

    fn class_names_from_metadata(session: &Session) -> Option<Vec<String>> {
        let metadata = session.metadata().ok()?;
        let raw = metadata.custom("names").ok()??;
        let names = parse_class_names(&raw);
        if names.is_empty() {
            warn!("Could not parse model class names: {}", raw);
            return None;
        }
        Some(names)
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Detect PPE items in a frame
    pub fn detect(
        &mut self,
        frame: &RgbImage,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, DashboardError> {
        debug!(
            "Starting detection on {}x{} frame",
            frame.width(),
            frame.height()
        );

        let (input_tensor, transform) = self.preprocessor.preprocess(frame);
        let input_tensor = input_tensor.into_dyn();

        let tensor_ref = TensorRef::from_array_view(&input_tensor)
            .map_err(|e| DashboardError::inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| DashboardError::inference(e.to_string()))?;

        // Extract and own the output tensor
        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DashboardError::postprocessing(e.to_string()))?
            .into_owned();

        // Drop outputs to release borrow on self
        drop(outputs);

        let detections = self.postprocessor.process(
            output_array.view(),
            &self.class_names,
            confidence_threshold,
            &transform,
        )?;

        debug!("Detected {} items", detections.len());
        Ok(detections)
    }
}
