//! Postprocessing of YOLOv8 output tensors into frame detections

use crate::error::{DashboardError, Result};
use crate::preprocessing::LetterboxTransform;
use crate::types::{BoundingBox, Detection};
use ndarray::ArrayView;
use ndarray::IxDyn;
use regex::Regex;
use std::cmp::Ordering;
use std::path::Path;

/// Postprocessor for converting model outputs to detection results
pub struct Postprocessor {
    /// NMS threshold for removing duplicate detections
    nms_threshold: f32,
    /// Maximum number of detections to return
    max_detections: usize,
}

impl Postprocessor {
    pub fn new(nms_threshold: f32, max_detections: usize) -> Self {
        Self {
            nms_threshold,
            max_detections,
        }
    }

    /// Decode a `[1, 4 + nc, anchors]` tensor into detections on the frame
    ///
    /// Rows 0-3 hold the box center and size in model pixels, the remaining
    /// rows hold per-class scores.
    pub fn process(
        &self,
        output: ArrayView<f32, IxDyn>,
        class_names: &[String],
        confidence_threshold: f32,
        transform: &LetterboxTransform,
    ) -> Result<Vec<Detection>> {
        let shape = output.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            return Err(DashboardError::postprocessing(format!(
                "Unexpected output shape: {:?}",
                shape
            )));
        }

        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];
        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            let mut best_score = 0.0f32;
            let mut best_class = 0usize;
            for c in 0..num_classes {
                let score = output[[0, 4 + c, i]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }

            if best_score < confidence_threshold {
                continue;
            }

            let model_box = BoundingBox::from_center(
                output[[0, 0, i]],
                output[[0, 1, i]],
                output[[0, 2, i]],
                output[[0, 3, i]],
            );
            let bbox = transform.to_frame(&model_box);
            if !bbox.is_valid() {
                continue;
            }

            candidates.push(Detection::new(
                class_label(class_names, best_class),
                best_score,
                bbox,
            ));
        }

        let mut detections = self.apply_nms(candidates);
        detections.truncate(self.max_detections);
        Ok(detections)
    }

    /// Class-aware non-maximum suppression, highest confidence first
    pub fn apply_nms(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        detections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        let mut keep: Vec<Detection> = Vec::new();
        for det in detections {
            let suppressed = keep
                .iter()
                .any(|k| k.label == det.label && k.bbox.iou(&det.bbox) > self.nms_threshold);
            if !suppressed {
                keep.push(det);
            }
        }

        keep
    }
}

fn class_label(class_names: &[String], class_id: usize) -> String {
    class_names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", class_id))
}

/// Parse the `names` metadata entry written by Ultralytics exports,
/// e.g. `{0: 'Hardhat', 1: 'Mask'}`
pub fn parse_class_names(metadata: &str) -> Vec<String> {
    let Ok(pattern) = Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#) else {
        return Vec::new();
    };

    let mut entries: Vec<(usize, String)> = pattern
        .captures_iter(metadata)
        .filter_map(|cap| {
            let id = cap.get(1)?.as_str().parse::<usize>().ok()?;
            let name = cap.get(2).or_else(|| cap.get(3))?.as_str().to_string();
            Some((id, name))
        })
        .collect();
    entries.sort_by_key(|(id, _)| *id);

    let len = entries.last().map(|(id, _)| id + 1).unwrap_or(0);
    let mut names: Vec<String> = (0..len).map(|id| format!("class_{}", id)).collect();
    for (id, name) in entries {
        names[id] = name;
    }
    names
}

/// Read one class name per line, skipping blank lines
pub fn load_labels_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
