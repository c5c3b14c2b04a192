//! Per-frame detection and annotation

use crate::dashboard::{text_at_baseline, Dashboard, PanelStats};
use crate::detector_trait::Detector;
use crate::error::Result;
use crate::font::text_size;
use crate::image_utils::{draw_rect, fill_rect};
use crate::palette::{ppe_color, COLOR_LABEL_BG, COLOR_TEXT};
use crate::types::{Detection, RuntimeParameters};
use image::RgbImage;

const BOX_THICKNESS: i32 = 3;
const LABEL_SCALE: u32 = 2;

/// Runs the detector on a frame and draws boxes plus the dashboard onto it
pub struct DetectionRenderer<D: Detector> {
    detector: D,
}

impl<D: Detector> DetectionRenderer<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Detect, annotate `frame` in place, and return the detection count
    ///
    /// Detector failures are returned untouched and leave the frame
    /// unannotated.
    pub fn process(
        &mut self,
        frame: &mut RgbImage,
        params: &RuntimeParameters,
        fps: f64,
        frame_index: u64,
        elapsed_secs: f64,
    ) -> Result<usize> {
        let detections = self.detector.detect(frame, params.confidence_threshold)?;

        draw_detection_boxes(frame, &detections);

        let panel = PanelStats {
            fps,
            frame_count: frame_index,
            elapsed_secs,
            confidence_threshold: params.confidence_threshold,
        };
        Dashboard::build(&detections, panel).draw(frame);

        log::debug!(
            "Frame {}: {} detections at {:.0}% confidence",
            frame_index,
            detections.len(),
            params.confidence_percent()
        );

        Ok(detections.len())
    }
}

/// Draw each detection as a colored box with its label on a black tab
pub fn draw_detection_boxes(frame: &mut RgbImage, detections: &[Detection]) {
    for det in detections {
        let color = ppe_color(&det.label);
        let (x1, y1, x2, y2) = det.bbox.to_pixels();

        draw_rect(frame, x1, y1, x2, y2, color, BOX_THICKNESS);

        let (tw, th) = text_size(&det.label, LABEL_SCALE);
        fill_rect(
            frame,
            x1,
            y1 - th as i32 - 10,
            x1 + tw as i32 + 10,
            y1,
            COLOR_LABEL_BG,
        );
        text_at_baseline(frame, &det.label, x1 + 5, y1 - 5, LABEL_SCALE, COLOR_TEXT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector_stub::StubDetector;
    use crate::palette::{COLOR_SAFE, COLOR_UNSAFE};
    use crate::types::BoundingBox;
    use image::Rgb;

    const GREY: Rgb<u8> = Rgb([90, 90, 90]);

    fn frame() -> RgbImage {
        RgbImage::from_pixel(1280, 720, GREY)
    }

    fn helmet_at(x1: f32, y1: f32, confidence: f32) -> Detection {
        Detection::new(
            "Helmet",
            confidence,
            BoundingBox::new(x1, y1, x1 + 100.0, y1 + 80.0),
        )
    }

    #[test]
    fn test_process_counts_and_status_bar() {
        let stub = StubDetector::new(vec![
            vec![helmet_at(100.0, 200.0, 0.9), helmet_at(400.0, 200.0, 0.8)],
            vec![],
        ]);
        let mut renderer = DetectionRenderer::new(stub);
        let params = RuntimeParameters::default();

        let mut first = frame();
        let count = renderer.process(&mut first, &params, 0.0, 1, 0.1).unwrap();
        assert_eq!(count, 2);
        assert_eq!(*first.get_pixel(2, 2), COLOR_SAFE);

        let mut second = frame();
        let count = renderer.process(&mut second, &params, 0.0, 2, 0.2).unwrap();
        assert_eq!(count, 0);
        assert_eq!(*second.get_pixel(2, 2), COLOR_UNSAFE);

        assert_eq!(renderer.detector().calls(), 2);
    }

    #[test]
    fn test_process_uses_current_threshold() {
        let stub = StubDetector::new(vec![vec![
            helmet_at(100.0, 200.0, 0.9),
            helmet_at(400.0, 200.0, 0.3),
        ]]);
        let mut renderer = DetectionRenderer::new(stub);

        let mut params = RuntimeParameters::new(0.5);
        assert_eq!(renderer.process(&mut frame(), &params, 0.0, 1, 0.0).unwrap(), 1);

        for _ in 0..5 {
            params.decrease_confidence();
        }
        assert_eq!(renderer.process(&mut frame(), &params, 0.0, 2, 0.0).unwrap(), 2);
    }

    #[test]
    fn test_detector_failure_propagates() {
        let mut stub = StubDetector::empty();
        stub.push_failure("boom");
        let mut renderer = DetectionRenderer::new(stub);

        let mut img = frame();
        let result = renderer.process(&mut img, &RuntimeParameters::default(), 0.0, 1, 0.0);
        assert!(result.is_err());
        // Nothing drawn when detection fails
        assert_eq!(*img.get_pixel(2, 2), GREY);
    }

    #[test]
    fn test_box_uses_category_color() {
        let mut img = frame();
        draw_detection_boxes(&mut img, &[helmet_at(100.0, 200.0, 0.9)]);

        // Left edge below the label tab
        assert_eq!(*img.get_pixel(100, 250), ppe_color("helmet"));
        assert_eq!(*img.get_pixel(98, 250), ppe_color("helmet"));
        // Label tab sits above the box
        assert_eq!(*img.get_pixel(101, 178), COLOR_LABEL_BG);
        // Interior untouched
        assert_eq!(*img.get_pixel(150, 240), GREY);
    }
}
