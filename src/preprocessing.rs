//! Frame preprocessing for YOLOv8 inference

use crate::image_utils::resize_with_letterbox;
use crate::types::BoundingBox;
use image::{Rgb, RgbImage};
use ndarray::Array4;

/// Padding color Ultralytics uses when letterboxing
pub const LETTERBOX_PAD: Rgb<u8> = Rgb([114, 114, 114]);

/// Maps model-space coordinates back onto the original frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl LetterboxTransform {
    /// Undo the letterbox on a model-space box and clamp it to the frame
    pub fn to_frame(&self, bbox: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            (bbox.x1 - self.pad_x) / self.scale,
            (bbox.y1 - self.pad_y) / self.scale,
            (bbox.x2 - self.pad_x) / self.scale,
            (bbox.y2 - self.pad_y) / self.scale,
        )
        .clamp_to(self.frame_width, self.frame_height)
    }
}

/// Image preprocessor for preparing input data for the model
pub struct ImagePreprocessor {
    /// Square model input size
    input_size: u32,
}

impl ImagePreprocessor {
    pub fn new(input_size: u32) -> Self {
        Self { input_size }
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Letterbox the frame and convert it to a normalized NCHW tensor
    pub fn preprocess(&self, frame: &RgbImage) -> (Array4<f32>, LetterboxTransform) {
        let (canvas, scale, (pad_x, pad_y)) =
            resize_with_letterbox(frame, self.input_size, LETTERBOX_PAD);

        let size = self.input_size as usize;
        let mut tensor = Array4::zeros((1, 3, size, size));

        for (x, y, pixel) in canvas.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }

        let transform = LetterboxTransform {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            frame_width: frame.width(),
            frame_height: frame.height(),
        };

        (tensor, transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_preprocessor_creation() {
        let preprocessor = ImagePreprocessor::new(640);
        assert_eq!(preprocessor.input_size(), 640);
    }

    #[test]
    fn test_tensor_shape_and_normalization() {
        let frame = RgbImage::from_pixel(64, 32, Rgb([255, 0, 51]));
        let (tensor, transform) = ImagePreprocessor::new(32).preprocess(&frame);

        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        assert_abs_diff_eq!(transform.scale, 0.5);
        assert_eq!(transform.pad_y, 8.0);

        // Center pixel comes from the frame, corner from the padding
        assert_abs_diff_eq!(tensor[[0, 0, 16, 16]], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(tensor[[0, 2, 16, 16]], 0.2, epsilon = 1e-2);
        assert_abs_diff_eq!(tensor[[0, 1, 0, 0]], 114.0 / 255.0, epsilon = 1e-3);
    }

    #[test]
    fn test_transform_maps_back_to_frame() {
        let transform = LetterboxTransform {
            scale: 0.5,
            pad_x: 0.0,
            pad_y: 140.0,
            frame_width: 1280,
            frame_height: 720,
        };

        let bbox = transform.to_frame(&BoundingBox::new(100.0, 150.0, 200.0, 250.0));
        assert_eq!(bbox, BoundingBox::new(200.0, 20.0, 400.0, 220.0));

        // Boxes reaching into the padding are clamped to the frame
        let clamped = transform.to_frame(&BoundingBox::new(-10.0, 100.0, 700.0, 600.0));
        assert_eq!(clamped, BoundingBox::new(0.0, 0.0, 1280.0, 720.0));
    }
}
