//! OpenCV camera capture and HighGUI display window

use crate::app::{FrameDisplay, FrameSource};
use crate::error::{DashboardError, Result};
use image::RgbImage;
use log::{info, warn};
use opencv::{
    core::{self, Mat},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

/// Window title used by the dashboard
pub const WINDOW_NAME: &str = "PPE Detection Dashboard";

/// Local camera opened through OpenCV
pub struct CameraSource {
    cap: VideoCapture,
    index: i32,
}

impl CameraSource {
    /// Open camera `index` and request `size` with a single-frame buffer
    pub fn open(index: i32, size: (u32, u32)) -> Result<Self> {
        let mut cap = VideoCapture::new(index, videoio::CAP_ANY).map_err(|e| {
            DashboardError::camera(format!("Failed to open camera {}: {}", index, e))
        })?;

        if !cap.is_opened()? {
            return Err(DashboardError::camera(format!(
                "Camera {} is not available",
                index
            )));
        }

        // Property requests are hints; drivers are free to ignore them
        let _ = cap.set(videoio::CAP_PROP_FRAME_WIDTH, size.0 as f64);
        let _ = cap.set(videoio::CAP_PROP_FRAME_HEIGHT, size.1 as f64);
        let _ = cap.set(videoio::CAP_PROP_BUFFERSIZE, 1.0);

        let actual_w = cap.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0);
        let actual_h = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0);
        info!(
            "✓ Camera {} ready ({}x{})",
            index, actual_w as u32, actual_h as u32
        );

        Ok(Self { cap, index })
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Result<Option<RgbImage>> {
        let mut mat = Mat::default();
        match self.cap.read(&mut mat) {
            Ok(true) if !mat.empty() => mat_to_rgb(&mat).map(Some),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!("Camera read failed: {}", e);
                Ok(None)
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.cap.release() {
            warn!("Failed to release camera {}: {}", self.index, e);
        }
    }
}

/// Convert a BGR OpenCV frame into an RGB image
pub fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    let mut rgb_mat = Mat::default();
    imgproc::cvt_color(
        mat,
        &mut rgb_mat,
        imgproc::COLOR_BGR2RGB,
        0,
        core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;

    let width = rgb_mat.cols() as u32;
    let height = rgb_mat.rows() as u32;
    let data = rgb_mat.data_bytes()?.to_vec();

    RgbImage::from_vec(width, height, data)
        .ok_or_else(|| DashboardError::camera("Frame buffer size mismatch"))
}

/// Convert an RGB image into a BGR OpenCV frame
pub fn rgb_to_mat(frame: &RgbImage) -> Result<Mat> {
    let data = frame.as_raw();

    // The borrowed Mat only lives until the color conversion copies it
    let borrowed = unsafe {
        Mat::new_rows_cols_with_data_unsafe(
            frame.height() as i32,
            frame.width() as i32,
            core::CV_8UC3,
            data.as_ptr() as *mut _,
            core::Mat_AUTO_STEP,
        )?
    };

    let mut bgr = Mat::default();
    imgproc::cvt_color(
        &borrowed,
        &mut bgr,
        imgproc::COLOR_RGB2BGR,
        0,
        core::AlgorithmHint::ALGO_HINT_DEFAULT,
    )?;
    Ok(bgr)
}

/// HighGUI window that shows the dashboard and reads key presses
pub struct HighGuiDisplay {
    window: String,
}

impl HighGuiDisplay {
    pub fn open(window: &str) -> Result<Self> {
        highgui::named_window(window, highgui::WINDOW_AUTOSIZE)
            .map_err(|e| DashboardError::display(format!("Failed to create window: {}", e)))?;
        Ok(Self {
            window: window.to_string(),
        })
    }
}

impl FrameDisplay for HighGuiDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        let mat = rgb_to_mat(frame)?;
        highgui::imshow(&self.window, &mat)
            .map_err(|e| DashboardError::display(e.to_string()))
    }

    fn poll_key(&mut self) -> Result<Option<i32>> {
        let key = highgui::wait_key(1)?;
        Ok((key >= 0).then_some(key))
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            warn!("Failed to close windows: {}", e);
        }
    }
}
