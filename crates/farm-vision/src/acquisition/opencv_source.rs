//! OpenCV `videoio` capture for USB cameras and RTSP streams.

use std::time::Duration;

use opencv::core::{Mat, Vector};
use opencv::prelude::*;
use opencv::videoio::{
    VideoCapture, CAP_ANY, CAP_PROP_OPEN_TIMEOUT_MSEC, CAP_PROP_READ_TIMEOUT_MSEC,
};
use tracing::info;

use super::{CaptureDevice, VideoSource};
use crate::error::{VisionError, VisionResult};
use crate::frame::RawImage;

/// Where OpenCV should read from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CaptureTarget {
    /// Local device index (`/dev/video0` is `0`)
    Device(i32),
    /// Stream URL or file path
    Url(String),
}

impl CaptureTarget {
    fn parse(source_id: &str) -> Self {
        match source_id.trim().parse::<i32>() {
            Ok(index) => CaptureTarget::Device(index),
            Err(_) => CaptureTarget::Url(source_id.to_string()),
        }
    }
}

/// Camera source backed by OpenCV `VideoCapture`.
#[derive(Debug, Clone)]
pub struct OpenCvSource {
    id: String,
    target: CaptureTarget,
}

impl OpenCvSource {
    pub fn new(source_id: &str) -> Self {
        Self {
            id: source_id.to_string(),
            target: CaptureTarget::parse(source_id),
        }
    }
}

impl VideoSource for OpenCvSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self, open_timeout: Duration, read_timeout: Duration) -> VisionResult<Box<dyn CaptureDevice>> {
        let params = Vector::<i32>::from_slice(&[
            CAP_PROP_OPEN_TIMEOUT_MSEC,
            open_timeout.as_millis().min(i32::MAX as u128) as i32,
            CAP_PROP_READ_TIMEOUT_MSEC,
            read_timeout.as_millis().min(i32::MAX as u128) as i32,
        ]);

        let cap = match &self.target {
            CaptureTarget::Device(index) => VideoCapture::new_with_params(*index, CAP_ANY, &params),
            CaptureTarget::Url(url) => VideoCapture::from_file_with_params(url, CAP_ANY, &params),
        }
        .map_err(|e| VisionError::capture(&self.id, format!("Failed to open video: {}", e)))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(VisionError::capture(&self.id, "Cannot open video stream"));
        }

        info!(source = %self.id, "Video source opened");
        Ok(Box::new(OpenCvDevice {
            id: self.id.clone(),
            cap,
        }))
    }
}

struct OpenCvDevice {
    id: String,
    cap: VideoCapture,
}

impl CaptureDevice for OpenCvDevice {
    fn read(&mut self) -> VisionResult<Option<RawImage>> {
        let mut frame = Mat::default();
        let ok = self
            .cap
            .read(&mut frame)
            .map_err(|e| VisionError::capture(&self.id, format!("Read failed: {}", e)))?;
        if !ok || frame.empty() {
            return Ok(None);
        }

        // OpenCV decodes to BGR; the detectors expect RGB
        let mut rgb = Mat::default();
        opencv::imgproc::cvt_color_def(&frame, &mut rgb, opencv::imgproc::COLOR_BGR2RGB)
            .map_err(|e| VisionError::capture(&self.id, format!("Color conversion failed: {}", e)))?;

        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb
            .data_bytes()
            .map_err(|e| VisionError::capture(&self.id, format!("Failed to get frame data: {}", e)))?
            .to_vec();

        Ok(Some(RawImage::new(data, width, height)))
    }

    fn release(&mut self) -> VisionResult<()> {
        self.cap
            .release()
            .map_err(|e| VisionError::capture(&self.id, format!("Release failed: {}", e)))
    }
}
