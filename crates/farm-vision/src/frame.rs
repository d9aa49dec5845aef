//! Frame types handed from capture to detection.

use image::{DynamicImage, ImageBuffer, Rgb};

use crate::error::{VisionError, VisionResult};

/// Decoded RGB8 image as returned by a capture device.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Packed RGB bytes (width * height * 3)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self { data, width, height }
    }

    /// Byte length of a packed RGB8 buffer, or `None` if it overflows `usize`.
    pub fn rgb_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(3))
    }

    /// A read can succeed and still hand back no pixels (e.g. a stalled stream).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }
}

/// One usable frame plus the attempt at which it was acquired.
#[derive(Debug, Clone)]
pub struct FrameSample {
    pub image: RawImage,
    /// 1-based attempt index
    pub attempt: u32,
}

impl FrameSample {
    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }

    /// Convert to a DynamicImage for preprocessing.
    pub fn to_dynamic_image(&self) -> VisionResult<DynamicImage> {
        let expected_len = RawImage::rgb_len(self.image.width, self.image.height);
        if expected_len != Some(self.image.data.len()) {
            return Err(VisionError::internal(format!(
                "Invalid image data length for {}x{}: got {}",
                self.image.width,
                self.image.height,
                self.image.data.len()
            )));
        }

        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.image.width, self.image.height, self.image.data.clone())
                .ok_or_else(|| VisionError::internal("Failed to create image buffer"))?;

        Ok(DynamicImage::ImageRgb8(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payloads() {
        assert!(RawImage::new(Vec::new(), 640, 480).is_empty());
        assert!(RawImage::new(vec![0; 3], 0, 1).is_empty());
        assert!(!RawImage::new(vec![0; 3], 1, 1).is_empty());
    }

    #[test]
    fn test_to_dynamic_image_checks_length() {
        let good = FrameSample {
            image: RawImage::new(vec![10; 2 * 2 * 3], 2, 2),
            attempt: 1,
        };
        assert!(good.to_dynamic_image().is_ok());

        let bad = FrameSample {
            image: RawImage::new(vec![10; 5], 2, 2),
            attempt: 1,
        };
        assert!(bad.to_dynamic_image().is_err());
    }

    #[test]
    fn test_oversized_dimensions_do_not_overflow() {
        let huge = FrameSample {
            image: RawImage::new(vec![0; 12], 70_000, 70_000),
            attempt: 1,
        };
        assert!(huge.to_dynamic_image().is_err());
        assert_eq!(RawImage::rgb_len(70_000, 70_000), Some(14_700_000_000));
        assert_eq!(RawImage::rgb_len(u32::MAX, 2), Some(u32::MAX as usize * 6));
    }
}
