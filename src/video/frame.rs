//! RGB frame bitmap

use crate::{LedToneError, Result};

/// Packed 8-bit RGB bitmap, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// `width * height * 3` bytes, R G B per pixel
    pub rgb: Vec<u8>,
}

impl FrameBuffer {
    /// Create an all-black frame
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            width,
            height,
            rgb: vec![0; width * height * 3],
        }
    }

    /// Wrap existing RGB bytes
    pub fn from_raw(width: usize, height: usize, rgb: Vec<u8>) -> Result<Self> {
        if rgb.len() != width * height * 3 {
            return Err(LedToneError::FrameError(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                width * height * 3,
                rgb.len()
            )));
        }
        Ok(FrameBuffer { width, height, rgb })
    }

    /// Build a frame from row-major pixels
    pub fn from_pixels(width: usize, height: usize, pixels: &[[u8; 3]]) -> Result<Self> {
        Self::from_raw(width, height, pixels.iter().flatten().copied().collect())
    }

    /// Convert a decoded image
    #[cfg(feature = "images")]
    pub fn from_rgb_image(img: &image::RgbImage) -> Self {
        FrameBuffer {
            width: img.width() as usize,
            height: img.height() as usize,
            rgb: img.as_raw().clone(),
        }
    }

    /// Pixel at (x, y)
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }

    /// Overwrite pixel at (x, y)
    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.rgb[i..i + 3].copy_from_slice(&rgb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_checks_length() {
        assert!(FrameBuffer::from_raw(2, 2, vec![0; 11]).is_err());
        assert!(FrameBuffer::from_raw(2, 2, vec![0; 12]).is_ok());
    }

    #[test]
    fn test_pixel_access() {
        let mut frame = FrameBuffer::new(3, 2);
        frame.set_pixel(2, 1, [1, 2, 3]);
        assert_eq!(frame.pixel(2, 1), [1, 2, 3]);
        assert_eq!(&frame.rgb[15..18], &[1, 2, 3]);
    }

    #[cfg(feature = "images")]
    #[test]
    fn test_from_rgb_image() {
        let img = image::RgbImage::from_pixel(4, 2, image::Rgb([9, 8, 7]));
        let frame = FrameBuffer::from_rgb_image(&img);
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.pixel(3, 1), [9, 8, 7]);
    }
}
