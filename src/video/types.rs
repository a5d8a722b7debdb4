use image::{ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Represents a single RGBA video frame
///
/// A thin wrapper around an 8-bit RGBA image buffer. Every core operation keeps the
/// frame's dimensions and channel layout intact; effects return new frames of the
/// same size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    buffer: RgbaImage,
}

impl Frame {
    /// Create a new frame from an RGBA image buffer
    pub fn new(buffer: RgbaImage) -> Self {
        Self { buffer }
    }

    /// Create a fully transparent black frame
    pub fn new_transparent(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgba(color));
        Self { buffer }
    }

    /// Create a frame from raw RGBA bytes, `None` if the length does not match
    pub fn from_rgba_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.buffer.get_pixel(x, y).0
    }

    /// Get a mutable reference to a pixel at the given coordinates
    pub fn get_pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        &mut self.buffer.get_pixel_mut(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        self.buffer.put_pixel(x, y, Rgba(color));
    }

    /// Interleaved RGBA bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Mutable interleaved RGBA bytes, row-major
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn into_image(self) -> RgbaImage {
        self.buffer
    }

    /// Consume the frame and return its raw RGBA bytes
    pub fn into_rgba_bytes(self) -> Vec<u8> {
        self.buffer.into_raw()
    }

    /// Load any image format `image` understands and convert it to RGBA
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, image::ImageError> {
        Ok(Self::new(image::open(path)?.to_rgba8()))
    }

    /// Save the frame as a PNG file
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// Per-pixel blend weights in `[0, 1]`, one per pixel, row-major
///
/// A mask restricts an effect's influence to part of the frame; the same weight is
/// applied to all four channels of a pixel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMask")]
pub struct Mask {
    width: u32,
    height: u32,
    weights: Vec<f32>,
}

impl Mask {
    /// Build a mask from row-major weights. Values are clamped into `[0, 1]`;
    /// returns `None` if the weight count does not match the dimensions.
    pub fn new(width: u32, height: u32, weights: Vec<f32>) -> Option<Self> {
        if weights.len() != width as usize * height as usize {
            return None;
        }
        let weights = weights
            .into_iter()
            .map(|w| if w.is_finite() { w.clamp(0.0, 1.0) } else { 0.0 })
            .collect();
        Some(Self { width, height, weights })
    }

    /// A mask with the same weight everywhere
    pub fn filled(width: u32, height: u32, weight: f32) -> Self {
        let weight = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            width,
            height,
            weights: vec![weight; width as usize * height as usize],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.weights[y as usize * self.width as usize + x as usize]
    }
}

#[derive(Deserialize)]
struct RawMask {
    width: u32,
    height: u32,
    weights: Vec<f32>,
}

impl TryFrom<RawMask> for Mask {
    type Error = String;

    fn try_from(raw: RawMask) -> Result<Self, Self::Error> {
        Mask::new(raw.width, raw.height, raw.weights).ok_or_else(|| {
            format!("mask weights do not match {}x{}", raw.width, raw.height)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frame() {
        let frame = Frame::new_filled(3, 2, [10, 20, 30, 40]);
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame.pixels().len(), 3 * 2 * 4);
        assert_eq!(frame.get_pixel(2, 1), [10, 20, 30, 40]);
    }

    #[test]
    fn test_from_rgba_bytes_checks_length() {
        assert!(Frame::from_rgba_bytes(2, 2, vec![0; 16]).is_some());
        assert!(Frame::from_rgba_bytes(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_mask_clamps_weights() {
        let mask = Mask::new(2, 1, vec![-1.0, 3.0]).unwrap();
        assert_eq!(mask.weights(), &[0.0, 1.0]);
        assert!(Mask::new(2, 2, vec![0.5; 3]).is_none());
    }
}
