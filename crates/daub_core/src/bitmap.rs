//! CPU-side pixel buffer
//!
//! Used for the painting background image and for snapshot extraction.
//! Encoding/decoding to an on-disk format is the hosting application's
//! concern.

use crate::Color;

/// Tightly packed RGBA8 pixel buffer, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Create a bitmap filled with a single color.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let rgba = color.to_rgba8();
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Wrap an existing RGBA8 buffer. Returns `None` when the length does
    /// not match `width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_bitmap() {
        let bmp = Bitmap::filled(4, 2, Color::RED);
        assert_eq!(bmp.pixels().len(), 32);
        assert_eq!(bmp.pixel(3, 1), Some([255, 0, 0, 255]));
        assert_eq!(bmp.pixel(4, 0), None);
    }

    #[test]
    fn test_from_rgba8_length_check() {
        assert!(Bitmap::from_rgba8(2, 2, vec![0; 16]).is_some());
        assert!(Bitmap::from_rgba8(2, 2, vec![0; 15]).is_none());
    }
}
