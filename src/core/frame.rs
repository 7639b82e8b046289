use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::FrameError;
use crate::types::Rgb;

/// Fixed-size pixel buffer pushed to the hardware sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Frame {
    /// Create a black frame
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgb::BLACK)
    }

    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    /// Build a frame from packed `r, g, b` bytes
    pub fn from_rgb_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, FrameError> {
        let expected = (width * height * 3) as usize;
        if bytes.len() != expected {
            return Err(FrameError::Corrupt(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                bytes.len()
            )));
        }

        let pixels = bytes
            .chunks_exact(3)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
            .collect();

        Ok(Self { width, height, pixels })
    }

    pub fn from_image(image: &RgbImage) -> Self {
        let pixels = image.pixels().map(|p| Rgb::from_channels(p.0)).collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    /// Raw `r, g, b` bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Set pixel, ignoring out-of-bounds coordinates
    pub fn set(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as u32 * self.width + x as u32) as usize;
        self.pixels[idx] = color;
    }

    pub fn clear(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// True when every pixel is black
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| *p == Rgb::BLACK)
    }

    pub fn to_image(&self) -> RgbImage {
        // Length always matches width * height * 3
        RgbImage::from_raw(self.width, self.height, self.as_bytes().to_vec())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Resample to the given dimensions; no-op copy when already that size
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        let resized = imageops::resize(&self.to_image(), width, height, FilterType::Lanczos3);
        Frame::from_image(&resized)
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = std::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point.x, point.y, Rgb::new(color.r(), color.g(), color.b()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_black() {
        let frame = Frame::new(64, 32);
        assert_eq!(frame.dimensions(), (64, 32));
        assert_eq!(frame.pixels().len(), 64 * 32);
        assert!(frame.is_blank());
    }

    #[test]
    fn test_as_bytes_is_packed_rgb() {
        let mut frame = Frame::new(2, 1);
        frame.set(1, 0, Rgb::new(1, 2, 3));
        assert_eq!(frame.as_bytes(), &[0, 0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_from_rgb_bytes_rejects_wrong_length() {
        let err = Frame::from_rgb_bytes(2, 2, &[0; 11]).unwrap_err();
        assert!(matches!(err, FrameError::Corrupt(_)));
    }

    #[test]
    fn test_set_out_of_bounds_is_ignored() {
        let mut frame = Frame::new(4, 4);
        frame.set(-1, 0, Rgb::WHITE);
        frame.set(4, 0, Rgb::WHITE);
        frame.set(0, 10, Rgb::WHITE);
        assert!(frame.is_blank());
    }

    #[test]
    fn test_resize_solid_color_keeps_color() {
        let frame = Frame::filled(10, 6, Rgb::new(200, 100, 50));
        let resized = frame.resized(64, 32);
        assert_eq!(resized.dimensions(), (64, 32));
        for p in resized.pixels() {
            assert!(p.r.abs_diff(200) <= 1 && p.g.abs_diff(100) <= 1 && p.b.abs_diff(50) <= 1);
        }
    }

    #[test]
    fn test_draw_target_writes_pixels() {
        let mut frame = Frame::new(8, 8);
        Pixel(Point::new(3, 4), Rgb888::new(9, 8, 7)).draw(&mut frame).unwrap();
        assert_eq!(frame.get(3, 4), Some(Rgb::new(9, 8, 7)));
    }
}
