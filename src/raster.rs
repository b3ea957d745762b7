//! Decoded RGB frames
use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::error::{Error, Result};

/// Color channels per pixel
pub const RGB_CHANNELS: usize = 3;

/// A decoded frame: 8-bit RGB triples in row-major order.
///
/// Dimensions are bounded by what a GIF logical screen can describe, so
/// both sides fit in a `u16`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wraps a packed RGB buffer of exactly `width * height * 3` bytes.
    pub fn from_rgb(width: u16, height: u16, pixels: Vec<u8>) -> Result<RasterImage> {
        if width == 0 || height == 0 {
            return Err(Error::MalformedRaster(format!(
                "{}x{} has no pixels",
                width, height
            )));
        }
        let expected = width as usize * height as usize * RGB_CHANNELS;
        if pixels.len() != expected {
            return Err(Error::MalformedRaster(format!(
                "{}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(RasterImage {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with a single color.
    pub fn solid(width: u16, height: u16, color: [u8; 3]) -> Result<RasterImage> {
        let count = width as usize * height as usize;
        RasterImage::from_rgb(width, height, color.repeat(count))
    }

    pub fn from_rgb_image(image: RgbImage) -> Result<RasterImage> {
        let (width, height) = checked_dimensions(image.width(), image.height())?;
        RasterImage::from_rgb(width, height, image.into_raw())
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<RasterImage> {
        RasterImage::from_rgb_image(image.into_rgb8())
    }

    /// Decodes an image file (PNG or JPEG).
    pub fn open(path: &Path) -> Result<RasterImage> {
        let image = image::open(path).map_err(|err| Error::decode_failure(path, err))?;
        RasterImage::from_dynamic(image).map_err(|err| Error::decode_failure(path, err))
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// The packed RGB buffer
    pub fn as_rgb(&self) -> &[u8] {
        &self.pixels
    }

    /// Iterates over the pixels in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.pixels
            .chunks_exact(RGB_CHANNELS)
            .map(|pix| [pix[0], pix[1], pix[2]])
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl AsRef<RasterImage> for RasterImage {
    fn as_ref(&self) -> &RasterImage {
        self
    }
}

/// Narrows decoder dimensions to the range a GIF canvas accepts.
pub fn checked_dimensions(width: u32, height: u32) -> Result<(u16, u16)> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(Error::MalformedRaster(format!(
            "{}x{} does not fit a GIF canvas",
            width, height
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_wrong_buffer_length() {
        let err = RasterImage::from_rgb(2, 2, vec![0; 11]).unwrap_err();
        assert!(matches!(err, Error::MalformedRaster(_)));
    }

    #[test]
    fn rejects_empty_canvas() {
        assert!(RasterImage::from_rgb(0, 4, Vec::new()).is_err());
        assert!(checked_dimensions(70_000, 10).is_err());
    }

    #[test]
    fn pixels_are_row_major() {
        let image = RasterImage::from_rgb(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let pixels: Vec<_> = image.pixels().collect();
        assert_eq!(pixels, [[1, 2, 3], [4, 5, 6]]);
    }

    #[test]
    fn converts_from_image_buffer() {
        let buffer = RgbImage::from_pixel(3, 2, image::Rgb([9, 8, 7]));
        let image = RasterImage::from_rgb_image(buffer).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert!(image.pixels().all(|pix| pix == [9, 8, 7]));
    }
}
