//! Decoding tile payloads into RGB pixel buffers.

use crate::error::{PmdemError, Result};

/// An 8-bit RGB raster, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbRaster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbRaster {
    /// Wrap a pixel buffer.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != width * height * 3`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize * 3,
            "pixel buffer does not match {width}x{height}"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A raster with every pixel set to `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGB bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGB triplet at column `x`, row `y`.
    #[inline]
    pub fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width as usize + x) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Set the RGB triplet at column `x`, row `y`.
    pub fn set_rgb(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let i = (y * self.width as usize + x) * 3;
        self.pixels[i..i + 3].copy_from_slice(&rgb);
    }
}

/// Turns an opaque tile payload into RGB pixels.
pub trait RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RgbRaster>;
}

/// [`RasterDecoder`] backed by the `image` crate (PNG and WebP).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRasterDecoder;

impl RasterDecoder for ImageRasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RgbRaster> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width != height {
            return Err(PmdemError::NonSquareTile { width, height });
        }
        Ok(RgbRaster::new(width, height, rgb.into_raw()))
    }
}

/// Encode a raster as PNG, for building test archives.
#[cfg(test)]
pub(crate) fn encode_png(raster: &RgbRaster) -> Vec<u8> {
    use std::io::Cursor;

    let img = image::RgbImage::from_raw(raster.width(), raster.height(), raster.pixels().to_vec())
        .unwrap();
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled() {
        let r = RgbRaster::filled(2, 2, [1, 2, 3]);
        assert_eq!(r.pixels(), &[1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 2, 3]);
        assert_eq!(r.rgb(1, 1), [1, 2, 3]);
    }

    #[test]
    fn test_set_rgb() {
        let mut r = RgbRaster::filled(3, 2, [0, 0, 0]);
        r.set_rgb(2, 1, [9, 8, 7]);
        assert_eq!(r.rgb(2, 1), [9, 8, 7]);
        assert_eq!(r.rgb(1, 1), [0, 0, 0]);
        assert_eq!(&r.pixels()[15..18], &[9, 8, 7]);
    }

    #[test]
    #[should_panic]
    fn test_wrong_buffer_size() {
        RgbRaster::new(2, 2, vec![0; 5]);
    }

    #[test]
    fn test_png_decode() {
        let mut raster = RgbRaster::filled(4, 4, [128, 0, 0]);
        raster.set_rgb(3, 0, [130, 10, 20]);
        let bytes = encode_png(&raster);

        let decoded = ImageRasterDecoder.decode(&bytes).unwrap();
        assert_eq!(decoded, raster);
    }

    #[test]
    fn test_non_square_rejected() {
        let bytes = encode_png(&RgbRaster::filled(4, 2, [0, 0, 0]));
        assert!(matches!(
            ImageRasterDecoder.decode(&bytes),
            Err(PmdemError::NonSquareTile {
                width: 4,
                height: 2
            })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            ImageRasterDecoder.decode(b"not an image"),
            Err(PmdemError::ImageDecode(_))
        ));
    }
}
