//! Decoded raster image held by the engine.
//!
//! Images are dense row-major `(height, width, channels)` arrays of `u8`
//! with 1 (grayscale) or 3 (RGB) channels. An `Image` is never modified in
//! place: every filter builds a new one.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::error::{EngineError, Result};

/// Immutable 8-bit image with 1 or 3 channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pixels: Array3<u8>,
}

impl Image {
    /// Wrap an `(height, width, channels)` array.
    ///
    /// Fails with [`EngineError::Decode`] for empty images or channel counts
    /// other than 1 and 3.
    pub fn new(pixels: Array3<u8>) -> Result<Self> {
        let (height, width, channels) = pixels.dim();
        if height == 0 || width == 0 {
            return Err(EngineError::Decode(format!(
                "image must be non-empty, got {}x{}",
                width, height
            )));
        }
        if channels != 1 && channels != 3 {
            return Err(EngineError::Decode(format!(
                "unsupported channel count {} (expected 1 or 3)",
                channels
            )));
        }
        Ok(Image { pixels })
    }

    /// Build a single-channel image from a 2D plane.
    pub fn from_gray(plane: Array2<u8>) -> Result<Self> {
        Image::new(plane.insert_axis(Axis(2)))
    }

    /// Build an image from a flat row-major buffer as handed over by a codec.
    pub fn from_raw(height: usize, width: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        let expected = height
            .checked_mul(width)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| {
                EngineError::Decode(format!(
                    "{}x{}x{} overflows the addressable size",
                    height, width, channels
                ))
            })?;
        if data.len() != expected {
            return Err(EngineError::Decode(format!(
                "buffer holds {} bytes, {}x{}x{} needs {}",
                data.len(),
                height,
                width,
                channels,
                expected
            )));
        }
        let pixels = Array3::from_shape_vec((height, width, channels), data)
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        Image::new(pixels)
    }

    /// Replicate a luma plane into `channels` identical channels.
    pub fn from_gray_replicated(plane: &Array2<u8>, channels: usize) -> Result<Self> {
        let (height, width) = plane.dim();
        Image::new(Array3::from_shape_fn((height, width, channels), |(y, x, _)| {
            plane[[y, x]]
        }))
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn channels(&self) -> usize {
        self.pixels.dim().2
    }

    /// `(height, width, channels)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.pixels.dim()
    }

    pub fn is_color(&self) -> bool {
        self.channels() == 3
    }

    /// True when both images share height, width and channel count.
    pub fn same_shape(&self, other: &Image) -> bool {
        self.dim() == other.dim()
    }

    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    pub fn pixels(&self) -> &Array3<u8> {
        &self.pixels
    }

    /// View of a single channel as a 2D plane.
    pub fn channel(&self, c: usize) -> ArrayView2<'_, u8> {
        self.pixels.index_axis(Axis(2), c)
    }

    /// Consume the image, returning its row-major bytes.
    pub fn into_raw(self) -> Vec<u8> {
        let (raw, _offset) = self.pixels.as_standard_layout().to_owned().into_raw_vec_and_offset();
        raw
    }

    pub fn into_array(self) -> Array3<u8> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_rgba() {
        let err = Image::new(Array3::<u8>::zeros((2, 2, 4))).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(Image::new(Array3::<u8>::zeros((0, 3, 3))).is_err());
    }

    #[test]
    fn test_from_raw_length_mismatch() {
        let err = Image::from_raw(2, 2, 3, vec![0; 11]).unwrap_err();
        assert!(err.is_validation_class());
    }

    #[test]
    fn test_from_raw_overflowing_dims() {
        let err = Image::from_raw(usize::MAX, 2, 3, vec![0; 6]).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
        let err = Image::from_raw(usize::MAX / 2, 1, 3, Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn test_from_raw_row_major() {
        let img = Image::from_raw(1, 2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(img.pixels()[[0, 1, 0]], 4);
        assert_eq!(img.into_raw(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_gray_replicated() {
        let plane = Array2::from_shape_vec((1, 2), vec![10u8, 20]).unwrap();
        let img = Image::from_gray_replicated(&plane, 3).unwrap();
        assert_eq!(img.dim(), (1, 2, 3));
        assert_eq!(img.pixels()[[0, 1, 2]], 20);
    }
}
