//! Grayscale (luma) conversion.
//!
//! Uses ITU-R BT.601 luma coefficients: `0.299 R + 0.587 G + 0.114 B`.
//! Channels are expected in R, G, B order; single-channel images pass
//! through unchanged.
//!
//! Edge detection, histogram analysis and frequency filtering all run on
//! this luma plane.

use ndarray::{Array2, Zip};

use crate::error::Result;
use crate::filters::core::to_u8;
use crate::image::Image;

/// ITU-R BT.601 luma coefficients
pub const LUMA_R: f64 = 0.299;
pub const LUMA_G: f64 = 0.587;
pub const LUMA_B: f64 = 0.114;

/// Luma of one RGB sample, unrounded.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64
}

/// Luma plane rounded to 8 bits.
pub fn luma_plane(image: &Image) -> Array2<u8> {
    if !image.is_color() {
        return image.channel(0).to_owned();
    }
    let (height, width, _) = image.dim();
    let pixels = image.view();
    let mut output = Array2::<u8>::zeros((height, width));
    Zip::indexed(&mut output).for_each(|(y, x), out| {
        *out = to_u8(luma(pixels[[y, x, 0]], pixels[[y, x, 1]], pixels[[y, x, 2]]));
    });
    output
}

/// Luma plane as `f64`, for the frequency and gradient pipelines.
pub fn luma_plane_f64(image: &Image) -> Array2<f64> {
    luma_plane(image).mapv(f64::from)
}

/// Single-channel luma image.
pub fn to_grayscale(image: &Image) -> Result<Image> {
    Image::from_gray(luma_plane(image))
}

/// Luma replicated into the input's channel count, keeping the image shape.
pub fn to_grayscale_keep_channels(image: &Image) -> Result<Image> {
    Image::from_gray_replicated(&luma_plane(image), image.channels())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn rgb(r: u8, g: u8, b: u8) -> Image {
        let mut img = Array3::<u8>::zeros((1, 1, 3));
        img[[0, 0, 0]] = r;
        img[[0, 0, 1]] = g;
        img[[0, 0, 2]] = b;
        Image::new(img).unwrap()
    }

    #[test]
    fn test_grayscale_red() {
        // 0.299 * 255 = 76.245
        assert_eq!(luma_plane(&rgb(255, 0, 0))[[0, 0]], 76);
    }

    #[test]
    fn test_grayscale_green() {
        // 0.587 * 255 = 149.685
        assert_eq!(luma_plane(&rgb(0, 255, 0))[[0, 0]], 150);
    }

    #[test]
    fn test_grayscale_white() {
        assert_eq!(luma_plane(&rgb(255, 255, 255))[[0, 0]], 255);
    }

    #[test]
    fn test_single_channel_passthrough() {
        let img = Image::from_gray(Array2::from_elem((2, 3), 42u8)).unwrap();
        assert_eq!(luma_plane(&img), Array2::from_elem((2, 3), 42u8));
    }

    #[test]
    fn test_keep_channels() {
        let out = to_grayscale_keep_channels(&rgb(0, 255, 0)).unwrap();
        assert_eq!(out.dim(), (1, 1, 3));
        assert!(out.pixels().iter().all(|&v| v == 150));
    }
}
