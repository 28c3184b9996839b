//! Spatial smoothing filters: Average, Gaussian, Median.
//!
//! Average and Gaussian are kernel convolutions through
//! [`convolve`](crate::filters::core::convolve); Median gathers the same
//! edge-replicated `k×k` neighborhood per channel and takes its middle value.
//!
//! All three leave a constant-color image unchanged.

use ndarray::{Array3, Zip};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filters::core::{convolve, replicate, validate_kernel_size, Kernel};
use crate::image::Image;

fn default_kernel_size() -> usize {
    3
}

fn default_sigma() -> f64 {
    1.0
}

/// Smoothing filter selection with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter_type", rename_all = "snake_case")]
pub enum SpatialFilter {
    Average {
        #[serde(default = "default_kernel_size")]
        kernel_size: usize,
    },
    Gaussian {
        #[serde(default = "default_kernel_size")]
        kernel_size: usize,
        #[serde(default = "default_sigma")]
        sigma: f64,
    },
    Median {
        #[serde(default = "default_kernel_size")]
        kernel_size: usize,
    },
}

impl SpatialFilter {
    pub fn name(&self) -> &'static str {
        match self {
            SpatialFilter::Average { .. } => "average",
            SpatialFilter::Gaussian { .. } => "gaussian",
            SpatialFilter::Median { .. } => "median",
        }
    }

    pub fn kernel_size(&self) -> usize {
        match *self {
            SpatialFilter::Average { kernel_size }
            | SpatialFilter::Gaussian { kernel_size, .. }
            | SpatialFilter::Median { kernel_size } => kernel_size,
        }
    }

    /// Check parameters, building the kernel where one is needed.
    pub fn validate(&self) -> Result<()> {
        match *self {
            SpatialFilter::Average { kernel_size } | SpatialFilter::Median { kernel_size } => {
                validate_kernel_size(kernel_size)
            }
            SpatialFilter::Gaussian { kernel_size, sigma } => {
                Kernel::gaussian(kernel_size, sigma).map(|_| ())
            }
        }
    }

    pub fn apply(&self, image: &Image) -> Result<Image> {
        match *self {
            SpatialFilter::Average { kernel_size } => {
                convolve(image, &Kernel::box_filter(kernel_size)?)
            }
            SpatialFilter::Gaussian { kernel_size, sigma } => {
                convolve(image, &Kernel::gaussian(kernel_size, sigma)?)
            }
            SpatialFilter::Median { kernel_size } => median_filter(image, kernel_size),
        }
    }
}

// ============================================================================
// Median Filter
// ============================================================================

/// Apply a `kernel_size×kernel_size` median filter to every channel.
///
/// Removes salt-and-pepper noise while preserving edges. Neighborhoods
/// replicate border pixels, matching the convolution filters.
///
/// # Arguments
/// * `image` - Grayscale or RGB image
/// * `kernel_size` - Odd window size, at least 3
pub fn median_filter(image: &Image, kernel_size: usize) -> Result<Image> {
    validate_kernel_size(kernel_size)?;
    let (height, width, channels) = image.dim();
    let input = image.view();
    let radius = (kernel_size / 2) as isize;
    let window_size = kernel_size * kernel_size;

    let mut output = Array3::<u8>::zeros((height, width, channels));
    Zip::indexed(&mut output).par_for_each(|(y, x, c), out| {
        let mut values: Vec<u8> = Vec::with_capacity(window_size);
        for dy in -radius..=radius {
            let sy = replicate(y as isize + dy, height);
            for dx in -radius..=radius {
                let sx = replicate(x as isize + dx, width);
                values.push(input[[sy, sx, c]]);
            }
        }
        let mid = values.len() / 2;
        let (_, median, _) = values.select_nth_unstable(mid);
        *out = *median;
    });

    Image::new(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use ndarray::{array, Array2};

    fn flat(value: u8, channels: usize) -> Image {
        Image::new(Array3::from_elem((6, 5, channels), value)).unwrap()
    }

    #[test]
    fn test_flat_image_unchanged_by_all_filters() {
        for &k in &[3usize, 5, 7] {
            for img in [flat(37, 1), flat(200, 3), flat(255, 3), flat(0, 1)] {
                let filters = [
                    SpatialFilter::Average { kernel_size: k },
                    SpatialFilter::Gaussian {
                        kernel_size: k,
                        sigma: 1.7,
                    },
                    SpatialFilter::Median { kernel_size: k },
                ];
                for f in filters {
                    assert_eq!(f.apply(&img).unwrap(), img, "{} k={}", f.name(), k);
                }
            }
        }
    }

    #[test]
    fn test_even_kernel_rejected() {
        let f = SpatialFilter::Average { kernel_size: 4 };
        assert!(matches!(f.validate(), Err(EngineError::Validation(_))));
        let f = SpatialFilter::Median { kernel_size: 1 };
        assert!(f.apply(&flat(1, 1)).is_err());
    }

    #[test]
    fn test_gaussian_requires_positive_sigma() {
        let f = SpatialFilter::Gaussian {
            kernel_size: 3,
            sigma: 0.0,
        };
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_median_removes_salt() {
        let mut plane = Array2::from_elem((5, 5), 128u8);
        plane[[2, 2]] = 255;
        let img = Image::from_gray(plane).unwrap();
        let out = median_filter(&img, 3).unwrap();
        assert_eq!(out.channel(0)[[2, 2]], 128);
    }

    #[test]
    fn test_median_preserves_edge() {
        let plane = Array2::from_shape_fn((5, 6), |(_, x)| if x < 3 { 0u8 } else { 255 });
        let img = Image::from_gray(plane.clone()).unwrap();
        let out = median_filter(&img, 3).unwrap();
        assert_eq!(out.channel(0), plane.view());
    }

    #[test]
    fn test_average_checkerboard() {
        let img = Image::from_gray(array![
            [0u8, 255, 0, 255],
            [255, 0, 255, 0],
            [0, 255, 0, 255],
            [255, 0, 255, 0]
        ])
        .unwrap();
        let out = SpatialFilter::Average { kernel_size: 3 }.apply(&img).unwrap();
        assert_eq!(out.channel(0)[[0, 0]], 113);
        assert_eq!(out.channel(0)[[0, 3]], 142);
        assert_eq!(out.channel(0)[[3, 3]], 113);
    }

    #[test]
    fn test_gaussian_smooths_impulse() {
        let mut plane = Array2::from_elem((5, 5), 0u8);
        plane[[2, 2]] = 255;
        let img = Image::from_gray(plane).unwrap();
        let out = SpatialFilter::Gaussian {
            kernel_size: 3,
            sigma: 1.0,
        }
        .apply(&img)
        .unwrap();
        let center = out.channel(0)[[2, 2]];
        assert!(center < 255 && center > 0);
        assert!(out.channel(0)[[2, 1]] > 0);
        assert!(out.channel(0)[[2, 1]] < center);
    }
}
