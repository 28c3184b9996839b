//! Core kernel math shared by every spatial operator.
//!
//! This module provides:
//! - `Kernel` construction (box, sampled Gaussian, fixed gradient kernels)
//! - Edge-replicating convolution on single planes and whole images
//! - Rounding/clamping back into the 8-bit storage range
//!
//! ## Border Policy
//!
//! Out-of-range neighbor coordinates are clamped to the nearest valid
//! row/column (edge replication). Every convolution-based filter and edge
//! operator goes through [`convolve_plane`], so boundary behavior is
//! identical across them.

use ndarray::{Array2, Array3, ArrayView2, Zip};

use crate::error::{EngineError, Result};
use crate::image::Image;

/// Rectangular array of real-valued weights.
///
/// The anchor (the tap aligned with the output pixel) sits at
/// `((rows - 1) / 2, (cols - 1) / 2)`: the center for odd sizes, the
/// top-left tap for 2×2 kernels.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    weights: Array2<f64>,
}

impl Kernel {
    /// Wrap an arbitrary weight array.
    pub fn new(weights: Array2<f64>) -> Result<Self> {
        let (rows, cols) = weights.dim();
        if rows == 0 || cols == 0 {
            return Err(EngineError::validation("kernel must be non-empty"));
        }
        Ok(Kernel { weights })
    }

    /// Build a kernel from fixed-size rows.
    pub fn from_rows<const R: usize, const C: usize>(rows: [[f64; C]; R]) -> Self {
        Kernel {
            weights: Array2::from_shape_fn((R, C), |(y, x)| rows[y][x]),
        }
    }

    /// `size×size` kernel of uniform weight `1/size²`.
    pub fn box_filter(size: usize) -> Result<Self> {
        validate_kernel_size(size)?;
        let w = 1.0 / (size * size) as f64;
        Ok(Kernel {
            weights: Array2::from_elem((size, size), w),
        })
    }

    /// Sampled isotropic Gaussian of `size×size`, renormalized to sum to 1.
    ///
    /// # Arguments
    /// * `size` - Odd kernel size, at least 3
    /// * `sigma` - Standard deviation in pixels, must be positive
    pub fn gaussian(size: usize, sigma: f64) -> Result<Self> {
        validate_kernel_size(size)?;
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(EngineError::validation(format!(
                "sigma must be > 0 for a gaussian kernel, got {}",
                sigma
            )));
        }
        let half = (size / 2) as f64;
        let mut weights = Array2::from_shape_fn((size, size), |(y, x)| {
            let dy = y as f64 - half;
            let dx = x as f64 - half;
            (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
        });

        // Normalize
        let sum = weights.sum();
        weights.mapv_inplace(|v| v / sum);

        Ok(Kernel { weights })
    }

    pub fn rows(&self) -> usize {
        self.weights.dim().0
    }

    pub fn cols(&self) -> usize {
        self.weights.dim().1
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    fn anchor(&self) -> (isize, isize) {
        (
            ((self.rows() - 1) / 2) as isize,
            ((self.cols() - 1) / 2) as isize,
        )
    }
}

/// Largest accepted smoothing kernel size.
pub const MAX_KERNEL_SIZE: usize = 255;

/// Kernel sizes for smoothing filters must be odd, at least 3 and at most
/// [`MAX_KERNEL_SIZE`].
pub fn validate_kernel_size(size: usize) -> Result<()> {
    if size < 3 || size % 2 == 0 {
        return Err(EngineError::validation(format!(
            "kernel_size must be odd and >= 3, got {}",
            size
        )));
    }
    if size > MAX_KERNEL_SIZE {
        return Err(EngineError::validation(format!(
            "kernel_size must be <= {}, got {}",
            MAX_KERNEL_SIZE, size
        )));
    }
    Ok(())
}

/// Clamp a possibly out-of-range coordinate to `[0, len)`.
#[inline]
pub fn replicate(coord: isize, len: usize) -> usize {
    coord.clamp(0, len as isize - 1) as usize
}

/// Round to nearest and clamp into the u8 storage range.
#[inline]
pub fn to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Correlate a real-valued plane with `kernel`, replicating edges.
///
/// `out[y, x] = Σ plane[clamp(y + dy), clamp(x + dx)] * kernel[dy, dx]`
/// with offsets taken relative to the kernel anchor. Rows are processed in
/// parallel; output assembly is order-independent.
pub fn convolve_plane(plane: ArrayView2<f64>, kernel: &Kernel) -> Array2<f64> {
    let (height, width) = plane.dim();
    let (ay, ax) = kernel.anchor();
    let weights = kernel.weights();
    let mut output = Array2::<f64>::zeros((height, width));

    Zip::indexed(&mut output).par_for_each(|(y, x), out| {
        let mut sum = 0.0f64;
        for ((ky, kx), &w) in weights.indexed_iter() {
            let sy = replicate(y as isize + ky as isize - ay, height);
            let sx = replicate(x as isize + kx as isize - ax, width);
            sum += plane[[sy, sx]] * w;
        }
        *out = sum;
    });

    output
}

/// Convolve every channel of `image` independently with edge replication.
///
/// Output samples are rounded to nearest and clamped to `[0, 255]`.
pub fn convolve(image: &Image, kernel: &Kernel) -> Result<Image> {
    let (height, width, channels) = image.dim();
    let planes: Vec<Array2<f64>> = (0..channels)
        .map(|c| convolve_plane(image.channel(c).mapv(f64::from).view(), kernel))
        .collect();

    Image::new(Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        to_u8(planes[c][[y, x]])
    }))
}

/// Map a real-valued plane onto `[0, 255]` by min/max stretching.
///
/// A flat plane maps to all zeros.
pub fn stretch_to_u8(plane: &Array2<f64>) -> Array2<u8> {
    let (lo, hi) = plane
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    if !(range > 0.0) {
        return Array2::zeros(plane.dim());
    }
    plane.mapv(|v| to_u8((v - lo) / range * 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gaussian_kernel_normalized() {
        let k = Kernel::gaussian(5, 1.0).unwrap();
        assert!((k.weights().sum() - 1.0).abs() < 1e-12);
        // Center is the peak
        let center = k.weights()[[2, 2]];
        assert!(k.weights().iter().all(|&w| w <= center));
    }

    #[test]
    fn test_gaussian_kernel_rejects_bad_sigma() {
        assert!(Kernel::gaussian(3, 0.0).is_err());
        assert!(Kernel::gaussian(3, -1.0).is_err());
        assert!(Kernel::gaussian(3, f64::NAN).is_err());
    }

    #[test]
    fn test_kernel_size_validation() {
        assert!(validate_kernel_size(3).is_ok());
        assert!(validate_kernel_size(7).is_ok());
        assert!(validate_kernel_size(1).is_err());
        assert!(validate_kernel_size(4).is_err());
        assert!(Kernel::box_filter(2).is_err());
    }

    #[test]
    fn test_kernel_size_upper_bound() {
        assert!(validate_kernel_size(MAX_KERNEL_SIZE).is_ok());
        assert!(validate_kernel_size(MAX_KERNEL_SIZE + 2).is_err());
        let huge = (1usize << 32) + 1;
        assert!(matches!(
            Kernel::box_filter(huge),
            Err(EngineError::Validation(_))
        ));
        assert!(Kernel::gaussian(huge, 1.0).is_err());
    }

    #[test]
    fn test_convolve_replicates_edges() {
        // Identity-shifted kernel reads the right neighbor; the last column
        // must read itself.
        let plane = array![[1.0, 2.0, 3.0]];
        let k = Kernel::from_rows([[0.0, 0.0, 1.0]]);
        let out = convolve_plane(plane.view(), &k);
        assert_eq!(out, array![[2.0, 3.0, 3.0]]);
    }

    #[test]
    fn test_two_by_two_anchor_top_left() {
        let plane = array![[1.0, 2.0], [3.0, 4.0]];
        let k = Kernel::from_rows([[0.0, 0.0], [0.0, 1.0]]);
        let out = convolve_plane(plane.view(), &k);
        // (y+1, x+1), clamped at the bottom/right border
        assert_eq!(out, array![[4.0, 4.0], [4.0, 4.0]]);
    }

    #[test]
    fn test_checkerboard_average_golden() {
        let board = array![
            [0u8, 255, 0, 255],
            [255, 0, 255, 0],
            [0, 255, 0, 255],
            [255, 0, 255, 0]
        ];
        let img = Image::from_gray(board).unwrap();
        let out = convolve(&img, &Kernel::box_filter(3).unwrap()).unwrap();

        let expected = array![
            [113u8, 113, 142, 142],
            [113, 113, 142, 142],
            [142, 142, 113, 113],
            [142, 142, 113, 113]
        ];
        assert_eq!(out.channel(0), expected.view());
    }

    #[test]
    fn test_convolve_clamps() {
        let img = Image::from_gray(array![[200u8, 200], [200, 200]]).unwrap();
        let k = Kernel::from_rows([[0.0, 2.0, 0.0]]);
        let out = convolve(&img, &k).unwrap();
        assert!(out.pixels().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_stretch_flat_plane() {
        let plane = Array2::from_elem((2, 2), 7.0);
        assert!(stretch_to_u8(&plane).iter().all(|&v| v == 0));
    }
}
