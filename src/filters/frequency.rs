//! Frequency-domain filtering with ideal circular masks.
//!
//! The luma plane is transformed with a 2D FFT (row passes, transpose,
//! column passes), the zero frequency is shifted to `(H/2, W/2)`, and a
//! binary disc of radius `cutoff` keeps either the inside (low-pass) or the
//! outside (high-pass). The inverse transform's magnitude, clamped to
//! `[0, 255]`, is the filtered image. The mask itself and the masked
//! spectrum are returned alongside it for display.
//!
//! ## Conventions
//!
//! | Step | Convention |
//! |------|------------|
//! | Forward | unscaled |
//! | Inverse | divided by `H·W` |
//! | Shift | `out[i] = in[(i + n - n/2) % n]` |
//! | Unshift | `out[i] = in[(i + n/2) % n]` |

use ndarray::{Array2, Zip};
use rayon::prelude::*;
use rustfft::{num_complex::Complex64, FftDirection, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::filters::core::{stretch_to_u8, to_u8};
use crate::filters::grayscale::luma_plane_f64;
use crate::image::Image;

fn default_cutoff() -> f64 {
    30.0
}

/// Which side of the circular mask survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Keep distance ≤ cutoff
    Low,
    /// Keep distance > cutoff
    High,
}

impl PassKind {
    pub fn name(&self) -> &'static str {
        match self {
            PassKind::Low => "low",
            PassKind::High => "high",
        }
    }
}

/// Ideal low/high-pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyFilter {
    #[serde(rename = "filter_type")]
    pub kind: PassKind,
    /// Mask radius in frequency samples; clamped into `[0, min(H, W) / 2]`
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
}

/// Output of [`FrequencyFilter::apply`].
///
/// `filtered` keeps the input channel count; the other three are single
/// channel images of the shifted frequency plane.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyResult {
    pub filtered: Image,
    /// `ln(1 + |F|)` of the unfiltered transform, stretched to `[0, 255]`
    pub spectrum: Image,
    /// 255 where coefficients are kept, 0 elsewhere
    pub mask: Image,
    /// `ln(1 + |F·mask|)`, stretched to `[0, 255]`
    pub filtered_spectrum: Image,
}

impl FrequencyFilter {
    pub fn new(kind: PassKind, cutoff: f64) -> Self {
        FrequencyFilter { kind, cutoff }
    }

    /// Out-of-range cutoffs are clamped later; only NaN is rejected.
    pub fn validate(&self) -> Result<()> {
        if self.cutoff.is_nan() {
            return Err(EngineError::validation("cutoff must be a number"));
        }
        Ok(())
    }

    pub fn apply(&self, image: &Image) -> Result<FrequencyResult> {
        self.validate()?;
        let luma = luma_plane_f64(image);
        let shifted = fft_shift(&fft2(&luma));
        let (height, width) = shifted.dim();
        let mask = circular_mask(height, width, self.kind, self.cutoff);

        let spectrum = log_magnitude(&shifted);
        let masked = apply_mask(shifted, &mask);
        let filtered_spectrum = log_magnitude(&masked);
        let filtered = invert(&masked).mapv(to_u8);

        Ok(FrequencyResult {
            filtered: Image::from_gray_replicated(&filtered, image.channels())?,
            spectrum: Image::from_gray(stretch_to_u8(&spectrum))?,
            mask: Image::from_gray(mask.mapv(|keep| if keep { 255 } else { 0 }))?,
            filtered_spectrum: Image::from_gray(stretch_to_u8(&filtered_spectrum))?,
        })
    }
}

/// Clamp `cutoff` into `[0, min(height, width) / 2]`.
pub fn clamp_cutoff(cutoff: f64, height: usize, width: usize) -> f64 {
    let max = height.min(width) as f64 / 2.0;
    if cutoff.is_nan() {
        return 0.0;
    }
    cutoff.clamp(0.0, max)
}

/// Filter a real plane, returning the magnitude of the inverse transform
/// (unclamped).
pub fn filter_plane(plane: &Array2<f64>, kind: PassKind, cutoff: f64) -> Array2<f64> {
    let (height, width) = plane.dim();
    let mask = circular_mask(height, width, kind, cutoff);
    invert(&apply_mask(fft_shift(&fft2(plane)), &mask))
}

/// Keep-mask over a shifted `height × width` spectrum: a disc of radius
/// `cutoff` (clamped) around `(H/2, W/2)`, or its complement for high-pass.
pub fn circular_mask(height: usize, width: usize, kind: PassKind, cutoff: f64) -> Array2<bool> {
    let radius = clamp_cutoff(cutoff, height, width);
    let (cy, cx) = ((height / 2) as f64, (width / 2) as f64);

    Array2::from_shape_fn((height, width), |(y, x)| {
        let distance = ((y as f64 - cy).powi(2) + (x as f64 - cx).powi(2)).sqrt();
        match kind {
            PassKind::Low => distance <= radius,
            PassKind::High => distance > radius,
        }
    })
}

fn apply_mask(mut shifted: Array2<Complex64>, mask: &Array2<bool>) -> Array2<Complex64> {
    Zip::from(&mut shifted)
        .and(mask)
        .for_each(|v, &keep| {
            if !keep {
                *v = Complex64::new(0.0, 0.0);
            }
        });
    shifted
}

/// Magnitude of the inverse transform of a shifted spectrum.
fn invert(shifted: &Array2<Complex64>) -> Array2<f64> {
    ifft2(&ifft_shift(shifted)).mapv(|c| c.norm())
}

/// `ln(1 + |F|)` of a shifted spectrum.
fn log_magnitude(shifted: &Array2<Complex64>) -> Array2<f64> {
    shifted.mapv(|c| c.norm().ln_1p())
}

// ============================================================================
// Transforms
// ============================================================================

/// Forward 2D FFT of a real plane.
pub fn fft2(plane: &Array2<f64>) -> Array2<Complex64> {
    transform_2d(plane.mapv(|v| Complex64::new(v, 0.0)), FftDirection::Forward)
}

/// Inverse 2D FFT, scaled by `1 / (H·W)`.
pub fn ifft2(spectrum: &Array2<Complex64>) -> Array2<Complex64> {
    let (height, width) = spectrum.dim();
    let scale = 1.0 / (height * width) as f64;
    transform_2d(spectrum.clone(), FftDirection::Inverse).mapv(|c| c * scale)
}

fn transform_2d(values: Array2<Complex64>, direction: FftDirection) -> Array2<Complex64> {
    let (height, width) = values.dim();
    let mut planner = FftPlanner::new();
    let row_fft = planner.plan_fft(width, direction);
    let col_fft = planner.plan_fft(height, direction);

    let mut rows: Vec<Complex64> = values.iter().copied().collect();
    rows.par_chunks_mut(width).for_each(|row| row_fft.process(row));

    let mut cols = vec![Complex64::new(0.0, 0.0); height * width];
    for y in 0..height {
        for x in 0..width {
            cols[x * height + y] = rows[y * width + x];
        }
    }
    cols.par_chunks_mut(height).for_each(|col| col_fft.process(col));

    Array2::from_shape_fn((height, width), |(y, x)| cols[x * height + y])
}

/// Move the zero frequency from `(0, 0)` to `(H/2, W/2)`.
pub fn fft_shift<T: Clone>(a: &Array2<T>) -> Array2<T> {
    let (h, w) = a.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        a[[(y + h - h / 2) % h, (x + w - w / 2) % w]].clone()
    })
}

/// Inverse of [`fft_shift`], also for odd sizes.
pub fn ifft_shift<T: Clone>(a: &Array2<T>) -> Array2<T> {
    let (h, w) = a.dim();
    Array2::from_shape_fn((h, w), |(y, x)| a[[(y + h / 2) % h, (x + w / 2) % w]].clone())
}
