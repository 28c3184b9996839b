//! Noise synthesis: Gaussian, Uniform, Salt & Pepper.
//!
//! Additive generators draw an independent sample for every channel of every
//! pixel; impulse noise picks whole pixels so an affected pixel's channels
//! move together. Results are rounded and clamped to `[0, 255]`.
//!
//! All generators take the caller's RNG so a session can own a seeded
//! source and replay deterministic noise.

use ndarray::Axis;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::filters::core::to_u8;
use crate::image::Image;

fn default_sigma() -> f64 {
    25.0
}

fn default_low() -> f64 {
    -25.0
}

fn default_high() -> f64 {
    25.0
}

fn default_ratio() -> f64 {
    0.05
}

fn default_salt_vs_pepper() -> f64 {
    0.5
}

/// Noise generator selection with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "noise_type", rename_all = "snake_case")]
pub enum Noise {
    /// Additive normal noise `N(mean, sigma)`
    Gaussian {
        #[serde(default)]
        mean: f64,
        #[serde(default = "default_sigma")]
        sigma: f64,
    },
    /// Additive uniform noise on `[low, high]`
    Uniform {
        #[serde(default = "default_low")]
        low: f64,
        #[serde(default = "default_high")]
        high: f64,
    },
    /// Impulse noise on a `ratio` fraction of pixels
    SaltPepper {
        #[serde(default = "default_ratio")]
        ratio: f64,
        /// Probability that an affected pixel becomes white
        #[serde(default = "default_salt_vs_pepper")]
        salt_vs_pepper: f64,
    },
}

impl Noise {
    /// Short name used in status messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Noise::Gaussian { .. } => "gaussian",
            Noise::Uniform { .. } => "uniform",
            Noise::SaltPepper { .. } => "salt_pepper",
        }
    }

    /// Check parameters without touching any pixels.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Noise::Gaussian { mean, sigma } => {
                if !mean.is_finite() || !sigma.is_finite() {
                    return Err(EngineError::validation("gaussian mean/sigma must be finite"));
                }
                if sigma < 0.0 {
                    return Err(EngineError::validation(format!(
                        "sigma must be >= 0, got {}",
                        sigma
                    )));
                }
            }
            Noise::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(EngineError::validation("uniform bounds must be finite"));
                }
                if !(high - low).is_finite() {
                    return Err(EngineError::validation(format!(
                        "uniform range {}..{} is too wide",
                        low, high
                    )));
                }
                if low > high {
                    return Err(EngineError::validation(format!(
                        "uniform low ({}) must not exceed high ({})",
                        low, high
                    )));
                }
            }
            Noise::SaltPepper {
                ratio,
                salt_vs_pepper,
            } => {
                if !(0.0..=1.0).contains(&ratio) {
                    return Err(EngineError::validation(format!(
                        "ratio must be in [0, 1], got {}",
                        ratio
                    )));
                }
                if !(0.0..=1.0).contains(&salt_vs_pepper) {
                    return Err(EngineError::validation(format!(
                        "salt_vs_pepper must be in [0, 1], got {}",
                        salt_vs_pepper
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validate, then generate noise on a copy of `image`.
    pub fn apply<R: Rng + ?Sized>(&self, image: &Image, rng: &mut R) -> Result<Image> {
        self.validate()?;
        match *self {
            Noise::Gaussian { mean, sigma } => add_gaussian_noise(image, mean, sigma, rng),
            Noise::Uniform { low, high } => add_uniform_noise(image, low, high, rng),
            Noise::SaltPepper {
                ratio,
                salt_vs_pepper,
            } => add_salt_pepper_noise(image, ratio, salt_vs_pepper, rng),
        }
    }
}

// ============================================================================
// Additive noise
// ============================================================================

fn add_sampled<R, D>(image: &Image, dist: D, rng: &mut R) -> Result<Image>
where
    R: Rng + ?Sized,
    D: Distribution<f64>,
{
    let mut output = image.pixels().clone();
    for v in output.iter_mut() {
        *v = to_u8(*v as f64 + dist.sample(rng));
    }
    Image::new(output)
}

/// Add independent `N(mean, sigma)` noise to every sample.
///
/// `sigma == 0` returns a bit-identical copy regardless of `mean`.
pub fn add_gaussian_noise<R: Rng + ?Sized>(
    image: &Image,
    mean: f64,
    sigma: f64,
    rng: &mut R,
) -> Result<Image> {
    if sigma == 0.0 {
        return Ok(image.clone());
    }
    let dist = Normal::new(mean, sigma).map_err(|e| EngineError::validation(e.to_string()))?;
    add_sampled(image, dist, rng)
}

/// Add independent `U(low, high)` noise to every sample.
pub fn add_uniform_noise<R: Rng + ?Sized>(
    image: &Image,
    low: f64,
    high: f64,
    rng: &mut R,
) -> Result<Image> {
    Noise::Uniform { low, high }.validate()?;
    add_sampled(image, Uniform::new_inclusive(low, high), rng)
}

// ============================================================================
// Impulse noise
// ============================================================================

/// Force a `ratio` fraction of pixels to pure black or white.
///
/// Each pixel is hit with probability `ratio`; a hit pixel becomes 255 with
/// probability `salt_vs_pepper`, else 0, across all of its channels.
///
/// # Arguments
/// * `image` - Grayscale or RGB image
/// * `ratio` - Fraction of affected pixels (0.0-1.0)
/// * `salt_vs_pepper` - Share of white among affected pixels (0.0-1.0)
pub fn add_salt_pepper_noise<R: Rng + ?Sized>(
    image: &Image,
    ratio: f64,
    salt_vs_pepper: f64,
    rng: &mut R,
) -> Result<Image> {
    if ratio <= 0.0 {
        return Ok(image.clone());
    }
    let mut output = image.pixels().clone();
    for mut row in output.axis_iter_mut(Axis(0)) {
        for mut pixel in row.axis_iter_mut(Axis(0)) {
            if rng.gen::<f64>() < ratio {
                let value = if rng.gen_bool(salt_vs_pepper) { 255 } else { 0 };
                pixel.fill(value);
            }
        }
    }
    Image::new(output)
}
