//! Intensity enhancement: histogram equalization, range normalization and
//! grayscale conversion.
//!
//! Equalization builds a lookup table from the channel CDF
//! (`v → round(255 * cdf[v])`). Normalization stretches each channel's
//! `[min, max]` onto the requested range.
//!
//! Every result keeps the input's height, width and channel count.

use ndarray::{Array2, Array3, Zip};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filters::core::to_u8;
use crate::filters::grayscale::{luma, to_grayscale_keep_channels, LUMA_B, LUMA_G, LUMA_R};
use crate::filters::histogram::{channel_histogram, Histogram, LEVELS};
use crate::image::Image;

/// How color images are equalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqualizeMode {
    /// Each channel remapped by its own CDF
    #[default]
    PerChannel,
    /// Only the luma (Y of YUV) is remapped; chroma is kept
    Luma,
}

/// Target range of [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalizeRange {
    /// `[0, 1]`, stored as `[0, 255]` with the unit values reported alongside
    #[default]
    #[serde(rename = "0-1")]
    Unit,
    #[serde(rename = "0-255")]
    Full,
}

/// Enhancement selection with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "enhance_type", rename_all = "snake_case")]
pub enum Enhancement {
    Equalization,
    Normalization {
        #[serde(default, rename = "range_type")]
        range: NormalizeRange,
    },
    Grayscale,
}

/// Enhanced image plus the `[0, 1]` values when unit normalization was asked.
#[derive(Debug, Clone, PartialEq)]
pub struct Enhanced {
    pub image: Image,
    pub unit: Option<Array3<f32>>,
}

impl Enhancement {
    pub fn name(&self) -> &'static str {
        match self {
            Enhancement::Equalization => "equalization",
            Enhancement::Normalization { .. } => "normalization",
            Enhancement::Grayscale => "grayscale",
        }
    }

    pub fn apply(&self, image: &Image, mode: EqualizeMode) -> Result<Enhanced> {
        match *self {
            Enhancement::Equalization => Ok(Enhanced {
                image: equalize(image, mode)?,
                unit: None,
            }),
            Enhancement::Normalization { range } => normalize(image, range),
            Enhancement::Grayscale => Ok(Enhanced {
                image: to_grayscale_keep_channels(image)?,
                unit: None,
            }),
        }
    }
}

// ============================================================================
// Equalization
// ============================================================================

/// Histogram-equalize `image`.
///
/// Re-equalizing an equalized image is close to a fixed point but not exact,
/// because of rounding in the lookup table.
pub fn equalize(image: &Image, mode: EqualizeMode) -> Result<Image> {
    match mode {
        EqualizeMode::Luma if image.is_color() => equalize_luma(image),
        _ => equalize_per_channel(image),
    }
}

fn equalize_per_channel(image: &Image) -> Result<Image> {
    let luts: Vec<[u8; LEVELS]> = (0..image.channels())
        .map(|c| channel_histogram(image, c).cdf().equalization_lut())
        .collect();

    let mut output = image.pixels().clone();
    Zip::indexed(&mut output).for_each(|(_, _, c), v| *v = luts[c][*v as usize]);
    Image::new(output)
}

/// Equalize Y of YUV, carrying the chroma differences `R - Y` and `B - Y`
/// over unchanged and solving G from the new luma.
fn equalize_luma(image: &Image) -> Result<Image> {
    let (height, width, _) = image.dim();
    let pixels = image.view();

    let y_plane = Array2::from_shape_fn((height, width), |(y, x)| {
        to_u8(luma(pixels[[y, x, 0]], pixels[[y, x, 1]], pixels[[y, x, 2]]))
    });
    let lut = Histogram::from_samples(y_plane.iter()).cdf().equalization_lut();

    let output = Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        let y_old = y_plane[[y, x]] as f64;
        let y_new = lut[y_plane[[y, x]] as usize] as f64;
        let r_new = y_new + (pixels[[y, x, 0]] as f64 - y_old);
        let b_new = y_new + (pixels[[y, x, 2]] as f64 - y_old);
        match c {
            0 => to_u8(r_new),
            2 => to_u8(b_new),
            _ => to_u8((y_new - LUMA_R * r_new - LUMA_B * b_new) / LUMA_G),
        }
    });
    Image::new(output)
}

// ============================================================================
// Normalization
// ============================================================================

/// Stretch each channel's `[min, max]` onto the requested range.
///
/// The stored image always spans `[0, 255]` for non-constant channels. For
/// [`NormalizeRange::Unit`] the exact `[0, 1]` values are returned in
/// [`Enhanced::unit`]. A constant channel is left unchanged (no division by
/// zero); its unit values are `v / 255`.
pub fn normalize(image: &Image, range: NormalizeRange) -> Result<Enhanced> {
    let (height, width, channels) = image.dim();
    let bounds: Vec<(u8, u8)> = (0..channels)
        .map(|c| {
            image
                .channel(c)
                .iter()
                .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        })
        .collect();

    let unit = Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        let (lo, hi) = bounds[c];
        let v = image.pixels()[[y, x, c]];
        if hi == lo {
            v as f32 / 255.0
        } else {
            (v - lo) as f32 / (hi - lo) as f32
        }
    });

    let stored = Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        let (lo, hi) = bounds[c];
        let v = image.pixels()[[y, x, c]];
        if hi == lo {
            v
        } else {
            to_u8((v - lo) as f64 / (hi - lo) as f64 * 255.0)
        }
    });

    Ok(Enhanced {
        image: Image::new(stored)?,
        unit: match range {
            NormalizeRange::Unit => Some(unit),
            NormalizeRange::Full => None,
        },
    })
}
