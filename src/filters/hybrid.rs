//! Hybrid images: the low band of one image plus the high band of another.
//!
//! Both inputs are reduced to luma. The high band of the second image is
//! its luma minus its own low-pass, kept signed until the final sum so the
//! two bands stay complementary:
//!
//! ```text
//! low    = lowpass(luma1, cutoff_low)
//! high   = luma2 - lowpass(luma2, cutoff_high)
//! hybrid = clamp(low + high)
//! ```
//!
//! Outputs are replicated back to the inputs' channel count.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::filters::core::to_u8;
use crate::filters::frequency::{filter_plane, PassKind};
use crate::filters::grayscale::luma_plane_f64;
use crate::image::Image;

fn default_cutoff_low() -> f64 {
    30.0
}

fn default_cutoff_high() -> f64 {
    10.0
}

/// Offset added to the signed high band before it is stored for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighBandOffset {
    /// Re-center around 128 so negative detail stays visible
    #[default]
    MidGray,
    /// Clamp the signed band directly
    Zero,
}

impl HighBandOffset {
    pub fn value(&self) -> f64 {
        match self {
            HighBandOffset::MidGray => 128.0,
            HighBandOffset::Zero => 0.0,
        }
    }
}

/// Cutoff radii for [`compose`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridParams {
    #[serde(default = "default_cutoff_low")]
    pub cutoff_low: f64,
    #[serde(default = "default_cutoff_high")]
    pub cutoff_high: f64,
}

impl Default for HybridParams {
    fn default() -> Self {
        HybridParams {
            cutoff_low: default_cutoff_low(),
            cutoff_high: default_cutoff_high(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridResult {
    pub low_freq: Image,
    pub high_freq: Image,
    pub hybrid: Image,
}

/// Combine the low band of `image1` with the high band of `image2`.
///
/// The images must share height, width and channel count; no resizing is
/// attempted.
pub fn compose(
    image1: &Image,
    image2: &Image,
    params: HybridParams,
    offset: HighBandOffset,
) -> Result<HybridResult> {
    if !image1.same_shape(image2) {
        return Err(EngineError::MismatchedDimensions {
            left: image1.dim(),
            right: image2.dim(),
        });
    }
    if params.cutoff_low.is_nan() || params.cutoff_high.is_nan() {
        return Err(EngineError::validation("hybrid cutoffs must be numbers"));
    }

    let low = filter_plane(&luma_plane_f64(image1), PassKind::Low, params.cutoff_low);
    let luma2 = luma_plane_f64(image2);
    let high = &luma2 - &filter_plane(&luma2, PassKind::Low, params.cutoff_high);

    let channels = image1.channels();
    let bias = offset.value();
    let display = |plane: Array2<f64>| Image::from_gray_replicated(&plane.mapv(to_u8), channels);

    Ok(HybridResult {
        low_freq: display(low.clone())?,
        high_freq: display(high.mapv(|v| v + bias))?,
        hybrid: display(low + high)?,
    })
}
