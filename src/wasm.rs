//! WebAssembly exports for ImageLab filters.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. They are
//! stateless: sessions and history live on the JavaScript side.
//!
//! All images are flat row-major byte arrays of length
//! `width * height * channels` with `channels` 1 or 3. Errors surface as
//! JavaScript exceptions carrying the error message.

use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

use crate::error::EngineError;
use crate::filters::edge::{EdgeMap, EdgeOperator};
use crate::filters::enhance::{equalize, EqualizeMode};
use crate::filters::frequency::{FrequencyFilter, PassKind};
use crate::filters::hybrid::{compose, HighBandOffset, HybridParams};
use crate::filters::noise::Noise;
use crate::filters::spatial::SpatialFilter;
use crate::image::Image;

fn to_js(err: EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn unknown(kind: &str, value: &str) -> JsValue {
    JsValue::from_str(&format!("Invalid {} type: {}", kind, value))
}

fn decode(data: &[u8], width: usize, height: usize, channels: usize) -> Result<Image, JsValue> {
    Image::from_raw(height, width, channels, data.to_vec()).map_err(to_js)
}

// ============================================================================
// Noise
// ============================================================================

/// Add noise with a deterministic seed.
///
/// # Arguments
/// * `noise_type` - "gaussian", "uniform" or "salt_pepper"
/// * `a`, `b` - (mean, sigma), (low, high) or (ratio, salt_vs_pepper)
/// * `seed` - RNG seed
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn add_noise_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    noise_type: &str,
    a: f64,
    b: f64,
    seed: u64,
) -> Result<Vec<u8>, JsValue> {
    let image = decode(data, width, height, channels)?;
    let noise = match noise_type {
        "gaussian" => Noise::Gaussian { mean: a, sigma: b },
        "uniform" => Noise::Uniform { low: a, high: b },
        "salt_pepper" => Noise::SaltPepper {
            ratio: a,
            salt_vs_pepper: b,
        },
        other => return Err(unknown("noise", other)),
    };
    let mut rng = StdRng::seed_from_u64(seed);
    noise
        .apply(&image, &mut rng)
        .map(Image::into_raw)
        .map_err(to_js)
}

// ============================================================================
// Smoothing
// ============================================================================

/// Average, gaussian or median filter. `sigma` is only read by gaussian.
#[wasm_bindgen]
pub fn spatial_filter_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    filter_type: &str,
    kernel_size: usize,
    sigma: f64,
) -> Result<Vec<u8>, JsValue> {
    let image = decode(data, width, height, channels)?;
    let filter = match filter_type {
        "average" => SpatialFilter::Average { kernel_size },
        "gaussian" => SpatialFilter::Gaussian { kernel_size, sigma },
        "median" => SpatialFilter::Median { kernel_size },
        other => return Err(unknown("filter", other)),
    };
    filter.apply(&image).map(Image::into_raw).map_err(to_js)
}

// ============================================================================
// Edges
// ============================================================================

/// Single-channel edge image: the gradient magnitude for sobel, prewitt and
/// roberts, the binary edge map for canny.
///
/// # Returns
/// Flat array of `width * height` bytes
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn edge_magnitude_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    edge_type: &str,
    threshold1: f64,
    threshold2: f64,
) -> Result<Vec<u8>, JsValue> {
    let image = decode(data, width, height, channels)?;
    let operator = match edge_type {
        "sobel" => EdgeOperator::Sobel,
        "prewitt" => EdgeOperator::Prewitt,
        "roberts" => EdgeOperator::Roberts,
        "canny" => EdgeOperator::Canny {
            threshold1,
            threshold2,
        },
        other => return Err(unknown("edge", other)),
    };
    let edges = match operator.apply(&image).map_err(to_js)? {
        EdgeMap::Multi { magnitude, .. } => magnitude,
        EdgeMap::Single { edges } => edges,
    };
    Ok(edges.into_raw())
}

// ============================================================================
// Enhancement
// ============================================================================

/// Per-channel histogram equalization.
#[wasm_bindgen]
pub fn equalize_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<Vec<u8>, JsValue> {
    let image = decode(data, width, height, channels)?;
    equalize(&image, EqualizeMode::PerChannel)
        .map(Image::into_raw)
        .map_err(to_js)
}

// ============================================================================
// Frequency
// ============================================================================

/// Ideal low- or high-pass filter. The output keeps the input channel count.
#[wasm_bindgen]
pub fn frequency_filter_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    filter_type: &str,
    cutoff: f64,
) -> Result<Vec<u8>, JsValue> {
    let image = decode(data, width, height, channels)?;
    let kind = match filter_type {
        "low" => PassKind::Low,
        "high" => PassKind::High,
        other => return Err(unknown("frequency filter", other)),
    };
    let result = FrequencyFilter::new(kind, cutoff)
        .apply(&image)
        .map_err(to_js)?;
    Ok(result.filtered.into_raw())
}

/// Hybrid of the first image's low band and the second's high band.
///
/// Both buffers must describe images of the same size and channel count.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn hybrid_wasm(
    data1: &[u8],
    data2: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    cutoff_low: f64,
    cutoff_high: f64,
) -> Result<Vec<u8>, JsValue> {
    let image1 = decode(data1, width, height, channels)?;
    let image2 = decode(data2, width, height, channels)?;
    let params = HybridParams {
        cutoff_low,
        cutoff_high,
    };
    let result = compose(&image1, &image2, params, HighBandOffset::MidGray).map_err(to_js)?;
    Ok(result.hybrid.into_raw())
}
