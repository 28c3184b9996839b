//! Pixel-processing filters.
//!
//! ## Supported Formats
//!
//! Every filter accepts an [`Image`](crate::image::Image) with 1 or 3 channels:
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Grayscale8 | (H, W, 1) | u8 | Single luminance channel, 0-255 |
//! | RGB8 | (H, W, 3) | u8 | Red, green, blue, 0-255 |
//!
//! ## Architecture
//!
//! All filters follow these principles:
//! - **Pure** - Input images are never modified; each call builds a new image
//! - **Shape preserving** - Mutating filters return the input's height, width and channel count
//! - **Edge replication** - Neighborhood operations clamp coordinates to the border
//! - **Round then clamp** - Real-valued intermediates are rounded to nearest, then clamped to 0-255
//! - **Thread-safe** - Use rayon for parallel processing where available
//!
//! ## Filter Categories
//!
//! - **Kernel math**: kernels, convolution, clamping (`core`)
//! - **Noise**: gaussian, uniform, salt & pepper (`noise`)
//! - **Smoothing**: average, gaussian, median (`spatial`)
//! - **Edge detection**: sobel, prewitt, roberts, canny (`edge`)
//! - **Tonal**: histogram/CDF (`histogram`), equalize, normalize, grayscale (`enhance`)
//! - **Frequency**: ideal low/high-pass (`frequency`), hybrid images (`hybrid`)

pub mod core;
pub mod grayscale;
pub mod noise;
pub mod spatial;
pub mod edge;
pub mod histogram;
pub mod enhance;
pub mod frequency;
pub mod hybrid;
