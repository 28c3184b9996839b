//! Histogram analysis: intensity counts and cumulative distributions.
//!
//! Results are plain numeric arrays; rendering them as charts is left to
//! whatever presents them.
//!
//! The RGB report rejects 1-channel images with a validation error; use the
//! grayscale report for those.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::filters::grayscale::luma_plane;
use crate::image::Image;

/// Number of intensity levels
pub const LEVELS: usize = 256;

/// Which histogram to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramKind {
    /// Luma histogram plus its CDF
    #[default]
    Grayscale,
    /// One histogram per RGB channel
    Rgb,
}

impl HistogramKind {
    pub fn name(&self) -> &'static str {
        match self {
            HistogramKind::Grayscale => "grayscale",
            HistogramKind::Rgb => "rgb",
        }
    }

    pub fn apply(&self, image: &Image) -> Result<HistogramReport> {
        match self {
            HistogramKind::Grayscale => Ok(HistogramReport::Grayscale(grayscale(image))),
            HistogramKind::Rgb => rgb(image).map(HistogramReport::Rgb),
        }
    }
}

/// Count of samples per intensity level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    /// Count every sample of a plane-like iterator.
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a u8>) -> Self {
        let mut counts = vec![0u64; LEVELS];
        for &v in samples {
            counts[v as usize] += 1;
        }
        Histogram { counts }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Running sum normalized by the sample count.
    ///
    /// `cdf[i] = Σ hist[0..=i] / total`; the last entry is exactly 1 for a
    /// non-empty histogram.
    pub fn cdf(&self) -> Cdf {
        let total = self.total();
        let mut values = Vec::with_capacity(LEVELS);
        let mut running = 0u64;
        for &count in &self.counts {
            running += count;
            values.push(if total == 0 {
                0.0
            } else {
                running as f64 / total as f64
            });
        }
        Cdf { values }
    }
}

/// Cumulative distribution over the 256 intensity levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cdf {
    values: Vec<f64>,
}

impl Cdf {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Lookup table `v → round(255 * cdf[v])`.
    pub fn equalization_lut(&self) -> [u8; LEVELS] {
        let mut lut = [0u8; LEVELS];
        for (slot, &c) in lut.iter_mut().zip(&self.values) {
            *slot = (255.0 * c).round().clamp(0.0, 255.0) as u8;
        }
        lut
    }
}

/// Luma histogram with its CDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrayscaleHistogram {
    pub histogram: Histogram,
    pub cdf: Cdf,
}

/// Per-channel histograms in R, G, B order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgbHistogram {
    pub red: Histogram,
    pub green: Histogram,
    pub blue: Histogram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hist_type", rename_all = "snake_case")]
pub enum HistogramReport {
    Grayscale(GrayscaleHistogram),
    Rgb(RgbHistogram),
}

/// Histogram of one channel.
pub fn channel_histogram(image: &Image, channel: usize) -> Histogram {
    Histogram::from_samples(image.channel(channel).iter())
}

/// Luma histogram and CDF.
pub fn grayscale(image: &Image) -> GrayscaleHistogram {
    let histogram = Histogram::from_samples(luma_plane(image).iter());
    let cdf = histogram.cdf();
    GrayscaleHistogram { histogram, cdf }
}

/// Independent histograms of the three color channels.
///
/// Fails with a validation error on single-channel images, which have no
/// color channels to split.
pub fn rgb(image: &Image) -> Result<RgbHistogram> {
    if !image.is_color() {
        return Err(EngineError::validation(
            "rgb histogram requires a 3-channel image",
        ));
    }
    Ok(RgbHistogram {
        red: channel_histogram(image, 0),
        green: channel_histogram(image, 1),
        blue: channel_histogram(image, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_grayscale_counts_and_cdf() {
        let plane = Array2::from_shape_vec((2, 2), vec![0u8, 0, 10, 255]).unwrap();
        let report = grayscale(&Image::from_gray(plane).unwrap());

        assert_eq!(report.histogram.total(), 4);
        assert_eq!(report.histogram.counts()[0], 2);
        assert_eq!(report.histogram.counts()[10], 1);
        assert_eq!(report.histogram.counts()[255], 1);

        let cdf = report.cdf.values();
        assert_eq!(cdf.len(), LEVELS);
        assert!((cdf[0] - 0.5).abs() < 1e-12);
        assert!((cdf[9] - 0.5).abs() < 1e-12);
        assert!((cdf[10] - 0.75).abs() < 1e-12);
        assert_eq!(cdf[255], 1.0);
    }

    #[test]
    fn test_cdf_monotonic() {
        let img = Image::new(Array3::from_shape_fn((9, 7, 3), |(y, x, c)| {
            ((y * 31 + x * 17 + c * 5) % 256) as u8
        }))
        .unwrap();
        let report = grayscale(&img);
        let cdf = report.cdf.values();
        assert!(cdf.windows(2).all(|w| w[0] <= w[1]));
        assert!(cdf.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_rgb_channels_independent() {
        let mut pixels = Array3::<u8>::zeros((2, 3, 3));
        for y in 0..2 {
            for x in 0..3 {
                pixels[[y, x, 0]] = 200;
                pixels[[y, x, 1]] = 100;
                pixels[[y, x, 2]] = 50;
            }
        }
        let report = rgb(&Image::new(pixels).unwrap()).unwrap();
        assert_eq!(report.red.counts()[200], 6);
        assert_eq!(report.green.counts()[100], 6);
        assert_eq!(report.blue.counts()[50], 6);
        assert_eq!(report.red.total(), 6);
    }

    #[test]
    fn test_rgb_requires_color() {
        let img = Image::from_gray(Array2::from_elem((2, 2), 3u8)).unwrap();
        assert!(matches!(rgb(&img), Err(EngineError::Validation(_))));
    }
}
