//! Edge detection: Sobel, Prewitt, Roberts, Canny.
//!
//! Every operator first converts the image to luma (BT.601), then works on
//! that single plane. Gradient operators return three display images
//! (`grad_x`, `grad_y`, `magnitude`); Canny returns one binary edge map.
//!
//! Border handling is the shared edge replication from
//! [`convolve_plane`](crate::filters::core::convolve_plane).

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::filters::core::{convolve_plane, to_u8, Kernel};
use crate::filters::grayscale::luma_plane_f64;
use crate::image::Image;

fn default_threshold1() -> f64 {
    100.0
}

fn default_threshold2() -> f64 {
    200.0
}

/// Edge operator selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edge_type", rename_all = "snake_case")]
pub enum EdgeOperator {
    Sobel,
    Prewitt,
    Roberts,
    /// Sobel gradients, non-maximum suppression, double threshold and
    /// hysteresis linking. `threshold1` is the low and `threshold2` the high
    /// threshold on the L2 gradient magnitude.
    Canny {
        #[serde(default = "default_threshold1")]
        threshold1: f64,
        #[serde(default = "default_threshold2")]
        threshold2: f64,
    },
}

/// How many images an edge result carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeTag {
    Multi,
    Single,
}

impl std::fmt::Display for EdgeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeTag::Multi => write!(f, "multi"),
            EdgeTag::Single => write!(f, "single"),
        }
    }
}

/// Output of an edge operator. All images are single-channel.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeMap {
    Multi {
        grad_x: Image,
        grad_y: Image,
        magnitude: Image,
    },
    Single {
        edges: Image,
    },
}

impl EdgeMap {
    pub fn tag(&self) -> EdgeTag {
        match self {
            EdgeMap::Multi { .. } => EdgeTag::Multi,
            EdgeMap::Single { .. } => EdgeTag::Single,
        }
    }
}

impl EdgeOperator {
    pub fn name(&self) -> &'static str {
        match self {
            EdgeOperator::Sobel => "sobel",
            EdgeOperator::Prewitt => "prewitt",
            EdgeOperator::Roberts => "roberts",
            EdgeOperator::Canny { .. } => "canny",
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let EdgeOperator::Canny {
            threshold1,
            threshold2,
        } = *self
        {
            if !threshold1.is_finite() || !threshold2.is_finite() || threshold1 < 0.0 {
                return Err(EngineError::validation(
                    "canny thresholds must be finite and non-negative",
                ));
            }
            if threshold1 >= threshold2 {
                return Err(EngineError::validation(format!(
                    "threshold1 ({}) must be below threshold2 ({})",
                    threshold1, threshold2
                )));
            }
        }
        Ok(())
    }

    pub fn apply(&self, image: &Image) -> Result<EdgeMap> {
        self.validate()?;
        let luma = luma_plane_f64(image);
        match *self {
            EdgeOperator::Sobel => gradient_edges(&luma, &sobel_kernels()),
            EdgeOperator::Prewitt => gradient_edges(&luma, &prewitt_kernels()),
            EdgeOperator::Roberts => gradient_edges(&luma, &roberts_kernels()),
            EdgeOperator::Canny {
                threshold1,
                threshold2,
            } => Ok(EdgeMap::Single {
                edges: Image::from_gray(canny(&luma, threshold1, threshold2))?,
            }),
        }
    }
}

// ============================================================================
// Gradient kernels
// ============================================================================

/// Horizontal and vertical gradient kernel pair.
pub struct GradientKernels {
    pub gx: Kernel,
    pub gy: Kernel,
}

pub fn sobel_kernels() -> GradientKernels {
    GradientKernels {
        gx: Kernel::from_rows([[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]]),
        gy: Kernel::from_rows([[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]]),
    }
}

pub fn prewitt_kernels() -> GradientKernels {
    GradientKernels {
        gx: Kernel::from_rows([[-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0]]),
        gy: Kernel::from_rows([[-1.0, -1.0, -1.0], [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]),
    }
}

pub fn roberts_kernels() -> GradientKernels {
    GradientKernels {
        gx: Kernel::from_rows([[1.0, 0.0], [0.0, -1.0]]),
        gy: Kernel::from_rows([[0.0, 1.0], [-1.0, 0.0]]),
    }
}

/// Signed gradients of a luma plane.
fn gradients(luma: &Array2<f64>, kernels: &GradientKernels) -> (Array2<f64>, Array2<f64>) {
    (
        convolve_plane(luma.view(), &kernels.gx),
        convolve_plane(luma.view(), &kernels.gy),
    )
}

/// Gradient edge images.
///
/// `grad_x`/`grad_y` are displayed as absolute responses clamped to
/// `[0, 255]`; `magnitude = clamp(sqrt(gx² + gy²), 0, 255)`.
fn gradient_edges(luma: &Array2<f64>, kernels: &GradientKernels) -> Result<EdgeMap> {
    let (gx, gy) = gradients(luma, kernels);
    let magnitude = Zip::from(&gx).and(&gy).map_collect(|&x, &y| to_u8(x.hypot(y)));
    Ok(EdgeMap::Multi {
        grad_x: Image::from_gray(gx.mapv(|v| to_u8(v.abs())))?,
        grad_y: Image::from_gray(gy.mapv(|v| to_u8(v.abs())))?,
        magnitude: Image::from_gray(magnitude)?,
    })
}

// ============================================================================
// Canny
// ============================================================================

const TAN_22_5_DEG: f64 = 0.414_213_562_373_095;

const STRONG: u8 = 255;
const WEAK: u8 = 1;

/// Canny edge map of a luma plane: 255 on edges, 0 elsewhere.
///
/// # Arguments
/// * `luma` - Luma plane (0-255 scale)
/// * `low` - Weak edge threshold
/// * `high` - Strong edge threshold
pub fn canny(luma: &Array2<f64>, low: f64, high: f64) -> Array2<u8> {
    let (gx, gy) = gradients(luma, &sobel_kernels());
    let magnitude = Zip::from(&gx).and(&gy).map_collect(|&x, &y| x.hypot(y));
    let suppressed = non_max_suppression(&magnitude, &gx, &gy);
    let classified = suppressed.mapv(|m| {
        if m >= high {
            STRONG
        } else if m >= low {
            WEAK
        } else {
            0
        }
    });
    hysteresis(classified)
}

/// Keep only local maxima along the quantized gradient direction.
///
/// Neighbors outside the image count as zero magnitude. Ties on a plateau
/// keep the first pixel along the direction.
fn non_max_suppression(magnitude: &Array2<f64>, gx: &Array2<f64>, gy: &Array2<f64>) -> Array2<f64> {
    let (height, width) = magnitude.dim();
    let at = |y: isize, x: isize| -> f64 {
        if y < 0 || x < 0 || y >= height as isize || x >= width as isize {
            0.0
        } else {
            magnitude[[y as usize, x as usize]]
        }
    };

    let mut output = Array2::<f64>::zeros((height, width));
    Zip::indexed(&mut output).par_for_each(|(y, x), out| {
        let mag = magnitude[[y, x]];
        if mag == 0.0 {
            return;
        }
        let (gxv, gyv) = (gx[[y, x]], gy[[y, x]]);
        let (abs_gx, abs_gy) = (gxv.abs(), gyv.abs());
        let same_sign = (gxv >= 0.0) == (gyv >= 0.0);
        let (y, x) = (y as isize, x as isize);

        // (before, after) along the gradient
        let (before, after) = if abs_gy <= abs_gx * TAN_22_5_DEG {
            (at(y, x - 1), at(y, x + 1))
        } else if abs_gx <= abs_gy * TAN_22_5_DEG {
            (at(y - 1, x), at(y + 1, x))
        } else if same_sign {
            (at(y - 1, x - 1), at(y + 1, x + 1))
        } else {
            (at(y - 1, x + 1), at(y + 1, x - 1))
        };

        if mag > before && mag >= after {
            *out = mag;
        }
    });
    output
}

/// Promote weak pixels 8-connected to a strong pixel; drop the rest.
fn hysteresis(mut classified: Array2<u8>) -> Array2<u8> {
    let (height, width) = classified.dim();
    let mut stack: Vec<(usize, usize)> = classified
        .indexed_iter()
        .filter(|(_, &v)| v == STRONG)
        .map(|(idx, _)| idx)
        .collect();

    while let Some((y, x)) = stack.pop() {
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let ny = y as isize + dy;
                let nx = x as isize + dx;
                if ny < 0 || nx < 0 || ny >= height as isize || nx >= width as isize {
                    continue;
                }
                let (ny, nx) = (ny as usize, nx as usize);
                if classified[[ny, nx]] == WEAK {
                    classified[[ny, nx]] = STRONG;
                    stack.push((ny, nx));
                }
            }
        }
    }

    classified.mapv_inplace(|v| if v == STRONG { 255 } else { 0 });
    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn vertical_step(height: usize, width: usize, split: usize) -> Image {
        Image::new(Array3::from_shape_fn((height, width, 3), |(_, x, _)| {
            if x < split {
                0
            } else {
                255
            }
        }))
        .unwrap()
    }

    fn flat(value: u8) -> Image {
        Image::new(Array3::from_elem((6, 6, 1), value)).unwrap()
    }

    #[test]
    fn test_sobel_detects_vertical_edge() {
        let result = EdgeOperator::Sobel.apply(&vertical_step(5, 6, 3)).unwrap();
        assert_eq!(result.tag(), EdgeTag::Multi);
        match result {
            EdgeMap::Multi {
                grad_x,
                grad_y,
                magnitude,
            } => {
                assert_eq!(grad_x.channel(0)[[2, 2]], 255);
                assert_eq!(grad_x.channel(0)[[2, 0]], 0);
                assert!(grad_y.pixels().iter().all(|&v| v == 0));
                assert_eq!(magnitude.channel(0)[[2, 3]], 255);
                assert_eq!(magnitude.dim(), (5, 6, 1));
            }
            EdgeMap::Single { .. } => panic!("sobel must be multi"),
        }
    }

    #[test]
    fn test_flat_image_has_no_gradient() {
        for op in [EdgeOperator::Sobel, EdgeOperator::Prewitt, EdgeOperator::Roberts] {
            match op.apply(&flat(90)).unwrap() {
                EdgeMap::Multi { magnitude, .. } => {
                    assert!(magnitude.pixels().iter().all(|&v| v == 0), "{}", op.name())
                }
                EdgeMap::Single { .. } => panic!("expected multi"),
            }
        }
    }

    #[test]
    fn test_prewitt_response_scale() {
        // Step of 30 gray levels: prewitt gx = 3 * 30 next to the step
        let img = Image::new(Array3::from_shape_fn((4, 4, 1), |(_, x, _)| {
            if x < 2 {
                100
            } else {
                130
            }
        }))
        .unwrap();
        match EdgeOperator::Prewitt.apply(&img).unwrap() {
            EdgeMap::Multi { grad_x, .. } => assert_eq!(grad_x.channel(0)[[1, 1]], 90),
            EdgeMap::Single { .. } => panic!("expected multi"),
        }
    }

    #[test]
    fn test_roberts_diagonal() {
        // Roberts gx at (0,0) = p(0,0) - p(1,1)
        let img = Image::new(Array3::from_shape_fn((3, 3, 1), |(y, x, _)| {
            if y == 0 && x == 0 {
                50
            } else {
                10
            }
        }))
        .unwrap();
        match EdgeOperator::Roberts.apply(&img).unwrap() {
            EdgeMap::Multi {
                grad_x, magnitude, ..
            } => {
                assert_eq!(grad_x.channel(0)[[0, 0]], 40);
                assert_eq!(magnitude.channel(0)[[0, 0]], 40);
                assert_eq!(magnitude.channel(0)[[2, 2]], 0);
            }
            EdgeMap::Single { .. } => panic!("expected multi"),
        }
    }

    #[test]
    fn test_canny_thin_edge() {
        let result = EdgeOperator::Canny {
            threshold1: 100.0,
            threshold2: 200.0,
        }
        .apply(&vertical_step(8, 8, 4))
        .unwrap();
        assert_eq!(result.tag(), EdgeTag::Single);
        let edges = match result {
            EdgeMap::Single { edges } => edges,
            EdgeMap::Multi { .. } => panic!("canny must be single"),
        };
        for y in 0..8 {
            for x in 0..8 {
                let expected = if x == 3 { 255 } else { 0 };
                assert_eq!(edges.channel(0)[[y, x]], expected, "({}, {})", y, x);
            }
        }
    }

    #[test]
    fn test_canny_flat_image_empty() {
        let result = EdgeOperator::Canny {
            threshold1: 10.0,
            threshold2: 20.0,
        }
        .apply(&flat(200))
        .unwrap();
        match result {
            EdgeMap::Single { edges } => assert!(edges.pixels().iter().all(|&v| v == 0)),
            EdgeMap::Multi { .. } => panic!("expected single"),
        }
    }

    #[test]
    fn test_canny_threshold_order() {
        let op = EdgeOperator::Canny {
            threshold1: 200.0,
            threshold2: 100.0,
        };
        assert!(matches!(op.validate(), Err(EngineError::Validation(_))));
        let op = EdgeOperator::Canny {
            threshold1: 50.0,
            threshold2: 50.0,
        };
        assert!(op.apply(&flat(0)).is_err());
    }

    #[test]
    fn test_hysteresis_links_weak_to_strong() {
        let classified = ndarray::array![[STRONG, WEAK, WEAK, 0, WEAK]];
        let out = hysteresis(classified);
        assert_eq!(out, ndarray::array![[255u8, 255, 255, 0, 0]]);
    }
}
