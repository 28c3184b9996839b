//! Closed set of session operations.
//!
//! [`Mutation`]s replace a session's working image and push the previous
//! one onto its history. [`Analysis`] operations only read the working image
//! and return artifacts.
//!
//! Both enums are serde-tagged on `operation` so a transport layer can decode
//! a request body directly, e.g.
//! `{"operation": "noise", "noise_type": "gaussian", "sigma": 10}`.

use ndarray::Array3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filters::edge::{EdgeMap, EdgeOperator};
use crate::filters::enhance::{EqualizeMode, Enhancement};
use crate::filters::frequency::FrequencyFilter;
use crate::filters::histogram::{HistogramKind, HistogramReport};
use crate::filters::noise::Noise;
use crate::filters::spatial::SpatialFilter;
use crate::image::Image;

/// Operation that replaces the working image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Mutation {
    Noise(Noise),
    Filter(SpatialFilter),
    Enhance(Enhancement),
    Frequency(FrequencyFilter),
}

/// Side output of a mutation that is returned but never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Frequency-plane views of a frequency filter: the unfiltered
    /// log-magnitude spectrum, the keep-mask and the masked spectrum
    Spectrum {
        spectrum: Image,
        mask: Image,
        filtered_spectrum: Image,
    },
    /// Exact `[0, 1]` values of a unit normalization
    UnitNormalized(Array3<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutput {
    pub image: Image,
    pub artifact: Option<Artifact>,
}

impl MutationOutput {
    fn image(image: Image) -> Self {
        MutationOutput {
            image,
            artifact: None,
        }
    }
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Noise(_) => "noise",
            Mutation::Filter(_) => "filter",
            Mutation::Enhance(_) => "enhance",
            Mutation::Frequency(_) => "frequency",
        }
    }

    /// Check parameters without computing anything.
    pub fn validate(&self) -> Result<()> {
        match self {
            Mutation::Noise(noise) => noise.validate(),
            Mutation::Filter(filter) => filter.validate(),
            Mutation::Enhance(_) => Ok(()),
            Mutation::Frequency(filter) => filter.validate(),
        }
    }

    /// Run the operation on `image`. Only noise draws from `rng`; only
    /// equalization reads `mode`.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        image: &Image,
        rng: &mut R,
        mode: EqualizeMode,
    ) -> Result<MutationOutput> {
        match self {
            Mutation::Noise(noise) => noise.apply(image, rng).map(MutationOutput::image),
            Mutation::Filter(filter) => filter.apply(image).map(MutationOutput::image),
            Mutation::Enhance(enhancement) => {
                let enhanced = enhancement.apply(image, mode)?;
                Ok(MutationOutput {
                    image: enhanced.image,
                    artifact: enhanced.unit.map(Artifact::UnitNormalized),
                })
            }
            Mutation::Frequency(filter) => {
                let result = filter.apply(image)?;
                Ok(MutationOutput {
                    image: result.filtered,
                    artifact: Some(Artifact::Spectrum {
                        spectrum: result.spectrum,
                        mask: result.mask,
                        filtered_spectrum: result.filtered_spectrum,
                    }),
                })
            }
        }
    }

    /// Status line reported after a successful commit.
    pub fn describe(&self) -> String {
        match self {
            Mutation::Noise(noise) => format!("{} noise added successfully", noise.name()),
            Mutation::Filter(filter) => format!("{} filter applied", filter.name()),
            Mutation::Enhance(enhancement) => {
                format!("{} applied successfully", enhancement.name())
            }
            Mutation::Frequency(filter) => format!("{}-pass filter applied", filter.kind.name()),
        }
    }
}

/// Read-only operation on the working image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Analysis {
    Edges(EdgeOperator),
    Histogram {
        #[serde(default, rename = "hist_type")]
        kind: HistogramKind,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutput {
    Edges(EdgeMap),
    Histogram(HistogramReport),
}

impl Analysis {
    pub fn name(&self) -> &'static str {
        match self {
            Analysis::Edges(_) => "edges",
            Analysis::Histogram { .. } => "histogram",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Analysis::Edges(operator) => operator.validate(),
            Analysis::Histogram { .. } => Ok(()),
        }
    }

    pub fn apply(&self, image: &Image) -> Result<AnalysisOutput> {
        match self {
            Analysis::Edges(operator) => operator.apply(image).map(AnalysisOutput::Edges),
            Analysis::Histogram { kind } => kind.apply(image).map(AnalysisOutput::Histogram),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Analysis::Edges(operator) => format!("{} edge detection applied", operator.name()),
            Analysis::Histogram { kind } => format!("{} histogram computed", kind.name()),
        }
    }
}
