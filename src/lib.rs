//! ImageLab Rust Engine
//!
//! Per-session pixel processing for an interactive image editor: noise
//! synthesis, smoothing, edge detection, histogram analysis, intensity
//! enhancement, frequency-domain filtering and hybrid images, composed
//! through a linear undo/reset history. Python bindings via PyO3 and WASM
//! bindings for JavaScript are available behind features.
//!
//! ## Image Format
//! Images are `u8` arrays shaped `(height, width, channels)`:
//! - **Grayscale**: (height, width, 1) - single channel
//! - **RGB**: (height, width, 3) - red, green, blue
//!
//! Encoding and decoding to portable formats (PNG, JPEG) happens outside
//! this crate; [`Image::from_raw`](image::Image::from_raw) accepts the
//! decoded bytes.
//!
//! ## Layers
//! - [`filters`] - pure functions over [`Image`](image::Image)
//! - [`ops`] - the closed set of mutations and analyses
//! - [`session`] - sessions, history and the session store
//! - [`engine`] - request/response front door with status messages
//!
//! ## Logging
//! The session and engine layers emit `tracing` events; installing a
//! subscriber is up to the host.

pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod image;
pub mod ops;
pub mod session;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::EngineConfig;
pub use engine::{Engine, Request, Response};
pub use error::{EngineError, Result};
pub use image::Image;
pub use ops::{Analysis, AnalysisOutput, Artifact, Mutation, MutationOutput};
pub use session::{InMemoryStorage, SessionId, SessionStorage, SessionStore};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray3, PyReadonlyArray3};
    use pyo3::exceptions::{PyKeyError, PyValueError};
    use pyo3::prelude::*;

    use crate::config::EngineConfig;
    use crate::engine::{Engine, Request, Response};
    use crate::error::EngineError;
    use crate::filters::edge::{EdgeMap, EdgeOperator};
    use crate::filters::enhance::{Enhancement, NormalizeRange};
    use crate::filters::frequency::{FrequencyFilter, PassKind};
    use crate::filters::histogram::{HistogramKind, HistogramReport};
    use crate::filters::hybrid::{compose, HybridParams};
    use crate::filters::noise::Noise;
    use crate::filters::spatial::SpatialFilter;
    use crate::image::Image;
    use crate::ops::{Analysis, AnalysisOutput, Artifact, Mutation};
    use crate::session::SessionId;

    impl From<EngineError> for PyErr {
        fn from(err: EngineError) -> PyErr {
            match err {
                EngineError::NotFound(_) => PyKeyError::new_err(err.to_string()),
                _ => PyValueError::new_err(err.to_string()),
            }
        }
    }

    fn to_image(array: PyReadonlyArray3<'_, u8>) -> PyResult<Image> {
        Ok(Image::new(array.as_array().to_owned())?)
    }

    fn to_py<'py>(py: Python<'py>, image: Image) -> Bound<'py, PyArray3<u8>> {
        image.into_array().into_pyarray(py)
    }

    fn parse_session(session: &str) -> PyResult<SessionId> {
        session
            .parse()
            .map_err(|e: uuid::Error| PyValueError::new_err(format!("Invalid session id: {}", e)))
    }

    fn unknown(kind: &str, value: &str) -> PyErr {
        PyValueError::new_err(format!("Invalid {} type: {}", kind, value))
    }

    /// Editing engine holding any number of sessions.
    ///
    /// Images are numpy `uint8` arrays shaped `(H, W, 1)` or `(H, W, 3)`.
    /// Mutating methods return `(image, message)`.
    #[pyclass]
    pub struct ImageLab {
        engine: Engine,
    }

    impl ImageLab {
        fn run(&self, py: Python<'_>, request: Request) -> PyResult<Response> {
            Ok(py.allow_threads(|| self.engine.handle(request))?)
        }

        fn mutate<'py>(
            &self,
            py: Python<'py>,
            session: &str,
            mutation: Mutation,
        ) -> PyResult<(Bound<'py, PyArray3<u8>>, String)> {
            let request = Request::Mutate {
                session: parse_session(session)?,
                mutation,
            };
            match self.run(py, request)? {
                Response::Image { image, message, .. } => Ok((to_py(py, image), message)),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }

        fn analyze(&self, py: Python<'_>, session: &str, analysis: Analysis) -> PyResult<AnalysisOutput> {
            let request = Request::Analyze {
                session: parse_session(session)?,
                analysis,
            };
            match self.run(py, request)? {
                Response::Analysis { output, .. } => Ok(output),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }
    }

    #[pymethods]
    impl ImageLab {
        /// Create an engine, optionally from a TOML configuration string.
        #[new]
        #[pyo3(signature = (config_toml=None))]
        fn new(config_toml: Option<&str>) -> PyResult<Self> {
            let config = match config_toml {
                Some(content) => EngineConfig::from_toml_str(content)?,
                None => EngineConfig::default(),
            };
            Ok(ImageLab {
                engine: Engine::new(config),
            })
        }

        /// Open a session and return its id.
        fn upload(&self, py: Python<'_>, image: PyReadonlyArray3<'_, u8>) -> PyResult<String> {
            match self.run(py, Request::Upload { image: to_image(image)? })? {
                Response::Created { session, .. } => Ok(session.to_string()),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }

        fn working<'py>(&self, py: Python<'py>, session: &str) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let image = self.engine.store().working(&parse_session(session)?)?;
            Ok(to_py(py, image))
        }

        fn original<'py>(&self, py: Python<'py>, session: &str) -> PyResult<Bound<'py, PyArray3<u8>>> {
            let snapshot = self.engine.store().snapshot(&parse_session(session)?)?;
            Ok(to_py(py, snapshot.original))
        }

        fn history_depth(&self, session: &str) -> PyResult<usize> {
            Ok(self.engine.store().snapshot(&parse_session(session)?)?.history_depth)
        }

        /// Add gaussian, uniform or salt_pepper noise.
        #[pyo3(signature = (session, noise_type="gaussian", mean=0.0, sigma=25.0, low=-25.0, high=25.0, ratio=0.05, salt_vs_pepper=0.5))]
        #[allow(clippy::too_many_arguments)]
        fn add_noise<'py>(
            &self,
            py: Python<'py>,
            session: &str,
            noise_type: &str,
            mean: f64,
            sigma: f64,
            low: f64,
            high: f64,
            ratio: f64,
            salt_vs_pepper: f64,
        ) -> PyResult<(Bound<'py, PyArray3<u8>>, String)> {
            let noise = match noise_type {
                "gaussian" => Noise::Gaussian { mean, sigma },
                "uniform" => Noise::Uniform { low, high },
                "salt_pepper" => Noise::SaltPepper {
                    ratio,
                    salt_vs_pepper,
                },
                other => return Err(unknown("noise", other)),
            };
            self.mutate(py, session, Mutation::Noise(noise))
        }

        /// Apply an average, gaussian or median filter.
        #[pyo3(signature = (session, filter_type="average", kernel_size=3, sigma=1.0))]
        fn apply_filter<'py>(
            &self,
            py: Python<'py>,
            session: &str,
            filter_type: &str,
            kernel_size: usize,
            sigma: f64,
        ) -> PyResult<(Bound<'py, PyArray3<u8>>, String)> {
            let filter = match filter_type {
                "average" => SpatialFilter::Average { kernel_size },
                "gaussian" => SpatialFilter::Gaussian { kernel_size, sigma },
                "median" => SpatialFilter::Median { kernel_size },
                other => return Err(unknown("filter", other)),
            };
            self.mutate(py, session, Mutation::Filter(filter))
        }

        /// Apply equalization, normalization or grayscale.
        #[pyo3(signature = (session, enhance_type="equalization", range_type="0-1"))]
        fn enhance<'py>(
            &self,
            py: Python<'py>,
            session: &str,
            enhance_type: &str,
            range_type: &str,
        ) -> PyResult<(Bound<'py, PyArray3<u8>>, String)> {
            let enhancement = match enhance_type {
                "equalization" => Enhancement::Equalization,
                "normalization" => Enhancement::Normalization {
                    range: match range_type {
                        "0-1" => NormalizeRange::Unit,
                        "0-255" => NormalizeRange::Full,
                        other => return Err(unknown("range", other)),
                    },
                },
                "grayscale" => Enhancement::Grayscale,
                other => return Err(unknown("enhancement", other)),
            };
            self.mutate(py, session, Mutation::Enhance(enhancement))
        }

        /// Ideal low/high-pass filter; returns
        /// `(image, spectrum, mask, filtered_spectrum, message)`.
        #[pyo3(signature = (session, filter_type="low", cutoff=30.0))]
        fn frequency_filter<'py>(
            &self,
            py: Python<'py>,
            session: &str,
            filter_type: &str,
            cutoff: f64,
        ) -> PyResult<(
            Bound<'py, PyArray3<u8>>,
            Bound<'py, PyArray3<u8>>,
            Bound<'py, PyArray3<u8>>,
            Bound<'py, PyArray3<u8>>,
            String,
        )> {
            let kind = match filter_type {
                "low" => PassKind::Low,
                "high" => PassKind::High,
                other => return Err(unknown("frequency filter", other)),
            };
            let request = Request::Mutate {
                session: parse_session(session)?,
                mutation: Mutation::Frequency(FrequencyFilter::new(kind, cutoff)),
            };
            match self.run(py, request)? {
                Response::Image {
                    image,
                    artifact:
                        Some(Artifact::Spectrum {
                            spectrum,
                            mask,
                            filtered_spectrum,
                        }),
                    message,
                    ..
                } => Ok((
                    to_py(py, image),
                    to_py(py, spectrum),
                    to_py(py, mask),
                    to_py(py, filtered_spectrum),
                    message,
                )),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }

        /// Edge maps as a list: `[grad_x, grad_y, magnitude]` or `[edges]`.
        #[pyo3(signature = (session, edge_type="sobel", threshold1=100.0, threshold2=200.0))]
        fn detect_edges<'py>(
            &self,
            py: Python<'py>,
            session: &str,
            edge_type: &str,
            threshold1: f64,
            threshold2: f64,
        ) -> PyResult<Vec<Bound<'py, PyArray3<u8>>>> {
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
            match self.analyze(py, session, Analysis::Edges(operator))? {
                AnalysisOutput::Edges(EdgeMap::Multi {
                    grad_x,
                    grad_y,
                    magnitude,
                }) => Ok(vec![to_py(py, grad_x), to_py(py, grad_y), to_py(py, magnitude)]),
                AnalysisOutput::Edges(EdgeMap::Single { edges }) => Ok(vec![to_py(py, edges)]),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }

        /// Luma histogram and CDF.
        fn histogram_gray(&self, py: Python<'_>, session: &str) -> PyResult<(Vec<u64>, Vec<f64>)> {
            let analysis = Analysis::Histogram {
                kind: HistogramKind::Grayscale,
            };
            match self.analyze(py, session, analysis)? {
                AnalysisOutput::Histogram(HistogramReport::Grayscale(report)) => Ok((
                    report.histogram.counts().to_vec(),
                    report.cdf.values().to_vec(),
                )),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }

        /// Red, green and blue histograms.
        fn histogram_rgb(
            &self,
            py: Python<'_>,
            session: &str,
        ) -> PyResult<(Vec<u64>, Vec<u64>, Vec<u64>)> {
            let analysis = Analysis::Histogram {
                kind: HistogramKind::Rgb,
            };
            match self.analyze(py, session, analysis)? {
                AnalysisOutput::Histogram(HistogramReport::Rgb(report)) => Ok((
                    report.red.counts().to_vec(),
                    report.green.counts().to_vec(),
                    report.blue.counts().to_vec(),
                )),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }

        fn undo<'py>(
            &self,
            py: Python<'py>,
            session: &str,
        ) -> PyResult<(Bound<'py, PyArray3<u8>>, String)> {
            match self.run(py, Request::Undo { session: parse_session(session)? })? {
                Response::Image { image, message, .. } => Ok((to_py(py, image), message)),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }

        fn reset<'py>(
            &self,
            py: Python<'py>,
            session: &str,
        ) -> PyResult<(Bound<'py, PyArray3<u8>>, String)> {
            match self.run(py, Request::Reset { session: parse_session(session)? })? {
                Response::Image { image, message, .. } => Ok((to_py(py, image), message)),
                _ => Err(PyValueError::new_err("unexpected response")),
            }
        }

        fn remove(&self, session: &str) -> PyResult<()> {
            Ok(self.engine.store().remove(&parse_session(session)?)?)
        }
    }

    /// Hybrid of `image1`'s low band and `image2`'s high band.
    ///
    /// Returns `(low_freq, high_freq, hybrid)`.
    #[pyfunction]
    #[pyo3(signature = (image1, image2, cutoff_low=30.0, cutoff_high=10.0))]
    pub fn hybrid_image<'py>(
        py: Python<'py>,
        image1: PyReadonlyArray3<'py, u8>,
        image2: PyReadonlyArray3<'py, u8>,
        cutoff_low: f64,
        cutoff_high: f64,
    ) -> PyResult<(
        Bound<'py, PyArray3<u8>>,
        Bound<'py, PyArray3<u8>>,
        Bound<'py, PyArray3<u8>>,
    )> {
        let image1 = to_image(image1)?;
        let image2 = to_image(image2)?;
        let params = HybridParams {
            cutoff_low,
            cutoff_high,
        };
        let result = py.allow_threads(|| compose(&image1, &image2, params, Default::default()))?;
        Ok((
            to_py(py, result.low_freq),
            to_py(py, result.high_freq),
            to_py(py, result.hybrid),
        ))
    }

    #[pymodule]
    pub fn imagelab_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<ImageLab>()?;
        m.add_function(wrap_pyfunction!(hybrid_image, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::imagelab_rust;
