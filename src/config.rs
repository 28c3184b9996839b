//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! history_limit = 50          # omit for unbounded undo history
//! equalization = "luma"       # or "per_channel"
//! high_band_offset = "zero"   # or "mid_gray"
//! noise_seed = 42             # omit to seed from entropy
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, Result};
use crate::filters::enhance::EqualizeMode;
use crate::filters::hybrid::HighBandOffset;

/// Tunables shared by every session of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum undo depth per session; `None` keeps every entry
    pub history_limit: Option<usize>,
    /// How color images are equalized
    pub equalization: EqualizeMode,
    /// Display offset of the hybrid high band
    pub high_band_offset: HighBandOffset,
    /// Fixed seed for every session's noise generator
    pub noise_seed: Option<u64>,
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| EngineError::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded engine configuration from {:?}", path);
        Ok(config)
    }
}
