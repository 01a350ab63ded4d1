use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::model::OutputMode;
use crate::depth::{NormalizerConfig, VirtualDepthPlanes};
use crate::error::{Error, Result};

/// Pipeline settings, loadable from JSON. Every field is optional in the
/// file and falls back to its default.
///
/// ```json
/// {
///   "channel": 1,
///   "output_type": "mask",
///   "planes": [0.0, 0.14, 0.32, 0.53],
///   "normalizer": { "reference_diopter": 0.61 },
///   "resize": [480, 640]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Color channel to keep, if any.
    pub channel: Option<usize>,
    pub output_type: OutputMode,
    pub planes: VirtualDepthPlanes,
    pub normalizer: NormalizerConfig,
    /// `[height, width]` applied to both color and depth.
    pub resize: Option<[u32; 2]>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate. Bad output types, plane lists, or normalizer
    /// constants are reported as [`Error::InvalidConfiguration`].
    pub fn from_json(text: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(text).map_err(|e| {
            if e.is_data() {
                Error::InvalidConfiguration(e.to_string())
            } else {
                Error::Config(e)
            }
        })?;
        config.normalizer.validate()?;
        if let Some([0, _] | [_, 0]) = config.resize {
            return Err(Error::InvalidConfiguration(
                "resize dimensions must be non-zero".to_string(),
            ));
        }
        Ok(config)
    }
}
