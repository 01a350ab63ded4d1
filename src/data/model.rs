use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::DynamicImage;
use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};

use crate::depth::MaskStack;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// OutputMode – what `RgbdDataset::get` returns
// ---------------------------------------------------------------------------

/// Shape of the value produced per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputMode {
    /// `(color, depth)` as separate arrays.
    #[default]
    PairedRaw,
    /// Color and depth concatenated along the channel axis.
    ConcatenatedField,
    /// `(color ⊙ masks, masks, identifier)`.
    MaskTriplet,
}

impl OutputMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            OutputMode::PairedRaw => "color_depth",
            OutputMode::ConcatenatedField => "field",
            OutputMode::MaskTriplet => "mask",
        }
    }
}

impl FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "color_depth" | "pairedRaw" => Ok(OutputMode::PairedRaw),
            "field" | "concatenatedField" => Ok(OutputMode::ConcatenatedField),
            "mask" | "maskTriplet" => Ok(OutputMode::MaskTriplet),
            other => Err(Error::InvalidConfiguration(format!(
                "Undefined output_type '{other}', \
                 can only be chosen from 'color_depth', 'field', 'mask'"
            ))),
        }
    }
}

impl TryFrom<String> for OutputMode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<OutputMode> for String {
    fn from(mode: OutputMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transforms – user-supplied image → image / array mappings
// ---------------------------------------------------------------------------

/// Result of a transform: either still an image, or already an array
/// `[channels, height, width]`.
#[derive(Debug, Clone)]
pub enum Transformed {
    Image(DynamicImage),
    Array(Array3<f32>),
}

impl From<DynamicImage> for Transformed {
    fn from(image: DynamicImage) -> Self {
        Transformed::Image(image)
    }
}

impl From<Array3<f32>> for Transformed {
    fn from(array: Array3<f32>) -> Self {
        Transformed::Array(array)
    }
}

/// A color or depth transform. Must be reentrant: a dataset may be shared
/// across worker threads.
pub type Transform = Arc<dyn Fn(DynamicImage) -> Result<Transformed> + Send + Sync>;

// ---------------------------------------------------------------------------
// Sample – one fetched item
// ---------------------------------------------------------------------------

/// One item produced by [`super::dataset::RgbdDataset::get`].
#[derive(Debug, Clone)]
pub enum Sample {
    Paired {
        /// `[color_channels, h, w]`
        color: Array3<f32>,
        /// `[depth_channels, h, w]`
        depth: Array3<f32>,
    },
    /// `[color_channels + depth_channels, h, w]`
    Field(Array3<f32>),
    Masked {
        /// `[planes, color_channels, h, w]`
        masked_color: Array4<f32>,
        masks: MaskStack,
        /// `<directory name>-<color file name>`
        id: String,
    },
}

impl Sample {
    pub fn mode(&self) -> OutputMode {
        match self {
            Sample::Paired { .. } => OutputMode::PairedRaw,
            Sample::Field(_) => OutputMode::ConcatenatedField,
            Sample::Masked { .. } => OutputMode::MaskTriplet,
        }
    }
}
