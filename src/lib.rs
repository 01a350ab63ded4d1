//! Paired RGB-D loading and depth-plane decomposition.
//!
//! A directory of `*color*` / `*depth*` images is opened as an
//! [`RgbdDataset`]. In [`OutputMode::MaskTriplet`] every depth map is
//! converted to diopters ([`DepthNormalizer`]) and split into one-hot
//! occupancy masks over a fixed set of virtual depth planes
//! ([`PlaneMaskDecomposer`]).

pub mod color;
pub mod config;
pub mod data;
pub mod depth;
pub mod error;

pub use config::PipelineConfig;
pub use data::dataset::{RgbdDataset, RgbdDatasetBuilder};
pub use data::loader::{list_pairs, resize_transform, PairedListing};
pub use data::model::{OutputMode, Sample, Transform, Transformed};
pub use depth::{
    DepthNormalizer, MaskStack, NormalizerConfig, PlaneMaskDecomposer, VirtualDepthPlanes,
    VIRTUAL_DEPTH_PLANES,
};
pub use error::{Error, Result};
