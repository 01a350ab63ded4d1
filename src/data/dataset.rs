use std::fmt;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use ndarray::{concatenate, Array3, Array4, Axis};

use super::loader::{
    decode_image, into_array, list_pairs, resize_transform, select_channel, PairedListing,
};
use super::model::{OutputMode, Sample, Transform, Transformed};
use crate::config::PipelineConfig;
use crate::depth::{DepthNormalizer, MaskStack, PlaneMaskDecomposer};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// RgbdDataset – paired color/depth sample accessor
// ---------------------------------------------------------------------------

/// Indexes the color/depth pairs of one directory and produces a
/// [`Sample`] per index.
///
/// Nothing is cached: every [`get`](Self::get) decodes both files and
/// recomputes masks. `get` only reads instance state, so a dataset can be
/// shared across worker threads.
pub struct RgbdDataset {
    dir: PathBuf,
    listing: PairedListing,
    channel: Option<usize>,
    color_transform: Option<Transform>,
    depth_transform: Option<Transform>,
    output: OutputMode,
    normalizer: DepthNormalizer,
    decomposer: PlaneMaskDecomposer,
}

impl RgbdDataset {
    /// Open with default settings: no channel selection, no transforms,
    /// [`OutputMode::PairedRaw`].
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(dir).build()
    }

    pub fn builder(dir: impl Into<PathBuf>) -> RgbdDatasetBuilder {
        RgbdDatasetBuilder::new(dir.into())
    }

    /// Open with settings from a [`PipelineConfig`]. A configured resize is
    /// installed as both the color and the depth transform.
    pub fn from_config(dir: impl Into<PathBuf>, config: &PipelineConfig) -> Result<Self> {
        let mut builder = Self::builder(dir)
            .output_mode(config.output_type)
            .decomposer(PlaneMaskDecomposer::new(config.planes.clone()))
            .normalizer(DepthNormalizer::new(config.normalizer)?);
        if let Some(channel) = config.channel {
            builder = builder.channel(channel);
        }
        if let Some([height, width]) = config.resize {
            builder = builder
                .color_transform(resize_transform(height, width))
                .depth_transform(resize_transform(height, width));
        }
        builder.build()
    }

    /// Number of samples (the number of color files).
    pub fn len(&self) -> usize {
        self.listing.color.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listing.color.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn listing(&self) -> &PairedListing {
        &self.listing
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    pub fn decomposer(&self) -> &PlaneMaskDecomposer {
        &self.decomposer
    }

    /// File names `(color, depth)` at `index`, relative to [`dir`](Self::dir).
    pub fn pair(&self, index: usize) -> Result<(&Path, &Path)> {
        let color = self.listing.color.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.listing.color.len(),
        })?;
        let depth = self.listing.depth.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.listing.depth.len(),
        })?;
        Ok((color.as_path(), depth.as_path()))
    }

    /// `<directory name>-<color file name>`. Non-UTF-8 bytes are replaced.
    pub fn identifier(&self, color_name: &Path) -> String {
        let dir_name = self
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{dir_name}-{}", color_name.as_os_str().to_string_lossy())
    }

    pub fn get(&self, index: usize) -> Result<Sample> {
        let (color_name, depth_name) = self.pair(index)?;

        let mut color_image = decode_image(&self.dir.join(color_name))?;
        if let Some(channel) = self.channel {
            color_image = select_channel(&color_image, channel)?;
        }
        let depth_image = decode_image(&self.dir.join(depth_name))?;

        let color = apply(self.color_transform.as_ref(), color_image)?;
        let depth = apply(self.depth_transform.as_ref(), depth_image)?;

        match self.output {
            OutputMode::PairedRaw => Ok(Sample::Paired { color, depth }),
            OutputMode::ConcatenatedField => {
                let field = concatenate(Axis(0), &[color.view(), depth.view()]).map_err(|e| {
                    Error::InvalidInput(format!(
                        "cannot concatenate color {:?} with depth {:?}: {e}",
                        color.dim(),
                        depth.dim()
                    ))
                })?;
                Ok(Sample::Field(field))
            }
            OutputMode::MaskTriplet => {
                let (masked_color, masks) = self.masked(&color, &depth)?;
                Ok(Sample::Masked {
                    masked_color,
                    masks,
                    id: self.identifier(color_name),
                })
            }
        }
    }

    /// Every sample in index order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Sample>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    fn masked(
        &self,
        color: &Array3<f32>,
        depth: &Array3<f32>,
    ) -> Result<(Array4<f32>, MaskStack)> {
        let diopters = self.normalizer.normalize(depth)?;
        let masks = self.decomposer.decompose(&diopters)?;

        if masks.batch() != 1 {
            return Err(Error::InvalidInput(format!(
                "mask output needs a single-channel depth image, got {} channels",
                masks.batch()
            )));
        }
        let (_, ch, cw) = color.dim();
        if (ch, cw) != masks.resolution() {
            return Err(Error::InvalidInput(format!(
                "color resolution {:?} does not match depth resolution {:?}",
                (ch, cw),
                masks.resolution()
            )));
        }

        // [1, C, H, W] * [P, 1, H, W] → [P, C, H, W]
        let planes = masks.as_array().index_axis(Axis(0), 0);
        let masked_color = &color.view().insert_axis(Axis(0)) * &planes.insert_axis(Axis(1));
        Ok((masked_color, masks))
    }
}

fn apply(transform: Option<&Transform>, image: DynamicImage) -> Result<Array3<f32>> {
    let value = match transform {
        Some(transform) => transform(image)?,
        None => Transformed::Image(image),
    };
    Ok(into_array(value))
}

impl fmt::Debug for RgbdDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RgbdDataset")
            .field("dir", &self.dir)
            .field("len", &self.len())
            .field("channel", &self.channel)
            .field("color_transform", &self.color_transform.is_some())
            .field("depth_transform", &self.depth_transform.is_some())
            .field("output", &self.output)
            .field("planes", self.decomposer.planes())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct RgbdDatasetBuilder {
    dir: PathBuf,
    channel: Option<usize>,
    color_transform: Option<Transform>,
    depth_transform: Option<Transform>,
    output: OutputMode,
    normalizer: DepthNormalizer,
    decomposer: PlaneMaskDecomposer,
}

impl RgbdDatasetBuilder {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            channel: None,
            color_transform: None,
            depth_transform: None,
            output: OutputMode::default(),
            normalizer: DepthNormalizer::default(),
            decomposer: PlaneMaskDecomposer::default(),
        }
    }

    /// Keep only this channel of the decoded color image.
    pub fn channel(mut self, channel: usize) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn color_transform(mut self, transform: Transform) -> Self {
        self.color_transform = Some(transform);
        self
    }

    pub fn depth_transform(mut self, transform: Transform) -> Self {
        self.depth_transform = Some(transform);
        self
    }

    pub fn output_mode(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn normalizer(mut self, normalizer: DepthNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn decomposer(mut self, decomposer: PlaneMaskDecomposer) -> Self {
        self.decomposer = decomposer;
        self
    }

    /// List the directory and fix the color/depth pairing.
    pub fn build(self) -> Result<RgbdDataset> {
        let listing = list_pairs(&self.dir)?;
        if listing.color.len() != listing.depth.len() {
            log::warn!(
                "{}: {} color files but {} depth files; pairs are matched by position only",
                self.dir.display(),
                listing.color.len(),
                listing.depth.len()
            );
        }
        log::info!(
            "opened {} with {} samples ({} output)",
            self.dir.display(),
            listing.color.len(),
            self.output
        );

        Ok(RgbdDataset {
            dir: self.dir,
            listing,
            channel: self.channel,
            color_transform: self.color_transform,
            depth_transform: self.depth_transform,
            output: self.output,
            normalizer: self.normalizer,
            decomposer: self.decomposer,
        })
    }
}
