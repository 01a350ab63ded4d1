use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, ImageBuffer, Luma, Pixel};
use ndarray::Array3;

use super::model::{Transform, Transformed};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Directory pairing
// ---------------------------------------------------------------------------

/// Color and depth file names (relative to the directory), each sorted.
///
/// Pairing is positional: `color[i]` goes with `depth[i]`. Nothing checks
/// that the two lists line up, so a directory with a missing or extra file
/// silently shifts every later pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairedListing {
    pub color: Vec<PathBuf>,
    pub depth: Vec<PathBuf>,
}

/// List `dir` and split its entries by the substrings `"color"` and
/// `"depth"`. A name containing both lands in both lists.
pub fn list_pairs(dir: &Path) -> Result<PairedListing> {
    let io_err = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        names.push(PathBuf::from(entry.file_name()));
    }
    names.sort();

    // Substring match only; the names themselves stay byte-exact.
    let matching = |needle: &str| -> Vec<PathBuf> {
        names
            .iter()
            .filter(|n| n.as_os_str().to_string_lossy().contains(needle))
            .cloned()
            .collect()
    };
    let color = matching("color");
    let depth = matching("depth");

    Ok(PairedListing { color, depth })
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

pub fn decode_image(path: &Path) -> Result<DynamicImage> {
    let image = image::open(path).map_err(|source| match source {
        image::ImageError::IoError(io) => Error::Io {
            path: path.to_path_buf(),
            source: io,
        },
        other => Error::Decode {
            path: path.to_path_buf(),
            source: other,
        },
    })?;
    log::debug!(
        "decoded {} ({}x{}, {:?})",
        path.display(),
        image.width(),
        image.height(),
        image.color()
    );
    Ok(image)
}

// ---------------------------------------------------------------------------
// Channel split
// ---------------------------------------------------------------------------

/// Extract one channel as a single-channel image of the same bit depth.
pub fn select_channel(image: &DynamicImage, channel: usize) -> Result<DynamicImage> {
    let available = image.color().channel_count() as usize;
    if channel >= available {
        return Err(Error::InvalidInput(format!(
            "channel {channel} requested from a {available}-channel image"
        )));
    }

    let selected = match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(split_channel(buf, channel)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLuma8(split_channel(buf, channel)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageLuma8(split_channel(buf, channel)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageLuma8(split_channel(buf, channel)),
        DynamicImage::ImageLuma16(buf) => DynamicImage::ImageLuma16(split_channel(buf, channel)),
        DynamicImage::ImageLumaA16(buf) => DynamicImage::ImageLuma16(split_channel(buf, channel)),
        DynamicImage::ImageRgb16(buf) => DynamicImage::ImageLuma16(split_channel(buf, channel)),
        DynamicImage::ImageRgba16(buf) => DynamicImage::ImageLuma16(split_channel(buf, channel)),
        other => {
            return Err(Error::InvalidInput(format!(
                "channel selection is not supported for {:?} images",
                other.color()
            )))
        }
    };
    Ok(selected)
}

fn split_channel<P>(
    buf: &ImageBuffer<P, Vec<P::Subpixel>>,
    channel: usize,
) -> ImageBuffer<Luma<P::Subpixel>, Vec<P::Subpixel>>
where
    P: Pixel,
    Luma<P::Subpixel>: Pixel<Subpixel = P::Subpixel>,
{
    ImageBuffer::from_fn(buf.width(), buf.height(), |x, y| {
        Luma([buf.get_pixel(x, y).channels()[channel]])
    })
}

// ---------------------------------------------------------------------------
// Image → array
// ---------------------------------------------------------------------------

/// Convert to a `[channels, height, width]` array.
///
/// 8-bit samples are scaled to [0, 1]; 16-bit samples keep their raw value
/// (depth maps store millimetres); float samples are copied.
pub fn image_to_array(image: &DynamicImage) -> Array3<f32> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let c = image.color().channel_count() as usize;

    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => {
            planar(image.as_bytes(), c, h, w, |v| f32::from(v) / 255.0)
        }
        DynamicImage::ImageLuma16(buf) => planar(buf.as_raw(), c, h, w, f32::from),
        DynamicImage::ImageLumaA16(buf) => planar(buf.as_raw(), c, h, w, f32::from),
        DynamicImage::ImageRgb16(buf) => planar(buf.as_raw(), c, h, w, f32::from),
        DynamicImage::ImageRgba16(buf) => planar(buf.as_raw(), c, h, w, f32::from),
        DynamicImage::ImageRgb32F(buf) => planar(buf.as_raw(), c, h, w, |v| v),
        DynamicImage::ImageRgba32F(buf) => planar(buf.as_raw(), c, h, w, |v| v),
        other => {
            let rgba = other.to_rgba32f();
            planar(rgba.as_raw(), 4, h, w, |v| v)
        }
    }
}

/// Interleaved `[h, w, c]` samples → planar `[c, h, w]`.
fn planar<T: Copy>(raw: &[T], c: usize, h: usize, w: usize, f: impl Fn(T) -> f32) -> Array3<f32> {
    Array3::from_shape_fn((c, h, w), |(ci, y, x)| f(raw[(y * w + x) * c + ci]))
}

/// Coerce a transform result into array form.
pub fn into_array(value: Transformed) -> Array3<f32> {
    match value {
        Transformed::Image(image) => image_to_array(&image),
        Transformed::Array(array) => array,
    }
}

// ---------------------------------------------------------------------------
// Stock transforms
// ---------------------------------------------------------------------------

/// Resize to exactly `height` x `width` with a triangle (bilinear) filter.
pub fn resize_transform(height: u32, width: u32) -> Transform {
    Arc::new(move |image: DynamicImage| {
        if height == 0 || width == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "resize target {height}x{width} has a zero dimension"
            )));
        }
        Ok(Transformed::Image(image.resize_exact(
            width,
            height,
            FilterType::Triangle,
        )))
    })
}
