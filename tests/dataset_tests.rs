//! Integration tests for directory pairing and sample assembly

use std::path::Path;
use std::sync::Arc;

use depth_planes::{
    Error, OutputMode, PipelineConfig, RgbdDataset, Sample, Transform, Transformed,
};
use image::{DynamicImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::{Array3, Axis};

const W: u32 = 4;
const H: u32 = 3;

fn write_color(dir: &Path, name: &str, base: u8) {
    let img: RgbImage =
        ImageBuffer::from_fn(W, H, |x, y| Rgb([base, x as u8 * 60, y as u8 * 100]));
    img.save(dir.join(name)).unwrap();
}

fn write_depth(dir: &Path, name: &str) {
    write_depth_sized(dir, name, W, H);
}

fn write_depth_sized(dir: &Path, name: &str, width: u32, height: u32) {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        if x == 0 && y == 0 {
            Luma([0u16])
        } else {
            Luma([2000u16 + (y * width + x) as u16 * 2000])
        }
    });
    img.save(dir.join(name)).unwrap();
}

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::Builder::new().prefix("scene_01").tempdir().unwrap();
    write_color(dir.path(), "a_color.png", 10);
    write_depth(dir.path(), "a_depth.png");
    write_color(dir.path(), "b_color.png", 200);
    write_depth(dir.path(), "b_depth.png");
    dir
}

fn dir_name(dir: &Path) -> String {
    dir.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn test_pairs_sorted_files() {
    let dir = fixture_dir();
    let dataset = RgbdDataset::open(dir.path()).unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(
        dataset.pair(0).unwrap(),
        (Path::new("a_color.png"), Path::new("a_depth.png"))
    );
    assert_eq!(
        dataset.pair(1).unwrap(),
        (Path::new("b_color.png"), Path::new("b_depth.png"))
    );
}

#[test]
fn test_paired_raw_output() {
    let dir = fixture_dir();
    let dataset = RgbdDataset::open(dir.path()).unwrap();

    let Sample::Paired { color, depth } = dataset.get(0).unwrap() else {
        panic!("expected paired output");
    };
    assert_eq!(color.dim(), (3, H as usize, W as usize));
    assert_eq!(depth.dim(), (1, H as usize, W as usize));
    assert!((color[[0, 0, 0]] - 10.0 / 255.0).abs() < 1e-6);
    assert_eq!(depth[[0, 0, 0]], 0.0);
    assert_eq!(depth[[0, 0, 1]], 4000.0);
}

#[test]
fn test_field_concatenates_channels() {
    let dir = fixture_dir();
    let dataset = RgbdDataset::builder(dir.path())
        .output_mode(OutputMode::ConcatenatedField)
        .build()
        .unwrap();

    let Sample::Field(field) = dataset.get(1).unwrap() else {
        panic!("expected field output");
    };
    assert_eq!(field.len_of(Axis(0)), 3 + 1);
    assert_eq!(field[[3, 2, 3]], (2000 + 11 * 2000) as f32);
}

#[test]
fn test_mask_triplet() {
    let dir = fixture_dir();
    let dataset = RgbdDataset::builder(dir.path())
        .output_mode(OutputMode::MaskTriplet)
        .build()
        .unwrap();

    let Sample::Masked {
        masked_color,
        masks,
        id,
    } = dataset.get(0).unwrap()
    else {
        panic!("expected mask output");
    };

    assert_eq!(id, format!("{}-a_color.png", dir_name(dir.path())));
    assert_eq!(masks.as_array().dim(), (1, 8, H as usize, W as usize));
    assert_eq!(masked_color.dim(), (8, 3, H as usize, W as usize));

    for lane in masks.as_array().lanes(Axis(1)) {
        assert_eq!(lane.sum(), 1.0);
    }

    // Planes partition the image, so summing over them restores the color.
    let paired = RgbdDataset::open(dir.path()).unwrap().get(0).unwrap();
    let Sample::Paired { color, .. } = paired else {
        panic!("expected paired output");
    };
    let restored = masked_color.sum_axis(Axis(0));
    for (a, b) in restored.iter().zip(color.iter()) {
        assert!((a - b).abs() < 1e-6);
    }

    // The "no return" pixel is farthest: plane 0.
    assert_eq!(masks.plane_indices()[[0, 0, 0]], 0);
    // With 12 pixels the robust peak is the closest pixel itself, scaled to
    // exactly 0.61: last plane.
    assert_eq!(masks.plane_indices()[[0, 0, 1]], 7);
}

#[test]
fn test_channel_selection() {
    let dir = fixture_dir();
    let dataset = RgbdDataset::builder(dir.path()).channel(1).build().unwrap();

    let Sample::Paired { color, .. } = dataset.get(0).unwrap() else {
        panic!("expected paired output");
    };
    assert_eq!(color.dim(), (1, H as usize, W as usize));
    assert!((color[[0, 0, 2]] - 120.0 / 255.0).abs() < 1e-6);
}

#[test]
fn test_channel_out_of_range() {
    let dir = fixture_dir();
    let dataset = RgbdDataset::builder(dir.path()).channel(3).build().unwrap();

    let err = dataset.get(0).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)), "{err}");
}

#[test]
fn test_bogus_output_type() {
    let err = PipelineConfig::from_json(r#"{ "output_type": "bogus" }"#).unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));

    let err = "bogus".parse::<OutputMode>().unwrap_err();
    assert!(err.to_string().contains("Undefined output_type"));
}

#[test]
fn test_transforms_applied() {
    let dir = fixture_dir();
    let color_to_array: Transform = Arc::new(|image: DynamicImage| {
        let gray = image.to_luma8();
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        Ok(Transformed::Array(Array3::from_elem((2, h, w), 0.5)))
    });
    let dataset = RgbdDataset::builder(dir.path())
        .color_transform(color_to_array)
        .depth_transform(depth_planes::resize_transform(H * 2, W * 2))
        .build()
        .unwrap();

    let Sample::Paired { color, depth } = dataset.get(0).unwrap() else {
        panic!("expected paired output");
    };
    assert_eq!(color.dim(), (2, H as usize, W as usize));
    assert!(color.iter().all(|&v| v == 0.5));
    assert_eq!(depth.dim(), (1, 2 * H as usize, 2 * W as usize));
}

#[test]
fn test_config_resize_and_channel() {
    let dir = fixture_dir();
    let config =
        PipelineConfig::from_json(r#"{ "channel": 0, "output_type": "mask", "resize": [6, 8] }"#)
            .unwrap();
    let dataset = RgbdDataset::from_config(dir.path(), &config).unwrap();

    let Sample::Masked {
        masked_color,
        masks,
        ..
    } = dataset.get(1).unwrap()
    else {
        panic!("expected mask output");
    };
    assert_eq!(masks.resolution(), (6, 8));
    assert_eq!(masked_color.dim(), (8, 1, 6, 8));
}

/// Pairing is positional and unchecked: a missing depth file shifts the
/// following pairs.
#[test]
fn test_misaligned_directory_pairs_by_position() {
    let dir = tempfile::tempdir().unwrap();
    write_color(dir.path(), "a_color.png", 10);
    write_depth(dir.path(), "a_depth.png");
    write_color(dir.path(), "b_color.png", 20);
    write_color(dir.path(), "c_color.png", 30);
    write_depth(dir.path(), "c_depth.png");

    let dataset = RgbdDataset::open(dir.path()).unwrap();
    assert_eq!(dataset.len(), 3);
    assert_eq!(
        dataset.pair(1).unwrap(),
        (Path::new("b_color.png"), Path::new("c_depth.png"))
    );
    assert!(dataset.get(1).is_ok());

    let err = dataset.get(2).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2 }));
}

#[test]
fn test_mask_rejects_multichannel_depth() {
    let dir = tempfile::tempdir().unwrap();
    write_color(dir.path(), "a_color.png", 10);
    write_color(dir.path(), "a_depth.png", 40);

    let dataset = RgbdDataset::builder(dir.path())
        .output_mode(OutputMode::MaskTriplet)
        .build()
        .unwrap();
    let err = dataset.get(0).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("3 channels")), "{err}");

    // The other modes take any channel count.
    let Sample::Field(field) = RgbdDataset::builder(dir.path())
        .output_mode(OutputMode::ConcatenatedField)
        .build()
        .unwrap()
        .get(0)
        .unwrap()
    else {
        panic!("expected field output");
    };
    assert_eq!(field.len_of(Axis(0)), 6);
}

#[test]
fn test_resolution_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    write_color(dir.path(), "a_color.png", 10);
    write_depth_sized(dir.path(), "a_depth.png", W + 1, H);

    for mode in [OutputMode::MaskTriplet, OutputMode::ConcatenatedField] {
        let dataset = RgbdDataset::builder(dir.path())
            .output_mode(mode)
            .build()
            .unwrap();
        let err = dataset.get(0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{mode}: {err}");
    }

    // Unpaired output never compares the two.
    let Sample::Paired { color, depth } = RgbdDataset::open(dir.path()).unwrap().get(0).unwrap()
    else {
        panic!("expected paired output");
    };
    assert_eq!(color.dim(), (3, H as usize, W as usize));
    assert_eq!(depth.dim(), (1, H as usize, W as usize + 1));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_file_names() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempfile::tempdir().unwrap();
    let color_name = OsStr::from_bytes(b"a\xffcolor.png");
    let img: RgbImage = ImageBuffer::from_pixel(W, H, Rgb([10, 20, 30]));
    img.save(dir.path().join(color_name)).unwrap();
    write_depth(dir.path(), "a_depth.png");

    let dataset = RgbdDataset::builder(dir.path())
        .output_mode(OutputMode::MaskTriplet)
        .build()
        .unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.pair(0).unwrap().0.as_os_str(), color_name);

    let Sample::Masked { id, .. } = dataset.get(0).unwrap() else {
        panic!("expected mask output");
    };
    assert_eq!(id, format!("{}-a\u{FFFD}color.png", dir_name(dir.path())));
}

#[test]
fn test_index_out_of_range() {
    let dir = fixture_dir();
    let dataset = RgbdDataset::open(dir.path()).unwrap();
    assert!(matches!(
        dataset.get(5),
        Err(Error::IndexOutOfRange { index: 5, len: 2 })
    ));
}

#[test]
fn test_shared_across_threads() {
    let dir = fixture_dir();
    let dataset = RgbdDataset::builder(dir.path())
        .output_mode(OutputMode::MaskTriplet)
        .build()
        .unwrap();

    let ids: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..dataset.len())
            .map(|i| {
                let dataset = &dataset;
                s.spawn(move || match dataset.get(i).unwrap() {
                    Sample::Masked { id, .. } => id,
                    _ => unreachable!(),
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let name = dir_name(dir.path());
    assert_eq!(ids, vec![format!("{name}-a_color.png"), format!("{name}-b_color.png")]);
}
