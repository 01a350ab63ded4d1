use std::path::PathBuf;

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;
const SCENES: usize = 6;

/// Share of depth pixels written as 0 ("no return").
const DROPOUT: f64 = 0.02;

/// Depth in millimetres of a tilted floor with one box standing on it.
fn scene_depth(x: u32, y: u32, box_x: u32, box_w: u32, box_depth: f64) -> f64 {
    let floor = 30000.0 - (y as f64 / HEIGHT as f64) * 25000.0;
    let in_box = x >= box_x && x < box_x + box_w && y > HEIGHT / 3 && y < HEIGHT * 5 / 6;
    if in_box {
        box_depth
    } else {
        floor
    }
}

fn main() {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_scene"));
    std::fs::create_dir_all(&out_dir).expect("Failed to create output directory");

    let mut rng = StdRng::seed_from_u64(42);

    for scene in 0..SCENES {
        let box_x = rng.random_range(0..WIDTH / 2);
        let box_w = rng.random_range(WIDTH / 8..WIDTH / 3);
        let box_depth = rng.random_range(5000.0..12000.0);
        let tint = [rng.random::<u8>(), rng.random::<u8>(), rng.random::<u8>()];

        let depth = ImageBuffer::from_fn(WIDTH, HEIGHT, |x, y| {
            if rng.random_bool(DROPOUT) {
                return Luma([0u16]);
            }
            let noise = rng.random_range(-50.0..50.0);
            Luma([(scene_depth(x, y, box_x, box_w, box_depth) + noise) as u16])
        });

        let color: RgbImage = ImageBuffer::from_fn(WIDTH, HEIGHT, |x, y| {
            let d = depth.get_pixel(x, y)[0] as f64;
            let shade = if d == 0.0 { 0.0 } else { 1.0 - d / 32000.0 };
            Rgb(tint.map(|c| (c as f64 * 0.5 + 127.0 * shade) as u8))
        });

        let color_path = out_dir.join(format!("scene_{scene:03}_color.png"));
        let depth_path = out_dir.join(format!("scene_{scene:03}_depth.png"));
        color.save(&color_path).expect("Failed to write color image");
        depth.save(&depth_path).expect("Failed to write depth image");
    }

    println!(
        "Wrote {SCENES} color/depth pairs ({WIDTH}x{HEIGHT}) to {}",
        out_dir.display()
    );
}
